use tracing::debug;

pub trait TextMeasure {
    fn text_width(&self, text: &str) -> f32;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBlock {
    lines: Vec<String>,
}

impl TextBlock {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// Greedy word wrap against a pixel budget.
///
/// Words are never split: a word wider than `max_width` on its own becomes a
/// line of its own and overflows. Text that already fits is returned as a
/// single line, so empty input yields one empty line.
pub fn wrap<M>(text: &str, max_width: f32, measure: &M) -> TextBlock
where
    M: TextMeasure + ?Sized,
{
    if measure.text_width(text) <= max_width {
        return TextBlock {
            lines: vec![text.to_string()],
        };
    }

    let words: Vec<&str> = text.split(' ').collect();
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut index = 0;
    while index < words.len() {
        let word = words[index];
        let candidate = format!("{}{} ", current, word);
        if measure.text_width(&candidate) <= max_width {
            current = candidate;
            index += 1;
            continue;
        }
        if !current.is_empty() {
            push_line(&mut lines, &current);
            current.clear();
            continue;
        }
        debug!("word overflows line budget {:.1}px: {}", max_width, word);
        lines.push(word.to_string());
        index += 1;
    }
    if !current.is_empty() {
        push_line(&mut lines, &current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    TextBlock { lines }
}

fn push_line(lines: &mut Vec<String>, buffer: &str) {
    let line = buffer.trim_end_matches(' ');
    if !line.is_empty() {
        lines.push(line.to_string());
    }
}
