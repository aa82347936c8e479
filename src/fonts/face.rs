use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::sync::Arc;
use tiny_skia::PathBuilder;
use ttf_parser::{Face, GlyphId, OutlineBuilder};

use crate::layout::TextMeasure;

/// A parsed font file bound to one pixel size.
#[derive(Clone)]
pub struct FontFace {
    data: Arc<Vec<u8>>,
    face_index: u32,
    size: f32,
    units_per_em: u16,
    ascender: i16,
    descender: i16,
    space_advance: u16,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PlacedGlyph {
    pub(crate) id: GlyphId,
    pub(crate) x: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct GlyphRun {
    pub(crate) glyphs: Vec<PlacedGlyph>,
    pub(crate) width: f32,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace")
            .field("face_index", &self.face_index)
            .field("size", &self.size)
            .field("units_per_em", &self.units_per_em)
            .finish()
    }
}

impl FontFace {
    pub fn load(path: &Path, size: f32) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read font: {}", path.display()))?;
        Self::from_bytes(data, size)
            .map_err(|err| anyhow!("failed to parse font: {} ({})", path.display(), err))
    }

    pub fn from_bytes(data: Vec<u8>, size: f32) -> Result<Self> {
        if !(size.is_finite() && size > 0.0) {
            return Err(anyhow!("font size must be positive"));
        }
        let count = ttf_parser::fonts_in_collection(&data).unwrap_or(1);
        for index in 0..count {
            let Ok(face) = Face::parse(&data, index) else {
                continue;
            };
            let units_per_em = face.units_per_em().max(1);
            let space_advance = face
                .glyph_index(' ')
                .and_then(|id| face.glyph_hor_advance(id))
                .unwrap_or(units_per_em / 2);
            let ascender = face.ascender();
            let descender = face.descender();
            return Ok(Self {
                data: Arc::new(data),
                face_index: index,
                size,
                units_per_em,
                ascender,
                descender,
                space_advance,
            });
        }
        Err(anyhow!("no parsable face in font data"))
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    fn scale(&self) -> f32 {
        self.size / self.units_per_em as f32
    }

    /// Distance from the top of the line box to the baseline.
    pub fn ascent(&self) -> f32 {
        self.ascender as f32 * self.scale()
    }

    /// Height of one line box; the same value drives wrapping and drawing.
    pub fn line_height(&self) -> f32 {
        (self.ascender as f32 - self.descender as f32) * self.scale()
    }

    pub fn text_width(&self, text: &str) -> f32 {
        self.place_glyphs(text).width
    }

    pub(crate) fn place_glyphs(&self, text: &str) -> GlyphRun {
        let Ok(face) = Face::parse(&self.data, self.face_index) else {
            return GlyphRun::default();
        };
        let scale = self.scale();
        let mut run = GlyphRun::default();
        let mut pen = 0u32;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            let glyph = face.glyph_index(ch);
            let advance = glyph
                .and_then(|id| face.glyph_hor_advance(id))
                .unwrap_or(self.space_advance);
            if let Some(id) = glyph
                && ch != ' '
            {
                run.glyphs.push(PlacedGlyph {
                    id,
                    x: pen as f32 * scale,
                });
            }
            pen = pen.saturating_add(advance as u32);
        }
        run.width = pen as f32 * scale;
        run
    }

    /// Appends the outlines of `text` to `builder`, with `(x, baseline)` as pen origin.
    pub(crate) fn append_outlines(
        &self,
        text: &str,
        x: f32,
        baseline: f32,
        builder: &mut PathBuilder,
    ) {
        let Ok(face) = Face::parse(&self.data, self.face_index) else {
            return;
        };
        let scale = self.scale();
        for glyph in self.place_glyphs(text).glyphs {
            let mut outline = GlyphOutline {
                builder: &mut *builder,
                origin_x: x + glyph.x,
                origin_y: baseline,
                scale,
            };
            face.outline_glyph(glyph.id, &mut outline);
        }
    }
}

impl TextMeasure for FontFace {
    fn text_width(&self, text: &str) -> f32 {
        FontFace::text_width(self, text)
    }
}

// Font units are y-up; canvas rows grow downward.
struct GlyphOutline<'a> {
    builder: &'a mut PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl GlyphOutline<'_> {
    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, self.origin_y - y * self.scale)
    }
}

impl OutlineBuilder for GlyphOutline<'_> {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}
