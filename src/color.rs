use anyhow::{Result, anyhow};
use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Accepts `#RRGGBB`, `#RRGGBBAA` (leading `#` optional) or `r,g,b`.
    pub fn parse(input: &str) -> Result<Self> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(anyhow!("color is empty"));
        }
        if raw.contains(',') {
            return parse_triplet(raw);
        }
        parse_hex(raw)
    }

    /// Channel-wise linear blend; `t` is clamped to `[0, 1]`.
    pub fn lerp(from: Color, to: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| -> u8 {
            let value = a as f32 + t * (b as f32 - a as f32);
            value.round().clamp(0.0, 255.0) as u8
        };
        Color {
            r: mix(from.r, to.r),
            g: mix(from.g, to.g),
            b: mix(from.b, to.b),
            a: mix(from.a, to.a),
        }
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Color::parse(&raw).map_err(serde::de::Error::custom)
    }
}

fn parse_hex(raw: &str) -> Result<Color> {
    let hex = raw.strip_prefix('#').unwrap_or(raw);
    if !hex.is_ascii() {
        return Err(anyhow!("invalid hex color: {}", raw));
    }
    let byte = |range: std::ops::Range<usize>| -> Result<u8> {
        u8::from_str_radix(&hex[range], 16).map_err(|_| anyhow!("invalid hex color: {}", raw))
    };
    match hex.len() {
        6 => Ok(Color::rgb(byte(0..2)?, byte(2..4)?, byte(4..6)?)),
        8 => Ok(Color::rgba(byte(0..2)?, byte(2..4)?, byte(4..6)?, byte(6..8)?)),
        _ => Err(anyhow!(
            "hex color must be #RRGGBB or #RRGGBBAA: {}",
            raw
        )),
    }
}

fn parse_triplet(raw: &str) -> Result<Color> {
    let parts = raw
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<u8>()
                .map_err(|_| anyhow!("invalid color channel '{}' in {}", part.trim(), raw))
        })
        .collect::<Result<Vec<_>>>()?;
    match parts.as_slice() {
        [r, g, b] => Ok(Color::rgb(*r, *g, *b)),
        [r, g, b, a] => Ok(Color::rgba(*r, *g, *b, *a)),
        _ => Err(anyhow!("color must have 3 or 4 channels: {}", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_triplets() {
        assert_eq!(Color::parse("#252525").unwrap(), Color::rgb(0x25, 0x25, 0x25));
        assert_eq!(Color::parse("ceecff").unwrap(), Color::rgb(206, 236, 255));
        assert_eq!(
            Color::parse("#00000080").unwrap(),
            Color::rgba(0, 0, 0, 0x80)
        );
        assert_eq!(
            Color::parse(" 206, 236 ,255 ").unwrap(),
            Color::rgb(206, 236, 255)
        );
    }

    #[test]
    fn rejects_malformed_colors() {
        assert!(Color::parse("").is_err());
        assert!(Color::parse("#12345").is_err());
        assert!(Color::parse("#gg0000").is_err());
        assert!(Color::parse("1,2").is_err());
        assert!(Color::parse("1,2,300").is_err());
        assert!(Color::parse("#ééé").is_err());
    }

    #[test]
    fn lerp_hits_both_endpoints() {
        let top = Color::rgb(206, 236, 255);
        let bottom = Color::rgb(236, 248, 255);
        assert_eq!(Color::lerp(top, bottom, 0.0), top);
        assert_eq!(Color::lerp(top, bottom, 1.0), bottom);
        assert_eq!(Color::lerp(top, bottom, 0.5), Color::rgb(221, 242, 255));
    }
}
