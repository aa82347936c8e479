use crate::canvas::Canvas;
use crate::color::Color;
use crate::error::{OgError, OgResult};

/// Full-bleed vertical gradient: `top` on row 0, `bottom` on the last row.
pub fn synthesize(width: u32, height: u32, top: Color, bottom: Color) -> OgResult<Canvas> {
    if width == 0 || height == 0 {
        return Err(OgError::InvalidDimensions { width, height });
    }
    let mut canvas = Canvas::new(width, height)?;
    for y in 0..height {
        canvas.fill_row(y, row_color(y, height, top, bottom));
    }
    Ok(canvas)
}

/// Stops are opaque, whatever alpha the inputs carry.
///
/// `t` runs over `height - 1` rather than `height`, which pins the last row
/// to `bottom` exactly.
pub fn row_color(y: u32, height: u32, top: Color, bottom: Color) -> Color {
    let t = if height > 1 {
        y as f32 / (height - 1) as f32
    } else {
        0.0
    };
    let top = Color { a: 255, ..top };
    let bottom = Color { a: 255, ..bottom };
    Color::lerp(top, bottom, t)
}
