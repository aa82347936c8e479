use tiny_skia::{
    ColorU8, FillRule, IntSize, Paint, PathBuilder, Pixmap, PixmapPaint, Transform,
};

use crate::assets::ImageAsset;
use crate::color::Color;
use crate::error::{OgError, OgResult};
use crate::fonts::FontFace;

/// RGBA raster with a top-left origin, stored premultiplied.
pub struct Canvas {
    pixmap: Pixmap,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> OgResult<Self> {
        let pixmap =
            Pixmap::new(width, height).ok_or(OgError::InvalidDimensions { width, height })?;
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        // Pixmap::pixel only checks the flat index, so (width, y) would wrap.
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let pixel = self.pixmap.pixel(x, y)?.demultiply();
        Some(Color::rgba(
            pixel.red(),
            pixel.green(),
            pixel.blue(),
            pixel.alpha(),
        ))
    }

    /// Overwrites row `y` with `color`; rows outside the canvas are ignored.
    pub fn fill_row(&mut self, y: u32, color: Color) {
        if y >= self.height() {
            return;
        }
        let width = self.width() as usize;
        let start = y as usize * width;
        let value = ColorU8::from_rgba(color.r, color.g, color.b, color.a).premultiply();
        self.pixmap.pixels_mut()[start..start + width].fill(value);
    }

    /// Source-over composite of `asset` with its top-left corner at `(x, y)`.
    pub fn paste(&mut self, asset: &ImageAsset, x: i32, y: i32) -> OgResult<()> {
        let image = asset.image();
        let size = IntSize::from_wh(image.width(), image.height())
            .ok_or_else(|| OgError::invalid_asset(asset.id(), "asset has no pixels"))?;
        let mut data = Vec::with_capacity(image.as_raw().len());
        for px in image.as_raw().chunks_exact(4) {
            let premul = ColorU8::from_rgba(px[0], px[1], px[2], px[3]).premultiply();
            data.extend_from_slice(&[premul.red(), premul.green(), premul.blue(), premul.alpha()]);
        }
        let source = Pixmap::from_vec(data, size)
            .ok_or_else(|| OgError::invalid_asset(asset.id(), "asset buffer size mismatch"))?;
        self.pixmap.draw_pixmap(
            x,
            y,
            source.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        Ok(())
    }

    /// Draws one line of text; `y` is the top of the face's line box.
    pub fn draw_text(&mut self, face: &FontFace, text: &str, x: f32, y: f32, color: Color) {
        let mut builder = PathBuilder::new();
        face.append_outlines(text, x, y + face.ascent(), &mut builder);
        let Some(path) = builder.finish() else {
            return;
        };
        let mut paint = Paint::default();
        paint.set_color_rgba8(color.r, color.g, color.b, color.a);
        paint.anti_alias = true;
        self.pixmap
            .fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }

    pub fn encode_png(&self) -> OgResult<Vec<u8>> {
        self.pixmap
            .encode_png()
            .map_err(|err| OgError::Encode(err.to_string()))
    }
}
