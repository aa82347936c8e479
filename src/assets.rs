use image::{DynamicImage, RgbaImage};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{OgError, OgResult};

#[derive(Debug, Clone)]
pub struct AssetConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ImageAsset {
    id: String,
    image: RgbaImage,
}

impl ImageAsset {
    pub fn new(id: impl Into<String>, image: RgbaImage) -> Self {
        Self {
            id: id.into(),
            image,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

/// Read-only store of named PNG rasters (`<dir>/<id>.png`).
#[derive(Debug, Clone)]
pub struct AssetLoader {
    config: AssetConfig,
}

impl AssetLoader {
    pub fn new(config: AssetConfig) -> Self {
        Self { config }
    }

    pub fn dir(&self) -> &Path {
        &self.config.dir
    }

    /// `None` for identifiers that would escape the store.
    pub fn asset_path(&self, id: &str) -> Option<PathBuf> {
        let id = id.trim();
        if id.is_empty()
            || id.contains(['/', '\\'])
            || id.contains("..")
            || id.starts_with('.')
        {
            return None;
        }
        Some(self.config.dir.join(format!("{}.png", id)))
    }

    pub fn load(
        &self,
        id: &str,
        max_dimensions: Option<(u32, u32)>,
        opacity: f32,
    ) -> OgResult<ImageAsset> {
        let path = self
            .asset_path(id)
            .ok_or_else(|| OgError::asset_not_found(id))?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(OgError::asset_not_found(id));
            }
            Err(err) => return Err(OgError::invalid_asset(id, err)),
        };
        let mut image =
            image::load_from_memory(&bytes).map_err(|err| OgError::invalid_asset(id, err))?;
        if let Some((max_width, max_height)) = max_dimensions {
            image = thumbnail(image, max_width, max_height);
        }
        let mut rgba = image.to_rgba8();
        apply_opacity(&mut rgba, opacity);
        debug!(
            "loaded asset {} ({}x{}) from {}",
            id,
            rgba.width(),
            rgba.height(),
            path.display()
        );
        Ok(ImageAsset::new(id.trim(), rgba))
    }
}

/// Shrinks to fit inside the box, keeping aspect ratio. Never enlarges.
pub fn thumbnail(image: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    if max_width == 0 || max_height == 0 {
        return image;
    }
    if image.width() <= max_width && image.height() <= max_height {
        return image;
    }
    image.thumbnail(max_width, max_height)
}

/// Scales alpha by `opacity` (rounded); values outside `[0, 1)` leave the image untouched.
pub fn apply_opacity(image: &mut RgbaImage, opacity: f32) {
    if !(0.0..1.0).contains(&opacity) {
        return;
    }
    for pixel in image.chunks_exact_mut(4) {
        pixel[3] = (pixel[3] as f32 * opacity).round() as u8;
    }
}
