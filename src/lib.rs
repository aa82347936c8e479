use anyhow::{Context, Result};

pub mod assets;
pub mod canvas;
pub mod color;
pub mod compose;
pub mod error;
pub mod fonts;
pub mod gradient;
pub mod layout;
pub mod logging;
mod paths;
pub mod server;
pub mod settings;
#[cfg(test)]
mod test_util;

pub use assets::{AssetConfig, AssetLoader, ImageAsset};
pub use canvas::Canvas;
pub use color::Color;
pub use compose::{GenerationRequest, LayoutConstants, OG_HEIGHT, OG_WIDTH, OgImageGenerator};
pub use error::{OgError, OgResult};
pub use fonts::{FontCache, FontCacheConfig, FontFace, FontFamily, FontProvider, HttpFontProvider};
pub use settings::{Settings, load_settings};

/// Wires the HTTP font provider, on-disk cache and asset loader from `settings`.
pub fn build_generator(settings: &Settings) -> Result<OgImageGenerator<HttpFontProvider>> {
    let provider = HttpFontProvider::new(
        &settings.font_provider_url,
        settings.font_timeout(),
        settings.font_max_retries,
    )
    .with_context(|| format!("invalid font provider: {}", settings.font_provider_url))?;
    let fonts = FontCache::new(provider, settings.font_cache_config());
    let assets = AssetLoader::new(settings.asset_config());
    Ok(OgImageGenerator::new(fonts, assets).with_logo(settings.logo.clone()))
}

/// Renders one card with a fresh generator and returns the PNG bytes.
pub async fn render_once(settings: &Settings, request: &GenerationRequest) -> Result<Vec<u8>> {
    let generator = build_generator(settings)?;
    let bytes = generator.generate(request).await?;
    Ok(bytes)
}
