use tracing::{debug, info, warn};

use crate::assets::AssetLoader;
use crate::canvas::Canvas;
use crate::color::Color;
use crate::error::{OgError, OgResult};
use crate::fonts::{FontCache, FontFace, FontProvider};
use crate::gradient;
use crate::layout::wrap;

pub const OG_WIDTH: u32 = 1200;
pub const OG_HEIGHT: u32 = 630;
pub const DEFAULT_LOGO: &str = "code";
pub const DEFAULT_FONT_FAMILY: &str = "Roboto";
pub const DEFAULT_TOP_COLOR: Color = Color::rgb(206, 236, 255);
pub const DEFAULT_BOTTOM_COLOR: Color = Color::rgb(236, 248, 255);

const TITLE_STYLES: &[&str] = &["Medium", "SemiBold", "Bold", "Regular"];
const SITE_STYLES: &[&str] = &["Regular", "Book", "Medium"];

/// Presentation constants for the card. Layout and drawing both read from here.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConstants {
    pub width: u32,
    pub height: u32,
    pub padding: f32,
    pub logo_size: u32,
    pub logo_offset: (i32, i32),
    pub title_size: f32,
    pub title_top: f32,
    pub title_line_spacing: f32,
    pub title_width_ratio: f32,
    pub title_color: Color,
    pub site_size: f32,
    pub site_color: Color,
    pub badge_offset: (i32, i32),
    pub badge_opacity: f32,
}

impl Default for LayoutConstants {
    fn default() -> Self {
        Self {
            width: OG_WIDTH,
            height: OG_HEIGHT,
            padding: 50.0,
            logo_size: 120,
            logo_offset: (45, 50),
            title_size: 70.0,
            title_top: 200.0,
            title_line_spacing: 10.0,
            title_width_ratio: 0.8,
            title_color: Color::rgb(0x25, 0x25, 0x25),
            site_size: 30.0,
            site_color: Color::rgb(0x58, 0x58, 0x58),
            badge_offset: (894, 324),
            badge_opacity: 0.5,
        }
    }
}

impl LayoutConstants {
    pub fn title_max_width(&self) -> f32 {
        self.title_width_ratio * self.width as f32 - 2.0 * self.padding
    }

    /// Top of the line box for title line `index`.
    pub fn title_line_y(&self, index: usize, line_height: f32) -> f32 {
        self.title_top + index as f32 * (line_height + self.title_line_spacing)
    }

    pub fn site_name_y(&self, line_height: f32) -> f32 {
        self.height as f32 - line_height - self.padding
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub title: String,
    pub site_name: String,
    pub top_color: Color,
    pub bottom_color: Color,
    pub font_family: String,
    pub tag: Option<String>,
}

impl GenerationRequest {
    pub fn new(title: impl Into<String>, site_name: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            site_name: site_name.into(),
            top_color: DEFAULT_TOP_COLOR,
            bottom_color: DEFAULT_BOTTOM_COLOR,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: Option<String>) -> Self {
        self.tag = tag.filter(|value| !value.trim().is_empty());
        self
    }

    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = family.into();
        self
    }

    pub fn with_colors(mut self, top: Color, bottom: Color) -> Self {
        self.top_color = top;
        self.bottom_color = bottom;
        self
    }
}

/// Faces for one generation job, loaded once at job start.
#[derive(Debug, Clone)]
pub struct JobFonts {
    pub title: FontFace,
    pub site: FontFace,
}

pub struct OgImageGenerator<P> {
    fonts: FontCache<P>,
    assets: AssetLoader,
    logo: String,
    layout: LayoutConstants,
}

impl<P: FontProvider> OgImageGenerator<P> {
    pub fn new(fonts: FontCache<P>, assets: AssetLoader) -> Self {
        Self {
            fonts,
            assets,
            logo: DEFAULT_LOGO.to_string(),
            layout: LayoutConstants::default(),
        }
    }

    pub fn with_layout(mut self, layout: LayoutConstants) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_logo(mut self, logo: impl Into<String>) -> Self {
        self.logo = logo.into();
        self
    }

    pub fn layout(&self) -> &LayoutConstants {
        &self.layout
    }

    pub fn font_cache(&self) -> &FontCache<P> {
        &self.fonts
    }

    pub fn assets(&self) -> &AssetLoader {
        &self.assets
    }

    /// Renders the card and returns it PNG-encoded.
    pub async fn generate(&self, request: &GenerationRequest) -> OgResult<Vec<u8>> {
        let canvas = self.render(request).await?;
        let bytes = canvas.encode_png()?;
        info!(
            "generated og image for {:?} ({} bytes)",
            request.title,
            bytes.len()
        );
        Ok(bytes)
    }

    pub async fn render(&self, request: &GenerationRequest) -> OgResult<Canvas> {
        let (width, height) = (self.layout.width, self.layout.height);
        if width == 0 || height == 0 {
            return Err(OgError::InvalidDimensions { width, height });
        }
        let fonts = self.load_fonts(&request.font_family).await?;
        self.compose(request, &fonts)
    }

    pub async fn load_fonts(&self, family: &str) -> OgResult<JobFonts> {
        let resolved = self.fonts.resolve(family).await?;
        let load = |styles: &[&str], size: f32| -> OgResult<FontFace> {
            let (style, path) = resolved.face_for(styles).ok_or_else(|| {
                OgError::font_unavailable(family, "family has no usable faces")
            })?;
            debug!("using {} {} at {}px", resolved.name(), style, size);
            FontFace::load(path, size).map_err(|err| OgError::font_unavailable(family, err))
        };
        Ok(JobFonts {
            title: load(TITLE_STYLES, self.layout.title_size)?,
            site: load(SITE_STYLES, self.layout.site_size)?,
        })
    }

    pub fn compose(&self, request: &GenerationRequest, fonts: &JobFonts) -> OgResult<Canvas> {
        let layout = &self.layout;
        let mut canvas = gradient::synthesize(
            layout.width,
            layout.height,
            request.top_color,
            request.bottom_color,
        )?;

        let logo = self.assets.load(
            &self.logo,
            Some((layout.logo_size, layout.logo_size)),
            1.0,
        )?;
        canvas.paste(&logo, layout.logo_offset.0, layout.logo_offset.1)?;

        let title_lines = wrap(&request.title, layout.title_max_width(), &fonts.title);
        let line_height = fonts.title.line_height();
        for (index, line) in title_lines.lines().iter().enumerate() {
            canvas.draw_text(
                &fonts.title,
                line,
                layout.padding,
                layout.title_line_y(index, line_height),
                layout.title_color,
            );
        }

        canvas.draw_text(
            &fonts.site,
            &request.site_name,
            layout.padding,
            layout.site_name_y(fonts.site.line_height()),
            layout.site_color,
        );

        if let Some(tag) = request.tag.as_deref() {
            match self.assets.load(tag, None, layout.badge_opacity) {
                Ok(badge) => canvas.paste(&badge, layout.badge_offset.0, layout.badge_offset.1)?,
                Err(err) if err.is_asset_not_found() => {
                    warn!("no badge for tag {:?}; rendering without it", tag);
                }
                Err(err) => return Err(err),
            }
        }

        Ok(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_budget_leaves_room_for_badge() {
        let layout = LayoutConstants::default();
        assert!((layout.title_max_width() - 860.0).abs() < 1e-3);
    }

    #[test]
    fn title_lines_advance_by_height_plus_spacing() {
        let layout = LayoutConstants::default();
        assert_eq!(layout.title_line_y(0, 80.0), 200.0);
        assert_eq!(layout.title_line_y(2, 80.0), 380.0);
        assert_eq!(layout.site_name_y(35.0), 545.0);
    }

    #[test]
    fn blank_tags_are_dropped() {
        let request = GenerationRequest::new("Hello", "example.com").with_tag(Some("  ".into()));
        assert_eq!(request.tag, None);
        let request = request.with_tag(Some("rust".into()));
        assert_eq!(request.tag.as_deref(), Some("rust"));
    }

    #[test]
    fn requests_default_to_roboto_on_blue() {
        let request = GenerationRequest::new("Hello", "example.com");
        assert_eq!(request.font_family, "Roboto");
        assert_eq!(request.top_color, Color::rgb(206, 236, 255));
        assert_eq!(request.bottom_color, Color::rgb(236, 248, 255));
    }
}
