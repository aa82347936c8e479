use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::assets::AssetConfig;
use crate::color::Color;
use crate::compose::{
    DEFAULT_BOTTOM_COLOR, DEFAULT_FONT_FAMILY, DEFAULT_LOGO, DEFAULT_TOP_COLOR, GenerationRequest,
};
use crate::fonts::FontCacheConfig;
use crate::paths;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub font_provider_url: String,
    pub font_cache_dir: Option<String>,
    pub font_timeout_secs: u64,
    pub font_max_retries: usize,
    pub default_font_family: String,
    pub resources_dir: String,
    pub logo: String,
    pub top_color: Color,
    pub bottom_color: Color,
    pub server_addr: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            font_provider_url: "https://fonts.google.com".to_string(),
            font_cache_dir: None,
            font_timeout_secs: 30,
            font_max_retries: 2,
            default_font_family: DEFAULT_FONT_FAMILY.to_string(),
            resources_dir: "resources/img".to_string(),
            logo: DEFAULT_LOGO.to_string(),
            top_color: DEFAULT_TOP_COLOR,
            bottom_color: DEFAULT_BOTTOM_COLOR,
            server_addr: "127.0.0.1:8000".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    fonts: Option<FontSettings>,
    resources: Option<ResourceSettings>,
    image: Option<ImageSettings>,
    server: Option<ServerSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct FontSettings {
    provider_url: Option<String>,
    cache_dir: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<usize>,
    default_family: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ResourceSettings {
    dir: Option<String>,
    logo: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ImageSettings {
    top_color: Option<Color>,
    bottom_color: Option<Color>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    addr: Option<String>,
}

/// Layers the embedded defaults, `./settings.toml`, `./settings.local.toml`,
/// `<base dir>/settings.toml` and finally `extra_path`.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::from_toml_str(DEFAULT_SETTINGS_TOML)
        .with_context(|| "failed to parse embedded default settings")?;

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(base) = paths::base_dir() {
        ordered_paths.push(base.join("settings.toml"));
    }
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.is_file() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            settings
                .merge_toml(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
        }
    }

    Ok(settings)
}

impl Settings {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut settings = Settings::default();
        settings.merge_toml(content)?;
        Ok(settings)
    }

    fn merge_toml(&mut self, content: &str) -> Result<()> {
        let parsed: SettingsFile = toml::from_str(content)?;
        self.merge(parsed);
        Ok(())
    }

    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(fonts) = incoming.fonts {
            if let Some(url) = non_blank(fonts.provider_url) {
                self.font_provider_url = url;
            }
            if let Some(dir) = non_blank(fonts.cache_dir) {
                self.font_cache_dir = Some(dir);
            }
            if let Some(secs) = fonts.timeout_secs.filter(|secs| *secs > 0) {
                self.font_timeout_secs = secs;
            }
            if let Some(retries) = fonts.max_retries {
                self.font_max_retries = retries;
            }
            if let Some(family) = non_blank(fonts.default_family) {
                self.default_font_family = family;
            }
        }
        if let Some(resources) = incoming.resources {
            if let Some(dir) = non_blank(resources.dir) {
                self.resources_dir = dir;
            }
            if let Some(logo) = non_blank(resources.logo) {
                self.logo = logo;
            }
        }
        if let Some(image) = incoming.image {
            if let Some(color) = image.top_color {
                self.top_color = color;
            }
            if let Some(color) = image.bottom_color {
                self.bottom_color = color;
            }
        }
        if let Some(server) = incoming.server {
            if let Some(addr) = non_blank(server.addr) {
                self.server_addr = addr;
            }
        }
    }

    pub fn font_timeout(&self) -> Duration {
        Duration::from_secs(self.font_timeout_secs)
    }

    pub fn font_cache_config(&self) -> FontCacheConfig {
        let cache_dir = self
            .font_cache_dir
            .as_deref()
            .and_then(paths::resolve_dir)
            .unwrap_or_else(paths::font_cache_dir);
        FontCacheConfig { cache_dir }
    }

    pub fn asset_config(&self) -> AssetConfig {
        let dir = paths::resolve_dir(&self.resources_dir)
            .unwrap_or_else(|| PathBuf::from("resources/img"));
        AssetConfig { dir }
    }

    /// A request carrying the configured colors and font family.
    pub fn request(&self, title: impl Into<String>, site_name: impl Into<String>) -> GenerationRequest {
        GenerationRequest::new(title, site_name)
            .with_colors(self.top_color, self.bottom_color)
            .with_font_family(self.default_font_family.clone())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
