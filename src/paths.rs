use std::path::{Path, PathBuf};

const BASE_DIR_ENV: &str = "OG_IMAGE_RUST_DIR";
const DEFAULT_BASE_DIR: &str = ".og-image-rust";

pub(crate) fn base_dir() -> Option<PathBuf> {
    if let Some(dir) = base_dir_override() {
        return Some(dir);
    }
    default_base_dir()
}

pub(crate) fn font_cache_dir() -> PathBuf {
    base_dir()
        .map(|dir| dir.join(".cache/fonts"))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BASE_DIR).join(".cache/fonts"))
}

/// Expands `~` and normalizes components; `None` for blank input.
pub(crate) fn resolve_dir(value: &str) -> Option<PathBuf> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let expanded = expand_tilde(trimmed, std::env::var("HOME").ok().as_deref());
    Some(normalize_path(PathBuf::from(expanded)))
}

fn base_dir_override() -> Option<PathBuf> {
    std::env::var(BASE_DIR_ENV)
        .ok()
        .and_then(|value| resolve_dir(&value))
}

fn default_base_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(DEFAULT_BASE_DIR))
        }
    })
}

fn normalize_path(path: PathBuf) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        normalized.push(component.as_os_str());
    }
    normalized
}

fn expand_tilde(value: &str, home: Option<&str>) -> String {
    let Some(home) = home.map(str::trim).filter(|home| !home.is_empty()) else {
        return value.to_string();
    };
    if value == "~" {
        return home.to_string();
    }
    if let Some(rest) = value.strip_prefix("~/") {
        return format!("{}/{}", home.trim_end_matches('/'), rest);
    }
    value.to_string()
}
