use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::error::{OgError, OgResult};

mod face;
mod provider;

pub use face::FontFace;
pub use provider::{FontFuture, FontProvider, HttpFontProvider};

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf"];
const STAGING_PREFIX: &str = ".staging-";

#[derive(Debug, Clone)]
pub struct FontCacheConfig {
    pub cache_dir: PathBuf,
}

/// Style name to installed file, for one family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFamily {
    name: String,
    faces: BTreeMap<String, PathBuf>,
}

impl FontFamily {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn faces(&self) -> &BTreeMap<String, PathBuf> {
        &self.faces
    }

    pub fn path(&self, style: &str) -> Option<&Path> {
        self.faces
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(style))
            .map(|(_, path)| path.as_path())
    }

    /// First style from `preferred` that is installed.
    pub fn preferred_face(&self, preferred: &[&str]) -> Option<(&str, &Path)> {
        preferred.iter().find_map(|style| {
            self.faces
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(style))
                .map(|(name, path)| (name.as_str(), path.as_path()))
        })
    }

    /// Like [`preferred_face`](Self::preferred_face), but falls back to the
    /// first installed style of the same family.
    pub fn face_for(&self, preferred: &[&str]) -> Option<(&str, &Path)> {
        if let Some(face) = self.preferred_face(preferred) {
            return Some(face);
        }
        let (name, path) = self.faces.iter().next()?;
        warn!(
            "font family {} has none of {:?}; falling back to {}",
            self.name, preferred, name
        );
        Some((name.as_str(), path.as_path()))
    }
}

/// On-disk cache of font families, populated from a [`FontProvider`] on first use.
///
/// Installed families are never refreshed. A family directory only becomes
/// visible once it is complete: files are extracted into a staging directory
/// under the cache root and renamed into place.
pub struct FontCache<P> {
    provider: P,
    config: FontCacheConfig,
}

impl<P: FontProvider> FontCache<P> {
    pub fn new(provider: P, config: FontCacheConfig) -> Self {
        Self { provider, config }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.config.cache_dir
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn family_dir(&self, family: &str) -> PathBuf {
        self.config.cache_dir.join(sanitize_family(family))
    }

    pub async fn resolve(&self, family: &str) -> OgResult<FontFamily> {
        let family = family.trim();
        if family.is_empty() {
            return Err(OgError::font_unavailable(family, "font family name is empty"));
        }
        let target = self.family_dir(family);
        if target.is_dir() {
            debug!("font family {} found in cache: {}", family, target.display());
            return scan_family_dir(family, &target);
        }

        info!("font family {} not cached; downloading ...", family);
        let archive = self
            .provider
            .fetch_archive(family)
            .await
            .map_err(|err| OgError::font_unavailable(family, format!("{:#}", err)))?;
        install_family(family, &archive, &self.config.cache_dir, &target)?;
        scan_family_dir(family, &target)
    }
}

fn install_family(family: &str, archive: &[u8], cache_root: &Path, target: &Path) -> OgResult<()> {
    fs::create_dir_all(cache_root).map_err(|err| {
        OgError::font_unavailable(
            family,
            format!("failed to create font cache dir {}: {}", cache_root.display(), err),
        )
    })?;
    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(cache_root)
        .map_err(|err| {
            OgError::font_unavailable(family, format!("failed to create staging dir: {}", err))
        })?;

    let extracted = extract_font_files(archive, staging.path())
        .map_err(|err| OgError::font_unavailable(family, format!("{:#}", err)))?;
    if extracted == 0 {
        return Err(OgError::font_unavailable(
            family,
            "archive contains no .ttf or .otf files",
        ));
    }

    // The staging guard is dropped afterwards; its path no longer exists on success.
    match fs::rename(staging.path(), target) {
        Ok(()) => {
            info!(
                "installed {} font files for {} into {}",
                extracted,
                family,
                target.display()
            );
            Ok(())
        }
        Err(_) if target.is_dir() => {
            debug!("font family {} was installed concurrently; keeping existing copy", family);
            Ok(())
        }
        Err(err) => Err(OgError::font_unavailable(
            family,
            format!("failed to install fonts into {}: {}", target.display(), err),
        )),
    }
}

/// Extracts font files from a zip archive into `dest`, flattening directories.
fn extract_font_files(archive: &[u8], dest: &Path) -> Result<usize> {
    let mut zip =
        ZipArchive::new(Cursor::new(archive)).with_context(|| "font archive is not a valid zip")?;
    let mut count = 0;
    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .with_context(|| format!("failed to read font archive entry {}", index))?;
        if entry.is_dir() {
            continue;
        }
        let Some(file_name) = entry
            .enclosed_name()
            .and_then(|path| path.file_name().map(|name| name.to_os_string()))
        else {
            continue;
        };
        if !is_font_file(Path::new(&file_name)) {
            continue;
        }
        let out_path = dest.join(&file_name);
        if out_path.exists() {
            continue;
        }
        let mut out = fs::File::create(&out_path)
            .with_context(|| format!("failed to write font: {}", out_path.display()))?;
        io::copy(&mut entry, &mut out)
            .with_context(|| format!("failed to extract font: {}", out_path.display()))?;
        count += 1;
    }
    Ok(count)
}

fn scan_family_dir(family: &str, dir: &Path) -> OgResult<FontFamily> {
    let entries = fs::read_dir(dir).map_err(|err| {
        OgError::font_unavailable(family, format!("failed to list {}: {}", dir.display(), err))
    })?;
    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_font_file(path))
        .collect();
    paths.sort();

    // Archives bundle sibling families (`Roboto_Condensed-Medium.ttf` next to
    // `Roboto-Medium.ttf`); files named after the family itself win a style.
    let mut faces: BTreeMap<String, (bool, PathBuf)> = BTreeMap::new();
    for path in paths {
        let Some(style) = style_from_path(&path) else {
            continue;
        };
        let own = is_own_face(family, &path);
        let replace = match faces.get(&style) {
            Some((held_own, _)) => own && !*held_own,
            None => true,
        };
        if replace {
            faces.insert(style, (own, path));
        }
    }
    if faces.is_empty() {
        return Err(OgError::font_unavailable(
            family,
            format!("no font files in {}", dir.display()),
        ));
    }
    Ok(FontFamily {
        name: family.to_string(),
        faces: faces
            .into_iter()
            .map(|(style, (_, path))| (style, path))
            .collect(),
    })
}

/// `Open Sans` owns `OpenSans-Bold.ttf` but not `OpenSans_Condensed-Bold.ttf`.
fn is_own_face(family: &str, path: &Path) -> bool {
    let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
        return false;
    };
    let prefix = stem.rsplit_once('-').map_or(stem, |(prefix, _)| prefix);
    let compact: String = family.chars().filter(|ch| !ch.is_whitespace()).collect();
    prefix.eq_ignore_ascii_case(&compact)
}

fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            FONT_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// `Roboto-MediumItalic.ttf` -> `MediumItalic`; files without a suffix are `Regular`.
fn style_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let style = match stem.rsplit_once('-') {
        Some((_, style)) if !style.is_empty() => style,
        _ => "Regular",
    };
    Some(style.to_string())
}

pub(crate) fn sanitize_family(family: &str) -> String {
    family
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}
