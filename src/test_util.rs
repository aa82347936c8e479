use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::anyhow;
use image::{Rgba, RgbaImage};
use zip::ZipWriter;
use zip::write::FileOptions;

use crate::assets::{AssetConfig, AssetLoader};
use crate::fonts::{FontFuture, FontProvider};

pub(crate) const REGULAR_FONT: &[u8] = include_bytes!("../tests/fixtures/DejaVuSans.ttf");
pub(crate) const BOLD_FONT: &[u8] = include_bytes!("../tests/fixtures/DejaVuSans-Bold.ttf");

pub(crate) fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in entries {
        writer
            .start_file(*name, FileOptions::default())
            .expect("start file");
        writer.write_all(bytes).expect("write entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

pub(crate) fn font_archive(family: &str) -> Vec<u8> {
    let regular = format!("static/{}-Regular.ttf", family);
    let medium = format!("static/{}-Medium.ttf", family);
    build_zip(&[(regular.as_str(), REGULAR_FONT), (medium.as_str(), BOLD_FONT)])
}

/// Serves a fixed archive and counts fetches.
#[derive(Clone)]
pub(crate) struct StaticFontProvider {
    archive: Arc<Vec<u8>>,
    pub(crate) calls: Arc<AtomicUsize>,
}

impl StaticFontProvider {
    pub(crate) fn new(archive: Vec<u8>) -> Self {
        Self {
            archive: Arc::new(archive),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn dejavu() -> Self {
        Self::new(font_archive("Roboto"))
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FontProvider for StaticFontProvider {
    fn fetch_archive(&self, _family: &str) -> FontFuture {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let archive = self.archive.as_ref().clone();
        Box::pin(async move { Ok(archive) })
    }
}

pub(crate) struct FailingFontProvider;

impl FontProvider for FailingFontProvider {
    fn fetch_archive(&self, family: &str) -> FontFuture {
        let family = family.to_string();
        Box::pin(async move { Err(anyhow!("font provider returned 404 for {}", family)) })
    }
}

pub(crate) fn write_png(dir: &Path, id: &str, width: u32, height: u32, color: [u8; 4]) {
    std::fs::create_dir_all(dir).expect("create asset dir");
    RgbaImage::from_pixel(width, height, Rgba(color))
        .save(dir.join(format!("{}.png", id)))
        .expect("write png");
}

/// A loader rooted at `<root>/img` holding a 240x240 `code` logo.
pub(crate) fn asset_loader_with_logo(root: &Path) -> AssetLoader {
    let dir = root.join("img");
    write_png(&dir, "code", 240, 240, [20, 40, 60, 255]);
    AssetLoader::new(AssetConfig { dir })
}
