#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::anyhow;
use image::{Rgba, RgbaImage};
use og_image_rust::fonts::FontFuture;
use og_image_rust::{
    AssetConfig, AssetLoader, FontCache, FontCacheConfig, FontProvider, OgImageGenerator,
};
use zip::ZipWriter;
use zip::write::FileOptions;

const REGULAR_FONT: &[u8] = include_bytes!("../fixtures/DejaVuSans.ttf");
const BOLD_FONT: &[u8] = include_bytes!("../fixtures/DejaVuSans-Bold.ttf");

pub const LOGO_COLOR: [u8; 4] = [20, 40, 60, 255];

pub fn roboto_archive() -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in [
        ("OFL.txt", b"license".as_slice()),
        ("static/Roboto-Regular.ttf", REGULAR_FONT),
        ("static/Roboto-Medium.ttf", BOLD_FONT),
    ] {
        writer
            .start_file(name, FileOptions::default())
            .expect("start file");
        writer.write_all(bytes).expect("write entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

#[derive(Clone)]
pub struct CountingProvider {
    archive: Arc<Vec<u8>>,
    pub calls: Arc<AtomicUsize>,
}

impl CountingProvider {
    pub fn new() -> Self {
        Self {
            archive: Arc::new(roboto_archive()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FontProvider for CountingProvider {
    fn fetch_archive(&self, _family: &str) -> FontFuture {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let archive = self.archive.as_ref().clone();
        Box::pin(async move { Ok(archive) })
    }
}

pub struct UnreachableProvider;

impl FontProvider for UnreachableProvider {
    fn fetch_archive(&self, _family: &str) -> FontFuture {
        Box::pin(async { Err(anyhow!("connection refused")) })
    }
}

pub fn write_png(dir: &Path, id: &str, width: u32, height: u32, color: [u8; 4]) {
    std::fs::create_dir_all(dir).expect("asset dir");
    RgbaImage::from_pixel(width, height, Rgba(color))
        .save(dir.join(format!("{}.png", id)))
        .expect("write png");
}

/// Generator over `<root>/fonts` and `<root>/img`, with a `code` logo in place.
pub fn generator<P: FontProvider>(root: &Path, provider: P) -> OgImageGenerator<P> {
    let img = root.join("img");
    write_png(&img, "code", 240, 240, LOGO_COLOR);
    let fonts = FontCache::new(
        provider,
        FontCacheConfig {
            cache_dir: root.join("fonts"),
        },
    );
    OgImageGenerator::new(fonts, AssetLoader::new(AssetConfig { dir: img }))
}
