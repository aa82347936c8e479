use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use og_image_rust::Color;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "og-image-rust",
    version,
    about = "Generate Open Graph preview images"
)]
struct Cli {
    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings", global = true)]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single image to a PNG file
    Render {
        #[arg(long = "title")]
        title: String,

        #[arg(long = "site-name", default_value = "")]
        site_name: String,

        /// Badge asset id under the resources dir
        #[arg(long = "tag")]
        tag: Option<String>,

        /// Font family (default from settings)
        #[arg(long = "font")]
        font: Option<String>,

        /// Gradient top color (#RRGGBB or r,g,b)
        #[arg(long = "top")]
        top: Option<String>,

        /// Gradient bottom color (#RRGGBB or r,g,b)
        #[arg(long = "bottom")]
        bottom: Option<String>,

        #[arg(short = 'o', long = "out", default_value = "og.png")]
        out: PathBuf,
    },
    /// Serve images over HTTP at /og
    Serve {
        /// Listen address (default from settings)
        #[arg(long = "addr")]
        addr: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    og_image_rust::logging::init(cli.verbose)?;
    let settings = og_image_rust::load_settings(cli.read_settings.as_deref().map(Path::new))?;

    match cli.command {
        Command::Render {
            title,
            site_name,
            tag,
            font,
            top,
            bottom,
            out,
        } => {
            let mut request = settings.request(title, site_name).with_tag(tag);
            if let Some(font) = font.filter(|value| !value.trim().is_empty()) {
                request = request.with_font_family(font.trim());
            }
            let top = parse_color(top.as_deref(), request.top_color)?;
            let bottom = parse_color(bottom.as_deref(), request.bottom_color)?;
            let request = request.with_colors(top, bottom);

            let bytes = og_image_rust::render_once(&settings, &request).await?;
            std::fs::write(&out, &bytes)
                .with_context(|| format!("failed to write image: {}", out.display()))?;
            info!("wrote {}", out.display());
        }
        Command::Serve { addr } => {
            og_image_rust::server::run_server(settings, addr).await?;
        }
    }
    Ok(())
}

fn parse_color(value: Option<&str>, fallback: Color) -> Result<Color> {
    match value {
        Some(raw) => Color::parse(raw).with_context(|| format!("invalid color: {}", raw)),
        None => Ok(fallback),
    }
}
