//! Command-line interface for verse-wallpaper.
//!
//! Handles CLI argument parsing and execution logic for rendering a single
//! wallpaper to disk.

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::Level;

use crate::{
    config::Config,
    encode::{self, ImageFormat},
    errors::{Result, WallpaperError},
    generator::WallpaperGenerator,
    model::{DevicePreset, Verse, WallpaperOptions},
};

/// Command-line arguments for verse-wallpaper.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Arabic text of the verse.
    pub arabic: Option<String>,

    /// Translation shown beneath the Arabic text.
    #[arg(short, long)]
    pub translation: Option<String>,

    /// Read the verse from a JSON file instead of the arguments.
    #[arg(long, value_name = "PATH", conflicts_with = "arabic")]
    pub verse: Option<PathBuf>,

    /// Surah number used in the reference line.
    #[arg(long, default_value_t = 1)]
    pub surah: u32,

    /// Ayah number used in the reference line.
    #[arg(long, default_value_t = 1)]
    pub ayah: u32,

    /// Target device preset (defaults to phone).
    #[arg(long, value_enum)]
    pub preset: Option<DevicePreset>,

    /// Canvas width in pixels, overriding the preset.
    #[arg(long)]
    pub width: Option<u32>,

    /// Canvas height in pixels, overriding the preset.
    #[arg(long)]
    pub height: Option<u32>,

    /// Background image URL; the gradient is used when absent or unreachable.
    #[arg(short, long)]
    pub background: Option<String>,

    /// The output path; the extension picks PNG, JPEG or WebP.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory of additional fonts to load.
    #[arg(long, value_name = "DIR")]
    pub fonts_dir: Option<PathBuf>,

    /// Start the HTTP server.
    #[arg(
        short,
        long,
        value_name = "HOST:PORT",
        num_args = 0..=1,
        require_equals = false
    )]
    pub server: Option<Option<String>>,

    /// Set the logging level.
    #[arg(long, short = 'L', value_name = "LEVEL", default_value_t = if cfg!(debug_assertions) { Level::DEBUG } else { Level::INFO })]
    pub log_level: Level,

    /// Port to use for the server (defaults to 8080).
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl Cli {
    /// Whether there is a verse to render.
    pub fn has_verse(&self) -> bool {
        self.arabic.is_some() || self.verse.is_some()
    }
}

/// Canvas options from the preset and explicit dimensions.
pub fn resolve_options(cli: &Cli) -> WallpaperOptions {
    let (preset_width, preset_height) = cli.preset.unwrap_or(DevicePreset::Phone).dimensions();
    WallpaperOptions {
        width: cli.width.unwrap_or(preset_width),
        height: cli.height.unwrap_or(preset_height),
        background_image_url: cli.background.clone(),
    }
}

/// Builds the verse from a JSON file or from the positional arguments.
pub fn resolve_verse(cli: &Cli) -> Result<Verse> {
    if let Some(path) = &cli.verse {
        let data = std::fs::read_to_string(path)?;
        return Ok(serde_json::from_str(&data)?);
    }

    let arabic = cli
        .arabic
        .clone()
        .ok_or(WallpaperError::MissingVerse)?;
    Ok(Verse {
        id: 0,
        surah_number: cli.surah,
        ayah_number: cli.ayah,
        arabic_text: arabic,
        translated_text: cli.translation.clone(),
        english_translation: String::new(),
    })
}

/// Output path and the format its extension selects.
///
/// Defaults to `wallpaper-{surah}-{ayah}.png`; unknown extensions fall back
/// to PNG.
pub fn output_target(cli: &Cli, verse: &Verse) -> (PathBuf, ImageFormat) {
    let path = cli.output.clone().unwrap_or_else(|| {
        PathBuf::from(format!(
            "wallpaper-{}-{}.png",
            verse.surah_number, verse.ayah_number
        ))
    });
    let format = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(encode::parse_extension)
        .unwrap_or_else(|| {
            tracing::warn!(
                "Unrecognized output extension for {}, writing PNG",
                path.display()
            );
            ImageFormat::Png
        });
    (path, format)
}

/// Executes the CLI command to render a wallpaper.
///
/// # Arguments
/// * `cli` - Parsed command-line arguments
/// * `config` - Loaded configuration
pub async fn run(cli: Cli, config: Config) -> Result<()> {
    let verse = resolve_verse(&cli)?;
    let options = resolve_options(&cli);
    let (output_path, format) = output_target(&cli, &verse);

    let start_time = std::time::Instant::now();

    let generator = WallpaperGenerator::new(config)?;
    let bytes = generator
        .generate_with_format(&verse, &options, format)
        .await?;
    write_output(&output_path, &bytes)?;

    let duration = start_time.elapsed();

    tracing::debug!(
        width = options.width,
        height = options.height,
        total_duration = ?duration,
        "CLI wallpaper generation completed"
    );

    tracing::info!("Successfully generated {}.", output_path.to_string_lossy());

    Ok(())
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(())
}
