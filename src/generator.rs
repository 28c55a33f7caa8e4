//! The wallpaper pipeline.
//!
//! [`WallpaperGenerator`] is an explicitly constructed service: it owns the
//! configuration, the font database, the measurer, the rasterizer and the
//! image source, and holds no per-render state. Each call allocates its own
//! surface and threads it through background, text and encoding stages.

use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use resvg::tiny_skia::Pixmap;
use resvg::usvg::fontdb;
use tracing::{debug, instrument, warn};

use crate::background::{self, HttpImageSource, ImageSource};
use crate::config::Config;
use crate::encode::{self, ImageFormat};
use crate::errors::{ImageError, Result};
use crate::fonts::{self, FontMeasurer, TextMeasurer};
use crate::layout::{LayoutInput, LayoutResult, TextFitter};
use crate::model::{Verse, WallpaperOptions};
use crate::render::{self, Rasterizer};

/// Renders verses into encoded wallpaper images.
pub struct WallpaperGenerator<S = HttpImageSource> {
    config: Config,
    measurer: Arc<dyn TextMeasurer>,
    rasterizer: Rasterizer,
    source: S,
}

impl<S> std::fmt::Debug for WallpaperGenerator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WallpaperGenerator")
            .field("config", &self.config)
            .field("rasterizer", &self.rasterizer)
            .finish_non_exhaustive()
    }
}

impl WallpaperGenerator<HttpImageSource> {
    /// Builds a generator that fetches backgrounds over HTTP and measures
    /// text with the installed fonts.
    pub fn new(config: Config) -> Result<Self> {
        let source = HttpImageSource::new(&config.fetch)?;
        Ok(Self::with_source(config, source))
    }
}

impl<S: ImageSource> WallpaperGenerator<S> {
    /// Builds a generator around a custom image source.
    pub fn with_source(config: Config, source: S) -> Self {
        let font_db = Arc::new(fonts::load_font_database(config.fonts.fonts_dir.as_deref()));
        Self::with_fonts(config, source, font_db)
    }

    /// Builds a generator around an already loaded font database.
    pub fn with_fonts(config: Config, source: S, font_db: Arc<fontdb::Database>) -> Self {
        Self {
            config,
            measurer: Arc::new(FontMeasurer::new(font_db.clone())),
            rasterizer: Rasterizer::new(font_db),
            source,
        }
    }

    /// Replaces the text measurer used for fitting.
    pub fn with_measurer(mut self, measurer: Arc<dyn TextMeasurer>) -> Self {
        self.measurer = measurer;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Renders `verse` as a PNG of exactly `options.width` x `options.height`.
    ///
    /// A missing or unreachable background falls back to the gradient; only
    /// structural failures (zero dimensions, rendering or encoding errors)
    /// are returned.
    pub async fn generate_wallpaper(
        &self,
        verse: &Verse,
        options: &WallpaperOptions,
    ) -> Result<Vec<u8>> {
        self.generate_with_format(verse, options, ImageFormat::Png)
            .await
    }

    #[instrument(skip(self, verse, options), fields(verse = verse.id, width = options.width, height = options.height))]
    pub async fn generate_with_format(
        &self,
        verse: &Verse,
        options: &WallpaperOptions,
        format: ImageFormat,
    ) -> Result<Vec<u8>> {
        check_dimensions(options)?;
        let background = self.load_background(options).await;
        self.render_encoded(verse, options, background.as_ref(), format)
    }

    /// Fetches the optional background, absorbing failures.
    pub async fn load_background(&self, options: &WallpaperOptions) -> Option<DynamicImage> {
        background::load_background(&self.source, options.background_image_url.as_deref()).await
    }

    /// Synchronous half of the pipeline: paint and encode with an already
    /// resolved background.
    pub fn render_encoded(
        &self,
        verse: &Verse,
        options: &WallpaperOptions,
        background: Option<&DynamicImage>,
        format: ImageFormat,
    ) -> Result<Vec<u8>> {
        let start_time = Instant::now();
        let pixmap = self.render(verse, options, background)?;
        let rendered = start_time.elapsed();
        let bytes = encode::encode_to_vec(&pixmap, format)?;
        let total = start_time.elapsed();

        debug!(
            rendering_duration = ?rendered,
            encoding_duration = ?(total - rendered),
            bytes = bytes.len(),
            "Wallpaper generated"
        );
        if total.as_millis() > 1000 {
            warn!(
                total_duration = ?total,
                width = options.width,
                height = options.height,
                "Slow wallpaper generation"
            );
        }

        Ok(bytes)
    }

    /// Fits the verse text to the canvas without painting anything.
    pub fn layout(&self, verse: &Verse, options: &WallpaperOptions) -> LayoutResult {
        if verse.arabic_text.trim().is_empty() || verse.translation().trim().is_empty() {
            warn!(verse = verse.id, "Verse has empty text, rendering a degenerate block");
        }
        let reference = verse.reference();
        let input = LayoutInput {
            arabic: &verse.arabic_text,
            translation: verse.translation(),
            reference: &reference,
            width: options.width,
            height: options.height,
        };
        TextFitter::new(&self.config.layout, &self.config.style, self.measurer.as_ref())
            .fit(&input)
    }

    /// Paints background, text and ornaments onto a new surface.
    pub fn render(
        &self,
        verse: &Verse,
        options: &WallpaperOptions,
        background: Option<&DynamicImage>,
    ) -> Result<Pixmap> {
        check_dimensions(options)?;
        let mut pixmap = Pixmap::new(options.width, options.height).ok_or_else(|| {
            ImageError::PixmapCreation(format!(
                "cannot allocate {}x{} surface",
                options.width, options.height
            ))
        })?;

        background::paint_background(&mut pixmap, background, &self.config.style)?;

        let layout = self.layout(verse, options);
        debug!(
            arabic = layout.arabic_font_size,
            translation = layout.translation_font_size,
            reference = layout.reference_font_size,
            iterations = layout.iterations,
            converged = layout.converged,
            "Text fitted"
        );

        let overlay = render::overlay_svg(&layout, options.width, options.height, &self.config.style);
        self.rasterizer.render_onto(&overlay, &mut pixmap)?;

        Ok(pixmap)
    }
}

fn check_dimensions(options: &WallpaperOptions) -> Result<()> {
    if options.width == 0 || options.height == 0 {
        return Err(ImageError::InvalidDimensions {
            width: options.width,
            height: options.height,
        }
        .into());
    }
    Ok(())
}
