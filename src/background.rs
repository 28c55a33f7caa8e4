//! Background compositing.
//!
//! Fills the raster surface with an opaque backdrop before any text is drawn:
//! a photographic image scaled to cover the canvas, or a three-stop vertical
//! gradient when no image is available. Both paths finish with a flat black
//! overlay so light text stays readable.

use std::future::Future;
use std::time::Duration;

use image::{imageops, DynamicImage, GenericImageView};
use reqwest::Client;
use resvg::tiny_skia::{
    self, GradientStop, LinearGradient, Paint, Pixmap, PixmapPaint, Point, Rect, SpreadMode,
    Transform,
};
use tracing::{debug, instrument, warn};

use crate::colors::BLACK;
use crate::config::{FetchConfig, StyleConfig};
use crate::errors::{BackgroundError, ImageError};

/// Image-fetch capability used for optional backgrounds.
pub trait ImageSource: Send + Sync {
    fn fetch(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<DynamicImage, BackgroundError>> + Send;
}

/// Fetches background images over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpImageSource {
    client: Client,
    timeout: Duration,
    max_bytes: u64,
}

impl HttpImageSource {
    pub fn new(config: &FetchConfig) -> Result<Self, BackgroundError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            timeout,
            max_bytes: config.max_image_bytes,
        })
    }
}

impl ImageSource for HttpImageSource {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<DynamicImage, BackgroundError> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(BackgroundError::UnsupportedUrl(url.to_string()));
        }

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                BackgroundError::Timeout(self.timeout.as_secs())
            } else {
                BackgroundError::Fetch(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackgroundError::Status(status.as_u16()));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_bytes {
                return Err(BackgroundError::TooLarge(length));
            }
        }

        let bytes = response.bytes().await?;
        if bytes.len() as u64 > self.max_bytes {
            return Err(BackgroundError::TooLarge(bytes.len() as u64));
        }
        debug!("Fetched {} background bytes", bytes.len());
        Ok(image::load_from_memory(&bytes)?)
    }
}

/// Resolves the optional background URL to a decoded image.
///
/// Failures are logged and reported as `None`; the caller then paints the
/// gradient.
pub async fn load_background<S: ImageSource>(source: &S, url: Option<&str>) -> Option<DynamicImage> {
    let url = url.map(str::trim).filter(|url| !url.is_empty())?;
    match source.fetch(url).await {
        Ok(image) => Some(image),
        Err(e) => {
            warn!("Background image unavailable, using gradient: {}", e);
            None
        }
    }
}

/// Scales `img` to cover `target_width`x`target_height`, cropping the excess
/// around the centre.
///
/// The source is cropped to the target aspect ratio before resampling, so
/// the work is bounded by the source and target sizes whatever the source
/// shape.
pub fn resize_fill(img: &DynamicImage, target_width: u32, target_height: u32) -> DynamicImage {
    let (img_width, img_height) = img.dimensions();
    if img_width == 0 || img_height == 0 {
        return DynamicImage::new_rgba8(target_width, target_height);
    }

    let target_ratio = target_width as f64 / target_height.max(1) as f64;
    let img_ratio = img_width as f64 / img_height as f64;

    let (crop_width, crop_height) = if img_ratio > target_ratio {
        let width = (img_height as f64 * target_ratio).round() as u32;
        (width.clamp(1, img_width), img_height)
    } else {
        let height = (img_width as f64 / target_ratio).round() as u32;
        (img_width, height.clamp(1, img_height))
    };
    let x_offset = (img_width - crop_width) / 2;
    let y_offset = (img_height - crop_height) / 2;

    img.crop_imm(x_offset, y_offset, crop_width, crop_height)
        .resize_exact(target_width, target_height, imageops::FilterType::Lanczos3)
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

fn full_canvas(pixmap: &Pixmap) -> Result<Rect, ImageError> {
    Rect::from_xywh(0.0, 0.0, pixmap.width() as f32, pixmap.height() as f32).ok_or(
        ImageError::InvalidDimensions {
            width: pixmap.width(),
            height: pixmap.height(),
        },
    )
}

fn paint_overlay(pixmap: &mut Pixmap, alpha: f32) -> Result<(), ImageError> {
    let rect = full_canvas(pixmap)?;
    let mut paint = Paint::default();
    paint.set_color(BLACK.with_alpha(alpha));
    pixmap.fill_rect(rect, &paint, Transform::identity(), None);
    Ok(())
}

fn paint_gradient(pixmap: &mut Pixmap, style: &StyleConfig) -> Result<(), ImageError> {
    let rect = full_canvas(pixmap)?;
    let [top, mid, bottom] = style.gradient;
    let mut paint = Paint::default();
    match LinearGradient::new(
        Point::from_xy(0.0, 0.0),
        Point::from_xy(0.0, pixmap.height() as f32),
        vec![
            GradientStop::new(0.0, top.with_alpha(1.0)),
            GradientStop::new(0.5, mid.with_alpha(1.0)),
            GradientStop::new(1.0, bottom.with_alpha(1.0)),
        ],
        SpreadMode::Pad,
        Transform::identity(),
    ) {
        Some(shader) => paint.shader = shader,
        None => paint.set_color(mid.with_alpha(1.0)),
    }
    pixmap.fill_rect(rect, &paint, Transform::identity(), None);
    paint_overlay(pixmap, style.gradient_overlay_alpha)
}

fn paint_image(
    pixmap: &mut Pixmap,
    image: &DynamicImage,
    style: &StyleConfig,
) -> Result<(), ImageError> {
    let (width, height) = (pixmap.width(), pixmap.height());
    let mut rgba = resize_fill(image, width, height).into_rgba8().into_raw();
    premultiply_rgba8_in_place(&mut rgba);

    let size = tiny_skia::IntSize::from_wh(width, height)
        .ok_or(ImageError::InvalidDimensions { width, height })?;
    let layer = Pixmap::from_vec(rgba, size).ok_or_else(|| {
        ImageError::PixmapCreation("background image does not match canvas".to_string())
    })?;

    // Transparent regions of the source must not leave the canvas translucent.
    pixmap.fill(BLACK.with_alpha(1.0));
    pixmap.draw_pixmap(
        0,
        0,
        layer.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
    paint_overlay(pixmap, style.image_overlay_alpha)
}

/// Paints the opaque background layer onto `pixmap`.
#[instrument(skip_all, fields(width = pixmap.width(), height = pixmap.height(), image = image.is_some()))]
pub fn paint_background(
    pixmap: &mut Pixmap,
    image: Option<&DynamicImage>,
    style: &StyleConfig,
) -> Result<(), ImageError> {
    match image {
        Some(image) => paint_image(pixmap, image, style),
        None => paint_gradient(pixmap, style),
    }
}
