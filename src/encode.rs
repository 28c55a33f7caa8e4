//! Image encoding support for different formats.
//!
//! This module provides encoders for PNG, JPEG and WebP output of a finished
//! wallpaper surface with consistent error handling and result types.

use std::io::Write;

use image::RgbaImage;
use resvg::tiny_skia::Pixmap;
use tracing::instrument;

use crate::errors::{ImageError, Result, WallpaperError};

/// Converts the premultiplied surface to a straight-alpha image buffer.
fn pixmap_to_rgba(pixmap: &Pixmap) -> Result<RgbaImage> {
    let mut data = Vec::with_capacity(pixmap.data().len());
    for pixel in pixmap.pixels() {
        let color = pixel.demultiply();
        data.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }

    RgbaImage::from_raw(pixmap.width(), pixmap.height(), data).ok_or_else(|| {
        WallpaperError::Image(ImageError::PixmapCreation(
            "pixel buffer does not match surface size".to_string(),
        ))
    })
}

/// Supported image formats for encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
    WebP,
}

impl ImageFormat {
    /// Get the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::WebP => "image/webp",
        }
    }

    /// Get the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::WebP => "webp",
        }
    }
}

/// Parses a file extension to determine the image format.
///
/// # Arguments
/// * `extension` - The file extension (e.g., "png", "webp", "jpg")
///
/// # Returns
/// Some(ImageFormat) if the extension is supported, None otherwise
pub fn parse_extension(extension: &str) -> Option<ImageFormat> {
    match extension.to_lowercase().as_str() {
        "png" => Some(ImageFormat::Png),
        "webp" => Some(ImageFormat::WebP),
        "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
        _ => None,
    }
}

/// Encoder trait for different image formats.
pub trait Encoder {
    /// Encode the finished surface to the target format.
    ///
    /// # Arguments
    /// * `pixmap` - The rendered wallpaper
    /// * `writer` - Output writer for the encoded data
    fn encode(&self, pixmap: &Pixmap, writer: &mut dyn Write) -> Result<()>;
}

/// PNG encoder writing the surface directly with the png crate.
#[derive(Debug, Default)]
pub struct PngEncoder;

impl PngEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Encoder for PngEncoder {
    #[instrument(skip_all)]
    fn encode(&self, pixmap: &Pixmap, writer: &mut dyn Write) -> Result<()> {
        let img = pixmap_to_rgba(pixmap)?;

        let mut png_encoder = png::Encoder::new(writer, img.width(), img.height());
        png_encoder.set_color(png::ColorType::Rgba);
        png_encoder.set_depth(png::BitDepth::Eight);

        let mut png_writer = png_encoder
            .write_header()
            .map_err(|e| WallpaperError::Image(ImageError::PngWrite(e.to_string())))?;

        png_writer
            .write_image_data(img.as_raw())
            .map_err(|e| WallpaperError::Image(ImageError::PngWrite(e.to_string())))?;

        png_writer
            .finish()
            .map_err(|e| WallpaperError::Image(ImageError::PngWrite(e.to_string())))?;

        Ok(())
    }
}

/// JPEG encoder using the image crate.
#[derive(Debug)]
pub struct JpegEncoder {
    quality: u8,
}

impl JpegEncoder {
    pub fn new() -> Self {
        Self { quality: 90 }
    }

    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }
}

impl Default for JpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder for JpegEncoder {
    #[instrument(skip_all)]
    fn encode(&self, pixmap: &Pixmap, writer: &mut dyn Write) -> Result<()> {
        let img = pixmap_to_rgba(pixmap)?;

        // Convert RGBA to RGB for JPEG encoding
        let rgb_img = image::DynamicImage::ImageRgba8(img).into_rgb8();

        rgb_img
            .write_with_encoder(image::codecs::jpeg::JpegEncoder::new_with_quality(
                writer,
                self.quality,
            ))
            .map_err(|e| WallpaperError::Image(ImageError::JpegWrite(e.to_string())))?;

        Ok(())
    }
}

/// Lossless WebP encoder using the image crate.
#[derive(Debug, Default)]
pub struct WebPEncoder;

impl WebPEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Encoder for WebPEncoder {
    #[instrument(skip_all)]
    fn encode(&self, pixmap: &Pixmap, writer: &mut dyn Write) -> Result<()> {
        let img = pixmap_to_rgba(pixmap)?;

        img.write_with_encoder(image::codecs::webp::WebPEncoder::new_lossless(writer))
            .map_err(|e| WallpaperError::Image(ImageError::WebPWrite(e.to_string())))?;

        Ok(())
    }
}

/// Enum to hold different encoder types.
#[derive(Debug)]
pub enum EncoderType {
    Png(PngEncoder),
    Jpeg(JpegEncoder),
    WebP(WebPEncoder),
}

impl Encoder for EncoderType {
    fn encode(&self, pixmap: &Pixmap, writer: &mut dyn Write) -> Result<()> {
        match self {
            EncoderType::Png(encoder) => encoder.encode(pixmap, writer),
            EncoderType::Jpeg(encoder) => encoder.encode(pixmap, writer),
            EncoderType::WebP(encoder) => encoder.encode(pixmap, writer),
        }
    }
}

/// Factory function to create an encoder for the specified format.
pub fn create_encoder(format: ImageFormat) -> EncoderType {
    match format {
        ImageFormat::Png => EncoderType::Png(PngEncoder::new()),
        ImageFormat::Jpeg => EncoderType::Jpeg(JpegEncoder::new()),
        ImageFormat::WebP => EncoderType::WebP(WebPEncoder::new()),
    }
}

/// Encodes `pixmap` into a fresh byte buffer.
pub fn encode_to_vec(pixmap: &Pixmap, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    create_encoder(format).encode(pixmap, &mut buffer)?;
    if buffer.is_empty() {
        return Err(WallpaperError::Image(ImageError::PixmapCreation(
            "encoder produced no output".to_string(),
        )));
    }
    Ok(buffer)
}
