//! Centralized error handling for the wallpaper renderer.
//!
//! This module provides a unified error type that consolidates all
//! application errors into a single enum for better error handling.

use thiserror::Error;

/// Unified error type for the wallpaper renderer.
#[allow(clippy::enum_variant_names)]
#[derive(Error, Debug)]
pub enum WallpaperError {
    /// Raster surface, overlay rendering and encoding errors
    #[error("Image generation error: {0}")]
    Image(#[from] ImageError),

    /// Background image retrieval errors
    #[error("Background error: {0}")]
    Background(#[from] BackgroundError),

    /// Server/HTTP related errors
    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    /// General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network/HTTP client errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Neither verse text nor a verse file was given
    #[error("No verse provided: pass the Arabic text or --verse <PATH>")]
    MissingVerse,
}

/// Raster surface and encoding errors. These are the structural failures
/// that reach the caller of a render.
#[derive(Error, Debug)]
pub enum ImageError {
    /// Canvas dimensions cannot back a raster surface
    #[error("Invalid canvas dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Failed to create pixmap
    #[error("Failed to create pixmap: {0}")]
    PixmapCreation(String),

    /// Failed to render the text overlay
    #[error("Failed to render SVG: {0}")]
    SvgRendering(String),

    /// Failed to write PNG
    #[error("Failed to write PNG: {0}")]
    PngWrite(String),

    /// Failed to write JPEG
    #[error("Failed to write JPEG: {0}")]
    JpegWrite(String),

    /// Failed to write WebP
    #[error("Failed to write WebP: {0}")]
    WebPWrite(String),
}

/// Background image errors. Never surfaced by a render; the compositor
/// falls back to the gradient instead.
#[derive(Error, Debug)]
pub enum BackgroundError {
    /// URL scheme is not fetchable
    #[error("Unsupported background URL: {0}")]
    UnsupportedUrl(String),

    /// Request failed before a response arrived
    #[error("Failed to fetch background: {0}")]
    Fetch(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Background fetch returned status {0}")]
    Status(u16),

    /// Response body exceeds the configured size limit
    #[error("Background image is too large: {0} bytes")]
    TooLarge(u64),

    /// Fetch exceeded the configured timeout
    #[error("Background fetch timed out after {0}s")]
    Timeout(u64),

    /// Bytes could not be decoded as an image
    #[error("Failed to decode background: {0}")]
    Decode(#[from] image::ImageError),
}

/// Server/HTTP specific errors
#[derive(Error, Debug)]
pub enum ServerError {
    /// Failed to bind to address
    #[error("Failed to bind to address: {0}")]
    BindError(String),

    /// Invalid address format
    #[error("Invalid address format: {0}")]
    InvalidAddress(String),

    /// Request asked for something the service refuses to render
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Blocking render task panicked or was cancelled
    #[error("Render task failed: {0}")]
    RenderTask(String),
}

/// Type alias for Result using the unified error type
pub type Result<T> = std::result::Result<T, WallpaperError>;

/// Convert errors to HTTP status codes
#[cfg(feature = "server")]
impl From<&WallpaperError> for axum::http::StatusCode {
    fn from(error: &WallpaperError) -> Self {
        match error {
            WallpaperError::Image(ImageError::InvalidDimensions { .. }) => {
                axum::http::StatusCode::BAD_REQUEST
            }
            WallpaperError::Server(ServerError::InvalidRequest(_)) => {
                axum::http::StatusCode::BAD_REQUEST
            }
            WallpaperError::Server(ServerError::InvalidAddress(_)) => {
                axum::http::StatusCode::BAD_REQUEST
            }
            WallpaperError::Json(_) => axum::http::StatusCode::BAD_REQUEST,
            WallpaperError::Background(_) | WallpaperError::Network(_) => {
                axum::http::StatusCode::BAD_GATEWAY
            }
            _ => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
