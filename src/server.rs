//! HTTP server for generating wallpapers on demand.
//!
//! Provides a JSON render endpoint returning encoded wallpapers.

use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::encode::{self, ImageFormat};
use crate::errors::{Result, ServerError, WallpaperError};
use crate::generator::WallpaperGenerator;
use crate::model::{Verse, WallpaperOptions};

/// Application state shared by every request.
#[derive(Clone, Debug)]
pub struct AppState {
    generator: Arc<WallpaperGenerator>,
    max_dimension: u32,
}

impl AppState {
    pub fn new(generator: WallpaperGenerator, max_dimension: u32) -> Self {
        Self {
            generator: Arc::new(generator),
            max_dimension,
        }
    }
}

/// Body of `POST /wallpaper`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WallpaperRequest {
    pub verse: Verse,
    pub options: WallpaperOptions,
    /// `png` (default), `jpg`/`jpeg` or `webp`
    #[serde(default)]
    pub format: Option<String>,
}

/// JSON error body. Only client errors carry details; everything else is
/// reported generically and logged.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
}

/// Middleware to add Server header to all responses
async fn add_server_header(request: axum::extract::Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    let server_header = format!("verse-wallpaper/{}", env!("CARGO_PKG_VERSION"));

    if let Ok(header_value) = axum::http::HeaderValue::from_str(&server_header) {
        response
            .headers_mut()
            .insert(axum::http::header::SERVER, header_value);
    }

    response
}

/// Builds the service routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/wallpaper", post(wallpaper_handler))
        .route("/health", get(health_handler))
        .layer(middleware::from_fn(add_server_header))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the HTTP server with graceful shutdown.
pub async fn start_server(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::BindError(format!("{}: {}", addr, e)))?;

    info!("Listening on http://{}", addr);

    let server = axum::serve(listener, router(state));
    let graceful = server.with_graceful_shutdown(shutdown_signal());

    info!("Server starting, press Ctrl+C to shut down.");

    graceful.await?;
    Ok(())
}

/// Listens for the shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Ctrl+C received, starting graceful shutdown.");
        },
        _ = terminate => {
            info!("Terminate signal received, starting graceful shutdown.");
        },
    }
}

/// Handles health check route - returns simple OK response.
///
/// Endpoint: GET /health
async fn health_handler() -> Response {
    ([(axum::http::header::CONTENT_TYPE, "text/plain")], "OK").into_response()
}

/// Handles wallpaper render requests.
///
/// Endpoint: POST /wallpaper
/// Returns: Image in the requested format (PNG by default)
#[instrument(skip_all)]
async fn wallpaper_handler(
    State(state): State<AppState>,
    Json(request): Json<WallpaperRequest>,
) -> Response {
    match render_request(&state, request).await {
        Ok((format, bytes)) => (
            [(axum::http::header::CONTENT_TYPE, format.mime_type())],
            bytes,
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn render_request(
    state: &AppState,
    request: WallpaperRequest,
) -> Result<(ImageFormat, Vec<u8>)> {
    let format = parse_format(request.format.as_deref())?;
    validate_options(&request.options, state.max_dimension)?;

    let background = state.generator.load_background(&request.options).await;

    // Rasterization is CPU-bound; keep it off the async workers.
    let generator = state.generator.clone();
    let bytes = tokio::task::spawn_blocking(move || {
        generator.render_encoded(
            &request.verse,
            &request.options,
            background.as_ref(),
            format,
        )
    })
    .await
    .map_err(|e| ServerError::RenderTask(e.to_string()))??;

    Ok((format, bytes))
}

fn error_response(error: &WallpaperError) -> Response {
    let status = StatusCode::from(error);
    let body = if status.is_client_error() {
        ErrorResponse {
            error: "invalid_request".to_string(),
            message: error.to_string(),
            status: status.as_u16(),
        }
    } else {
        tracing::error!("Failed to generate wallpaper: {}", error);
        ErrorResponse {
            error: "render_error".to_string(),
            message: "could not generate wallpaper".to_string(),
            status: status.as_u16(),
        }
    };
    (status, Json(body)).into_response()
}

/// Resolves the requested output format; absent means PNG.
pub fn parse_format(format: Option<&str>) -> std::result::Result<ImageFormat, ServerError> {
    match format.map(str::trim) {
        None | Some("") => Ok(ImageFormat::Png),
        Some(value) => encode::parse_extension(value)
            .ok_or_else(|| ServerError::InvalidRequest(format!("unsupported format '{}'", value))),
    }
}

/// Rejects canvases the service will not allocate.
pub fn validate_options(
    options: &WallpaperOptions,
    max_dimension: u32,
) -> std::result::Result<(), ServerError> {
    if options.width == 0 || options.height == 0 {
        return Err(ServerError::InvalidRequest(format!(
            "dimensions must be positive, got {}x{}",
            options.width, options.height
        )));
    }
    if options.width > max_dimension || options.height > max_dimension {
        return Err(ServerError::InvalidRequest(format!(
            "dimensions {}x{} exceed the {}px limit",
            options.width, options.height, max_dimension
        )));
    }
    Ok(())
}

/// Parses a listen address, filling in the missing parts.
///
/// Accepts `host:port`, `host`, `:port`, `port` and bracketed IPv6 with or
/// without a port.
pub fn parse_address(
    addr: &str,
    default_host: IpAddr,
    default_port: u16,
) -> std::result::Result<SocketAddr, ServerError> {
    let addr = addr.trim();
    let invalid = || ServerError::InvalidAddress(addr.to_string());

    if addr.is_empty() {
        return Err(invalid());
    }
    if let Ok(socket) = addr.parse::<SocketAddr>() {
        return Ok(socket);
    }
    if let Ok(ip) = addr.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, default_port));
    }

    let bare_port = addr
        .strip_prefix(':')
        .or_else(|| addr.chars().all(|c| c.is_ascii_digit()).then_some(addr));
    if let Some(port) = bare_port {
        return port
            .parse::<u16>()
            .map(|port| SocketAddr::new(default_host, port))
            .map_err(|_| invalid());
    }

    if let Some(rest) = addr.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
        let ip: Ipv6Addr = host.parse().map_err(|_| invalid())?;
        let port = match tail {
            "" | ":" => default_port,
            _ => tail
                .strip_prefix(':')
                .and_then(|port| port.parse().ok())
                .ok_or_else(invalid)?,
        };
        return Ok(SocketAddr::new(IpAddr::V6(ip), port));
    }

    Err(invalid())
}
