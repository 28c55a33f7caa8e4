//! Configuration management for the wallpaper renderer.
//!
//! Centralizes all configuration options, including every constant the
//! fitting loop depends on, and provides a clean interface for accessing
//! application settings.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::colors::{self, Rgb};

/// Application configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Text fitting constants
    pub layout: LayoutConfig,
    /// Colors, effects and font stacks
    pub style: StyleConfig,
    /// Background image retrieval
    pub fetch: FetchConfig,
    /// Server configuration
    pub server: ServerConfig,
    /// Font loading
    pub fonts: FontConfig,
}

/// Constants driving the text fitting engine.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    /// Top and bottom margin, each as a fraction of canvas height
    pub vertical_margin_ratio: f32,
    /// Maximum line width as a fraction of canvas width
    pub wrap_width_ratio: f32,
    /// Aspect ratio above which the canvas counts as wide
    pub wide_aspect_threshold: f32,
    /// Aspect ratio below which the canvas counts as tall
    pub tall_aspect_threshold: f32,
    pub wide_divisor: f32,
    pub tall_divisor: f32,
    pub default_divisor: f32,
    /// Arabic size as a multiple of the base size
    pub arabic_ratio: f32,
    /// Translation size as a multiple of the base size
    pub translation_ratio: f32,
    /// Reference size as a multiple of the base size
    pub reference_ratio: f32,
    /// Line height multiplier for wrapped blocks
    pub line_height: f32,
    /// Height multiplier for the single reference line
    pub reference_line_height: f32,
    /// Inter-block spacing as a fraction of the Arabic size
    pub spacing_ratio: f32,
    /// Lower bound for inter-block spacing in pixels
    pub min_spacing: f32,
    /// Vertical allowance reserved for the separator ornament in pixels
    pub separator_height: f32,
    /// Upper bound on fitting passes
    pub max_iterations: usize,
    /// Smallest factor a single shrink step may apply
    pub min_shrink_factor: f32,
    pub arabic_floor: f32,
    pub translation_floor: f32,
    pub reference_floor: f32,
}

/// Visual treatment of the wallpaper.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleConfig {
    /// Top, middle and bottom stops of the fallback gradient
    pub gradient: [Rgb; 3],
    /// Black overlay alpha over photographic backgrounds
    pub image_overlay_alpha: f32,
    /// Black overlay alpha over the gradient
    pub gradient_overlay_alpha: f32,
    /// Fill for Arabic and translation text
    pub text_color: Rgb,
    /// Glow, separator and reference color
    pub accent_color: Rgb,
    pub shadow_opacity: f32,
    pub shadow_blur: f32,
    pub shadow_offset: f32,
    pub glow_blur: f32,
    pub glow_opacity: f32,
    /// Preference-ordered font families for Arabic text
    pub arabic_fonts: Vec<String>,
    /// Preference-ordered font families for translation and reference text
    pub latin_fonts: Vec<String>,
}

/// Background image fetch configuration
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// User agent sent with image requests
    pub user_agent: String,
    /// Largest background response accepted, in bytes
    pub max_image_bytes: u64,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Default host address
    pub default_host: IpAddr,
    /// Default port
    pub default_port: u16,
    /// Largest width or height the service will render
    pub max_dimension: u32,
}

/// Font loading configuration
#[derive(Debug, Clone, Default)]
pub struct FontConfig {
    /// Extra directory of bundled fonts, loaded after system fonts
    pub fonts_dir: Option<PathBuf>,
}

/// CLI configuration overrides
#[derive(Debug, Clone)]
pub struct CliOverrides {
    /// Port override
    pub port: Option<u16>,
    /// Fonts directory override
    pub fonts_dir: Option<PathBuf>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            vertical_margin_ratio: 0.08,
            wrap_width_ratio: 0.9,
            wide_aspect_threshold: 1.5,
            tall_aspect_threshold: 0.8,
            wide_divisor: 35.0,
            tall_divisor: 45.0,
            default_divisor: 40.0,
            arabic_ratio: 1.8,
            translation_ratio: 1.0,
            reference_ratio: 0.8,
            line_height: 1.3,
            reference_line_height: 1.2,
            spacing_ratio: 0.4,
            min_spacing: 10.0,
            separator_height: 30.0,
            max_iterations: 10,
            min_shrink_factor: 0.8,
            arabic_floor: 12.0,
            translation_floor: 10.0,
            reference_floor: 8.0,
        }
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            gradient: [
                colors::GRADIENT_TOP,
                colors::GRADIENT_MID,
                colors::GRADIENT_BOTTOM,
            ],
            image_overlay_alpha: 0.35,
            gradient_overlay_alpha: 0.2,
            text_color: colors::WHITE,
            accent_color: colors::GOLD,
            shadow_opacity: 0.5,
            shadow_blur: 4.0,
            shadow_offset: 2.0,
            glow_blur: 8.0,
            glow_opacity: 0.6,
            arabic_fonts: [
                "Amiri",
                "Scheherazade New",
                "Noto Naskh Arabic",
                "Traditional Arabic",
                "serif",
            ]
            .map(String::from)
            .to_vec(),
            latin_fonts: ["Inter", "Helvetica Neue", "Arial", "Noto Sans", "sans-serif"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: format!("verse-wallpaper/{}", env!("CARGO_PKG_VERSION")),
            max_image_bytes: 20 * 1024 * 1024,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            default_host: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            default_port: 8080,
            max_dimension: 8192,
        }
    }
}

impl Config {
    /// Load configuration with CLI overrides
    pub fn load(cli_overrides: Option<CliOverrides>) -> Self {
        let mut config = Self::default();
        let mut port_from_cli = false;

        // Apply CLI overrides if provided
        if let Some(overrides) = cli_overrides {
            if let Some(port) = overrides.port {
                config.server.default_port = port;
                port_from_cli = true;
            }
            if let Some(dir) = overrides.fonts_dir {
                config.fonts.fonts_dir = Some(dir);
            }
        }

        // Load from environment variables (CLI overrides take precedence)
        if !port_from_cli {
            if let Some(port) = env_parse::<u16>("PORT") {
                config.server.default_port = port;
            }
        }

        if config.fonts.fonts_dir.is_none() {
            config.fonts.fonts_dir = std::env::var("WALLPAPER_FONTS_DIR").ok().map(PathBuf::from);
        }

        if let Some(timeout) = env_parse::<u64>("WALLPAPER_FETCH_TIMEOUT_SECS") {
            config.fetch.timeout_secs = timeout;
        }

        if let Some(max) = env_parse::<u32>("WALLPAPER_MAX_DIMENSION") {
            config.server.max_dimension = max;
        }

        config
    }

    /// Get the default host address
    pub fn default_host(&self) -> IpAddr {
        self.server.default_host
    }

    /// Get the default port
    pub fn default_port(&self) -> u16 {
        self.server.default_port
    }
}

impl CliOverrides {
    /// Create CLI overrides from CLI arguments
    pub fn from_cli_args(port: Option<u16>, fonts_dir: Option<PathBuf>) -> Self {
        Self { port, fonts_dir }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.trim().parse().ok()
}
