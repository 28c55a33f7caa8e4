//! verse-wallpaper - Render Quranic verses onto auto-fitted wallpaper images.
//!
//! A library, command-line tool and HTTP server that lays out a verse's
//! Arabic text, translation and reference on a gradient or photographic
//! background, shrinking the text until it fits the target canvas.

pub mod background;
pub mod colors;
pub mod config;
pub mod encode;
pub mod errors;
pub mod fonts;
pub mod generator;
pub mod layout;
pub mod model;
pub mod render;

#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "cli")]
pub mod cli;

pub use generator::WallpaperGenerator;
pub use model::{DevicePreset, Verse, WallpaperOptions};
