//! Value objects handed to the renderer by the surrounding application.

use serde::{Deserialize, Serialize};

/// A single verse with its Arabic text and translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verse {
    pub id: i64,
    pub surah_number: u32,
    pub ayah_number: u32,
    pub arabic_text: String,
    /// Translation in the reader's language, preferred when non-empty
    #[serde(default)]
    pub translated_text: Option<String>,
    #[serde(default)]
    pub english_translation: String,
}

impl Verse {
    /// The translation to render: `translated_text` when present and
    /// non-empty, otherwise `english_translation`.
    pub fn translation(&self) -> &str {
        match self.translated_text.as_deref() {
            Some(text) if !text.trim().is_empty() => text,
            _ => &self.english_translation,
        }
    }

    /// Reference line, e.g. `Quran 2:255`.
    pub fn reference(&self) -> String {
        format!("Quran {}:{}", self.surah_number, self.ayah_number)
    }
}

/// Target canvas and background for one render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WallpaperOptions {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub background_image_url: Option<String>,
}

/// Common target resolutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum DevicePreset {
    /// Portrait phone, 1080x1920
    Phone,
    /// Widescreen desktop, 1920x1080
    Desktop,
    /// Square, 1080x1080
    Square,
    /// QHD desktop, 2560x1440
    Qhd,
}

impl DevicePreset {
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            DevicePreset::Phone => (1080, 1920),
            DevicePreset::Desktop => (1920, 1080),
            DevicePreset::Square => (1080, 1080),
            DevicePreset::Qhd => (2560, 1440),
        }
    }
}

impl WallpaperOptions {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            background_image_url: None,
        }
    }

    pub fn from_preset(preset: DevicePreset) -> Self {
        let (width, height) = preset.dimensions();
        Self::new(width, height)
    }

    pub fn with_background(mut self, url: impl Into<String>) -> Self {
        self.background_image_url = Some(url.into());
        self
    }
}
