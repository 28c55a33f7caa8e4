//! Palette shared by the background compositor and the text overlay.

use resvg::tiny_skia;

/// An opaque sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Top stop of the fallback gradient.
pub const GRADIENT_TOP: Rgb = Rgb(0x0b, 0x1a, 0x3a);
/// Middle stop of the fallback gradient.
pub const GRADIENT_MID: Rgb = Rgb(0x1e, 0x3c, 0x72);
/// Bottom stop of the fallback gradient.
pub const GRADIENT_BOTTOM: Rgb = Rgb(0x5b, 0x5e, 0xa6);
/// Warm gold used for the Arabic glow, the separator and the reference line.
pub const GOLD: Rgb = Rgb(0xff, 0xd7, 0x00);
pub const WHITE: Rgb = Rgb(0xff, 0xff, 0xff);
pub const BLACK: Rgb = Rgb(0x00, 0x00, 0x00);

impl Rgb {
    /// Formats the color as `#rrggbb` for SVG attributes.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    /// Converts to a tiny-skia color with the given alpha in `0.0..=1.0`.
    pub fn with_alpha(self, alpha: f32) -> tiny_skia::Color {
        let alpha = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
        tiny_skia::Color::from_rgba8(self.0, self.1, self.2, alpha)
    }

    /// Parses `#rrggbb` or `rrggbb`.
    pub fn parse_hex(value: &str) -> Option<Self> {
        let hex = value.strip_prefix('#').unwrap_or(value);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        Some(Self(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}
