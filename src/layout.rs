//! Text fitting for wallpaper verses.
//!
//! Three text roles share the vertical region between the top and bottom
//! margins: the Arabic block, the quoted translation block and a single
//! reference line, with a separator ornament between translation and
//! reference. [`TextFitter::fit`] picks font sizes from the canvas size and
//! then shrinks all three together until the stacked height fits, bounded by
//! [`LayoutConfig::max_iterations`]. Size floors are applied afterwards, so a
//! very long verse may still overflow rather than become illegible.

use tracing::{debug, instrument, warn};

use crate::config::{LayoutConfig, StyleConfig};
use crate::fonts::{FontSpec, TextMeasurer};

/// Canvas shape classes used to pick the base font size divisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectBucket {
    Wide,
    Tall,
    Regular,
}

impl AspectBucket {
    pub fn classify(width: u32, height: u32, config: &LayoutConfig) -> Self {
        let aspect = width as f32 / height.max(1) as f32;
        if aspect > config.wide_aspect_threshold {
            AspectBucket::Wide
        } else if aspect < config.tall_aspect_threshold {
            AspectBucket::Tall
        } else {
            AspectBucket::Regular
        }
    }

    pub fn divisor(self, config: &LayoutConfig) -> f32 {
        match self {
            AspectBucket::Wide => config.wide_divisor,
            AspectBucket::Tall => config.tall_divisor,
            AspectBucket::Regular => config.default_divisor,
        }
    }
}

/// Base font size: the shorter canvas side over the bucket's divisor.
pub fn base_font_size(width: u32, height: u32, config: &LayoutConfig) -> f32 {
    let divisor = AspectBucket::classify(width, height, config).divisor(config);
    width.min(height) as f32 / divisor
}

/// Font sizes of the three text roles, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSizes {
    pub arabic: f32,
    pub translation: f32,
    pub reference: f32,
}

impl FontSizes {
    pub fn from_base(base: f32, config: &LayoutConfig) -> Self {
        Self {
            arabic: base * config.arabic_ratio,
            translation: base * config.translation_ratio,
            reference: base * config.reference_ratio,
        }
    }

    fn scaled(self, factor: f32) -> Self {
        Self {
            arabic: self.arabic * factor,
            translation: self.translation * factor,
            reference: self.reference * factor,
        }
    }

    fn clamped(self, config: &LayoutConfig) -> Self {
        Self {
            arabic: self.arabic.max(config.arabic_floor),
            translation: self.translation.max(config.translation_floor),
            reference: self.reference.max(config.reference_floor),
        }
    }
}

/// Shrink factor for one fitting step, never below `min_shrink_factor`.
pub fn shrink_factor(available: f32, total: f32, config: &LayoutConfig) -> f32 {
    if total <= 0.0 {
        return 1.0;
    }
    (available.max(0.0) / total)
        .sqrt()
        .clamp(config.min_shrink_factor, 1.0)
}

/// Wraps the translation in typographic quote marks.
pub fn quote_translation(text: &str) -> String {
    format!("\u{201C}{}\u{201D}", text.trim())
}

/// Greedy word wrap against a measured pixel width.
///
/// Words are never split: a word wider than `max_width` sits alone on its
/// line. Always returns at least one line, which is empty for blank input.
pub fn wrap_text(
    text: &str,
    font: &FontSpec<'_>,
    max_width: f32,
    measurer: &dyn TextMeasurer,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if current_line.is_empty() {
            current_line.push_str(word);
            continue;
        }
        let candidate = format!("{current_line} {word}");
        if measurer.measure(&candidate, font) > max_width {
            lines.push(std::mem::replace(&mut current_line, word.to_string()));
        } else {
            current_line = candidate;
        }
    }
    lines.push(current_line);

    lines
}

/// Text handed to the fitter.
#[derive(Debug, Clone, Copy)]
pub struct LayoutInput<'a> {
    pub arabic: &'a str,
    pub translation: &'a str,
    pub reference: &'a str,
    pub width: u32,
    pub height: u32,
}

/// Final layout of one wallpaper. Built once per render.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutResult {
    pub arabic_font_size: f32,
    pub translation_font_size: f32,
    pub reference_font_size: f32,
    pub arabic_lines: Vec<String>,
    /// Wrapped translation, quote marks included
    pub translation_lines: Vec<String>,
    pub reference: String,
    pub arabic_line_height: f32,
    pub translation_line_height: f32,
    pub reference_height: f32,
    pub separator_height: f32,
    /// Gap inserted before translation, separator and reference
    pub spacing: f32,
    pub total_height: f32,
    pub available_height: f32,
    /// Top of the stacked text block
    pub start_y: f32,
    /// Fitting passes performed inside the loop
    pub iterations: usize,
    /// Factor applied by each shrink step, in order
    pub shrink_factors: Vec<f32>,
    /// Sizes measured by each pass, in order
    pub size_history: Vec<FontSizes>,
    /// Whether a pass fit before the iteration bound was reached
    pub converged: bool,
}

impl LayoutResult {
    pub fn font_sizes(&self) -> FontSizes {
        FontSizes {
            arabic: self.arabic_font_size,
            translation: self.translation_font_size,
            reference: self.reference_font_size,
        }
    }

    /// Whether the block extends past the vertical region.
    pub fn overflows(&self) -> bool {
        self.total_height > self.available_height
    }
}

/// One wrap-and-measure pass at fixed sizes.
#[derive(Debug, Clone)]
struct Pass {
    arabic_lines: Vec<String>,
    translation_lines: Vec<String>,
    spacing: f32,
    total_height: f32,
}

/// Computes font sizes and line breaks for a verse.
pub struct TextFitter<'a> {
    config: &'a LayoutConfig,
    style: &'a StyleConfig,
    measurer: &'a dyn TextMeasurer,
}

impl<'a> TextFitter<'a> {
    pub fn new(
        config: &'a LayoutConfig,
        style: &'a StyleConfig,
        measurer: &'a dyn TextMeasurer,
    ) -> Self {
        Self {
            config,
            style,
            measurer,
        }
    }

    /// Top margin and height of the vertical region reserved for text.
    pub fn text_region(&self, height: u32) -> (f32, f32) {
        let height = height as f32;
        let margin = height * self.config.vertical_margin_ratio;
        (margin, height - 2.0 * margin)
    }

    fn spacing(&self, arabic_size: f32) -> f32 {
        (arabic_size * self.config.spacing_ratio).max(self.config.min_spacing)
    }

    fn measure_pass(&self, input: &LayoutInput<'_>, quoted: &str, sizes: &FontSizes) -> Pass {
        let max_width = input.width as f32 * self.config.wrap_width_ratio;
        let arabic_lines = wrap_text(
            input.arabic,
            &FontSpec::new(&self.style.arabic_fonts, sizes.arabic),
            max_width,
            self.measurer,
        );
        let translation_lines = wrap_text(
            quoted,
            &FontSpec::new(&self.style.latin_fonts, sizes.translation),
            max_width,
            self.measurer,
        );

        let arabic_height = arabic_lines.len() as f32 * sizes.arabic * self.config.line_height;
        let translation_height =
            translation_lines.len() as f32 * sizes.translation * self.config.line_height;
        let reference_height = sizes.reference * self.config.reference_line_height;
        let spacing = self.spacing(sizes.arabic);

        Pass {
            arabic_lines,
            translation_lines,
            spacing,
            total_height: arabic_height
                + translation_height
                + reference_height
                + self.config.separator_height
                + spacing * 3.0,
        }
    }

    #[instrument(skip(self, input), fields(width = input.width, height = input.height))]
    pub fn fit(&self, input: &LayoutInput<'_>) -> LayoutResult {
        let (top, available) = self.text_region(input.height);
        let quoted = quote_translation(input.translation);
        let base = base_font_size(input.width, input.height, self.config);

        let mut sizes = FontSizes::from_base(base, self.config);
        let mut shrink_factors = Vec::new();
        let mut size_history = Vec::new();
        let mut last_pass: Option<(FontSizes, Pass)> = None;
        let mut converged = false;

        for _ in 0..self.config.max_iterations {
            let pass = self.measure_pass(input, &quoted, &sizes);
            size_history.push(sizes);
            if pass.total_height <= available {
                converged = true;
                last_pass = Some((sizes, pass));
                break;
            }

            let factor = shrink_factor(available, pass.total_height, self.config);
            debug!(
                total = pass.total_height,
                available, factor, "Text block over budget, shrinking"
            );
            last_pass = Some((sizes, pass));
            sizes = sizes.scaled(factor);
            shrink_factors.push(factor);
        }

        let final_sizes = sizes.clamped(self.config);
        let pass = match last_pass {
            Some((measured, pass)) if measured == final_sizes => pass,
            _ => self.measure_pass(input, &quoted, &final_sizes),
        };

        if pass.total_height > available {
            warn!(
                total = pass.total_height,
                available,
                iterations = size_history.len(),
                "Verse text overflows the text region after fitting"
            );
        }

        LayoutResult {
            arabic_font_size: final_sizes.arabic,
            translation_font_size: final_sizes.translation,
            reference_font_size: final_sizes.reference,
            arabic_lines: pass.arabic_lines,
            translation_lines: pass.translation_lines,
            reference: input.reference.to_string(),
            arabic_line_height: final_sizes.arabic * self.config.line_height,
            translation_line_height: final_sizes.translation * self.config.line_height,
            reference_height: final_sizes.reference * self.config.reference_line_height,
            separator_height: self.config.separator_height,
            spacing: pass.spacing,
            total_height: pass.total_height,
            available_height: available,
            start_y: top + (available - pass.total_height) / 2.0,
            iterations: size_history.len(),
            shrink_factors,
            size_history,
            converged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::MonospaceMeasurer;

    #[test]
    fn shrink_factor_is_bounded() {
        let config = LayoutConfig::default();
        assert_eq!(shrink_factor(100.0, 1000.0, &config), 0.8);
        assert!((shrink_factor(90.0, 100.0, &config) - 0.9f32.sqrt()).abs() < 1e-6);
        assert_eq!(shrink_factor(100.0, 50.0, &config), 1.0);
        assert_eq!(shrink_factor(0.0, 50.0, &config), 0.8);
    }

    #[test]
    fn clamping_enforces_floors() {
        let config = LayoutConfig::default();
        let sizes = FontSizes {
            arabic: 1.0,
            translation: 1.0,
            reference: 1.0,
        }
        .clamped(&config);
        assert_eq!(sizes.arabic, 12.0);
        assert_eq!(sizes.translation, 10.0);
        assert_eq!(sizes.reference, 8.0);
    }

    #[test]
    fn reused_pass_matches_fresh_measurement() {
        let config = LayoutConfig::default();
        let style = StyleConfig::default();
        let measurer = MonospaceMeasurer::default();
        let fitter = TextFitter::new(&config, &style, &measurer);
        let input = LayoutInput {
            arabic: "بِسْمِ اللَّهِ الرَّحْمَٰنِ الرَّحِيمِ",
            translation: "In the name of Allah, the Entirely Merciful, the Especially Merciful.",
            reference: "Quran 1:1",
            width: 1080,
            height: 1080,
        };
        let layout = fitter.fit(&input);
        let fresh = fitter.measure_pass(
            &input,
            &quote_translation(input.translation),
            &layout.font_sizes(),
        );
        assert_eq!(layout.arabic_lines, fresh.arabic_lines);
        assert_eq!(layout.translation_lines, fresh.translation_lines);
        assert_eq!(layout.total_height, fresh.total_height);
    }
}
