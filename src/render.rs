//! Text and ornament compositing.
//!
//! The fitted layout is expressed as an SVG overlay (text lines, shadow and
//! glow filters, the separator star) and rasterized with resvg directly onto
//! the already-painted background surface.

use std::f32::consts::PI;
use std::fmt::Write as _;
use std::sync::Arc;

use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{self, fontdb};
use tracing::instrument;

use crate::config::StyleConfig;
use crate::errors::ImageError;
use crate::layout::LayoutResult;

/// Escapes text for use inside SVG element content and attribute values.
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// CSS `font-family` value for a preference-ordered stack.
pub fn css_font_family(families: &[String]) -> String {
    families
        .iter()
        .map(|family| match family.as_str() {
            "serif" | "sans-serif" | "monospace" | "cursive" | "fantasy" => family.clone(),
            name => format!("'{}'", escape_xml(name)),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Vertices of an 8-pointed star: 16 points alternating outer and inner
/// radius, outer points 45° apart, the first pointing straight up.
pub fn star_points(cx: f32, cy: f32, outer: f32, inner: f32) -> Vec<(f32, f32)> {
    (0..16)
        .map(|i| {
            let angle = i as f32 * PI / 8.0 - PI / 2.0;
            let radius = if i % 2 == 0 { outer } else { inner };
            (cx + radius * angle.cos(), cy + radius * angle.sin())
        })
        .collect()
}

/// Vertical centres of every painted element, top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockPositions {
    pub arabic: Vec<f32>,
    pub translation: Vec<f32>,
    pub separator: f32,
    pub reference: f32,
}

impl BlockPositions {
    /// Walks the layout with a vertical cursor in paint order.
    pub fn from_layout(layout: &LayoutResult) -> Self {
        let mut y = layout.start_y;

        let arabic = centres(y, layout.arabic_lines.len(), layout.arabic_line_height);
        y += layout.arabic_lines.len() as f32 * layout.arabic_line_height + layout.spacing;

        let translation = centres(
            y,
            layout.translation_lines.len(),
            layout.translation_line_height,
        );
        y += layout.translation_lines.len() as f32 * layout.translation_line_height
            + layout.spacing;

        let separator = y + layout.separator_height / 2.0;
        y += layout.separator_height + layout.spacing;

        Self {
            arabic,
            translation,
            separator,
            reference: y + layout.reference_height / 2.0,
        }
    }
}

fn centres(top: f32, count: usize, line_height: f32) -> Vec<f32> {
    (0..count)
        .map(|i| top + (i as f32 + 0.5) * line_height)
        .collect()
}

fn write_defs(svg: &mut String, style: &StyleConfig) {
    let shadow_sigma = style.shadow_blur / 2.0;
    let glow_sigma = style.glow_blur / 2.0;
    let offset = style.shadow_offset;
    let opacity = style.shadow_opacity;
    let accent = style.accent_color.to_hex();

    let _ = write!(
        svg,
        r##"<defs>
  <filter id="shadow" x="-20%" y="-50%" width="140%" height="200%">
    <feDropShadow dx="{offset}" dy="{offset}" stdDeviation="{shadow_sigma}" flood-color="#000000" flood-opacity="{opacity}"/>
  </filter>
  <filter id="glow" x="-20%" y="-50%" width="140%" height="200%">
    <feGaussianBlur in="SourceAlpha" stdDeviation="{glow_sigma}" result="blur"/>
    <feFlood flood-color="{accent}" flood-opacity="{glow_opacity}" result="tint"/>
    <feComposite in="tint" in2="blur" operator="in" result="halo"/>
    <feDropShadow in="SourceGraphic" dx="{offset}" dy="{offset}" stdDeviation="{shadow_sigma}" flood-color="#000000" flood-opacity="{opacity}" result="shadowed"/>
    <feMerge>
      <feMergeNode in="halo"/>
      <feMergeNode in="shadowed"/>
    </feMerge>
  </filter>
  <filter id="ornament-glow" x="-50%" y="-200%" width="200%" height="500%">
    <feGaussianBlur in="SourceGraphic" stdDeviation="3" result="soft"/>
    <feMerge>
      <feMergeNode in="soft"/>
      <feMergeNode in="SourceGraphic"/>
    </feMerge>
  </filter>
</defs>
"##,
        glow_opacity = style.glow_opacity,
    );
}

#[allow(clippy::too_many_arguments)]
fn write_text_block(
    svg: &mut String,
    lines: &[String],
    centres: &[f32],
    x: f32,
    font_family: &str,
    font_size: f32,
    fill: &str,
    filter: &str,
    extra: &str,
) {
    let _ = writeln!(
        svg,
        r#"<g font-family="{font_family}" font-size="{font_size:.2}" fill="{fill}" text-anchor="middle" filter="url(#{filter})"{extra}>"#
    );
    for (line, y) in lines.iter().zip(centres) {
        let _ = writeln!(
            svg,
            r#"  <text x="{x:.2}" y="{y:.2}" dominant-baseline="central">{}</text>"#,
            escape_xml(line)
        );
    }
    svg.push_str("</g>\n");
}

fn write_separator(svg: &mut String, cx: f32, cy: f32, width: u32, layout: &LayoutResult, accent: &str) {
    let outer = layout.separator_height * 0.3;
    let inner = outer * 0.45;
    let gap = outer * 1.8;
    let rule = width as f32 * 0.15;

    let points = star_points(cx, cy, outer, inner)
        .iter()
        .map(|(x, y)| format!("{x:.2},{y:.2}"))
        .collect::<Vec<_>>()
        .join(" ");

    let _ = write!(
        svg,
        r#"<g filter="url(#ornament-glow)" stroke="{accent}" fill="{accent}">
  <line x1="{l1:.2}" y1="{cy:.2}" x2="{l2:.2}" y2="{cy:.2}" stroke-width="1.5" stroke-opacity="0.8" stroke-linecap="round"/>
  <line x1="{r1:.2}" y1="{cy:.2}" x2="{r2:.2}" y2="{cy:.2}" stroke-width="1.5" stroke-opacity="0.8" stroke-linecap="round"/>
  <polygon points="{points}" stroke="none"/>
</g>
"#,
        l1 = cx - gap - rule,
        l2 = cx - gap,
        r1 = cx + gap,
        r2 = cx + gap + rule,
    );
}

/// Builds the overlay document: Arabic, translation, separator, reference.
pub fn overlay_svg(layout: &LayoutResult, width: u32, height: u32, style: &StyleConfig) -> String {
    let positions = BlockPositions::from_layout(layout);
    let cx = width as f32 / 2.0;
    let text_color = style.text_color.to_hex();
    let accent = style.accent_color.to_hex();
    let arabic_family = css_font_family(&style.arabic_fonts);
    let latin_family = css_font_family(&style.latin_fonts);

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">
"#
    );
    write_defs(&mut svg, style);

    write_text_block(
        &mut svg,
        &layout.arabic_lines,
        &positions.arabic,
        cx,
        &arabic_family,
        layout.arabic_font_size,
        &text_color,
        "glow",
        r#" direction="rtl""#,
    );
    write_text_block(
        &mut svg,
        &layout.translation_lines,
        &positions.translation,
        cx,
        &latin_family,
        layout.translation_font_size,
        &text_color,
        "shadow",
        "",
    );
    write_separator(&mut svg, cx, positions.separator, width, layout, &accent);
    write_text_block(
        &mut svg,
        std::slice::from_ref(&layout.reference),
        &[positions.reference],
        cx,
        &latin_family,
        layout.reference_font_size,
        &accent,
        "shadow",
        "",
    );

    svg.push_str("</svg>\n");
    svg
}

/// SVG rasterizer sharing the font database used for measurement.
#[derive(Debug, Clone)]
pub struct Rasterizer {
    font_db: Arc<fontdb::Database>,
}

impl Rasterizer {
    pub fn new(font_db: Arc<fontdb::Database>) -> Self {
        Self { font_db }
    }

    /// Parses `svg_data` and paints it over the existing contents of `pixmap`.
    #[instrument(skip(self, svg_data, pixmap))]
    pub fn render_onto(&self, svg_data: &str, pixmap: &mut Pixmap) -> Result<(), ImageError> {
        let start_time = std::time::Instant::now();

        let options = usvg::Options {
            fontdb: self.font_db.clone(),
            ..Default::default()
        };

        let tree = usvg::Tree::from_str(svg_data, &options)
            .map_err(|e| ImageError::SvgRendering(e.to_string()))?;

        resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());

        tracing::debug!(
            "SVG overlay rasterized in {}ms ({}x{})",
            start_time.elapsed().as_millis(),
            pixmap.width(),
            pixmap.height()
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_has_alternating_radii() {
        let points = star_points(0.0, 0.0, 10.0, 4.0);
        assert_eq!(points.len(), 16);
        for (i, (x, y)) in points.iter().enumerate() {
            let radius = (x * x + y * y).sqrt();
            let expected = if i % 2 == 0 { 10.0 } else { 4.0 };
            assert!((radius - expected).abs() < 1e-4);
        }
        // First point straight up.
        assert!(points[0].0.abs() < 1e-4);
        assert!((points[0].1 + 10.0).abs() < 1e-4);
    }

    #[test]
    fn positions_follow_paint_order() {
        use crate::config::{LayoutConfig, StyleConfig};
        use crate::fonts::MonospaceMeasurer;
        use crate::layout::{LayoutInput, TextFitter};

        let (config, style) = (LayoutConfig::default(), StyleConfig::default());
        let measurer = MonospaceMeasurer::default();
        let layout = TextFitter::new(&config, &style, &measurer).fit(&LayoutInput {
            arabic: "بِسْمِ اللَّهِ",
            translation: "In the name of Allah",
            reference: "Quran 1:1",
            width: 1080,
            height: 1920,
        });
        let positions = BlockPositions::from_layout(&layout);

        let last_arabic = *positions.arabic.last().unwrap();
        let first_translation = positions.translation[0];
        let last_translation = *positions.translation.last().unwrap();
        assert!(positions.arabic[0] > layout.start_y);
        assert!(last_arabic < first_translation);
        assert!(last_translation < positions.separator);
        assert!(positions.separator < positions.reference);
        let bottom = positions.reference + layout.reference_height / 2.0;
        assert!((bottom - (layout.start_y + layout.total_height)).abs() < 1e-3);
    }

    #[test]
    fn overlay_contains_escaped_text_and_filters() {
        use crate::config::{LayoutConfig, StyleConfig};
        use crate::fonts::MonospaceMeasurer;
        use crate::layout::{LayoutInput, TextFitter};

        let (config, style) = (LayoutConfig::default(), StyleConfig::default());
        let measurer = MonospaceMeasurer::default();
        let layout = TextFitter::new(&config, &style, &measurer).fit(&LayoutInput {
            arabic: "نور",
            translation: "Light & <guidance>",
            reference: "Quran 24:35",
            width: 1080,
            height: 1080,
        });
        let svg = overlay_svg(&layout, 1080, 1080, &style);

        assert!(svg.contains("Light &amp; &lt;guidance&gt;"));
        assert!(svg.contains(r#"direction="rtl""#));
        assert!(svg.contains(r#"filter="url(#glow)""#));
        assert!(svg.contains("#ffd700"));
        assert!(svg.contains("<polygon"));
        assert!(usvg::Tree::from_str(&svg, &usvg::Options::default()).is_ok());
    }

    #[test]
    fn escape_xml_handles_markup() {
        assert_eq!(escape_xml("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
    }

    #[test]
    fn css_font_family_quotes_names_only() {
        let stack = vec!["Amiri".to_string(), "serif".to_string()];
        assert_eq!(css_font_family(&stack), "'Amiri', serif");
    }
}
