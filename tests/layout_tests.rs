use verse_wallpaper::config::{LayoutConfig, StyleConfig};
use std::sync::Arc;

use verse_wallpaper::fonts::{
    load_font_database, FontMeasurer, FontSpec, MonospaceMeasurer, TextMeasurer,
};
use verse_wallpaper::layout::{
    base_font_size, quote_translation, wrap_text, AspectBucket, LayoutInput, LayoutResult,
    TextFitter,
};

const FATIHA_ARABIC: &str = "بِسْمِ اللَّهِ الرَّحْمَٰنِ الرَّحِيمِ";
const FATIHA_TRANSLATION: &str =
    "In the name of Allah, the Entirely Merciful, the Especially Merciful.";

fn fit_with(measurer: &dyn TextMeasurer, input: &LayoutInput<'_>) -> LayoutResult {
    let config = LayoutConfig::default();
    let style = StyleConfig::default();
    TextFitter::new(&config, &style, measurer).fit(input)
}

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}

/// `count` words of `word_len` characters each, separated by spaces.
fn repeated_words(word: char, word_len: usize, count: usize) -> String {
    let word: String = std::iter::repeat(word).take(word_len).collect();
    vec![word; count].join(" ")
}

#[test]
fn test_aspect_buckets() {
    let config = LayoutConfig::default();
    let test_cases = [
        (1920, 1080, AspectBucket::Wide, 35.0),
        (2560, 1440, AspectBucket::Wide, 35.0),
        (1080, 1920, AspectBucket::Tall, 45.0),
        (1080, 1080, AspectBucket::Regular, 40.0),
        (1200, 1000, AspectBucket::Regular, 40.0),
        // Exactly at the thresholds stays regular
        (1500, 1000, AspectBucket::Regular, 40.0),
        (800, 1000, AspectBucket::Regular, 40.0),
    ];

    for (width, height, bucket, divisor) in test_cases {
        let classified = AspectBucket::classify(width, height, &config);
        assert_eq!(classified, bucket, "{}x{}", width, height);
        assert_eq!(classified.divisor(&config), divisor);
    }
}

#[test]
fn test_base_font_size_uses_shorter_side() {
    let config = LayoutConfig::default();
    assert!(approx_eq(base_font_size(1080, 1080, &config), 27.0));
    assert!(approx_eq(base_font_size(1080, 1920, &config), 24.0));
    assert!(approx_eq(base_font_size(1920, 1080, &config), 1080.0 / 35.0));
}

#[test]
fn test_square_canvas_fits_without_shrinking() {
    let measurer = MonospaceMeasurer::default();
    let layout = fit_with(
        &measurer,
        &LayoutInput {
            arabic: FATIHA_ARABIC,
            translation: FATIHA_TRANSLATION,
            reference: "Quran 1:1",
            width: 1080,
            height: 1080,
        },
    );

    assert!(layout.converged);
    assert_eq!(layout.iterations, 1);
    assert!(layout.shrink_factors.is_empty());
    assert!(approx_eq(layout.arabic_font_size, 48.6));
    assert!(approx_eq(layout.translation_font_size, 27.0));
    assert!(approx_eq(layout.reference_font_size, 21.6));

    // Block is centred within the 8% margins.
    assert!(approx_eq(layout.available_height, 1080.0 * 0.84));
    assert!(layout.start_y >= 86.4 - 1e-3);
    assert!(layout.start_y + layout.total_height <= 993.6 + 1e-3);
    let top_gap = layout.start_y - 86.4;
    let bottom_gap = 993.6 - (layout.start_y + layout.total_height);
    assert!(approx_eq(top_gap, bottom_gap));
}

#[test]
fn test_long_verse_on_phone_shrinks_repeatedly() {
    // A wide calligraphic face: 300 characters in five-letter words, each word
    // alone on its line at every size the loop visits.
    let measurer = MonospaceMeasurer::new(4.0);
    let arabic = repeated_words('ع', 5, 50);
    assert!(arabic.chars().count() >= 299);

    let layout = fit_with(
        &measurer,
        &LayoutInput {
            arabic: &arabic,
            translation: "Short.",
            reference: "Quran 2:282",
            width: 1080,
            height: 1920,
        },
    );

    assert!(layout.shrink_factors.len() >= 2);
    assert!(layout.arabic_font_size < 1.8 * 24.0);
    for factor in &layout.shrink_factors {
        assert!((0.8..=1.0).contains(factor), "factor {}", factor);
    }
    for pair in layout.size_history.windows(2) {
        assert!(pair[1].arabic <= pair[0].arabic);
        assert!(pair[1].translation <= pair[0].translation);
        assert!(pair[1].reference <= pair[0].reference);
    }
    assert!(layout.iterations <= 10);
}

#[test]
fn test_fitting_terminates_and_respects_floors() {
    let measurer = MonospaceMeasurer::default();
    let arabic = repeated_words('م', 9, 50);
    let translation = repeated_words('a', 9, 50);

    for (width, height) in [(1080, 1920), (1920, 1080), (1080, 1080), (2560, 1440)] {
        let layout = fit_with(
            &measurer,
            &LayoutInput {
                arabic: &arabic,
                translation: &translation,
                reference: "Quran 2:282",
                width,
                height,
            },
        );

        assert!(layout.iterations >= 1 && layout.iterations <= 10);
        assert!(layout.arabic_font_size >= 12.0);
        assert!(layout.translation_font_size >= 10.0);
        assert!(layout.reference_font_size >= 8.0);
        assert!(!layout.arabic_lines.is_empty());
        assert!(!layout.translation_lines.is_empty());
        assert!(layout.arabic_lines.len() > 1, "{}x{} did not wrap", width, height);
    }
}

#[test]
fn test_overflow_stays_centred_when_floors_bind() {
    // Every word is wider than the wrap width, so the floors bind.
    let measurer = MonospaceMeasurer::new(20.0);
    let arabic = repeated_words('ع', 3, 200);

    let layout = fit_with(
        &measurer,
        &LayoutInput {
            arabic: &arabic,
            translation: FATIHA_TRANSLATION,
            reference: "Quran 2:282",
            width: 400,
            height: 400,
        },
    );

    assert!(!layout.converged);
    assert_eq!(layout.iterations, 10);
    assert!(layout.overflows());
    assert!(layout.arabic_font_size >= 12.0);
    let (top, available) = (400.0 * 0.08, 400.0 * 0.84);
    let expected = top + (available - layout.total_height) / 2.0;
    assert!(approx_eq(layout.start_y, expected));
    assert!(layout.start_y < top);
}

#[test]
fn test_total_height_accounts_for_every_block() {
    let measurer = MonospaceMeasurer::default();
    let layout = fit_with(
        &measurer,
        &LayoutInput {
            arabic: FATIHA_ARABIC,
            translation: FATIHA_TRANSLATION,
            reference: "Quran 1:1",
            width: 1920,
            height: 1080,
        },
    );

    let expected = layout.arabic_lines.len() as f32 * layout.arabic_line_height
        + layout.translation_lines.len() as f32 * layout.translation_line_height
        + layout.reference_height
        + layout.separator_height
        + 3.0 * layout.spacing;
    assert!(approx_eq(layout.total_height, expected));
    assert!(approx_eq(layout.spacing, (layout.arabic_font_size * 0.4).max(10.0)));
    assert!(approx_eq(layout.separator_height, 30.0));
}

#[test]
fn test_wrap_text_respects_width() {
    let measurer = MonospaceMeasurer::default();
    let families = vec!["sans-serif".to_string()];
    let font = FontSpec::new(&families, 20.0);
    let text = "the quick brown fox jumps over the lazy dog and keeps running far away";
    let max_width = 200.0;

    let lines = wrap_text(text, &font, max_width, &measurer);

    assert!(lines.len() > 1);
    for line in &lines {
        assert!(measurer.measure(line, &font) <= max_width, "line too wide: {}", line);
        assert!(!line.starts_with(' ') && !line.ends_with(' '));
    }
    let rejoined: Vec<&str> = lines.iter().flat_map(|l| l.split_whitespace()).collect();
    let words: Vec<&str> = text.split_whitespace().collect();
    assert_eq!(rejoined, words);
}

#[test]
fn test_wrap_text_keeps_long_word_whole() {
    let measurer = MonospaceMeasurer::default();
    let families = vec!["serif".to_string()];
    let font = FontSpec::new(&families, 20.0);
    let long_word = "a".repeat(40);
    let text = format!("short {} tail", long_word);

    let lines = wrap_text(&text, &font, 100.0, &measurer);

    assert_eq!(lines, vec!["short".to_string(), long_word, "tail".to_string()]);
}

#[test]
fn test_wrap_text_blank_input_yields_one_empty_line() {
    let measurer = MonospaceMeasurer::default();
    let families = vec!["serif".to_string()];
    let font = FontSpec::new(&families, 20.0);

    assert_eq!(wrap_text("", &font, 100.0, &measurer), vec![String::new()]);
    assert_eq!(wrap_text("   \n ", &font, 100.0, &measurer), vec![String::new()]);
}

#[test]
fn test_empty_translation_renders_quote_marks_only() {
    assert_eq!(quote_translation(""), "\u{201C}\u{201D}");
    assert_eq!(quote_translation("  Peace. "), "\u{201C}Peace.\u{201D}");

    let measurer = MonospaceMeasurer::default();
    let layout = fit_with(
        &measurer,
        &LayoutInput {
            arabic: FATIHA_ARABIC,
            translation: "",
            reference: "Quran 1:1",
            width: 1080,
            height: 1920,
        },
    );
    assert_eq!(layout.translation_lines, vec!["\u{201C}\u{201D}".to_string()]);
    assert!(layout.converged);
}

#[test]
fn test_empty_arabic_still_lays_out() {
    let measurer = MonospaceMeasurer::default();
    let layout = fit_with(
        &measurer,
        &LayoutInput {
            arabic: "",
            translation: FATIHA_TRANSLATION,
            reference: "Quran 1:1",
            width: 1080,
            height: 1920,
        },
    );
    assert_eq!(layout.arabic_lines, vec![String::new()]);
    assert!(layout.total_height > 0.0);
}

#[test]
fn test_fit_is_deterministic() {
    let measurer = MonospaceMeasurer::default();
    let input = LayoutInput {
        arabic: FATIHA_ARABIC,
        translation: FATIHA_TRANSLATION,
        reference: "Quran 1:1",
        width: 1080,
        height: 1920,
    };
    assert_eq!(fit_with(&measurer, &input), fit_with(&measurer, &input));
}

#[test]
fn test_shaped_measurement_drives_wrapping() {
    let measurer = FontMeasurer::new(Arc::new(load_font_database(None)));
    let config = LayoutConfig::default();
    let style = StyleConfig::default();
    let arabic = "اللَّهُ لَا إِلَٰهَ إِلَّا هُوَ الْحَيُّ الْقَيُّومُ ۚ لَا تَأْخُذُهُ سِنَةٌ وَلَا نَوْمٌ ۚ لَّهُ مَا فِي السَّمَاوَاتِ وَمَا فِي الْأَرْضِ";
    let translation = "Allah - there is no deity except Him, the Ever-Living, the Sustainer of existence. Neither drowsiness overtakes Him nor sleep.";

    let layout = TextFitter::new(&config, &style, &measurer).fit(&LayoutInput {
        arabic,
        translation,
        reference: "Quran 2:255",
        width: 1080,
        height: 1920,
    });

    let max_width = 1080.0 * config.wrap_width_ratio;
    let arabic_font = FontSpec::new(&style.arabic_fonts, layout.arabic_font_size);
    let latin_font = FontSpec::new(&style.latin_fonts, layout.translation_font_size);
    for (lines, font) in [
        (&layout.arabic_lines, &arabic_font),
        (&layout.translation_lines, &latin_font),
    ] {
        for line in lines {
            if line.split_whitespace().count() > 1 {
                assert!(measurer.measure(line, font) <= max_width, "line too wide: {}", line);
            }
        }
    }
    let rejoined: Vec<&str> = layout
        .arabic_lines
        .iter()
        .flat_map(|l| l.split_whitespace())
        .collect();
    assert_eq!(rejoined, arabic.split_whitespace().collect::<Vec<_>>());
    assert!(layout.arabic_font_size >= 12.0);
    assert!(layout.iterations <= 10);
}
