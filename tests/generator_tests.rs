use std::future::Future;
use std::sync::Arc;

use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use verse_wallpaper::background::ImageSource;
use verse_wallpaper::config::Config;
use verse_wallpaper::encode::ImageFormat;
use verse_wallpaper::errors::{BackgroundError, ImageError, WallpaperError};
use verse_wallpaper::fonts::MonospaceMeasurer;
use verse_wallpaper::{DevicePreset, Verse, WallpaperGenerator, WallpaperOptions};

/// Always fails, like an unreachable host.
struct UnreachableSource;

impl ImageSource for UnreachableSource {
    fn fetch(
        &self,
        _url: &str,
    ) -> impl Future<Output = Result<DynamicImage, BackgroundError>> + Send {
        async { Err(BackgroundError::Status(404)) }
    }
}

/// Serves a solid red image for every URL.
struct SolidSource;

impl ImageSource for SolidSource {
    fn fetch(
        &self,
        _url: &str,
    ) -> impl Future<Output = Result<DynamicImage, BackgroundError>> + Send {
        async {
            Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                64,
                48,
                Rgba([255, 0, 0, 255]),
            )))
        }
    }
}

fn generator<S: ImageSource>(source: S) -> WallpaperGenerator<S> {
    WallpaperGenerator::with_source(Config::default(), source)
        .with_measurer(Arc::new(MonospaceMeasurer::default()))
}

fn fatiha() -> Verse {
    Verse {
        id: 1,
        surah_number: 1,
        ayah_number: 1,
        arabic_text: "بِسْمِ اللَّهِ الرَّحْمَٰنِ الرَّحِيمِ".to_string(),
        translated_text: None,
        english_translation:
            "In the name of Allah, the Entirely Merciful, the Especially Merciful.".to_string(),
    }
}

#[tokio::test]
async fn test_output_matches_requested_dimensions() {
    let generator = generator(UnreachableSource);
    let verse = fatiha();

    for (width, height) in [(360, 640), (640, 360), (300, 300), (1, 1)] {
        let bytes = generator
            .generate_wallpaper(&verse, &WallpaperOptions::new(width, height))
            .await
            .unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (width, height));
    }
}

#[tokio::test]
async fn test_generation_is_idempotent() {
    let generator = generator(UnreachableSource);
    let verse = fatiha();
    let options = WallpaperOptions::new(540, 960);

    let first = generator.generate_wallpaper(&verse, &options).await.unwrap();
    let second = generator.generate_wallpaper(&verse, &options).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_unreachable_background_falls_back_to_gradient() {
    let generator = generator(UnreachableSource);
    let verse = fatiha();
    let plain = WallpaperOptions::new(320, 480);
    let with_url = plain.clone().with_background("https://example.invalid/bg.jpg");

    let expected = generator.generate_wallpaper(&verse, &plain).await.unwrap();
    let fallback = generator.generate_wallpaper(&verse, &with_url).await.unwrap();
    assert_eq!(expected, fallback);
}

#[tokio::test]
async fn test_blank_background_url_is_ignored() {
    let generator = generator(SolidSource);
    let verse = fatiha();
    let plain = WallpaperOptions::new(200, 200);
    let blank = plain.clone().with_background("   ");

    let expected = generator.generate_wallpaper(&verse, &plain).await.unwrap();
    let actual = generator.generate_wallpaper(&verse, &blank).await.unwrap();
    assert_eq!(expected, actual);
}

#[tokio::test]
async fn test_image_background_is_darkened() {
    let generator = generator(SolidSource);
    let verse = fatiha();
    let options = WallpaperOptions::new(200, 300).with_background("https://example.com/red.png");

    let bytes = generator.generate_wallpaper(&verse, &options).await.unwrap();
    let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
    let corner = decoded.get_pixel(0, 0).0;
    assert_eq!(corner[3], 255);
    assert!(corner[0] > 100 && corner[0] < 220, "red = {}", corner[0]);
    assert!(corner[1] < 20 && corner[2] < 20);
}

#[tokio::test]
async fn test_gradient_background_is_opaque() {
    let generator = generator(UnreachableSource);
    let pixmap = generator
        .render(&fatiha(), &WallpaperOptions::new(64, 128), None)
        .unwrap();
    assert!(pixmap.pixels().iter().all(|p| p.alpha() == 255));
}

#[tokio::test]
async fn test_missing_translation_still_renders() {
    let generator = generator(UnreachableSource);
    let verse = Verse {
        english_translation: String::new(),
        ..fatiha()
    };
    let options = WallpaperOptions::from_preset(DevicePreset::Square);

    let layout = generator.layout(&verse, &options);
    assert_eq!(layout.translation_lines, vec!["\u{201C}\u{201D}".to_string()]);

    let bytes = generator.generate_wallpaper(&verse, &options).await.unwrap();
    assert!(!bytes.is_empty());
}

#[tokio::test]
async fn test_translated_text_preferred_over_english() {
    let generator = generator(UnreachableSource);
    let verse = Verse {
        translated_text: Some("Au nom d'Allah".to_string()),
        ..fatiha()
    };
    let layout = generator.layout(&verse, &WallpaperOptions::new(1080, 1920));
    assert_eq!(
        layout.translation_lines,
        vec!["\u{201C}Au nom d'Allah\u{201D}".to_string()]
    );
    assert_eq!(layout.reference, "Quran 1:1");
}

#[tokio::test]
async fn test_zero_dimensions_are_rejected() {
    let generator = generator(UnreachableSource);
    let verse = fatiha();

    for (width, height) in [(0, 100), (100, 0), (0, 0)] {
        let result = generator
            .generate_wallpaper(&verse, &WallpaperOptions::new(width, height))
            .await;
        assert!(matches!(
            result,
            Err(WallpaperError::Image(ImageError::InvalidDimensions { .. }))
        ));
    }
}

#[tokio::test]
async fn test_generate_with_format() {
    let generator = generator(UnreachableSource);
    let verse = fatiha();
    let options = WallpaperOptions::new(120, 80);

    let jpeg = generator
        .generate_with_format(&verse, &options, ImageFormat::Jpeg)
        .await
        .unwrap();
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

    let webp = generator
        .generate_with_format(&verse, &options, ImageFormat::WebP)
        .await
        .unwrap();
    assert_eq!(&webp[8..12], b"WEBP");
}

#[tokio::test]
async fn test_concurrent_renders_share_one_generator() {
    let generator = Arc::new(generator(UnreachableSource));
    let options = WallpaperOptions::new(180, 320);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let generator = generator.clone();
            let options = options.clone();
            tokio::spawn(async move { generator.generate_wallpaper(&fatiha(), &options).await })
        })
        .collect();

    let mut outputs = Vec::new();
    for handle in handles {
        outputs.push(handle.await.unwrap().unwrap());
    }
    assert!(outputs.windows(2).all(|pair| pair[0] == pair[1]));
}

#[tokio::test]
async fn test_renders_with_installed_fonts() {
    let generator = WallpaperGenerator::with_source(Config::default(), UnreachableSource);
    let verse = fatiha();
    let options = WallpaperOptions::new(360, 640);

    let layout = generator.layout(&verse, &options);
    assert!(!layout.arabic_lines.is_empty());

    let bytes = generator.generate_wallpaper(&verse, &options).await.unwrap();
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!(decoded.dimensions(), (360, 640));
}
