//! Font loading and glyph-width measurement.
//!
//! The fitting engine never counts characters; it asks a [`TextMeasurer`]
//! how wide a candidate line renders at a given size. [`FontMeasurer`] answers
//! with real advances from the same font database the rasterizer draws with.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use resvg::usvg::fontdb;
use rustybuzz::ttf_parser;
use tracing::{debug, instrument, warn};

/// Advance, in ems, assumed for characters no resolved face can map.
pub const FALLBACK_ADVANCE_EM: f32 = 0.5;

/// A font request: preference-ordered family names and a pixel size.
///
/// Generic CSS families (`serif`, `sans-serif`, `monospace`, `cursive`,
/// `fantasy`) are honoured as the last resort of a stack.
#[derive(Debug, Clone, Copy)]
pub struct FontSpec<'a> {
    pub families: &'a [String],
    pub size: f32,
}

impl<'a> FontSpec<'a> {
    pub fn new(families: &'a [String], size: f32) -> Self {
        Self { families, size }
    }
}

/// Text-measurement capability: rendered width in pixels of `text` set in `font`.
pub trait TextMeasurer: Send + Sync {
    fn measure(&self, text: &str, font: &FontSpec<'_>) -> f32;
}

/// Loads system fonts plus, when present, a directory of bundled fonts.
#[instrument]
pub fn load_font_database(fonts_dir: Option<&Path>) -> fontdb::Database {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();

    // Try multiple font paths for different environments
    let bundled = ["src/fonts", "fonts"];
    let candidates = fonts_dir
        .map(Path::to_path_buf)
        .into_iter()
        .chain(bundled.iter().map(|path| Path::new(path).to_path_buf()));
    for path in candidates {
        if path.is_dir() {
            db.load_fonts_dir(&path);
            debug!("Loaded fonts from {}", path.display());
            break;
        }
    }

    if db.is_empty() {
        warn!("No fonts available; text will be measured with estimated advances");
    }
    db
}

fn to_family(name: &str) -> fontdb::Family<'_> {
    match name {
        "serif" => fontdb::Family::Serif,
        "sans-serif" => fontdb::Family::SansSerif,
        "monospace" => fontdb::Family::Monospace,
        "cursive" => fontdb::Family::Cursive,
        "fantasy" => fontdb::Family::Fantasy,
        other => fontdb::Family::Name(other),
    }
}

/// Measures text by shaping it with rustybuzz against the font database.
///
/// Each character is set in the first face of the stack that maps it, then in
/// any installed face that does, the way the rasterizer falls back. Runs of
/// characters sharing a face are shaped together so contextual forms,
/// ligatures and zero-width marks measure as they render. Characters no
/// installed face maps advance by [`FALLBACK_ADVANCE_EM`].
#[derive(Debug)]
pub struct FontMeasurer {
    db: Arc<fontdb::Database>,
    stacks: Mutex<HashMap<Vec<String>, StackFaces>>,
}

/// Faces resolved for one font stack, with per-character coverage.
#[derive(Debug, Default)]
struct StackFaces {
    faces: Vec<fontdb::ID>,
    by_char: HashMap<char, Option<fontdb::ID>>,
}

/// Consecutive characters set in the same face.
#[derive(Debug)]
struct Run {
    face: Option<fontdb::ID>,
    text: String,
}

impl FontMeasurer {
    pub fn new(db: Arc<fontdb::Database>) -> Self {
        Self {
            db,
            stacks: Mutex::new(HashMap::new()),
        }
    }

    fn query(&self, family: &str) -> Option<fontdb::ID> {
        self.db.query(&fontdb::Query {
            families: &[to_family(family)],
            weight: fontdb::Weight::NORMAL,
            stretch: fontdb::Stretch::Normal,
            style: fontdb::Style::Normal,
        })
    }

    fn resolve_stack(&self, families: &[String]) -> StackFaces {
        let mut faces = Vec::new();
        for id in families.iter().filter_map(|family| self.query(family)) {
            if !faces.contains(&id) {
                faces.push(id);
            }
        }
        if faces.is_empty() {
            debug!(?families, "No installed face for font stack");
        }
        StackFaces {
            faces,
            by_char: HashMap::new(),
        }
    }

    fn covers(&self, id: fontdb::ID, ch: char) -> bool {
        self.db
            .with_face_data(id, |data, index| {
                ttf_parser::Face::parse(data, index)
                    .ok()
                    .and_then(|face| face.glyph_index(ch))
                    .is_some()
            })
            .unwrap_or(false)
    }

    fn face_for(&self, stack: &[fontdb::ID], ch: char) -> Option<fontdb::ID> {
        stack
            .iter()
            .copied()
            .find(|id| self.covers(*id, ch))
            .or_else(|| {
                self.db
                    .faces()
                    .map(|face| face.id)
                    .find(|id| !stack.contains(id) && self.covers(*id, ch))
            })
    }

    /// Splits `text` into same-face runs. Combining marks stay with their base.
    fn runs(&self, text: &str, families: &[String]) -> Vec<Run> {
        let Ok(mut stacks) = self.stacks.lock() else {
            return vec![Run {
                face: None,
                text: text.to_string(),
            }];
        };
        let stack = stacks
            .entry(families.to_vec())
            .or_insert_with(|| self.resolve_stack(families));

        let mut runs: Vec<Run> = Vec::new();
        for ch in text.chars() {
            if let Some(run) = runs.last_mut() {
                if is_combining_mark(ch) {
                    run.text.push(ch);
                    continue;
                }
            }

            let face = match stack.by_char.get(&ch) {
                Some(face) => *face,
                None => {
                    let face = self.face_for(&stack.faces, ch);
                    stack.by_char.insert(ch, face);
                    face
                }
            };

            match runs.last_mut() {
                Some(run) if run.face == face => run.text.push(ch),
                _ => runs.push(Run {
                    face,
                    text: ch.to_string(),
                }),
            }
        }
        runs
    }

    fn shape_width(&self, id: fontdb::ID, text: &str, size: f32) -> Option<f32> {
        self.db
            .with_face_data(id, |data, index| {
                let face = rustybuzz::Face::from_slice(data, index)?;
                let units = face.units_per_em().max(1) as f32;
                let mut buffer = rustybuzz::UnicodeBuffer::new();
                buffer.push_str(text);
                buffer.set_direction(detect_direction(text));
                let output = rustybuzz::shape(&face, &[], buffer);
                let advance: i32 = output
                    .glyph_positions()
                    .iter()
                    .map(|pos| pos.x_advance)
                    .sum();
                Some(advance as f32 / units * size)
            })
            .flatten()
    }
}

/// Arabic and general-purpose combining marks, which never start a run.
fn is_combining_mark(ch: char) -> bool {
    matches!(
        ch as u32,
        0x0300..=0x036F
            | 0x0610..=0x061A
            | 0x064B..=0x065F
            | 0x0670
            | 0x06D6..=0x06DC
            | 0x06DF..=0x06E4
            | 0x06E7..=0x06E8
            | 0x06EA..=0x06ED
            | 0x08D3..=0x08FF
            | 0xFE20..=0xFE2F
    )
}

fn detect_direction(text: &str) -> rustybuzz::Direction {
    let rtl = text.chars().any(|ch| {
        matches!(
            ch as u32,
            0x0590..=0x08FF | 0xFB1D..=0xFDFF | 0xFE70..=0xFEFF | 0x1EE00..=0x1EEFF
        )
    });
    if rtl {
        rustybuzz::Direction::RightToLeft
    } else {
        rustybuzz::Direction::LeftToRight
    }
}

fn estimate_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * FALLBACK_ADVANCE_EM
}

impl TextMeasurer for FontMeasurer {
    fn measure(&self, text: &str, font: &FontSpec<'_>) -> f32 {
        if text.is_empty() {
            return 0.0;
        }

        self.runs(text, font.families)
            .iter()
            .map(|run| {
                run.face
                    .and_then(|id| self.shape_width(id, &run.text, font.size))
                    .unwrap_or_else(|| estimate_width(&run.text, font.size))
            })
            .sum()
    }
}

/// Deterministic measurer: every character advances by a fixed number of ems.
///
/// Useful where output must not depend on installed fonts.
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMeasurer {
    pub advance_em: f32,
}

impl MonospaceMeasurer {
    pub fn new(advance_em: f32) -> Self {
        Self { advance_em }
    }
}

impl Default for MonospaceMeasurer {
    fn default() -> Self {
        Self::new(FALLBACK_ADVANCE_EM)
    }
}

impl TextMeasurer for MonospaceMeasurer {
    fn measure(&self, text: &str, font: &FontSpec<'_>) -> f32 {
        text.chars().count() as f32 * font.size * self.advance_em
    }
}
