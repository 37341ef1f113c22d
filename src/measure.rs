use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontArc, ScaleFont};
use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::annotation::{FontFamily, Size, TextStyle, LINE_HEIGHT_FACTOR};

/// Average advance of a glyph relative to the font size, used when no face is loaded.
const ESTIMATED_ADVANCE: f32 = 0.6;

/// Text measurement as provided by a rendering backend.
pub trait TextMeasure {
    fn line_width(&self, line: &str, style: &TextStyle) -> f32;

    fn line_height(&self, style: &TextStyle) -> f32 {
        style.size.px() * LINE_HEIGHT_FACTOR
    }

    /// Box of a possibly multi-line text: widest line by line count times line height.
    fn measure(&self, text: &str, style: &TextStyle) -> Size {
        let mut lines = 0usize;
        let mut width = 0.0f32;
        for line in text.split('\n') {
            lines += 1;
            width = width.max(self.line_width(line, style));
        }
        Size {
            width,
            height: self.line_height(style) * lines as f32,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FaceKey {
    pub family: FontFamily,
    pub bold: bool,
    pub italic: bool,
}

impl FaceKey {
    pub fn of(style: &TextStyle) -> Self {
        Self {
            family: style.family,
            bold: style.bold,
            italic: style.italic,
        }
    }

    fn regular(family: FontFamily) -> Self {
        Self {
            family,
            bold: false,
            italic: false,
        }
    }
}

/// A font file the user wants for one family/weight/style combination.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FontFace {
    #[serde(flatten)]
    pub key: FaceKey,
    pub path: PathBuf,
}

/// Loaded font faces, keyed by family, weight and style.
#[derive(Clone, Default)]
pub struct FontBook {
    faces: HashMap<FaceKey, FontArc>,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook")
            .field("faces", &self.faces.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FontBook {
    /// No faces at all: measurement falls back to estimates and glyphs are not drawn.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn discover() -> Self {
        let mut book = Self::empty();
        for &family in FontFamily::all() {
            for bold in [false, true] {
                for italic in [false, true] {
                    let key = FaceKey {
                        family,
                        bold,
                        italic,
                    };
                    for path in system_candidates(key) {
                        if book.load_file(key, Path::new(path)).is_ok() {
                            debug!("font {key:?} loaded from {path}");
                            break;
                        }
                    }
                }
            }
        }
        if book.faces.is_empty() {
            warn!("no system fonts found, text will be measured but not drawn");
        }
        book
    }

    /// System faces first, then the configured overrides on top.
    pub fn with_overrides(faces: &[FontFace]) -> Self {
        let mut book = Self::discover();
        for face in faces {
            if let Err(err) = book.load_file(face.key, &face.path) {
                warn!("ignoring font override {}: {err:#}", face.path.display());
            }
        }
        book
    }

    pub fn load_file(&mut self, key: FaceKey, path: &Path) -> Result<()> {
        let bytes =
            std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
        let font = FontArc::try_from_vec(bytes)
            .with_context(|| format!("{} is not a usable font", path.display()))?;
        self.insert(key, font);
        Ok(())
    }

    pub fn insert(&mut self, key: FaceKey, font: FontArc) {
        self.faces.insert(key, font);
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Exact face, else the family's regular face, else regular sans-serif.
    pub fn face(&self, style: &TextStyle) -> Option<&FontArc> {
        let key = FaceKey::of(style);
        self.faces
            .get(&key)
            .or_else(|| self.faces.get(&FaceKey::regular(key.family)))
            .or_else(|| self.faces.get(&FaceKey::regular(FontFamily::SansSerif)))
    }
}

impl TextMeasure for FontBook {
    fn line_width(&self, line: &str, style: &TextStyle) -> f32 {
        let px = style.size.px();
        let Some(font) = self.face(style) else {
            return line.chars().count() as f32 * px * ESTIMATED_ADVANCE;
        };

        let scaled = font.as_scaled(px);
        let mut width = 0.0f32;
        let mut prev = None;
        for ch in line.chars() {
            let glyph = font.glyph_id(ch);
            if let Some(prev) = prev {
                width += scaled.kern(prev, glyph);
            }
            width += scaled.h_advance(glyph);
            prev = Some(glyph);
        }
        width
    }
}

fn system_candidates(key: FaceKey) -> &'static [&'static str] {
    match (key.family, key.bold, key.italic) {
        (FontFamily::SansSerif, false, false) => &[
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
            "/System/Library/Fonts/Supplemental/Arial.ttf",
            "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
            "C:\\Windows\\Fonts\\arial.ttf",
        ],
        (FontFamily::SansSerif, true, false) => &[
            "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
            "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
            "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
            "C:\\Windows\\Fonts\\arialbd.ttf",
        ],
        (FontFamily::SansSerif, false, true) => &[
            "/usr/share/fonts/truetype/dejavu/DejaVuSans-Oblique.ttf",
            "/usr/share/fonts/TTF/DejaVuSans-Oblique.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSans-Italic.ttf",
            "/System/Library/Fonts/Supplemental/Arial Italic.ttf",
            "C:\\Windows\\Fonts\\ariali.ttf",
        ],
        (FontFamily::SansSerif, true, true) => &[
            "/usr/share/fonts/truetype/dejavu/DejaVuSans-BoldOblique.ttf",
            "/usr/share/fonts/TTF/DejaVuSans-BoldOblique.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSans-BoldItalic.ttf",
            "/System/Library/Fonts/Supplemental/Arial Bold Italic.ttf",
            "C:\\Windows\\Fonts\\arialbi.ttf",
        ],
        (FontFamily::Serif, false, false) => &[
            "/usr/share/fonts/truetype/dejavu/DejaVuSerif.ttf",
            "/usr/share/fonts/TTF/DejaVuSerif.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSerif-Regular.ttf",
            "/System/Library/Fonts/Supplemental/Times New Roman.ttf",
            "C:\\Windows\\Fonts\\times.ttf",
        ],
        (FontFamily::Serif, true, false) => &[
            "/usr/share/fonts/truetype/dejavu/DejaVuSerif-Bold.ttf",
            "/usr/share/fonts/TTF/DejaVuSerif-Bold.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSerif-Bold.ttf",
            "/System/Library/Fonts/Supplemental/Times New Roman Bold.ttf",
            "C:\\Windows\\Fonts\\timesbd.ttf",
        ],
        (FontFamily::Serif, false, true) => &[
            "/usr/share/fonts/truetype/dejavu/DejaVuSerif-Italic.ttf",
            "/usr/share/fonts/TTF/DejaVuSerif-Italic.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSerif-Italic.ttf",
            "/System/Library/Fonts/Supplemental/Times New Roman Italic.ttf",
            "C:\\Windows\\Fonts\\timesi.ttf",
        ],
        (FontFamily::Serif, true, true) => &[
            "/usr/share/fonts/truetype/dejavu/DejaVuSerif-BoldItalic.ttf",
            "/usr/share/fonts/TTF/DejaVuSerif-BoldItalic.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSerif-BoldItalic.ttf",
            "/System/Library/Fonts/Supplemental/Times New Roman Bold Italic.ttf",
            "C:\\Windows\\Fonts\\timesbi.ttf",
        ],
        (FontFamily::Monospace, false, false) => &[
            "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
            "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
            "/System/Library/Fonts/Supplemental/Courier New.ttf",
            "C:\\Windows\\Fonts\\cour.ttf",
        ],
        (FontFamily::Monospace, true, false) => &[
            "/usr/share/fonts/truetype/dejavu/DejaVuSansMono-Bold.ttf",
            "/usr/share/fonts/TTF/DejaVuSansMono-Bold.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationMono-Bold.ttf",
            "/System/Library/Fonts/Supplemental/Courier New Bold.ttf",
            "C:\\Windows\\Fonts\\courbd.ttf",
        ],
        (FontFamily::Monospace, false, true) => &[
            "/usr/share/fonts/truetype/dejavu/DejaVuSansMono-Oblique.ttf",
            "/usr/share/fonts/TTF/DejaVuSansMono-Oblique.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationMono-Italic.ttf",
            "/System/Library/Fonts/Supplemental/Courier New Italic.ttf",
            "C:\\Windows\\Fonts\\couri.ttf",
        ],
        (FontFamily::Monospace, true, true) => &[
            "/usr/share/fonts/truetype/dejavu/DejaVuSansMono-BoldOblique.ttf",
            "/usr/share/fonts/TTF/DejaVuSansMono-BoldOblique.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationMono-BoldItalic.ttf",
            "/System/Library/Fonts/Supplemental/Courier New Bold Italic.ttf",
            "C:\\Windows\\Fonts\\courbi.ttf",
        ],
    }
}
