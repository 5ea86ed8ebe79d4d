//! Font loading, text measurement and glyph access using `ttf-parser`.
//!
//! Fonts come from configured files first, then from a list of well-known
//! system locations. With no font at all we fall back to Helvetica-like
//! heuristic metrics; text then rasterizes as placeholder bars.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{ExportError, Result};

/// Where system fonts usually live. First hit wins; bold/italic siblings
/// are looked up next to it.
const SYSTEM_FONT_CANDIDATES: &[(&str, &str, &str, &str)] = &[
    (
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Italic.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-BoldItalic.ttf",
    ),
    (
        "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
        "/usr/share/fonts/liberation-sans/LiberationSans-Bold.ttf",
        "/usr/share/fonts/liberation-sans/LiberationSans-Italic.ttf",
        "/usr/share/fonts/liberation-sans/LiberationSans-BoldItalic.ttf",
    ),
    (
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans-Oblique.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans-BoldOblique.ttf",
    ),
    (
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
        "/System/Library/Fonts/Supplemental/Arial Italic.ttf",
        "/System/Library/Fonts/Supplemental/Arial Bold Italic.ttf",
    ),
    (
        "C:\\Windows\\Fonts\\arial.ttf",
        "C:\\Windows\\Fonts\\arialbd.ttf",
        "C:\\Windows\\Fonts\\ariali.ttf",
        "C:\\Windows\\Fonts\\arialbi.ttf",
    ),
];

/// Font files to use for rasterized text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub regular: Option<PathBuf>,
    pub bold: Option<PathBuf>,
    pub italic: Option<PathBuf>,
    pub bold_italic: Option<PathBuf>,
    /// Look for a system font when `regular` is not set.
    pub discover_system: bool,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            regular: None,
            bold: None,
            italic: None,
            bold_italic: None,
            discover_system: true,
        }
    }
}

/// A loaded font face with metrics.
#[derive(Clone)]
pub struct FontData {
    /// Raw font bytes (kept alive for ttf-parser's zero-copy API). Empty for
    /// the heuristic fallback.
    pub bytes: Vec<u8>,
    pub units_per_em: f32,
    pub ascender: f32,
    pub descender: f32,
    pub line_gap: f32,
}

impl FontData {
    fn heuristic() -> Self {
        Self {
            bytes: Vec::new(),
            units_per_em: 1000.0,
            ascender: 750.0,
            descender: -250.0,
            line_gap: 0.0,
        }
    }

    pub fn face(&self) -> Option<ttf_parser::Face<'_>> {
        if self.bytes.is_empty() {
            return None;
        }
        ttf_parser::Face::parse(&self.bytes, 0).ok()
    }
}

/// Manages loaded fonts.
pub struct FontManager {
    fonts: HashMap<FontKey, FontData>,
    default_key: FontKey,
    fallback: FontData,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct FontKey {
    pub family: String,
    pub bold: bool,
    pub italic: bool,
}

impl FontKey {
    pub fn new(family: &str, bold: bool, italic: bool) -> Self {
        Self {
            family: family.to_string(),
            bold,
            italic,
        }
    }
}

impl FontManager {
    pub fn new() -> Self {
        Self {
            fonts: HashMap::new(),
            default_key: FontKey::new("Helvetica", false, false),
            fallback: FontData::heuristic(),
        }
    }

    /// Build a manager from configuration: configured files, then system
    /// discovery, then heuristics. Missing or broken files are logged.
    pub fn from_config(config: &FontConfig) -> Self {
        let mut mgr = Self::new();
        if let Some(regular) = &config.regular {
            let variants = [
                (Some(regular), false, false),
                (config.bold.as_ref(), true, false),
                (config.italic.as_ref(), false, true),
                (config.bold_italic.as_ref(), true, true),
            ];
            for (path, bold, italic) in variants {
                if let Some(path) = path {
                    if let Err(e) = mgr.load_file("Helvetica", bold, italic, path) {
                        warn!("Skipping font {}: {e}", path.display());
                    }
                }
            }
        } else if config.discover_system {
            mgr.discover_system_font();
        }
        if !mgr.has_real_fonts() {
            debug!("No font files loaded; using heuristic metrics");
        }
        mgr
    }

    /// Load the first complete system font family we can find.
    pub fn discover_system_font(&mut self) -> bool {
        for (regular, bold, italic, bold_italic) in SYSTEM_FONT_CANDIDATES {
            if !Path::new(regular).exists() {
                continue;
            }
            if self.load_file("Helvetica", false, false, Path::new(regular)).is_err() {
                continue;
            }
            debug!("Using system font {regular}");
            for (path, b, i) in [(bold, true, false), (italic, false, true), (bold_italic, true, true)] {
                if Path::new(path).exists() {
                    let _ = self.load_file("Helvetica", b, i, Path::new(path));
                }
            }
            return true;
        }
        false
    }

    pub fn load_file(&mut self, family: &str, bold: bool, italic: bool, path: &Path) -> Result<()> {
        let bytes = std::fs::read(path)?;
        self.load_font(family, bold, italic, bytes)
    }

    /// Load a TTF/OTF font from bytes.
    pub fn load_font(&mut self, family: &str, bold: bool, italic: bool, bytes: Vec<u8>) -> Result<()> {
        let face = ttf_parser::Face::parse(&bytes, 0)
            .map_err(|e| ExportError::Config(format!("Failed to parse font: {e}")))?;

        let data = FontData {
            units_per_em: face.units_per_em() as f32,
            ascender: face.ascender() as f32,
            descender: face.descender() as f32,
            line_gap: face.line_gap() as f32,
            bytes,
        };

        let key = FontKey::new(family, bold, italic);
        if self.fonts.is_empty() {
            self.default_key = key.clone();
        }
        self.fonts.insert(key, data);
        Ok(())
    }

    /// Get font data for a key. A missing family falls back to the default
    /// family with the same weight/style, then to plainer variants.
    pub fn get(&self, key: &FontKey) -> &FontData {
        let family = &self.default_key.family;
        let candidates = [
            key.clone(),
            FontKey::new(&key.family, key.bold, false),
            FontKey::new(family, key.bold, key.italic),
            FontKey::new(family, key.bold, false),
            FontKey::new(family, false, key.italic),
        ];
        candidates
            .iter()
            .find_map(|k| self.fonts.get(k))
            .or_else(|| self.fonts.get(&self.default_key))
            .unwrap_or(&self.fallback)
    }

    /// Measure the width of a string at a given font size (in px).
    /// If we have actual font bytes, we parse glyph advances. Otherwise we
    /// use an average character width heuristic (0.5 × font_size per char).
    pub fn measure_text_width(&self, text: &str, font_size: f32, bold: bool, italic: bool, family: &str) -> f32 {
        let data = self.get(&FontKey::new(family, bold, italic));

        let Some(face) = data.face() else {
            // Heuristic: bold is ~10 % wider.
            let avg = if bold { 0.55 } else { 0.5 };
            return text.chars().count() as f32 * font_size * avg;
        };

        let scale = font_size / data.units_per_em;
        text.chars()
            .map(|ch| match face.glyph_index(ch) {
                Some(gid) => face.glyph_hor_advance(gid).unwrap_or(0) as f32 * scale,
                None => font_size * 0.5,
            })
            .sum()
    }

    /// Measure the line height in px.
    pub fn line_height_px(&self, font_size: f32, line_height_factor: f32) -> f32 {
        font_size * line_height_factor
    }

    /// Get the ascender in px for the given font.
    pub fn ascender_px(&self, font_size: f32, bold: bool, italic: bool, family: &str) -> f32 {
        let data = self.get(&FontKey::new(family, bold, italic));
        data.ascender * font_size / data.units_per_em
    }

    /// Check if real font bytes are loaded for the default font.
    pub fn has_real_fonts(&self) -> bool {
        self.fonts
            .get(&self.default_key)
            .map(|d| !d.bytes.is_empty())
            .unwrap_or(false)
    }
}

impl Default for FontManager {
    /// Heuristic metrics only; deterministic regardless of installed fonts.
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_text_width() {
        let mgr = FontManager::default();
        let w = mgr.measure_text_width("Hello", 16.0, false, false, "Helvetica");
        // 5 chars × 16 × 0.5 = 40
        assert!((w - 40.0).abs() < 0.1);
        assert!(!mgr.has_real_fonts());
    }

    #[test]
    fn unknown_family_falls_back() {
        let mgr = FontManager::default();
        let a = mgr.measure_text_width("abc", 10.0, true, false, "Inter");
        let b = mgr.measure_text_width("abc", 10.0, true, false, "Helvetica");
        assert_eq!(a, b);
        assert_eq!(mgr.ascender_px(20.0, false, false, "Inter"), 15.0);
    }

    #[test]
    fn broken_font_bytes_rejected() {
        let mut mgr = FontManager::new();
        assert!(mgr.load_font("X", false, false, vec![0, 1, 2, 3]).is_err());
        assert!(!mgr.has_real_fonts());
    }

    #[test]
    fn missing_configured_font_is_not_fatal() {
        let config = FontConfig {
            regular: Some(PathBuf::from("/nonexistent/font.ttf")),
            discover_system: false,
            ..FontConfig::default()
        };
        let mgr = FontManager::from_config(&config);
        assert!(!mgr.has_real_fonts());
    }
}
