use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

static TEXT_MEASURER: Lazy<Mutex<TextMeasurer>> = Lazy::new(|| Mutex::new(TextMeasurer::new()));

/// Width and line-spacing source for node sizing. The editor core never
/// touches a font database directly; it only sees this trait, so tests and
/// headless callers can substitute [`FixedMetrics`].
pub trait FontMetrics {
    fn segment_width(&self, text: &str, bold: bool, italic: bool) -> f32;
    fn line_height(&self, bold: bool, italic: bool) -> f32;
}

/// Deterministic metrics with no font lookup. Every glyph is `char_width`
/// wide (bold slightly wider), every line is `line_height` tall.
#[derive(Debug, Clone, Copy)]
pub struct FixedMetrics {
    pub char_width: f32,
    pub line_height: f32,
}

impl Default for FixedMetrics {
    fn default() -> Self {
        Self {
            char_width: 7.0,
            line_height: 16.0,
        }
    }
}

impl FontMetrics for FixedMetrics {
    fn segment_width(&self, text: &str, bold: bool, _italic: bool) -> f32 {
        let factor = if bold { 1.08 } else { 1.0 };
        text.chars().count() as f32 * self.char_width * factor
    }

    fn line_height(&self, _bold: bool, _italic: bool) -> f32 {
        self.line_height
    }
}

/// Metrics backed by the system font database, resolving a separate face per
/// bold/italic variant of the configured family.
#[derive(Debug, Clone)]
pub struct SystemFonts {
    pub family: String,
    pub font_size: f32,
}

impl SystemFonts {
    pub fn new(family: impl Into<String>, font_size: f32) -> Self {
        Self {
            family: family.into(),
            font_size,
        }
    }
}

impl FontMetrics for SystemFonts {
    fn segment_width(&self, text: &str, bold: bool, italic: bool) -> f32 {
        if text.is_empty() || self.font_size <= 0.0 {
            return 0.0;
        }
        let fallback = fallback_width(text, self.font_size);
        let Ok(mut guard) = TEXT_MEASURER.lock() else {
            return fallback;
        };
        guard
            .measure(&self.family, text, self.font_size, bold, italic)
            .unwrap_or(fallback)
    }

    fn line_height(&self, bold: bool, italic: bool) -> f32 {
        let fallback = self.font_size * 1.35;
        let Ok(mut guard) = TEXT_MEASURER.lock() else {
            return fallback;
        };
        guard
            .line_height(&self.family, self.font_size, bold, italic)
            .unwrap_or(fallback)
    }
}

fn fallback_width(text: &str, font_size: f32) -> f32 {
    text.chars().filter(|ch| *ch != '\n').count() as f32 * font_size * 0.56
}

struct TextMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    cache: HashMap<(String, bool, bool), Option<FontFace>>,
}

impl TextMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            cache: HashMap::new(),
        }
    }

    fn face_for(
        &mut self,
        family: &str,
        bold: bool,
        italic: bool,
    ) -> Option<&mut FontFace> {
        let key = (normalize_family_key(family), bold, italic);
        if !self.cache.contains_key(&key) {
            let face = self.load_face(family, bold, italic);
            self.cache.insert(key.clone(), face);
        }
        self.cache.get_mut(&key).and_then(|face| face.as_mut())
    }

    fn measure(
        &mut self,
        family: &str,
        text: &str,
        font_size: f32,
        bold: bool,
        italic: bool,
    ) -> Option<f32> {
        let face = self.face_for(family, bold, italic)?;
        let normalized = text.replace('\t', "    ");
        face.measure_width(&normalized, font_size)
    }

    fn line_height(
        &mut self,
        family: &str,
        font_size: f32,
        bold: bool,
        italic: bool,
    ) -> Option<f32> {
        let face = self.face_for(family, bold, italic)?;
        Some(face.line_height(font_size))
    }

    fn load_face(&mut self, family: &str, bold: bool, italic: bool) -> Option<FontFace> {
        let mut names: Vec<String> = Vec::new();
        let mut generics: Vec<Family<'static>> = Vec::new();
        for part in family.split(',') {
            let raw = part.trim().trim_matches('"').trim_matches('\'');
            if raw.is_empty() {
                continue;
            }
            match raw.to_ascii_lowercase().as_str() {
                "serif" => generics.push(Family::Serif),
                "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => {
                    generics.push(Family::SansSerif)
                }
                "monospace" | "ui-monospace" => generics.push(Family::Monospace),
                "cursive" => generics.push(Family::Cursive),
                "fantasy" => generics.push(Family::Fantasy),
                _ => names.push(raw.to_string()),
            }
        }

        let mut families: Vec<Family<'_>> = names.iter().map(|n| Family::Name(n)).collect();
        families.extend(generics);
        if families.is_empty() {
            families.push(Family::SansSerif);
        }

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let query = Query {
            families: &families,
            weight: if bold { Weight::BOLD } else { Weight::NORMAL },
            stretch: Stretch::Normal,
            style: if italic { Style::Italic } else { Style::Normal },
        };
        let id = self.db.query(&query)?;
        let mut loaded: Option<FontFace> = None;
        self.db.with_face_data(id, |data, index| {
            loaded = FontFace::parse(data.to_vec(), index);
        });
        loaded
    }
}

/// A resolved face plus the advance caches needed to measure without
/// re-walking font tables per character.
struct FontFace {
    data: Vec<u8>,
    index: u32,
    units_per_em: u16,
    line_units: f32,
    ascii_advances: [u16; 128],
    advance_cache: HashMap<char, Option<u16>>,
}

impl FontFace {
    fn parse(data: Vec<u8>, index: u32) -> Option<Self> {
        let face = Face::parse(&data, index).ok()?;
        let units_per_em = face.units_per_em().max(1);
        let line_units = (face.ascender() as f32 - face.descender() as f32
            + face.line_gap() as f32)
            .max(1.0);
        let mut ascii_advances = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph) = face.glyph_index(byte as char) {
                ascii_advances[byte as usize] = face.glyph_hor_advance(glyph).unwrap_or(0);
            }
        }
        Some(Self {
            data,
            index,
            units_per_em,
            line_units,
            ascii_advances,
            advance_cache: HashMap::new(),
        })
    }

    fn line_height(&self, font_size: f32) -> f32 {
        self.line_units * font_size / self.units_per_em as f32
    }

    fn measure_width(&mut self, text: &str, font_size: f32) -> Option<f32> {
        let scale = font_size / self.units_per_em as f32;
        let fallback = font_size * 0.56;

        if text.is_ascii() {
            let mut width = 0.0f32;
            for byte in text.as_bytes() {
                if *byte == b'\n' {
                    continue;
                }
                let advance = self.ascii_advances[*byte as usize];
                if advance == 0 {
                    width += fallback;
                } else {
                    width += advance as f32 * scale;
                }
            }
            return Some(width.max(0.0));
        }

        // Non-ASCII path: re-parse the face (it borrows self.data) and cache
        // per-char advances across calls.
        let face = Face::parse(&self.data, self.index).ok()?;
        let mut width = 0.0f32;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            let advance = *self.advance_cache.entry(ch).or_insert_with(|| {
                face.glyph_index(ch)
                    .and_then(|glyph| face.glyph_hor_advance(glyph))
            });
            match advance {
                Some(units) => width += units as f32 * scale,
                None => width += fallback,
            }
        }
        Some(width.max(0.0))
    }
}

fn normalize_family_key(family: &str) -> String {
    let trimmed = family.trim();
    if trimmed.is_empty() {
        "sans-serif".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_metrics_scale_with_char_count() {
        let metrics = FixedMetrics::default();
        let one = metrics.segment_width("a", false, false);
        let five = metrics.segment_width("abcde", false, false);
        assert!((five - one * 5.0).abs() < 1e-4);
    }

    #[test]
    fn fixed_metrics_bold_is_wider() {
        let metrics = FixedMetrics::default();
        assert!(
            metrics.segment_width("word", true, false) > metrics.segment_width("word", false, false)
        );
    }

    #[test]
    fn fallback_width_ignores_newlines() {
        assert_eq!(fallback_width("ab\ncd", 10.0), fallback_width("abcd", 10.0));
    }

    #[test]
    fn system_fonts_return_finite_values() {
        // Works with or without any installed fonts thanks to the fallback.
        let metrics = SystemFonts::new("sans-serif", 11.0);
        let width = metrics.segment_width("hello", false, false);
        assert!(width.is_finite() && width > 0.0);
        let height = metrics.line_height(false, false);
        assert!(height.is_finite() && height > 0.0);
    }
}
