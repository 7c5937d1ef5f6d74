use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::{
    error::{ThumbforgeError, ThumbforgeResult},
    layout::TextMeasure,
};

/// RGBA8 brush color carried through Parley layouts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GlyphBrush {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

#[derive(Clone)]
struct RegisteredFamily {
    /// Family name as detected from the font data.
    resolved_name: String,
    /// Backing face bytes wrapped for the rasterizer.
    font: vello_cpu::peniko::FontData,
}

/// One shaped line of text, ready to measure or draw.
#[derive(Clone)]
pub struct ShapedLine {
    /// Single-line Parley layout (no line breaking applied).
    pub layout: parley::Layout<GlyphBrush>,
    /// Font data backing the glyph ids in `layout`.
    pub font: vello_cpu::peniko::FontData,
    /// Advance width in logical px.
    pub width: f32,
}

impl std::fmt::Debug for ShapedLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // `parley::Layout` and `FontData` do not implement `Debug`.
        f.debug_struct("ShapedLine")
            .field("width", &self.width)
            .finish_non_exhaustive()
    }
}

/// Registry of fonts available to the renderer.
///
/// Fonts are registered from raw bytes or files; nothing is pulled from the
/// system, so a render is reproducible across machines. Family lookup is
/// case-insensitive over the registered set, then the designated fallback
/// family; the stack handed to the shaper always ends in `sans-serif`.
pub struct FontLibrary {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<GlyphBrush>,
    families: HashMap<String, RegisteredFamily>,
    fallback: Option<String>,
}

impl Default for FontLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl FontLibrary {
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            families: HashMap::new(),
            fallback: None,
        }
    }

    /// Register a font under `alias` (the name states refer to it by) from
    /// raw font bytes. Returns the family name detected in the font data; the
    /// font is reachable under both names.
    #[tracing::instrument(skip(self, font_bytes))]
    pub fn register_family(&mut self, alias: &str, font_bytes: Vec<u8>) -> ThumbforgeResult<String> {
        let alias = alias.trim();
        if alias.is_empty() {
            return Err(ThumbforgeError::font("font alias must be non-empty"));
        }

        let entry = self.register_bytes(font_bytes)?;
        let resolved = entry.resolved_name.clone();
        self.families.insert(resolved.to_lowercase(), entry.clone());
        self.families.insert(alias.to_lowercase(), entry);
        Ok(resolved)
    }

    /// Register a font file under its detected family name.
    pub fn register_font_file(&mut self, path: &Path) -> ThumbforgeResult<String> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read font file '{}'", path.display()))
            .map_err(ThumbforgeError::from)?;
        let entry = self.register_bytes(bytes)?;
        let resolved = entry.resolved_name.clone();
        self.families.insert(resolved.to_lowercase(), entry);
        Ok(resolved)
    }

    /// Register every `.ttf`/`.otf`/`.ttc` file in `dir`. Unreadable or
    /// unparseable files are skipped. Returns the detected family names.
    pub fn load_fonts_dir(&mut self, dir: &Path) -> ThumbforgeResult<Vec<String>> {
        let mut loaded = Vec::new();
        let Ok(rd) = std::fs::read_dir(dir) else {
            return Ok(loaded);
        };

        let mut paths: Vec<PathBuf> = rd
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|s| s.to_str())
                        .map(|ext| {
                            let ext = ext.to_ascii_lowercase();
                            ext == "ttf" || ext == "otf" || ext == "ttc"
                        })
                        .unwrap_or(false)
            })
            .collect();
        paths.sort();

        for path in paths {
            if let Ok(name) = self.register_font_file(&path) {
                loaded.push(name);
            }
        }
        Ok(loaded)
    }

    /// Designate an already-registered family as the generic fallback used
    /// when a requested family is unknown.
    pub fn set_fallback_family(&mut self, family: &str) -> ThumbforgeResult<()> {
        let key = family.trim().to_lowercase();
        if !self.families.contains_key(&key) {
            return Err(ThumbforgeError::font(format!(
                "fallback family '{family}' is not registered"
            )));
        }
        self.fallback = Some(key);
        Ok(())
    }

    pub fn is_registered(&self, family: &str) -> bool {
        self.families.contains_key(&family.trim().to_lowercase())
    }

    /// Shape one line of text. The text is laid out without breaking; the
    /// wrap logic upstream decides where lines end.
    pub fn shape_line(
        &mut self,
        text: &str,
        family: &str,
        weight: u16,
        font_size: f32,
        brush: GlyphBrush,
    ) -> ThumbforgeResult<ShapedLine> {
        if !font_size.is_finite() || font_size <= 0.0 {
            return Err(ThumbforgeError::font("font size must be finite and > 0"));
        }

        let (stack_name, font) = {
            let fam = self.resolve(family)?;
            (fam.resolved_name.clone(), fam.font.clone())
        };

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(format!(
                "{stack_name}, sans-serif"
            ))),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(font_size));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::FontWeight::new(f32::from(weight)),
        ));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<GlyphBrush> = builder.build(text);
        layout.break_all_lines(None);

        let width = layout
            .lines()
            .map(|line| line.metrics().advance)
            .fold(0.0f32, f32::max);

        Ok(ShapedLine {
            layout,
            font,
            width,
        })
    }

    fn register_bytes(&mut self, font_bytes: Vec<u8>) -> ThumbforgeResult<RegisteredFamily> {
        let font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(font_bytes.clone()),
            0,
        );

        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| ThumbforgeError::font("no font families registered from font bytes"))?;
        let resolved_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| ThumbforgeError::font("registered font family has no name"))?
            .to_string();

        Ok(RegisteredFamily {
            resolved_name,
            font,
        })
    }

    fn resolve(&self, family: &str) -> ThumbforgeResult<&RegisteredFamily> {
        let key = family.trim().to_lowercase();
        if let Some(fam) = self.families.get(&key) {
            return Ok(fam);
        }
        if let Some(fallback) = &self.fallback
            && let Some(fam) = self.families.get(fallback)
        {
            return Ok(fam);
        }
        Err(ThumbforgeError::font(format!(
            "unknown font family '{family}' and no fallback registered"
        )))
    }
}

impl TextMeasure for FontLibrary {
    fn line_width(
        &mut self,
        text: &str,
        family: &str,
        weight: u16,
        font_size: f32,
    ) -> ThumbforgeResult<f32> {
        Ok(self
            .shape_line(text, family, weight, font_size, GlyphBrush::default())?
            .width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_family_without_fallback_is_a_font_error() {
        let mut lib = FontLibrary::new();
        let err = lib
            .shape_line("HI", "Montserrat", 900, 24.0, GlyphBrush::default())
            .unwrap_err();
        assert!(err.to_string().contains("unknown font family"));
    }

    #[test]
    fn garbage_font_bytes_are_rejected() {
        let mut lib = FontLibrary::new();
        assert!(lib.register_family("Broken", vec![0u8; 16]).is_err());
        assert!(!lib.is_registered("Broken"));
    }

    #[test]
    fn fallback_must_already_be_registered() {
        let mut lib = FontLibrary::new();
        assert!(lib.set_fallback_family("Roboto").is_err());
    }

    #[test]
    fn missing_fonts_dir_loads_nothing() {
        let mut lib = FontLibrary::new();
        let loaded = lib
            .load_fonts_dir(Path::new("target/does-not-exist-fonts"))
            .unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn invalid_font_size_is_rejected() {
        let mut lib = FontLibrary::new();
        assert!(lib.shape_line("HI", "X", 900, 0.0, GlyphBrush::default()).is_err());
        assert!(lib.shape_line("HI", "X", 900, f32::NAN, GlyphBrush::default()).is_err());
    }
}
