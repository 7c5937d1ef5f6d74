use crate::state::ThumbnailState;

/// Output width in logical pixels (the standard YouTube thumbnail size).
pub const CANVAS_WIDTH: u32 = 1280;
/// Output height in logical pixels.
pub const CANVAS_HEIGHT: u32 = 720;

/// Font families the built-in templates draw from.
pub const FONT_FAMILIES: [&str; 5] = ["Anton", "Bebas Neue", "Montserrat", "Oswald", "Roboto"];

/// Reusable text styling: fonts and fill colors for both blocks.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextStylePreset {
    pub title_font: String,
    pub subtitle_font: String,
    pub title_color: String,
    pub subtitle_color: String,
}

impl TextStylePreset {
    fn new(title_font: &str, subtitle_font: &str, title_color: &str, subtitle_color: &str) -> Self {
        Self {
            title_font: title_font.to_string(),
            subtitle_font: subtitle_font.to_string(),
            title_color: title_color.to_string(),
            subtitle_color: subtitle_color.to_string(),
        }
    }
}

/// Named, selectable template wrapping a [`TextStylePreset`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Template {
    /// Stable identifier (`impacto`, `moderno`, ...).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Style payload applied onto a state.
    pub style: TextStylePreset,
}

/// The built-in template set, in display order.
pub fn builtin_templates() -> Vec<Template> {
    fn template(id: &str, name: &str, style: TextStylePreset) -> Template {
        Template {
            id: id.to_string(),
            name: name.to_string(),
            style,
        }
    }

    vec![
        template(
            "impacto",
            "Impacto",
            TextStylePreset::new("Anton", "Roboto", "#FFFFFF", "#FFFF00"),
        ),
        template(
            "moderno",
            "Moderno",
            TextStylePreset::new("Montserrat", "Roboto", "#FFFFFF", "#00D1FF"),
        ),
        template(
            "elegante",
            "Elegante",
            TextStylePreset::new("Oswald", "Roboto", "#EAEAEA", "#FFBF00"),
        ),
        template(
            "ousado",
            "Ousado",
            TextStylePreset::new("Bebas Neue", "Montserrat", "#000000", "#FFFFFF"),
        ),
        template(
            "minimalista",
            "Minimalista",
            TextStylePreset::new("Roboto", "Roboto", "#FFFFFF", "#A0A0A0"),
        ),
    ]
}

/// Look up a built-in template by id.
pub fn template_by_id(id: &str) -> Option<Template> {
    builtin_templates().into_iter().find(|t| t.id == id)
}

/// Overwrite the four style fields of `state`; text and background are kept.
pub fn apply_preset(state: &mut ThumbnailState, preset: &TextStylePreset) {
    state.title_font = preset.title_font.clone();
    state.subtitle_font = preset.subtitle_font.clone();
    state.title_color = preset.title_color.clone();
    state.subtitle_color = preset.subtitle_color.clone();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::parse_css_color;

    #[test]
    fn builtin_templates_have_unique_ids_and_valid_styles() {
        let templates = builtin_templates();
        assert_eq!(templates.len(), 5);

        let mut ids: Vec<&str> = templates.iter().map(|t| t.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 5);

        for t in &templates {
            parse_css_color(&t.style.title_color).unwrap();
            parse_css_color(&t.style.subtitle_color).unwrap();
            assert!(FONT_FAMILIES.contains(&t.style.title_font.as_str()));
            assert!(FONT_FAMILIES.contains(&t.style.subtitle_font.as_str()));
        }
    }

    #[test]
    fn apply_preset_keeps_text_and_background() {
        let mut state = ThumbnailState::default();
        let original_title = state.title.clone();
        let original_bg1 = state.background_color1.clone();

        let impacto = template_by_id("impacto").unwrap();
        apply_preset(&mut state, &impacto.style);

        assert_eq!(state.title_font, "Anton");
        assert_eq!(state.subtitle_color, "#FFFF00");
        assert_eq!(state.title, original_title);
        assert_eq!(state.background_color1, original_bg1);
    }

    #[test]
    fn template_lookup_misses_return_none() {
        assert!(template_by_id("retro").is_none());
    }

    #[test]
    fn default_state_matches_moderno_styling() {
        let state = ThumbnailState::default();
        let moderno = template_by_id("moderno").unwrap();
        assert_eq!(state.title_font, moderno.style.title_font);
        assert_eq!(state.subtitle_color, moderno.style.subtitle_color);
    }
}
