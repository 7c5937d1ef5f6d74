use crate::{
    color::parse_css_color,
    error::{ThumbforgeError, ThumbforgeResult},
};

/// Full description of one thumbnail: the sole input to the renderer.
///
/// A state is an immutable snapshot; the renderer reads it and draws, it never
/// writes back. Color fields hold CSS color strings and are parsed at
/// validation/render time.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ThumbnailState {
    /// Title text. Folded to uppercase during wrapping and drawing.
    pub title: String,
    /// Subtitle text. Also folded to uppercase; may be empty.
    pub subtitle: String,
    /// Title font family name, resolved against the registered font set.
    pub title_font: String,
    /// Subtitle font family name.
    pub subtitle_font: String,
    /// Title fill color (CSS color string).
    pub title_color: String,
    /// Subtitle fill color (CSS color string).
    pub subtitle_color: String,
    /// First gradient stop for the fallback background.
    pub background_color1: String,
    /// Second gradient stop for the fallback background.
    pub background_color2: String,
    /// Optional background image URI (file path or `data:` URI). When the
    /// load fails the gradient background is used instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
    /// Whether to overlay the logo in the top-right corner.
    #[serde(default)]
    pub show_logo: bool,
    /// Logo image URI; drawn only when `show_logo` is set. Load failures
    /// silently drop the logo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_image: Option<String>,
}

impl Default for ThumbnailState {
    fn default() -> Self {
        Self {
            title: "GERADOR DE THUMBNAILS".to_string(),
            subtitle: "Automação com n8n e IA".to_string(),
            title_font: "Montserrat".to_string(),
            subtitle_font: "Roboto".to_string(),
            title_color: "#FFFFFF".to_string(),
            subtitle_color: "#00D1FF".to_string(),
            background_color1: "#1a1a1a".to_string(),
            background_color2: "#000000".to_string(),
            background_image: None,
            show_logo: false,
            logo_image: None,
        }
    }
}

impl ThumbnailState {
    pub fn validate(&self) -> ThumbforgeResult<()> {
        check_color("title_color", &self.title_color)?;
        check_color("subtitle_color", &self.subtitle_color)?;
        check_color("background_color1", &self.background_color1)?;
        check_color("background_color2", &self.background_color2)?;

        if self.title_font.trim().is_empty() {
            return Err(ThumbforgeError::validation("title_font must be non-empty"));
        }
        if self.subtitle_font.trim().is_empty() {
            return Err(ThumbforgeError::validation(
                "subtitle_font must be non-empty",
            ));
        }
        if let Some(uri) = &self.background_image
            && uri.trim().is_empty()
        {
            return Err(ThumbforgeError::validation(
                "background_image must be non-empty when present",
            ));
        }
        if let Some(uri) = &self.logo_image
            && uri.trim().is_empty()
        {
            return Err(ThumbforgeError::validation(
                "logo_image must be non-empty when present",
            ));
        }
        Ok(())
    }

    /// File stem for exported artifacts: the lowercased title with every
    /// non-`[a-z0-9]` character mapped to `_`, or `"thumbnail"` for an empty
    /// title.
    pub fn export_file_stem(&self) -> String {
        let stem: String = self
            .title
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_lowercase() || c.is_ascii_digit() {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if stem.is_empty() {
            "thumbnail".to_string()
        } else {
            stem
        }
    }
}

fn check_color(field: &str, value: &str) -> ThumbforgeResult<()> {
    parse_css_color(value).map(|_| ()).map_err(|_| {
        ThumbforgeError::validation(format!("{field} \"{value}\" is not a valid color"))
    })
}
