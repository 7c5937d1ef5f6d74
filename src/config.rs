use kurbo::Vec2;

use crate::error::{ThumbforgeError, ThumbforgeResult};

/// Fitting parameters for one text block (title or subtitle).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextBlockStyle {
    /// CSS-style font weight (700 bold, 900 heavy).
    pub weight: u16,
    /// Fraction of the canvas width the block may occupy.
    pub max_width_frac: f64,
    /// Fraction of the canvas height the block may occupy.
    pub max_height_frac: f64,
    /// Font size the fitting loop starts from, logical px.
    pub initial_font_size: f32,
    /// Hard floor for the fitting loop, logical px.
    pub min_font_size: f32,
}

/// Drop-shadow parameters, black ink at `opacity`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ShadowStyle {
    /// Shadow blur in logical px (2D-canvas convention: gaussian sigma is
    /// half of this).
    pub blur: f64,
    /// Shadow offset in logical px.
    pub offset: Vec2,
    /// Shadow opacity in `[0, 1]`.
    pub opacity: f32,
}

/// Style constants for a whole composition. The defaults reproduce the
/// product's look; every field can be overridden via a JSON config file.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_title_style")]
    pub title: TextBlockStyle,
    #[serde(default = "default_subtitle_style")]
    pub subtitle: TextBlockStyle,
    /// Vertical gap between title and subtitle blocks, logical px.
    #[serde(default = "default_block_spacing")]
    pub block_spacing: f64,
    #[serde(default = "default_title_shadow")]
    pub title_shadow: ShadowStyle,
    #[serde(default = "default_subtitle_shadow")]
    pub subtitle_shadow: ShadowStyle,
    /// Logo edge length, logical px (drawn square).
    #[serde(default = "default_logo_size")]
    pub logo_size: f64,
    /// Padding between the logo and the top/right canvas edges.
    #[serde(default = "default_logo_padding")]
    pub logo_padding: f64,
}

fn default_title_style() -> TextBlockStyle {
    TextBlockStyle {
        weight: 900,
        max_width_frac: 0.9,
        max_height_frac: 0.6,
        initial_font_size: 120.0,
        min_font_size: 40.0,
    }
}

fn default_subtitle_style() -> TextBlockStyle {
    TextBlockStyle {
        weight: 700,
        max_width_frac: 0.8,
        max_height_frac: 0.25,
        initial_font_size: 70.0,
        min_font_size: 30.0,
    }
}

fn default_block_spacing() -> f64 {
    20.0
}

fn default_title_shadow() -> ShadowStyle {
    ShadowStyle {
        blur: 15.0,
        offset: Vec2::new(5.0, 5.0),
        opacity: 0.7,
    }
}

fn default_subtitle_shadow() -> ShadowStyle {
    ShadowStyle {
        blur: 10.0,
        offset: Vec2::new(2.0, 2.0),
        opacity: 0.5,
    }
}

fn default_logo_size() -> f64 {
    120.0
}

fn default_logo_padding() -> f64 {
    40.0
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            title: default_title_style(),
            subtitle: default_subtitle_style(),
            block_spacing: default_block_spacing(),
            title_shadow: default_title_shadow(),
            subtitle_shadow: default_subtitle_shadow(),
            logo_size: default_logo_size(),
            logo_padding: default_logo_padding(),
        }
    }
}

impl TextBlockStyle {
    fn validate(&self, block: &str) -> ThumbforgeResult<()> {
        if self.weight == 0 || self.weight > 1000 {
            return Err(ThumbforgeError::validation(format!(
                "{block} weight must be in 1..=1000"
            )));
        }
        for (name, frac) in [
            ("max_width_frac", self.max_width_frac),
            ("max_height_frac", self.max_height_frac),
        ] {
            if !frac.is_finite() || frac <= 0.0 || frac > 1.0 {
                return Err(ThumbforgeError::validation(format!(
                    "{block} {name} must be in (0, 1]"
                )));
            }
        }
        if !self.min_font_size.is_finite() || self.min_font_size <= 0.0 {
            return Err(ThumbforgeError::validation(format!(
                "{block} min_font_size must be > 0"
            )));
        }
        if !self.initial_font_size.is_finite() || self.initial_font_size < self.min_font_size {
            return Err(ThumbforgeError::validation(format!(
                "{block} initial_font_size must be >= min_font_size"
            )));
        }
        Ok(())
    }
}

impl ShadowStyle {
    fn validate(&self, block: &str) -> ThumbforgeResult<()> {
        if !self.blur.is_finite() || self.blur < 0.0 {
            return Err(ThumbforgeError::validation(format!(
                "{block} shadow blur must be >= 0"
            )));
        }
        if !self.offset.x.is_finite() || !self.offset.y.is_finite() {
            return Err(ThumbforgeError::validation(format!(
                "{block} shadow offset must be finite"
            )));
        }
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(ThumbforgeError::validation(format!(
                "{block} shadow opacity must be in [0, 1]"
            )));
        }
        Ok(())
    }
}

impl RenderConfig {
    pub fn validate(&self) -> ThumbforgeResult<()> {
        self.title.validate("title")?;
        self.subtitle.validate("subtitle")?;
        self.title_shadow.validate("title")?;
        self.subtitle_shadow.validate("subtitle")?;

        if !self.block_spacing.is_finite() || self.block_spacing < 0.0 {
            return Err(ThumbforgeError::validation("block_spacing must be >= 0"));
        }
        if !self.logo_size.is_finite() || self.logo_size <= 0.0 {
            return Err(ThumbforgeError::validation("logo_size must be > 0"));
        }
        if !self.logo_padding.is_finite() || self.logo_padding < 0.0 {
            return Err(ThumbforgeError::validation("logo_padding must be >= 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let cfg = RenderConfig::default();
        assert_eq!(cfg.title.weight, 900);
        assert_eq!(cfg.title.max_width_frac, 0.9);
        assert_eq!(cfg.title.max_height_frac, 0.6);
        assert_eq!(cfg.title.initial_font_size, 120.0);
        assert_eq!(cfg.title.min_font_size, 40.0);

        assert_eq!(cfg.subtitle.weight, 700);
        assert_eq!(cfg.subtitle.max_width_frac, 0.8);
        assert_eq!(cfg.subtitle.max_height_frac, 0.25);
        assert_eq!(cfg.subtitle.initial_font_size, 70.0);
        assert_eq!(cfg.subtitle.min_font_size, 30.0);

        assert_eq!(cfg.block_spacing, 20.0);
        assert_eq!(cfg.title_shadow.blur, 15.0);
        assert_eq!(cfg.title_shadow.offset, Vec2::new(5.0, 5.0));
        assert_eq!(cfg.subtitle_shadow.blur, 10.0);
        assert_eq!(cfg.subtitle_shadow.offset, Vec2::new(2.0, 2.0));
        assert_eq!(cfg.logo_size, 120.0);
        assert_eq!(cfg.logo_padding, 40.0);

        cfg.validate().unwrap();
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let cfg: RenderConfig =
            serde_json::from_str(r#"{ "block_spacing": 32.0 }"#).unwrap();
        assert_eq!(cfg.block_spacing, 32.0);
        assert_eq!(cfg.title.weight, 900);
        assert_eq!(cfg.logo_size, 120.0);
    }

    #[test]
    fn validate_rejects_out_of_range_fields() {
        let mut cfg = RenderConfig::default();
        cfg.title.max_width_frac = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = RenderConfig::default();
        cfg.subtitle.initial_font_size = 10.0; // below its min of 30
        assert!(cfg.validate().is_err());

        let mut cfg = RenderConfig::default();
        cfg.title_shadow.opacity = 2.0;
        assert!(cfg.validate().is_err());
    }
}
