use crate::error::{ThumbforgeError, ThumbforgeResult};

/// Straight-alpha RGBA color as parsed from a CSS color string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const BLACK: Self = Self::new(0, 0, 0, 255);
    pub const WHITE: Self = Self::new(255, 255, 255, 255);
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    /// Convert to premultiplied RGBA8 bytes for the compositor.
    pub fn premultiply(self) -> [u8; 4] {
        let a = u16::from(self.a);
        let premul = |c: u8| -> u8 { ((u16::from(c) * a + 127) / 255) as u8 };
        [premul(self.r), premul(self.g), premul(self.b), self.a]
    }

    /// Linear interpolation in straight-alpha space, `t` clamped to `[0, 1]`.
    pub fn lerp(self, other: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| -> u8 {
            (f32::from(a) + (f32::from(b) - f32::from(a)) * t).round() as u8
        };
        Self::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }
}

/// Parse the CSS color forms the thumbnail model accepts.
///
/// Supported: `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`, `rgb(r, g, b)`,
/// `rgba(r, g, b, a)` with byte channels and fractional alpha, plus a small
/// set of named colors. Anything else is a validation error.
pub fn parse_css_color(s: &str) -> ThumbforgeResult<Rgba8> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ThumbforgeError::validation("color string must be non-empty"));
    }

    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }

    let lower = s.to_ascii_lowercase();
    if let Some(body) = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))
    {
        let body = body.strip_suffix(')').ok_or_else(|| {
            ThumbforgeError::validation(format!("unterminated rgb()/rgba() color \"{s}\""))
        })?;
        return parse_rgb_args(s, body);
    }

    named_color(&lower)
        .ok_or_else(|| ThumbforgeError::validation(format!("unrecognized color \"{s}\"")))
}

fn parse_hex(s: &str) -> ThumbforgeResult<Rgba8> {
    fn hex_byte(pair: &str) -> ThumbforgeResult<u8> {
        u8::from_str_radix(pair, 16)
            .map_err(|_| ThumbforgeError::validation(format!("invalid hex byte \"{pair}\"")))
    }

    fn hex_nibble(ch: &str) -> ThumbforgeResult<u8> {
        let v = u8::from_str_radix(ch, 16)
            .map_err(|_| ThumbforgeError::validation(format!("invalid hex digit \"{ch}\"")))?;
        Ok(v << 4 | v)
    }

    // The arms below slice by byte index, which requires ASCII input.
    if !s.is_ascii() {
        return Err(ThumbforgeError::validation(format!(
            "invalid hex color \"#{s}\""
        )));
    }

    match s.len() {
        3 => Ok(Rgba8::new(
            hex_nibble(&s[0..1])?,
            hex_nibble(&s[1..2])?,
            hex_nibble(&s[2..3])?,
            255,
        )),
        4 => Ok(Rgba8::new(
            hex_nibble(&s[0..1])?,
            hex_nibble(&s[1..2])?,
            hex_nibble(&s[2..3])?,
            hex_nibble(&s[3..4])?,
        )),
        6 => Ok(Rgba8::new(
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
            255,
        )),
        8 => Ok(Rgba8::new(
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
            hex_byte(&s[6..8])?,
        )),
        _ => Err(ThumbforgeError::validation(
            "hex color must be #RGB, #RGBA, #RRGGBB or #RRGGBBAA (case-insensitive)",
        )),
    }
}

fn parse_rgb_args(original: &str, body: &str) -> ThumbforgeResult<Rgba8> {
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return Err(ThumbforgeError::validation(format!(
            "rgb()/rgba() color \"{original}\" must have 3 or 4 components"
        )));
    }

    fn channel(part: &str, original: &str) -> ThumbforgeResult<u8> {
        let v: f32 = part.parse().map_err(|_| {
            ThumbforgeError::validation(format!("invalid channel \"{part}\" in \"{original}\""))
        })?;
        Ok(v.clamp(0.0, 255.0).round() as u8)
    }

    let r = channel(parts[0], original)?;
    let g = channel(parts[1], original)?;
    let b = channel(parts[2], original)?;
    let a = if parts.len() == 4 {
        let v: f32 = parts[3].parse().map_err(|_| {
            ThumbforgeError::validation(format!(
                "invalid alpha \"{}\" in \"{original}\"",
                parts[3]
            ))
        })?;
        (v.clamp(0.0, 1.0) * 255.0).round() as u8
    } else {
        255
    };

    Ok(Rgba8::new(r, g, b, a))
}

fn named_color(name: &str) -> Option<Rgba8> {
    let c = match name {
        "transparent" => Rgba8::TRANSPARENT,
        "black" => Rgba8::BLACK,
        "white" => Rgba8::WHITE,
        "red" => Rgba8::new(255, 0, 0, 255),
        "green" => Rgba8::new(0, 128, 0, 255),
        "blue" => Rgba8::new(0, 0, 255, 255),
        "yellow" => Rgba8::new(255, 255, 0, 255),
        "cyan" | "aqua" => Rgba8::new(0, 255, 255, 255),
        "magenta" | "fuchsia" => Rgba8::new(255, 0, 255, 255),
        "gray" | "grey" => Rgba8::new(128, 128, 128, 255),
        _ => return None,
    };
    Some(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_rgb_and_rgba() {
        assert_eq!(parse_css_color("#ff0000").unwrap(), Rgba8::new(255, 0, 0, 255));
        assert_eq!(
            parse_css_color("#0000FF80").unwrap(),
            Rgba8::new(0, 0, 255, 128)
        );
        assert_eq!(parse_css_color("#1a1a1a").unwrap(), Rgba8::new(26, 26, 26, 255));
    }

    #[test]
    fn parses_hex_shorthand() {
        assert_eq!(parse_css_color("#fff").unwrap(), Rgba8::WHITE);
        assert_eq!(parse_css_color("#f00").unwrap(), Rgba8::new(255, 0, 0, 255));
        assert_eq!(parse_css_color("#f008").unwrap(), Rgba8::new(255, 0, 0, 136));
    }

    #[test]
    fn parses_rgb_functional_forms() {
        assert_eq!(
            parse_css_color("rgb(0, 209, 255)").unwrap(),
            Rgba8::new(0, 209, 255, 255)
        );
        // 0.7f32 sits just under 0.7, so 0.7 * 255 rounds down to 178.
        assert_eq!(
            parse_css_color("rgba(0, 0, 0, 0.7)").unwrap(),
            Rgba8::new(0, 0, 0, 178)
        );
        assert_eq!(
            parse_css_color("rgba(10, 20, 30, 1)").unwrap(),
            Rgba8::new(10, 20, 30, 255)
        );
    }

    #[test]
    fn parses_named_colors() {
        assert_eq!(parse_css_color("white").unwrap(), Rgba8::WHITE);
        assert_eq!(parse_css_color("Black").unwrap(), Rgba8::BLACK);
    }

    #[test]
    fn rejects_malformed_colors() {
        assert!(parse_css_color("").is_err());
        assert!(parse_css_color("#12345").is_err());
        assert!(parse_css_color("#gg0000").is_err());
        assert!(parse_css_color("rgb(1, 2)").is_err());
        assert!(parse_css_color("blurple").is_err());
    }

    #[test]
    fn rejects_non_ascii_hex_without_panicking() {
        // Multi-byte chars can land on every byte-length arm: 3, 4, 6 and 8.
        assert!(parse_css_color("#€").is_err());
        assert!(parse_css_color("#🀄").is_err());
        assert!(parse_css_color("#日本").is_err());
        assert!(parse_css_color("#🀄🀄").is_err());
    }

    #[test]
    fn premultiply_scales_channels_by_alpha() {
        assert_eq!(Rgba8::new(255, 255, 255, 255).premultiply(), [255, 255, 255, 255]);
        assert_eq!(Rgba8::new(255, 0, 0, 0).premultiply(), [0, 0, 0, 0]);
        let half = Rgba8::new(200, 100, 50, 128).premultiply();
        assert_eq!(half[3], 128);
        assert!((i16::from(half[0]) - 100).abs() <= 1);
    }

    #[test]
    fn lerp_endpoints_are_exact() {
        let a = Rgba8::new(26, 26, 26, 255);
        let b = Rgba8::BLACK;
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
    }
}
