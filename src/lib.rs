//! Thumbforge composes YouTube-style thumbnails: a fixed 1280x720 canvas
//! with an image or gradient background, auto-fitted title and subtitle
//! blocks with drop shadows, and an optional corner logo.
//!
//! # Pipeline overview
//!
//! 1. **Describe**: build or deserialize a [`ThumbnailState`]
//! 2. **Load**: fonts via [`FontLibrary`], images via an [`ImageLoader`]
//! 3. **Render**: [`ThumbnailRenderer::render`] draws onto a [`RenderSurface`]
//! 4. **Export**: [`encode_jpeg`] / [`encode_png`] produce file bytes
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic**: a fixed state and loader always produce identical
//!   pixels, so re-rendering is idempotent.
//! - **Sequential asset loads**: the background resolves before any text is
//!   drawn and the logo lands last; there are no callback races to guard
//!   against.
//! - **Premultiplied RGBA8** end-to-end: the surface stores premultiplied
//!   pixels; encoders unpremultiply or flatten at the edge.

#![forbid(unsafe_code)]

pub mod blur;
pub mod color;
pub mod composite;
pub mod config;
pub mod encode;
pub mod error;
pub mod fonts;
pub mod layout;
pub mod presets;
pub mod render;
pub mod sources;
pub mod state;

pub use color::{Rgba8, parse_css_color};
pub use config::{RenderConfig, ShadowStyle, TextBlockStyle};
pub use encode::{JPEG_EXPORT_QUALITY, encode_jpeg, encode_png};
pub use error::{ThumbforgeError, ThumbforgeResult};
pub use fonts::FontLibrary;
pub use layout::{FittedBlock, TextMeasure, fit_text, wrap_words};
pub use presets::{
    CANVAS_HEIGHT, CANVAS_WIDTH, FONT_FAMILIES, Template, TextStylePreset, apply_preset,
    builtin_templates, template_by_id,
};
pub use render::{RenderSurface, ThumbnailRenderer};
pub use sources::{FsImageLoader, ImageLoader, PreparedImage};
pub use state::ThumbnailState;
