use std::sync::Arc;

use kurbo::Affine;

use crate::{
    blur::{blur_rgba8_premul, shadow_blur_params},
    color::{Rgba8, parse_css_color},
    composite::{OffsetParams, over_in_place, over_in_place_offset},
    config::{RenderConfig, ShadowStyle, TextBlockStyle},
    error::{ThumbforgeError, ThumbforgeResult},
    fonts::{FontLibrary, GlyphBrush, ShapedLine},
    layout::{FittedBlock, fit_text, stack_blocks},
    presets::{CANVAS_HEIGHT, CANVAS_WIDTH},
    sources::{ImageLoader, PreparedImage},
    state::ThumbnailState,
};

/// Fixed-size drawing target: a premultiplied RGBA8 pixmap at
/// `1280x720 * dpr` device pixels. All drawing happens in logical 1280x720
/// coordinates with the dpr scale applied on top.
pub struct RenderSurface {
    pixmap: vello_cpu::Pixmap,
    device_width: u16,
    device_height: u16,
    dpr: f64,
}

impl RenderSurface {
    pub fn new(dpr: f64) -> ThumbforgeResult<Self> {
        if !dpr.is_finite() || dpr <= 0.0 {
            return Err(ThumbforgeError::validation("dpr must be finite and > 0"));
        }
        let dw = (f64::from(CANVAS_WIDTH) * dpr).round();
        let dh = (f64::from(CANVAS_HEIGHT) * dpr).round();
        if dw < 1.0 || dh < 1.0 {
            return Err(ThumbforgeError::validation("dpr leaves no device pixels"));
        }
        if dw > f64::from(u16::MAX) || dh > f64::from(u16::MAX) {
            return Err(ThumbforgeError::validation(
                "dpr exceeds the rasterizer's u16 surface limit",
            ));
        }

        let device_width = dw as u16;
        let device_height = dh as u16;
        Ok(Self {
            pixmap: vello_cpu::Pixmap::new(device_width, device_height),
            device_width,
            device_height,
            dpr,
        })
    }

    pub fn dpr(&self) -> f64 {
        self.dpr
    }

    /// Logical width, always [`CANVAS_WIDTH`].
    pub fn width(&self) -> u32 {
        CANVAS_WIDTH
    }

    /// Logical height, always [`CANVAS_HEIGHT`].
    pub fn height(&self) -> u32 {
        CANVAS_HEIGHT
    }

    pub fn device_width(&self) -> u32 {
        u32::from(self.device_width)
    }

    pub fn device_height(&self) -> u32 {
        u32::from(self.device_height)
    }

    /// Premultiplied RGBA8 pixels, row-major, `device_width * device_height`.
    pub fn data(&self) -> &[u8] {
        self.pixmap.data_as_u8_slice()
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        self.pixmap.data_as_u8_slice_mut()
    }

    pub fn clear(&mut self) {
        for px in self.data_mut().chunks_exact_mut(4) {
            px.copy_from_slice(&[0, 0, 0, 0]);
        }
    }
}

/// One laid-out line with its logical top-left position.
struct PlacedLine {
    shaped: ShapedLine,
    x: f64,
    y: f64,
}

/// Draws [`ThumbnailState`] values onto [`RenderSurface`]s.
///
/// Rendering is fully sequential: the background image (or gradient
/// fallback) lands before any text, and the logo is drawn last. Image load
/// failures degrade silently; only font and rasterizer problems surface as
/// errors.
pub struct ThumbnailRenderer {
    fonts: FontLibrary,
    config: RenderConfig,
}

impl ThumbnailRenderer {
    pub fn new(fonts: FontLibrary) -> Self {
        Self {
            fonts,
            config: RenderConfig::default(),
        }
    }

    pub fn with_config(fonts: FontLibrary, config: RenderConfig) -> ThumbforgeResult<Self> {
        config.validate()?;
        Ok(Self { fonts, config })
    }

    pub fn fonts_mut(&mut self) -> &mut FontLibrary {
        &mut self.fonts
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Compose `state` onto `surface`: clear, background, centered
    /// title/subtitle blocks with drop shadows, optional logo.
    ///
    /// Idempotent for a fixed state and loader: rendering twice produces
    /// byte-identical pixels.
    #[tracing::instrument(skip(self, surface, state, images))]
    pub fn render(
        &mut self,
        surface: &mut RenderSurface,
        state: &ThumbnailState,
        images: &mut dyn ImageLoader,
    ) -> ThumbforgeResult<()> {
        state.validate()?;

        let title_color = parse_css_color(&state.title_color)?;
        let subtitle_color = parse_css_color(&state.subtitle_color)?;
        let gradient_from = parse_css_color(&state.background_color1)?;
        let gradient_to = parse_css_color(&state.background_color2)?;

        surface.clear();

        // Background resolves before any text lands.
        let background = state
            .background_image
            .as_deref()
            .and_then(|uri| images.load(uri).ok());
        match background {
            Some(img) => draw_stretched_image(surface, &img)?,
            None => draw_gradient(surface, gradient_from, gradient_to),
        }

        let title = fit_block(
            &mut self.fonts,
            &state.title,
            &state.title_font,
            &self.config.title,
        )?;
        let subtitle = fit_block(
            &mut self.fonts,
            &state.subtitle,
            &state.subtitle_font,
            &self.config.subtitle,
        )?;

        let placed = stack_blocks(
            CANVAS_HEIGHT as f32,
            title.height(),
            subtitle.height(),
            self.config.block_spacing as f32,
        );

        let title_lines = place_block(
            &mut self.fonts,
            &title,
            &state.title_font,
            self.config.title.weight,
            title_color,
            placed.title_y,
        )?;
        let subtitle_lines = place_block(
            &mut self.fonts,
            &subtitle,
            &state.subtitle_font,
            self.config.subtitle.weight,
            subtitle_color,
            placed.subtitle_y,
        )?;

        draw_block_shadow(surface, &title_lines, &self.config.title_shadow)?;
        draw_block_fill(surface, &title_lines)?;
        draw_block_shadow(surface, &subtitle_lines, &self.config.subtitle_shadow)?;
        draw_block_fill(surface, &subtitle_lines)?;

        // Logo last, best-effort: a failed load simply leaves it out.
        if state.show_logo
            && let Some(uri) = &state.logo_image
            && let Ok(logo) = images.load(uri)
        {
            draw_logo(
                surface,
                &logo,
                self.config.logo_size,
                self.config.logo_padding,
            )?;
        }

        Ok(())
    }
}

fn fit_block(
    fonts: &mut FontLibrary,
    text: &str,
    family: &str,
    style: &TextBlockStyle,
) -> ThumbforgeResult<FittedBlock> {
    fit_text(
        fonts,
        text,
        family,
        style.weight,
        (style.max_width_frac * f64::from(CANVAS_WIDTH)) as f32,
        (style.max_height_frac * f64::from(CANVAS_HEIGHT)) as f32,
        style.initial_font_size,
        style.min_font_size,
    )
}

/// Shape each wrapped line and center it horizontally; `top_y` is the
/// block's logical top edge, lines advance by `fontSize * 1.1`.
fn place_block(
    fonts: &mut FontLibrary,
    block: &FittedBlock,
    family: &str,
    weight: u16,
    color: Rgba8,
    top_y: f32,
) -> ThumbforgeResult<Vec<PlacedLine>> {
    let brush = GlyphBrush {
        r: color.r,
        g: color.g,
        b: color.b,
        a: color.a,
    };

    let mut y = f64::from(top_y);
    let line_height = f64::from(block.line_height());
    let mut out = Vec::with_capacity(block.lines.len());
    for line in &block.lines {
        let shaped = fonts.shape_line(line, family, weight, block.font_size, brush)?;
        let x = (f64::from(CANVAS_WIDTH) - f64::from(shaped.width)) / 2.0;
        out.push(PlacedLine { shaped, x, y });
        y += line_height;
    }
    Ok(out)
}

/// Two-stop linear gradient from the top-left to the bottom-right corner,
/// written straight into the surface as the bottom layer.
fn draw_gradient(surface: &mut RenderSurface, from: Rgba8, to: Rgba8) {
    let w = surface.device_width() as usize;
    let h = surface.device_height() as usize;
    // Project each pixel center onto the (w, h) diagonal.
    let axis_x = w as f32;
    let axis_y = h as f32;
    let inv_len_sq = 1.0 / (axis_x * axis_x + axis_y * axis_y);

    let data = surface.data_mut();
    for y in 0..h {
        let row_t = (y as f32 + 0.5) * axis_y * inv_len_sq;
        for x in 0..w {
            let t = ((x as f32 + 0.5) * axis_x * inv_len_sq + row_t).clamp(0.0, 1.0);
            let px = from.lerp(to, t).premultiply();
            let idx = (y * w + x) * 4;
            data[idx..idx + 4].copy_from_slice(&px);
        }
    }
}

/// Stretch-draw an image to cover the full logical canvas.
fn draw_stretched_image(surface: &mut RenderSurface, img: &PreparedImage) -> ThumbforgeResult<()> {
    let paint = image_paint(img)?;
    let sx = f64::from(CANVAS_WIDTH) / f64::from(img.width);
    let sy = f64::from(CANVAS_HEIGHT) / f64::from(img.height);
    let transform = Affine::scale(surface.dpr()) * Affine::scale_non_uniform(sx, sy);

    render_pass(surface, 1.0, |ctx| {
        ctx.set_transform(to_cpu_affine(transform));
        ctx.set_paint(paint);
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(img.width),
            f64::from(img.height),
        ));
        Ok(())
    })
}

/// Fixed-size logo in the top-right corner, padded from both edges.
fn draw_logo(
    surface: &mut RenderSurface,
    img: &PreparedImage,
    size: f64,
    padding: f64,
) -> ThumbforgeResult<()> {
    let paint = image_paint(img)?;
    let x = f64::from(CANVAS_WIDTH) - size - padding;
    let transform = Affine::scale(surface.dpr())
        * Affine::translate((x, padding))
        * Affine::scale_non_uniform(size / f64::from(img.width), size / f64::from(img.height));

    render_pass(surface, 1.0, |ctx| {
        ctx.set_transform(to_cpu_affine(transform));
        ctx.set_paint(paint);
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(img.width),
            f64::from(img.height),
        ));
        Ok(())
    })
}

/// Render the block's glyphs in opaque black, blur per the shadow style, and
/// composite at the shadow offset and opacity.
fn draw_block_shadow(
    surface: &mut RenderSurface,
    lines: &[PlacedLine],
    shadow: &ShadowStyle,
) -> ThumbforgeResult<()> {
    if lines.is_empty() || shadow.opacity <= 0.0 {
        return Ok(());
    }

    let dpr = surface.dpr();
    let (w, h) = (surface.device_width, surface.device_height);
    let mut ctx = vello_cpu::RenderContext::new(w, h);
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    draw_lines(&mut ctx, lines, dpr, Some(Rgba8::BLACK));
    ctx.flush();
    let mut ink = vello_cpu::Pixmap::new(w, h);
    ctx.render_to_pixmap(&mut ink);

    let (radius, sigma) = shadow_blur_params(shadow.blur, dpr);
    let blurred = blur_rgba8_premul(
        ink.data_as_u8_slice(),
        surface.device_width(),
        surface.device_height(),
        radius,
        sigma,
    )?;

    over_in_place_offset(
        surface.data_mut(),
        &blurred,
        OffsetParams {
            width: u32::from(w),
            height: u32::from(h),
            dx: (shadow.offset.x * dpr).round() as i32,
            dy: (shadow.offset.y * dpr).round() as i32,
            opacity: shadow.opacity,
        },
    )
}

fn draw_block_fill(surface: &mut RenderSurface, lines: &[PlacedLine]) -> ThumbforgeResult<()> {
    if lines.is_empty() {
        return Ok(());
    }
    let dpr = surface.dpr();
    render_pass(surface, 1.0, |ctx| {
        draw_lines(ctx, lines, dpr, None);
        Ok(())
    })
}

/// Issue the glyph runs for every placed line. `override_color` replaces the
/// layout brush (used for the shadow ink).
fn draw_lines(
    ctx: &mut vello_cpu::RenderContext,
    lines: &[PlacedLine],
    dpr: f64,
    override_color: Option<Rgba8>,
) {
    for placed in lines {
        let transform = Affine::scale(dpr) * Affine::translate((placed.x, placed.y));
        ctx.set_transform(to_cpu_affine(transform));

        for line in placed.shaped.layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };

                let color = override_color.unwrap_or_else(|| {
                    let b = run.style().brush;
                    Rgba8::new(b.r, b.g, b.b, b.a)
                });
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    color.r, color.g, color.b, color.a,
                ));

                let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&placed.shaped.font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
    }
}

/// Run scene drawing into a scratch pixmap, then source-over the result onto
/// the surface.
fn render_pass<F>(surface: &mut RenderSurface, opacity: f32, build: F) -> ThumbforgeResult<()>
where
    F: FnOnce(&mut vello_cpu::RenderContext) -> ThumbforgeResult<()>,
{
    let (w, h) = (surface.device_width, surface.device_height);
    let mut ctx = vello_cpu::RenderContext::new(w, h);
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    build(&mut ctx)?;
    ctx.flush();

    let mut scratch = vello_cpu::Pixmap::new(w, h);
    ctx.render_to_pixmap(&mut scratch);
    over_in_place(surface.data_mut(), scratch.data_as_u8_slice(), opacity)
}

fn image_paint(img: &PreparedImage) -> ThumbforgeResult<vello_cpu::Image> {
    let pixmap = premul_bytes_to_pixmap(img.rgba8_premul.as_slice(), img.width, img.height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

fn premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> ThumbforgeResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| ThumbforgeError::render("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| ThumbforgeError::render("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(ThumbforgeError::render(
            "prepared image byte length mismatch",
        ));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

fn to_cpu_affine(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_rejects_bad_dpr() {
        assert!(RenderSurface::new(0.0).is_err());
        assert!(RenderSurface::new(-1.0).is_err());
        assert!(RenderSurface::new(f64::NAN).is_err());
        assert!(RenderSurface::new(100.0).is_err());
    }

    #[test]
    fn surface_scales_device_size_by_dpr() {
        let s = RenderSurface::new(1.0).unwrap();
        assert_eq!((s.device_width(), s.device_height()), (1280, 720));
        assert_eq!((s.width(), s.height()), (1280, 720));

        let s = RenderSurface::new(1.5).unwrap();
        assert_eq!((s.device_width(), s.device_height()), (1920, 1080));
    }

    #[test]
    fn gradient_interpolates_between_corners() {
        let mut s = RenderSurface::new(1.0).unwrap();
        let from = Rgba8::new(26, 26, 26, 255);
        let to = Rgba8::new(0, 0, 0, 255);
        draw_gradient(&mut s, from, to);

        let data = s.data();
        let w = s.device_width() as usize;
        let h = s.device_height() as usize;

        // Corners sit at the gradient extremes (within pixel-center rounding).
        assert!(data[0] >= 24 && data[0] <= 26);
        let last = (h - 1) * w * 4 + (w - 1) * 4;
        assert!(data[last] <= 2);
        assert_eq!(data[3], 255);
        assert_eq!(data[last + 3], 255);

        // The canvas center is the halfway color.
        let mid = (h / 2) * w * 4 + (w / 2) * 4;
        assert!((i16::from(data[mid]) - 13).abs() <= 1);
    }

    #[test]
    fn clear_resets_every_pixel() {
        let mut s = RenderSurface::new(1.0).unwrap();
        draw_gradient(&mut s, Rgba8::WHITE, Rgba8::WHITE);
        assert!(s.data().iter().any(|&b| b != 0));
        s.clear();
        assert!(s.data().iter().all(|&b| b == 0));
    }
}
