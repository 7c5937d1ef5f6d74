use crate::error::{ThumbforgeError, ThumbforgeResult};

pub type PremulRgba8 = [u8; 4];

/// Source-over in premultiplied space, with an extra scalar opacity on `src`.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = add_sat_u8(sa, mul_div255(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), op);
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = add_sat_u8(sc, dc);
    }
    out
}

pub fn over_in_place(dst: &mut [u8], src: &[u8], opacity: f32) -> ThumbforgeResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(ThumbforgeError::render(
            "over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Parameters for [`over_in_place_offset`]: same-size buffers, `src`
/// translated by `(dx, dy)` device pixels before compositing.
#[derive(Clone, Copy, Debug)]
pub struct OffsetParams {
    pub width: u32,
    pub height: u32,
    pub dx: i32,
    pub dy: i32,
    pub opacity: f32,
}

/// Composite `src` over `dst` shifted by an integer offset; pixels pushed
/// outside the canvas are clipped.
pub fn over_in_place_offset(
    dst: &mut [u8],
    src: &[u8],
    params: OffsetParams,
) -> ThumbforgeResult<()> {
    let expected = (params.width as usize)
        .checked_mul(params.height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| ThumbforgeError::render("offset composite buffer size overflow"))?;
    if dst.len() != expected || src.len() != expected {
        return Err(ThumbforgeError::render(
            "over_in_place_offset expects width*height*4 rgba8 buffers",
        ));
    }
    if params.dx == 0 && params.dy == 0 {
        return over_in_place(dst, src, params.opacity);
    }

    let w = params.width as i64;
    let h = params.height as i64;
    for sy in 0..h {
        let ty = sy + i64::from(params.dy);
        if ty < 0 || ty >= h {
            continue;
        }
        for sx in 0..w {
            let tx = sx + i64::from(params.dx);
            if tx < 0 || tx >= w {
                continue;
            }
            let si = ((sy * w + sx) as usize) * 4;
            let di = ((ty * w + tx) as usize) * 4;
            let out = over(
                [dst[di], dst[di + 1], dst[di + 2], dst[di + 3]],
                [src[si], src[si + 1], src[si + 2], src[si + 3]],
                params.opacity,
            );
            dst[di..di + 4].copy_from_slice(&out);
        }
    }
    Ok(())
}

/// Convert straight-alpha RGBA8 to premultiplied, in place.
pub fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

/// Convert premultiplied RGBA8 back to straight alpha, in place.
pub fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u32;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u32 * 255 + a / 2) / a).min(255) as u8;
        px[1] = ((px[1] as u32 * 255 + a / 2) / a).min(255) as u8;
        px[2] = ((px[2] as u32 * 255 + a / 2) / a).min(255) as u8;
    }
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}
