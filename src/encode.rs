use anyhow::Context;
use image::ImageEncoder;

use crate::{
    composite::unpremultiply_rgba8_in_place, error::ThumbforgeResult, render::RenderSurface,
};

/// Quality used for JPEG exports, on the encoder's 1-100 scale.
pub const JPEG_EXPORT_QUALITY: u8 = 95;

/// Encode the surface as JPEG bytes at [`JPEG_EXPORT_QUALITY`].
///
/// JPEG carries no alpha, so pixels are flattened over black. For
/// premultiplied data that is exactly the RGB channels as stored.
pub fn encode_jpeg(surface: &RenderSurface) -> ThumbforgeResult<Vec<u8>> {
    let data = surface.data();
    let mut rgb = Vec::with_capacity(data.len() / 4 * 3);
    for px in data.chunks_exact(4) {
        rgb.extend_from_slice(&px[..3]);
    }

    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, JPEG_EXPORT_QUALITY)
        .write_image(
            &rgb,
            surface.device_width(),
            surface.device_height(),
            image::ExtendedColorType::Rgb8,
        )
        .context("encode jpeg")?;
    Ok(out)
}

/// Encode the surface as PNG bytes with straight (unpremultiplied) alpha.
pub fn encode_png(surface: &RenderSurface) -> ThumbforgeResult<Vec<u8>> {
    let mut rgba = surface.data().to_vec();
    unpremultiply_rgba8_in_place(&mut rgba);

    let mut out = Vec::new();
    image::codecs::png::PngEncoder::new(&mut out)
        .write_image(
            &rgba,
            surface.device_width(),
            surface.device_height(),
            image::ExtendedColorType::Rgba8,
        )
        .context("encode png")?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_surface(premul_px: [u8; 4]) -> RenderSurface {
        let mut s = RenderSurface::new(0.1).unwrap();
        for px in s.data_mut().chunks_exact_mut(4) {
            px.copy_from_slice(&premul_px);
        }
        s
    }

    #[test]
    fn jpeg_has_magic_and_flattens_over_black() {
        let s = filled_surface([128, 0, 0, 128]);
        let bytes = encode_jpeg(&s).unwrap();
        assert_eq!(&bytes[..3], &[0xFF, 0xD8, 0xFF]);

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (s.device_width(), s.device_height()));
        let px = decoded.get_pixel(decoded.width() / 2, decoded.height() / 2);
        // Solid fills survive lossy compression within a small tolerance.
        assert!((i16::from(px[0]) - 128).abs() <= 3, "r = {}", px[0]);
        assert!(px[1] <= 3 && px[2] <= 3);
    }

    #[test]
    fn png_round_trips_straight_alpha() {
        let s = filled_surface([128, 0, 0, 128]);
        let bytes = encode_png(&s).unwrap();
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (s.device_width(), s.device_height()));
        let px = decoded.get_pixel(1, 1);
        assert_eq!(px[0], 255);
        assert_eq!(px[3], 128);
    }

    #[test]
    fn cleared_surface_exports_transparent_png() {
        let mut s = RenderSurface::new(0.1).unwrap();
        s.clear();
        let bytes = encode_png(&s).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert!(decoded.pixels().all(|p| p[3] == 0));
    }
}
