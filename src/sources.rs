use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use base64::Engine as _;

use crate::{
    composite::premultiply_rgba8_in_place,
    error::{ThumbforgeError, ThumbforgeResult},
};

/// Decoded sources are capped at this many pixels per side; larger inputs
/// are scaled down proportionally.
const MAX_IMAGE_DIM: u32 = 4096;

/// Decoded raster image in row-major premultiplied RGBA8.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes, `width * height * 4` long.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Image-loading facility the renderer depends on.
///
/// URIs are opaque at this seam; the renderer only branches on
/// success/failure and treats failures as "draw without this image".
pub trait ImageLoader {
    fn load(&mut self, uri: &str) -> ThumbforgeResult<PreparedImage>;
}

/// Loader that resolves `data:` URIs inline and everything else as a path
/// relative to a root directory (typically the state file's directory).
///
/// Bitmap formats go through `image`; SVG documents are rasterized at their
/// intrinsic size. Absolute paths and `..` traversals are rejected so state
/// files stay portable.
pub struct FsImageLoader {
    root: PathBuf,
}

impl FsImageLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ImageLoader for FsImageLoader {
    #[tracing::instrument(skip(self, uri))]
    fn load(&mut self, uri: &str) -> ThumbforgeResult<PreparedImage> {
        if let Some(rest) = uri.strip_prefix("data:") {
            return decode_data_uri(rest);
        }

        let norm = normalize_rel_path(uri)?;
        let path = self.root.join(Path::new(&norm));
        let bytes = std::fs::read(&path)
            .with_context(|| format!("read image bytes from '{}'", path.display()))
            .map_err(ThumbforgeError::from)?;

        let is_svg_ext = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
        if is_svg_ext || sniff_svg(&bytes) {
            decode_svg(&bytes)
        } else {
            decode_image(&bytes)
        }
    }
}

/// Decode encoded bitmap bytes and convert to premultiplied RGBA8.
///
/// Bitmaps wider or taller than the per-side cap are downscaled
/// proportionally before conversion.
pub fn decode_image(bytes: &[u8]) -> ThumbforgeResult<PreparedImage> {
    let mut dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    if dyn_img.width() > MAX_IMAGE_DIM || dyn_img.height() > MAX_IMAGE_DIM {
        dyn_img = dyn_img.resize(
            MAX_IMAGE_DIM,
            MAX_IMAGE_DIM,
            image::imageops::FilterType::Triangle,
        );
    }
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// Parse SVG bytes and rasterize at intrinsic size (capped so pathological
/// documents cannot balloon memory; the renderer rescales to fit anyway).
pub fn decode_svg(bytes: &[u8]) -> ThumbforgeResult<PreparedImage> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts).context("parse svg tree")?;

    let size = tree.size();
    if !size.width().is_finite()
        || !size.height().is_finite()
        || size.width() <= 0.0
        || size.height() <= 0.0
    {
        return Err(ThumbforgeError::render("svg has invalid width/height"));
    }

    let scale = (MAX_IMAGE_DIM as f32 / size.width().max(size.height())).min(1.0);
    let width = ((size.width() * scale).ceil() as u32).max(1);
    let height = ((size.height() * scale).ceil() as u32).max(1);

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| ThumbforgeError::render("failed to allocate svg pixmap"))?;
    let sx = (width as f32) / size.width();
    let sy = (height as f32) / size.height();
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(sx, sy),
        &mut pixmap.as_mut(),
    );

    // tiny-skia pixmaps are already premultiplied RGBA8.
    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(pixmap.data().to_vec()),
    })
}

fn decode_data_uri(rest: &str) -> ThumbforgeResult<PreparedImage> {
    let (meta, payload) = rest.split_once(',').ok_or_else(|| {
        ThumbforgeError::validation("data: URI must contain a ',' separating metadata and payload")
    })?;

    let bytes = if meta.ends_with(";base64") {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(compact.as_bytes())
            .context("decode base64 data: URI payload")?
    } else {
        percent_decode(payload)?
    };

    if meta.starts_with("image/svg") || sniff_svg(&bytes) {
        decode_svg(&bytes)
    } else {
        decode_image(&bytes)
    }
}

fn percent_decode(payload: &str) -> ThumbforgeResult<Vec<u8>> {
    let src = payload.as_bytes();
    let mut out = Vec::with_capacity(src.len());
    let mut i = 0;
    while i < src.len() {
        let b = src[i];
        if b == b'%' {
            let pair = src.get(i + 1..i + 3).ok_or_else(|| {
                ThumbforgeError::validation("truncated percent escape in data: URI")
            })?;
            let hex = std::str::from_utf8(pair)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| {
                    ThumbforgeError::validation("invalid percent escape in data: URI")
                })?;
            out.push(hex);
            i += 3;
        } else {
            out.push(b);
            i += 1;
        }
    }
    Ok(out)
}

fn sniff_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let Ok(text) = std::str::from_utf8(head) else {
        return false;
    };
    let trimmed = text.trim_start_matches('\u{feff}').trim_start();
    trimmed.starts_with("<svg") || (trimmed.starts_with("<?xml") && text.contains("<svg"))
}

/// Normalize and validate loader-relative image paths.
///
/// The normalized result uses `/` separators, removes `.` segments, and
/// rejects absolute paths or parent traversals (`..`).
pub fn normalize_rel_path(source: &str) -> ThumbforgeResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(ThumbforgeError::validation("image paths must be relative"));
    }
    if s.is_empty() {
        return Err(ThumbforgeError::validation("image path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(ThumbforgeError::validation(
                "image paths must not contain '..'",
            ));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(ThumbforgeError::validation(
            "image path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_data_uri(width: u32, height: u32, rgba: [u8; 4]) -> String {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&bytes)
        )
    }

    #[test]
    fn loads_base64_png_data_uri() {
        let mut loader = FsImageLoader::new(".");
        let img = loader.load(&png_data_uri(2, 1, [255, 0, 0, 255])).unwrap();
        assert_eq!((img.width, img.height), (2, 1));
        assert_eq!(&img.rgba8_premul[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn premultiplies_translucent_bitmap_pixels() {
        let mut loader = FsImageLoader::new(".");
        let img = loader.load(&png_data_uri(1, 1, [200, 100, 50, 128])).unwrap();
        let px = &img.rgba8_premul[0..4];
        assert_eq!(px[3], 128);
        assert!((i16::from(px[0]) - 100).abs() <= 1);
    }

    #[test]
    fn oversized_bitmap_is_downscaled() {
        let mut loader = FsImageLoader::new(".");
        let img = loader.load(&png_data_uri(5000, 1, [255, 0, 0, 255])).unwrap();
        assert_eq!((img.width, img.height), (MAX_IMAGE_DIM, 1));
        assert_eq!(&img.rgba8_premul[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn loads_plain_svg_data_uri() {
        let uri = "data:image/svg+xml,<svg xmlns='http://www.w3.org/2000/svg' \
                   width='4' height='2'><rect width='4' height='2' fill='%23ff0000'/></svg>";
        let mut loader = FsImageLoader::new(".");
        let img = loader.load(uri).unwrap();
        assert_eq!((img.width, img.height), (4, 2));
        assert_eq!(&img.rgba8_premul[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn rejects_escaping_and_absolute_paths() {
        assert!(normalize_rel_path("../secret.png").is_err());
        assert!(normalize_rel_path("/etc/image.png").is_err());
        assert!(normalize_rel_path("").is_err());
        assert_eq!(normalize_rel_path("a/./b.png").unwrap(), "a/b.png");
    }

    #[test]
    fn missing_file_is_an_error() {
        let mut loader = FsImageLoader::new("target");
        assert!(loader.load("does-not-exist.png").is_err());
    }

    #[test]
    fn garbage_payload_is_an_error() {
        let mut loader = FsImageLoader::new(".");
        let uri = format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(b"not an image")
        );
        assert!(loader.load(&uri).is_err());
    }
}
