//! Encoding results to bytes or files, and output path helpers.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};

use crate::error::{Error, Result};

/// JPEG quality used for every lossy output.
pub const JPEG_QUALITY: u8 = 95;

/// Whether `path` has an extension this crate reads and writes.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

/// Open and decode an image, rejecting unsupported extensions before reading.
///
/// # Errors
///
/// - [`Error::UnsupportedFormat`] when [`is_supported_image`] rejects the path.
/// - [`Error::Io`] if the file does not exist or cannot be read.
/// - [`Error::Image`] if decoding fails.
pub fn open_image(path: &Path) -> Result<DynamicImage> {
    if !is_supported_image(path) {
        return Err(Error::UnsupportedFormat(path.display().to_string()));
    }
    if !path.exists() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input path does not exist: {}", path.display()),
        )));
    }
    Ok(image::open(path)?)
}

/// Normalize an image to what `format` can store.
///
/// PNG keeps an alpha channel. Every other format gets plain RGB: alpha is
/// dropped (not composited) and grayscale is expanded.
fn prepare_for(image: &DynamicImage, format: ImageFormat) -> DynamicImage {
    let has_alpha = image.color().has_alpha();
    match format {
        ImageFormat::Png if has_alpha => DynamicImage::ImageRgba8(image.to_rgba8()),
        _ => DynamicImage::ImageRgb8(image.to_rgb8()),
    }
}

/// Encode an image into an in-memory PNG or JPEG.
///
/// # Errors
///
/// - [`Error::UnsupportedFormat`] for formats other than PNG and JPEG.
/// - [`Error::Image`] if the encoder fails.
pub fn encode_image(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let prepared = prepare_for(image, format);
    let mut buf = Cursor::new(Vec::new());
    match format {
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
            prepared.write_with_encoder(encoder)?;
        }
        ImageFormat::Png => prepared.write_to(&mut buf, ImageFormat::Png)?,
        other => return Err(Error::UnsupportedFormat(format!("{other:?}"))),
    }
    tracing::trace!(?format, bytes = buf.get_ref().len(), "encoded image");
    Ok(buf.into_inner())
}

/// Save an image, choosing the format from the path extension.
///
/// # Errors
///
/// Returns an error if the format is unsupported or writing fails.
pub fn save_image(image: &DynamicImage, path: &Path) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

    match format {
        ImageFormat::Jpeg | ImageFormat::Png => {
            std::fs::write(path, encode_image(image, format)?)?;
        }
        ImageFormat::WebP | ImageFormat::Bmp => {
            prepare_for(image, format).save(path)?;
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!("{format:?}")));
        }
    }

    Ok(())
}

/// Generate a default output path from an input path.
///
/// Example: `("photo.jpg", "rotate")` becomes `"photo_rotate.jpg"`.
#[must_use]
pub fn default_output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let ext = input.extension().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_{suffix}.{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgba, RgbaImage};

    #[test]
    fn default_output_path_appends_suffix() {
        let p = default_output_path(Path::new("/tmp/photo.jpg"), "blur");
        assert_eq!(p, PathBuf::from("/tmp/photo_blur.jpg"));

        let p = default_output_path(Path::new("image.png"), "nobg");
        assert_eq!(p.file_name().unwrap().to_str().unwrap(), "image_nobg.png");
    }

    #[test]
    fn is_supported_image_accepts_common_formats() {
        assert!(is_supported_image(Path::new("photo.jpg")));
        assert!(is_supported_image(Path::new("photo.JPEG")));
        assert!(is_supported_image(Path::new("photo.png")));
        assert!(is_supported_image(Path::new("photo.webp")));
        assert!(is_supported_image(Path::new("photo.bmp")));
    }

    #[test]
    fn is_supported_image_rejects_unsupported_formats() {
        assert!(!is_supported_image(Path::new("photo.gif")));
        assert!(!is_supported_image(Path::new("photo.txt")));
        assert!(!is_supported_image(Path::new("photo")));
    }

    #[test]
    fn open_image_gates_on_extension_then_existence() {
        assert!(matches!(
            open_image(Path::new("notes.txt")),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(matches!(
            open_image(Path::new("/nonexistent/photolab/missing.png")),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn png_round_trip_keeps_alpha() {
        let rgba = RgbaImage::from_fn(6, 4, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            Rgba([x as u8 * 40, y as u8 * 60, 7, if x < 3 { 255 } else { 0 }])
        });
        let bytes = encode_image(&DynamicImage::ImageRgba8(rgba.clone()), ImageFormat::Png).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.color().channel_count(), 4);
        assert_eq!(decoded.to_rgba8(), rgba);
    }

    #[test]
    fn jpeg_drops_alpha_and_promotes_gray() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([200, 10, 10, 0])));
        let decoded = image::load_from_memory(&encode_image(&rgba, ImageFormat::Jpeg).unwrap()).unwrap();
        assert_eq!(decoded.color().channel_count(), 3);
        assert_eq!((decoded.width(), decoded.height()), (16, 16));
        let px = decoded.to_rgb8().get_pixel(8, 8).0;
        assert!(px[0] > 150, "alpha must be dropped, not composited: {px:?}");

        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([90])));
        let png = image::load_from_memory(&encode_image(&gray, ImageFormat::Png).unwrap()).unwrap();
        assert_eq!(png.color().channel_count(), 3);
    }

    #[test]
    fn unsupported_encode_format_is_rejected() {
        let img = DynamicImage::new_rgb8(2, 2);
        assert!(matches!(
            encode_image(&img, ImageFormat::Gif),
            Err(Error::UnsupportedFormat(_))
        ));
    }
}
