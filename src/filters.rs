//! Whole-image filters offered next to the background remover.
//!
//! Blur and sharpen run on the grayscale version of the photo through
//! [`convolve`] and are expanded back to three channels, so their output
//! can be displayed and saved like any other RGB result.

use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::color::{gray_to_rgb, rgb_to_hsv, round_u8, to_gray};
use crate::convolution::{convolve, Kernel};
use crate::error::Result;

/// Kernel sizes offered for the box blur.
pub const BLUR_KERNEL_SIZES: [usize; 6] = [3, 5, 7, 9, 11, 15];

/// Canny thresholds used by the edge filter.
pub const EDGE_CANNY_THRESHOLDS: (f32, f32) = (100.0, 200.0);

/// HSV upper bound of the simple threshold remover; pixels at or below it are background.
const HSV_BACKGROUND_MAX: [u8; 3] = [180, 255, 200];

/// Per-channel (R, G, B) 256-bin intensity counts.
pub type Histogram = [[u32; 256]; 3];

/// Box-blur the grayscale version of `image` with a `k x k` average.
///
/// # Errors
///
/// Returns an error if `k` is even or zero, or the image is empty.
pub fn box_blur(image: &RgbImage, k: usize) -> Result<RgbImage> {
    let gray = to_gray(image);
    let blurred = convolve(&gray, &Kernel::box_blur(k)?)?;
    Ok(gray_to_rgb(&blurred))
}

/// Sharpen the grayscale version of `image` with the fixed 3x3 stencil.
///
/// # Errors
///
/// Returns an error if the image is empty.
pub fn sharpen(image: &RgbImage) -> Result<RgbImage> {
    let gray = to_gray(image);
    let sharpened = convolve(&gray, &Kernel::sharpen())?;
    Ok(gray_to_rgb(&sharpened))
}

/// Grayscale rendition of `image`, kept as three channels.
#[must_use]
pub fn grayscale(image: &RgbImage) -> RgbImage {
    gray_to_rgb(&to_gray(image))
}

/// Sobel gradient magnitude, saturated to 255.
#[must_use]
pub fn sobel_edges(image: &RgbImage) -> RgbImage {
    let gradients = imageproc::gradients::sobel_gradients(&to_gray(image));
    let magnitude = GrayImage::from_fn(image.width(), image.height(), |x, y| {
        #[allow(clippy::cast_possible_truncation)]
        Luma([gradients.get_pixel(x, y)[0].min(255) as u8])
    });
    gray_to_rgb(&magnitude)
}

/// Binary Canny edge map (edges are 255).
#[must_use]
pub fn canny_edges(image: &RgbImage, low: f32, high: f32) -> RgbImage {
    gray_to_rgb(&imageproc::edges::canny(&to_gray(image), low, high))
}

/// Linear remap `out = clamp(alpha * in + beta)` with
/// `alpha = 1 + contrast / 100` and `beta = brightness`.
#[must_use]
pub fn adjust_brightness_contrast(image: &RgbImage, brightness: f32, contrast: f32) -> RgbImage {
    let alpha = 1.0 + contrast / 100.0;
    let mut out = image.clone();
    for v in out.iter_mut() {
        *v = round_u8(alpha * f32::from(*v) + brightness);
    }
    out
}

/// Count intensities per channel.
#[must_use]
pub fn histogram(image: &RgbImage) -> Histogram {
    let mut bins = [[0u32; 256]; 3];
    for px in image.pixels() {
        for (c, channel) in bins.iter_mut().enumerate() {
            channel[usize::from(px[c])] += 1;
        }
    }
    bins
}

/// Keep only bright pixels: anything whose HSV value is within
/// `[0, 0, 0]..=[180, 255, 200]` is treated as background and blacked out.
#[must_use]
pub fn hsv_threshold_removal(image: &RgbImage) -> RgbImage {
    let mut out = image.clone();
    for px in out.pixels_mut() {
        let hsv = rgb_to_hsv(*px);
        let background = hsv.iter().zip(HSV_BACKGROUND_MAX).all(|(&v, max)| v <= max);
        if background {
            *px = Rgb([0, 0, 0]);
        }
    }
    out
}
