//! Turning an opacity mask into the requested output image.
//!
//! All blends use the forward alpha-blending equation
//! `out = alpha * subject + (1 - alpha) * backdrop`.

use image::{Rgb, RgbImage, Rgba, RgbaImage};

use crate::color::round_u8;
use crate::convolution::gaussian_blur_rgb;

use super::refine::Mask;

/// Attach the mask as an alpha channel; color channels are copied verbatim.
#[must_use]
pub fn with_alpha(image: &RgbImage, mask: &Mask) -> RgbaImage {
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        Rgba([r, g, b, round_u8(mask.get(x, y) * 255.0)])
    })
}

/// Blend the subject over a flat color.
#[must_use]
pub fn over_solid(image: &RgbImage, mask: &Mask, color: Rgb<u8>) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        blend(*image.get_pixel(x, y), color, mask.get(x, y))
    })
}

/// Blend the subject over a Gaussian-blurred copy of the whole frame.
#[must_use]
pub fn over_blurred(image: &RgbImage, mask: &Mask, ksize: usize) -> RgbImage {
    let backdrop = gaussian_blur_rgb(image, ksize);
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        blend(*image.get_pixel(x, y), *backdrop.get_pixel(x, y), mask.get(x, y))
    })
}

fn blend(subject: Rgb<u8>, backdrop: Rgb<u8>, alpha: f32) -> Rgb<u8> {
    let inv_alpha = 1.0 - alpha;
    let mix = |c: usize| round_u8(alpha * f32::from(subject[c]) + inv_alpha * f32::from(backdrop[c]));
    Rgb([mix(0), mix(1), mix(2)])
}
