//! Color-space conversions shared by the filters and the segmentation engine.
//!
//! All conversions produce 8-bit channels in the ranges the heuristics were
//! tuned against: luma in `[0, 255]`, hue in `[0, 180)`, saturation and value
//! in `[0, 255]`, and CIE L* lightness rescaled from `[0, 100]` to `[0, 255]`.

use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::error::{Error, Result};

/// BT.601 luma of an RGB triple, unrounded.
#[inline]
#[must_use]
pub fn luma(px: Rgb<u8>) -> f32 {
    0.299 * f32::from(px[0]) + 0.587 * f32::from(px[1]) + 0.114 * f32::from(px[2])
}

/// Convert an RGB image to single-channel BT.601 grayscale.
#[must_use]
pub fn to_gray(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([round_u8(luma(*image.get_pixel(x, y)))])
    })
}

/// Expand a grayscale image back to three identical RGB channels.
#[must_use]
pub fn gray_to_rgb(gray: &GrayImage) -> RgbImage {
    RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y)[0];
        Rgb([v, v, v])
    })
}

/// Convert one RGB pixel to 8-bit HSV (`h` in `[0, 180)`).
#[must_use]
pub fn rgb_to_hsv(px: Rgb<u8>) -> [u8; 3] {
    let r = f32::from(px[0]);
    let g = f32::from(px[1]);
    let b = f32::from(px[2]);
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = v - min;

    let s = if v > 0.0 { diff * 255.0 / v } else { 0.0 };

    let mut h = if diff == 0.0 {
        0.0
    } else if (v - r).abs() < f32::EPSILON {
        60.0 * (g - b) / diff
    } else if (v - g).abs() < f32::EPSILON {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }

    // 360 degrees folded into 180 so the hue fits a byte
    let h = round_u8(h / 2.0).min(179);
    [h, round_u8(s), round_u8(v)]
}

/// Convert every pixel of an RGB image to HSV, in row-major order.
#[must_use]
pub fn hsv_pixels(image: &RgbImage) -> Vec<[u8; 3]> {
    image.pixels().map(|px| rgb_to_hsv(*px)).collect()
}

/// CIE L* lightness of an sRGB pixel, rescaled to `[0, 255]`.
#[must_use]
pub fn lightness(px: Rgb<u8>) -> u8 {
    let lin = |c: u8| {
        let c = f32::from(c) / 255.0;
        if c <= 0.040_45 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    let y = 0.212_671 * lin(px[0]) + 0.715_160 * lin(px[1]) + 0.072_169 * lin(px[2]);
    let l = if y > 0.008_856 {
        116.0 * y.cbrt() - 16.0
    } else {
        903.3 * y
    };
    round_u8(l * 255.0 / 100.0)
}

/// Lightness channel of an RGB image.
#[must_use]
pub fn lightness_channel(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([lightness(*image.get_pixel(x, y))])
    })
}

/// Named backdrop colors offered for solid-color replacement.
pub const NAMED_COLORS: [(&str, Rgb<u8>); 6] = [
    ("white", Rgb([255, 255, 255])),
    ("red", Rgb([255, 0, 0])),
    ("blue", Rgb([0, 0, 255])),
    ("yellow", Rgb([255, 255, 0])),
    ("green", Rgb([0, 255, 0])),
    ("brown", Rgb([150, 75, 0])),
];

/// Parse a color given as `#rrggbb`, `r,g,b` or one of [`NAMED_COLORS`].
///
/// # Errors
///
/// Returns [`Error::InvalidColor`] when the text matches none of the forms.
pub fn parse_color(text: &str) -> Result<Rgb<u8>> {
    let s = text.trim();
    let invalid = || Error::InvalidColor(text.to_string());

    if let Some(hex) = s.strip_prefix('#') {
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        return Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]));
    }

    if s.contains(',') {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<u8>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>>>()?;
        return match parts.as_slice() {
            [r, g, b] => Ok(Rgb([*r, *g, *b])),
            _ => Err(invalid()),
        };
    }

    NAMED_COLORS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(s))
        .map(|(_, rgb)| *rgb)
        .ok_or_else(invalid)
}

/// Round and saturate a float sample into a byte.
#[inline]
#[must_use]
pub fn round_u8(v: f32) -> u8 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        v.round().clamp(0.0, 255.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luma_of_primaries_matches_bt601_weights() {
        assert!((luma(Rgb([255, 0, 0])) - 76.245).abs() < 1e-3);
        assert!((luma(Rgb([0, 255, 0])) - 149.685).abs() < 1e-3);
        assert!((luma(Rgb([0, 0, 255])) - 29.07).abs() < 1e-3);
        assert!((luma(Rgb([200, 200, 200])) - 200.0).abs() < 1e-3);
    }

    #[test]
    fn to_gray_preserves_dimensions_and_neutral_values() {
        let img = RgbImage::from_pixel(7, 3, Rgb([90, 90, 90]));
        let gray = to_gray(&img);
        assert_eq!(gray.dimensions(), (7, 3));
        assert!(gray.pixels().all(|p| p[0] == 90));
        assert_eq!(gray_to_rgb(&gray), img);
    }

    #[test]
    fn hsv_of_primaries() {
        assert_eq!(rgb_to_hsv(Rgb([255, 0, 0])), [0, 255, 255]);
        assert_eq!(rgb_to_hsv(Rgb([0, 255, 0])), [60, 255, 255]);
        assert_eq!(rgb_to_hsv(Rgb([0, 0, 255])), [120, 255, 255]);
        assert_eq!(rgb_to_hsv(Rgb([255, 255, 0])), [30, 255, 255]);
    }

    #[test]
    fn hsv_of_grays_has_no_hue_or_saturation() {
        assert_eq!(rgb_to_hsv(Rgb([0, 0, 0])), [0, 0, 0]);
        assert_eq!(rgb_to_hsv(Rgb([128, 128, 128])), [0, 0, 128]);
        assert_eq!(rgb_to_hsv(Rgb([255, 255, 255])), [0, 0, 255]);
    }

    #[test]
    fn hue_stays_below_180() {
        // magenta-ish reds wrap close to 360 degrees
        let [h, _, _] = rgb_to_hsv(Rgb([255, 0, 1]));
        assert!(h < 180, "hue {h} out of range");
    }

    #[test]
    fn lightness_endpoints_and_monotonicity() {
        assert_eq!(lightness(Rgb([0, 0, 0])), 0);
        assert_eq!(lightness(Rgb([255, 255, 255])), 255);
        let mut prev = 0;
        for v in (0..=255u8).step_by(5) {
            let l = lightness(Rgb([v, v, v]));
            assert!(l >= prev, "lightness must not decrease ({v}: {l} < {prev})");
            prev = l;
        }
    }

    #[test]
    fn round_u8_saturates() {
        assert_eq!(round_u8(-3.0), 0);
        assert_eq!(round_u8(254.6), 255);
        assert_eq!(round_u8(300.0), 255);
        assert_eq!(round_u8(49.5), 50);
    }

    #[test]
    fn colors_parse_from_hex_triples_and_names() {
        assert_eq!(parse_color("#ff8000").unwrap(), Rgb([255, 128, 0]));
        assert_eq!(parse_color(" 10, 20 ,30 ").unwrap(), Rgb([10, 20, 30]));
        assert_eq!(parse_color("Brown").unwrap(), Rgb([150, 75, 0]));
        assert_eq!(parse_color("white").unwrap(), Rgb([255, 255, 255]));
        for bad in ["#fff", "#gg0000", "1,2", "1,2,300", "mauve", ""] {
            assert!(matches!(parse_color(bad), Err(Error::InvalidColor(_))), "{bad}");
        }
    }
}
