//! Backdrop statistics and the per-scene foreground guesses.
//!
//! Every strategy assumes the subject does not touch the frame, so the band
//! of pixels along the four edges is a sample of pure backdrop.

use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::morphology::{close, dilate, open};

use crate::color::{hsv_pixels, lightness_channel, round_u8, to_gray};
use crate::convolution::gaussian_blur_gray;

use super::prior::SubjectPrior;
use super::{Scene, SegmentationParams};

/// Thickness of the border band for a `width x height` image.
#[must_use]
pub fn border_thickness(width: u32, height: u32, params: &SegmentationParams) -> u32 {
    params
        .border_min_thickness
        .max(width.min(height) / params.border_divisor.max(1))
}

/// Whether `(x, y)` lies within `t` pixels of any edge.
#[inline]
fn in_band(x: u32, y: u32, width: u32, height: u32, t: u32) -> bool {
    x < t || y < t || x + t >= width || y + t >= height
}

/// Collect the values of a row-major plane that fall in the border band.
fn band_values<T: Copy>(plane: &[T], width: u32, height: u32, t: u32) -> Vec<T> {
    plane
        .iter()
        .enumerate()
        .filter(|(i, _)| {
            #[allow(clippy::cast_possible_truncation)]
            let i = *i as u32;
            in_band(i % width, i / width, width, height, t)
        })
        .map(|(_, v)| *v)
        .collect()
}

/// Median with the two middle values averaged for even counts.
fn median(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f32::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Population standard deviation.
fn stddev(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = data.len() as f32;
    let mean = data.iter().sum::<f32>() / n;
    let variance = data.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    variance.sqrt()
}

/// `q`-th percentile (0..=100) with linear interpolation between ranks.
fn percentile(values: &[f32], q: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);
    #[allow(clippy::cast_precision_loss)]
    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    #[allow(clippy::cast_precision_loss)]
    let frac = rank - lo as f32;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Standard deviation of lightness across the border band.
#[must_use]
pub fn border_lightness_stddev(image: &RgbImage, params: &SegmentationParams) -> f32 {
    let (w, h) = image.dimensions();
    let l = lightness_channel(image);
    let plane: Vec<f32> = l.as_raw().iter().map(|&v| f32::from(v)).collect();
    stddev(&band_values(&plane, w, h, border_thickness(w, h, params)))
}

/// Pick a concrete scene from how uneven the border lightness is.
///
/// Returns the measured standard deviation alongside the choice.
#[must_use]
pub fn classify(image: &RgbImage, params: &SegmentationParams) -> (Scene, f32) {
    let std = border_lightness_stddev(image, params);
    let scene = if std < params.auto_solid_max_std {
        Scene::Solid
    } else if std < params.auto_gradient_max_std {
        Scene::Gradient
    } else {
        Scene::Textured
    };
    (scene, std)
}

/// Binary (0/255) foreground guess for a concrete scene.
#[must_use]
pub fn raw_mask(
    image: &RgbImage,
    scene: Scene,
    params: &SegmentationParams,
    prior: &dyn SubjectPrior,
) -> GrayImage {
    match scene {
        Scene::Solid => color_distance_mask(image, params.solid_percentile, params),
        Scene::Minimalist => color_distance_mask(image, params.minimalist_percentile, params),
        Scene::Gradient => gradient_mask(image, params),
        Scene::Textured => textured_mask(image, params, prior),
        Scene::Natural => natural_mask(image, params, prior),
        Scene::Abstract => abstract_mask(image, params, prior),
        Scene::Vintage => vintage_mask(image, params),
    }
}

/// Foreground where the HSV distance from the median border color exceeds
/// the given percentile of all distances.
fn color_distance_mask(image: &RgbImage, q: f32, params: &SegmentationParams) -> GrayImage {
    let (w, h) = image.dimensions();
    let t = border_thickness(w, h, params);
    let hsv = hsv_pixels(image);
    let band = band_values(&hsv, w, h, t);

    let mut backdrop = [0.0_f32; 3];
    for (c, slot) in backdrop.iter_mut().enumerate() {
        let mut channel: Vec<f32> = band.iter().map(|p| f32::from(p[c])).collect();
        *slot = median(&mut channel);
    }

    let distances: Vec<f32> = hsv
        .iter()
        .map(|p| {
            p.iter()
                .zip(backdrop)
                .map(|(&v, b)| (f32::from(v) - b).powi(2))
                .sum::<f32>()
                .sqrt()
        })
        .collect();
    let threshold = percentile(&distances, q);
    tracing::trace!(?backdrop, threshold, "color distance threshold");

    binary_from(w, h, |i| distances[i] > threshold)
}

/// Edges of the stretched lightness OR an adaptive (local Gaussian mean) threshold.
fn gradient_mask(image: &RgbImage, params: &SegmentationParams) -> GrayImage {
    let stretched = stretch(&lightness_channel(image));
    let (low, high) = params.gradient_canny;
    let edges = canny(&stretched, low, high);

    let local_mean = gaussian_blur_gray(&stretched, params.adaptive_block_size);
    let (w, h) = image.dimensions();
    let src = stretched.as_raw();
    let mean = local_mean.as_raw();
    let bias = params.adaptive_bias;
    binary_from(w, h, |i| {
        edges.as_raw()[i] > 0 || f32::from(src[i]) > f32::from(mean[i]) - bias
    })
}

/// Dilated prior OR dilated Canny edges.
fn textured_mask(image: &RgbImage, params: &SegmentationParams, prior: &dyn SubjectPrior) -> GrayImage {
    let (w, h) = image.dimensions();
    let seed = dilate(&prior.seed(w, h), Norm::LInf, params.prior_dilation_radius);
    let (low, high) = params.textured_canny;
    let edges = dilate(&canny(&to_gray(image), low, high), Norm::LInf, params.edge_dilation_radius);
    union(&seed, &edges)
}

/// (prior OR edges) AND lightness far enough from the border median.
fn natural_mask(image: &RgbImage, params: &SegmentationParams, prior: &dyn SubjectPrior) -> GrayImage {
    let (w, h) = image.dimensions();
    let (low, high) = params.natural_canny;
    let candidate = union(&prior.seed(w, h), &canny(&to_gray(image), low, high));

    let l = lightness_channel(image);
    let plane: Vec<f32> = l.as_raw().iter().map(|&v| f32::from(v)).collect();
    let backdrop = median(&mut band_values(&plane, w, h, border_thickness(w, h, params)));
    let min_contrast = params.natural_min_contrast;

    binary_from(w, h, |i| {
        candidate.as_raw()[i] > 0 && (plane[i] - backdrop).abs() > min_contrast
    })
}

/// Prior OR edges, closed to consolidate.
fn abstract_mask(image: &RgbImage, params: &SegmentationParams, prior: &dyn SubjectPrior) -> GrayImage {
    let (w, h) = image.dimensions();
    let (low, high) = params.abstract_canny;
    let raw = union(&prior.seed(w, h), &canny(&to_gray(image), low, high));
    close(&raw, Norm::LInf, params.abstract_closing_radius)
}

/// Otsu threshold of the blurred lightness, opened to drop specks.
fn vintage_mask(image: &RgbImage, params: &SegmentationParams) -> GrayImage {
    let blurred = gaussian_blur_gray(&lightness_channel(image), params.vintage_blur_size);
    let level = imageproc::contrast::otsu_level(&blurred);
    let (w, h) = image.dimensions();
    let raw = binary_from(w, h, |i| blurred.as_raw()[i] > level);
    open(&raw, Norm::LInf, params.vintage_opening_radius)
}

/// Min-max stretch to the full byte range; a flat image maps to 0.
fn stretch(gray: &GrayImage) -> GrayImage {
    let lo = gray.as_raw().iter().copied().min().unwrap_or(0);
    let hi = gray.as_raw().iter().copied().max().unwrap_or(0);
    if hi == lo {
        return GrayImage::new(gray.width(), gray.height());
    }
    let scale = 255.0 / f32::from(hi - lo);
    let mut out = gray.clone();
    for v in out.iter_mut() {
        *v = round_u8(f32::from(*v - lo) * scale);
    }
    out
}

fn union(a: &GrayImage, b: &GrayImage) -> GrayImage {
    binary_from(a.width(), a.height(), |i| a.as_raw()[i] > 0 || b.as_raw()[i] > 0)
}

/// Build a 0/255 mask from a predicate over row-major pixel indices.
fn binary_from(width: u32, height: u32, mut fg: impl FnMut(usize) -> bool) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let i = y as usize * width as usize + x as usize;
        Luma([if fg(i) { 255 } else { 0 }])
    })
}
