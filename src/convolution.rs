//! Sliding-window convolution over single-channel images.
//!
//! Every filter in the crate funnels through the same padded weighted sum:
//! the input is extended by `k / 2` pixels on each side by mirroring it about
//! its edge pixels (`dcb|abcd|cba`), the products are accumulated in `f32`,
//! and the result is rounded and clamped back to `[0, 255]`.
//!
//! The Gaussian blur used by feathering, adaptive thresholding and the
//! blurred backdrop is the separable special case of the same operation.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};

use crate::color::round_u8;
use crate::error::{Error, Result};

/// A square, odd-sized convolution kernel stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    size: usize,
    weights: Vec<f32>,
}

impl Kernel {
    /// Build a kernel from its rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKernel`] unless the rows form a non-empty
    /// square with an odd side.
    pub fn from_rows<R: AsRef<[f32]>>(rows: &[R]) -> Result<Self> {
        let size = rows.len();
        let cols = rows.first().map_or(0, |r| r.as_ref().len());
        if size == 0 || size % 2 == 0 || rows.iter().any(|r| r.as_ref().len() != size) {
            return Err(Error::InvalidKernel { rows: size, cols });
        }
        let weights = rows.iter().flat_map(|r| r.as_ref().iter().copied()).collect();
        Ok(Self { size, weights })
    }

    /// The 1x1 kernel with weight 1.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            size: 1,
            weights: vec![1.0],
        }
    }

    /// Uniform `k x k` average; weights sum to 1.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKernel`] if `k` is zero or even.
    pub fn box_blur(k: usize) -> Result<Self> {
        if k == 0 || k % 2 == 0 {
            return Err(Error::InvalidKernel { rows: k, cols: k });
        }
        #[allow(clippy::cast_precision_loss)]
        let w = 1.0 / (k * k) as f32;
        Ok(Self {
            size: k,
            weights: vec![w; k * k],
        })
    }

    /// Fixed 3x3 sharpening stencil: center 5, orthogonal neighbours -1.
    #[must_use]
    pub fn sharpen() -> Self {
        Self {
            size: 3,
            weights: vec![0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0],
        }
    }

    /// Side length of the kernel.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Half the side length, i.e. the padding applied on each edge.
    #[must_use]
    pub fn radius(&self) -> usize {
        self.size / 2
    }

    /// Row-major weights.
    #[must_use]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }
}

/// Convolve a grayscale image with a square kernel.
///
/// The output has the same dimensions as the input.
///
/// # Errors
///
/// Returns [`Error::EmptyImage`] for a zero-sized image.
pub fn convolve(image: &GrayImage, kernel: &Kernel) -> Result<GrayImage> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::EmptyImage {
            context: "convolve",
        });
    }
    let plane: Vec<f32> = image.as_raw().iter().map(|&v| f32::from(v)).collect();
    let out = convolve_plane(&plane, width as usize, height as usize, kernel);
    Ok(plane_to_gray(&out, width, height))
}

/// Convolve a float plane of `width * height` samples, without rounding.
///
/// An empty plane is returned unchanged.
#[must_use]
pub fn convolve_plane(plane: &[f32], width: usize, height: usize, kernel: &Kernel) -> Vec<f32> {
    debug_assert_eq!(plane.len(), width * height);
    if width == 0 || height == 0 {
        return plane.to_vec();
    }
    let k = kernel.size();
    let r = kernel.radius();
    let xs = reflect_indices(width, r);
    let ys = reflect_indices(height, r);

    let mut out = vec![0.0_f32; width * height];
    fill_rows(&mut out, width, |y, row| {
        for (x, slot) in row.iter_mut().enumerate() {
            let mut acc = 0.0_f32;
            for ky in 0..k {
                let src_row = &plane[ys[y + ky] * width..][..width];
                let weights = &kernel.weights()[ky * k..][..k];
                for (kx, &w) in weights.iter().enumerate() {
                    acc += w * src_row[xs[x + kx]];
                }
            }
            *slot = acc;
        }
    });
    out
}

/// Normalized 1-D Gaussian weights of length `ksize`.
///
/// The standard deviation is derived from the size as
/// `0.3 * ((ksize - 1) / 2 - 1) + 0.8`; sizes up to 7 use the exact binomial
/// taps.
#[must_use]
pub fn gaussian_kernel_1d(ksize: usize) -> Vec<f32> {
    match ksize {
        0 | 1 => return vec![1.0],
        3 => return vec![0.25, 0.5, 0.25],
        5 => return vec![0.0625, 0.25, 0.375, 0.25, 0.0625],
        7 => {
            return vec![
                0.031_25, 0.109_375, 0.218_75, 0.281_25, 0.218_75, 0.109_375, 0.031_25,
            ]
        }
        _ => {}
    }
    #[allow(clippy::cast_precision_loss)]
    let half = (ksize - 1) as f32 * 0.5;
    let sigma = 0.3 * (half - 1.0) + 0.8;
    let denom = 2.0 * sigma * sigma;
    #[allow(clippy::cast_precision_loss)]
    let mut taps: Vec<f32> = (0..ksize)
        .map(|i| {
            let d = i as f32 - half;
            (-d * d / denom).exp()
        })
        .collect();
    let sum: f32 = taps.iter().sum();
    for t in &mut taps {
        *t /= sum;
    }
    taps
}

/// Gaussian-blur a float plane with a separable `ksize x ksize` kernel.
///
/// An even `ksize` is bumped to the next odd size.
#[must_use]
pub fn gaussian_blur_plane(plane: &[f32], width: usize, height: usize, ksize: usize) -> Vec<f32> {
    debug_assert_eq!(plane.len(), width * height);
    let ksize = force_odd(ksize);
    if ksize <= 1 || width == 0 || height == 0 {
        return plane.to_vec();
    }
    let taps = gaussian_kernel_1d(ksize);
    let r = ksize / 2;

    let xs = reflect_indices(width, r);
    let mut horizontal = vec![0.0_f32; width * height];
    fill_rows(&mut horizontal, width, |y, row| {
        let src = &plane[y * width..][..width];
        for (x, slot) in row.iter_mut().enumerate() {
            *slot = taps
                .iter()
                .enumerate()
                .map(|(i, &t)| t * src[xs[x + i]])
                .sum();
        }
    });

    let ys = reflect_indices(height, r);
    let mut out = vec![0.0_f32; width * height];
    fill_rows(&mut out, width, |y, row| {
        for (x, slot) in row.iter_mut().enumerate() {
            *slot = taps
                .iter()
                .enumerate()
                .map(|(i, &t)| t * horizontal[ys[y + i] * width + x])
                .sum();
        }
    });
    out
}

/// Gaussian-blur a grayscale image.
#[must_use]
pub fn gaussian_blur_gray(image: &GrayImage, ksize: usize) -> GrayImage {
    let (width, height) = image.dimensions();
    let plane: Vec<f32> = image.as_raw().iter().map(|&v| f32::from(v)).collect();
    let out = gaussian_blur_plane(&plane, width as usize, height as usize, ksize);
    plane_to_gray(&out, width, height)
}

/// Gaussian-blur each channel of an RGB image independently.
#[must_use]
pub fn gaussian_blur_rgb(image: &RgbImage, ksize: usize) -> RgbImage {
    let (width, height) = image.dimensions();
    let (w, h) = (width as usize, height as usize);
    let channels: Vec<Vec<f32>> = (0..3)
        .map(|c| {
            let plane: Vec<f32> = image.pixels().map(|px| f32::from(px[c])).collect();
            gaussian_blur_plane(&plane, w, h, ksize)
        })
        .collect();
    ImageBuffer::from_fn(width, height, |x, y| {
        let i = y as usize * w + x as usize;
        Rgb([
            round_u8(channels[0][i]),
            round_u8(channels[1][i]),
            round_u8(channels[2][i]),
        ])
    })
}

/// Round a float plane back into a grayscale image.
#[must_use]
pub fn plane_to_gray(plane: &[f32], width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        Luma([round_u8(plane[y as usize * width as usize + x as usize])])
    })
}

/// Make a kernel size odd by adding one when it is even.
#[must_use]
pub fn force_odd(ksize: usize) -> usize {
    if ksize % 2 == 0 {
        tracing::warn!(ksize, "even kernel size, using {}", ksize + 1);
        ksize + 1
    } else {
        ksize
    }
}

/// Source index for every position of an axis padded by `pad` on both sides.
///
/// Mirrors about the edge samples without repeating them (`dcb|abcd|cba`).
fn reflect_indices(len: usize, pad: usize) -> Vec<usize> {
    (0..len + 2 * pad)
        .map(|i| {
            #[allow(clippy::cast_possible_wrap)]
            let i = i as isize - pad as isize;
            reflect_101(i, len)
        })
        .collect()
}

fn reflect_101(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    #[allow(clippy::cast_possible_wrap)]
    let period = 2 * (len as isize - 1);
    let m = i.rem_euclid(period);
    #[allow(clippy::cast_sign_loss)]
    let m = m as usize;
    if m >= len {
        2 * (len - 1) - m
    } else {
        m
    }
}

/// Compute each output row of a `width`-wide plane with `f(row_index, row)`.
fn fill_rows<F>(out: &mut [f32], width: usize, f: F)
where
    F: Fn(usize, &mut [f32]) + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        out.par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| f(y, row));
    }

    #[cfg(not(feature = "parallel"))]
    {
        out.chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| f(y, row));
    }
}
