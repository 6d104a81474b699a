//! Affine transforms in homogeneous coordinates and bilinear resampling.
//!
//! Matrices map *source* coordinates to *destination* coordinates. Resampling
//! walks the destination grid and pulls each pixel from the inverse-mapped
//! source position, treating pixel `(x, y)` as the unit square centered on
//! `(x + 0.5, y + 0.5)`. Positions outside the source are mirrored back in
//! with the edge pixel repeated (`cba|abc|cba`).

use std::ops::Mul;

use image::{ImageBuffer, Pixel};

use crate::color::round_u8;
use crate::error::{Error, Result};

/// Determinants smaller than this are treated as singular.
const SINGULAR_EPSILON: f64 = 1e-10;

/// Axis selection for [`AffineMatrix::reflection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReflectAxis {
    /// Mirror across the horizontal midline (`y -> H - y`), turning the image upside down.
    Horizontal,
    /// Mirror across the vertical midline (`x -> W - x`).
    Vertical,
    /// Swap the axes (`x <-> y`), i.e. transpose.
    Diagonal,
}

/// A 3x3 affine matrix whose bottom row is fixed at `[0, 0, 1]`.
///
/// Only the top two rows `[a b c; d e f]` are stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineMatrix {
    coeffs: [f64; 6],
}

impl Default for AffineMatrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineMatrix {
    /// Build from the top two rows `[a, b, c, d, e, f]`.
    #[must_use]
    pub fn new(coeffs: [f64; 6]) -> Self {
        Self { coeffs }
    }

    /// Build from a full 3x3 matrix. The bottom row is ignored.
    #[must_use]
    pub fn from_rows(rows: [[f64; 3]; 3]) -> Self {
        let [[a, b, c], [d, e, f], _] = rows;
        Self::new([a, b, c, d, e, f])
    }

    /// The full 3x3 matrix.
    #[must_use]
    pub fn to_rows(&self) -> [[f64; 3]; 3] {
        let [a, b, c, d, e, f] = self.coeffs;
        [[a, b, c], [d, e, f], [0.0, 0.0, 1.0]]
    }

    /// The identity mapping.
    #[must_use]
    pub fn identity() -> Self {
        Self::new([1.0, 0.0, 0.0, 0.0, 1.0, 0.0])
    }

    /// Shift by `(dx, dy)` pixels.
    #[must_use]
    pub fn translation(dx: f64, dy: f64) -> Self {
        Self::new([1.0, 0.0, dx, 0.0, 1.0, dy])
    }

    /// Scale independently along X and Y about the origin.
    ///
    /// Pair with [`scaled_output_size`] so the enlarged content is not cropped.
    #[must_use]
    pub fn scaling(sx: f64, sy: f64) -> Self {
        Self::new([sx, 0.0, 0.0, 0.0, sy, 0.0])
    }

    /// Rotate by `degrees` about the origin.
    #[must_use]
    pub fn rotation(degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self::new([cos, -sin, 0.0, sin, cos, 0.0])
    }

    /// Rotate by `degrees` about `(cx, cy)`: translate the pivot to the
    /// origin, rotate, translate back.
    #[must_use]
    pub fn rotation_about(cx: f64, cy: f64, degrees: f64) -> Self {
        Self::translation(-cx, -cy)
            .then(&Self::rotation(degrees))
            .then(&Self::translation(cx, cy))
    }

    /// Rotate by `degrees` about the center of a `width x height` image.
    #[must_use]
    pub fn rotation_about_center(width: u32, height: u32, degrees: f64) -> Self {
        Self::rotation_about(f64::from(width) / 2.0, f64::from(height) / 2.0, degrees)
    }

    /// Shear with independent X and Y factors: `x' = x + shx*y`, `y' = shy*x + y`.
    #[must_use]
    pub fn shearing(shx: f64, shy: f64) -> Self {
        Self::new([1.0, shx, 0.0, shy, 1.0, 0.0])
    }

    /// One of the three fixed reflections of a `width x height` image.
    #[must_use]
    pub fn reflection(axis: ReflectAxis, width: u32, height: u32) -> Self {
        match axis {
            ReflectAxis::Horizontal => Self::new([1.0, 0.0, 0.0, 0.0, -1.0, f64::from(height)]),
            ReflectAxis::Vertical => Self::new([-1.0, 0.0, f64::from(width), 0.0, 1.0, 0.0]),
            ReflectAxis::Diagonal => Self::new([0.0, 1.0, 0.0, 1.0, 0.0, 0.0]),
        }
    }

    /// Apply `self` first, then `next`.
    #[must_use]
    pub fn then(&self, next: &Self) -> Self {
        *next * *self
    }

    /// Determinant of the linear part.
    #[must_use]
    pub fn determinant(&self) -> f64 {
        let [a, b, _, d, e, _] = self.coeffs;
        a * e - b * d
    }

    /// The inverse mapping.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DegenerateTransform`] when the determinant is
    /// too close to zero, or when any coefficient of the matrix or of its
    /// inverse is not finite.
    pub fn inverse(&self) -> Result<Self> {
        let det = self.determinant();
        let degenerate = Error::DegenerateTransform { determinant: det };
        if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
            return Err(degenerate);
        }
        let [a, b, c, d, e, f] = self.coeffs;
        let inv = 1.0 / det;
        let (ia, ib, id, ie) = (e * inv, -b * inv, -d * inv, a * inv);
        let inverse = Self::new([
            ia,
            ib,
            -(ia * c + ib * f),
            id,
            ie,
            -(id * c + ie * f),
        ]);
        if self.is_finite() && inverse.is_finite() {
            Ok(inverse)
        } else {
            Err(degenerate)
        }
    }

    fn is_finite(&self) -> bool {
        self.coeffs.iter().all(|v| v.is_finite())
    }

    /// Map a point.
    #[must_use]
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let [a, b, c, d, e, f] = self.coeffs;
        (a * x + b * y + c, d * x + e * y + f)
    }
}

impl Mul for AffineMatrix {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let [a, b, c, d, e, f] = self.coeffs;
        let [ra, rb, rc, rd, re, rf] = rhs.coeffs;
        Self::new([
            a * ra + b * rd,
            a * rb + b * re,
            a * rc + b * rf + c,
            d * ra + e * rd,
            d * rb + e * re,
            d * rc + e * rf + f,
        ])
    }
}

/// Output size that keeps a scaled image uncropped (`width * sx`, `height * sy`, truncated).
#[must_use]
pub fn scaled_output_size(width: u32, height: u32, sx: f64, sy: f64) -> (u32, u32) {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let scale = |len: u32, s: f64| (f64::from(len) * s).max(0.0) as u32;
    (scale(width, sx), scale(height, sy))
}

/// Resample `image` through `matrix`.
///
/// `output_size` defaults to the input size. The input is never modified.
///
/// # Errors
///
/// - [`Error::EmptyImage`] for a zero-sized input.
/// - [`Error::InvalidOutputSize`] for a zero-sized output.
/// - [`Error::DegenerateTransform`] when `matrix` is not invertible.
pub fn apply_affine<P>(
    image: &ImageBuffer<P, Vec<u8>>,
    matrix: &AffineMatrix,
    output_size: Option<(u32, u32)>,
) -> Result<ImageBuffer<P, Vec<u8>>>
where
    P: Pixel<Subpixel = u8>,
{
    let (src_w, src_h) = image.dimensions();
    if src_w == 0 || src_h == 0 {
        return Err(Error::EmptyImage {
            context: "apply_affine",
        });
    }
    let (dst_w, dst_h) = output_size.unwrap_or((src_w, src_h));
    if dst_w == 0 || dst_h == 0 {
        return Err(Error::InvalidOutputSize {
            width: dst_w,
            height: dst_h,
        });
    }
    let inverse = matrix.inverse()?;
    tracing::trace!(
        ?matrix,
        src = ?(src_w, src_h),
        dst = ?(dst_w, dst_h),
        "resampling through affine matrix"
    );

    let channels = usize::from(P::CHANNEL_COUNT);
    let src = image.as_raw();
    let (sw, sh) = (src_w as usize, src_h as usize);
    let row_stride = sw * channels;

    // sampling is periodic in 2 * len, so folding keeps indices small
    #[allow(clippy::cast_precision_loss)]
    let (period_x, period_y) = (2.0 * sw as f64, 2.0 * sh as f64);

    let mut out = vec![0u8; dst_w as usize * dst_h as usize * channels];
    for (i, px) in out.chunks_exact_mut(channels).enumerate() {
        let x = i % dst_w as usize;
        let y = i / dst_w as usize;
        #[allow(clippy::cast_precision_loss)]
        let (sx, sy) = inverse.apply(x as f64 + 0.5, y as f64 + 0.5);
        if !sx.is_finite() || !sy.is_finite() {
            return Err(Error::DegenerateTransform {
                determinant: matrix.determinant(),
            });
        }
        let (sx, sy) = ((sx - 0.5).rem_euclid(period_x), (sy - 0.5).rem_euclid(period_y));

        let x0 = sx.floor();
        let y0 = sy.floor();
        let fx = sx - x0;
        let fy = sy - y0;
        #[allow(clippy::cast_possible_truncation)]
        let (x0, y0) = (x0 as isize, y0 as isize);
        let (xa, xb) = (reflect(x0, sw), reflect(x0 + 1, sw));
        let (ya, yb) = (reflect(y0, sh), reflect(y0 + 1, sh));

        for (c, slot) in px.iter_mut().enumerate() {
            let at = |xx: usize, yy: usize| f64::from(src[yy * row_stride + xx * channels + c]);
            let top = at(xa, ya) * (1.0 - fx) + at(xb, ya) * fx;
            let bottom = at(xa, yb) * (1.0 - fx) + at(xb, yb) * fx;
            #[allow(clippy::cast_possible_truncation)]
            let v = (top * (1.0 - fy) + bottom * fy) as f32;
            *slot = round_u8(v);
        }
    }

    ImageBuffer::from_raw(dst_w, dst_h, out).ok_or(Error::InvalidOutputSize {
        width: dst_w,
        height: dst_h,
    })
}

/// Mirror an index into `[0, len)` repeating the edge sample.
fn reflect(i: isize, len: usize) -> usize {
    #[allow(clippy::cast_possible_wrap)]
    let period = 2 * len as isize;
    #[allow(clippy::cast_sign_loss)]
    let m = i.rem_euclid(period) as usize;
    if m >= len {
        2 * len - 1 - m
    } else {
        m
    }
}
