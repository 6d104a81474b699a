//! Cleanup applied to every raw mask before compositing.
//!
//! Binary masks travel as [`GrayImage`]s holding 0 (background) or 255
//! (foreground) so the `imageproc` morphology and labelling routines can work
//! on them directly. Feathering is the only step that leaves the binary
//! domain and produces a [`Mask`] of opacities.

use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{
    close, dilate, grayscale_dilate, grayscale_erode, Mask as StructuringElement,
};
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::color::{round_u8, to_gray};
use crate::convolution::gaussian_blur_plane;

use super::SegmentationParams;

/// Per-pixel foreground opacity in `[0, 1]`, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    width: u32,
    height: u32,
    alpha: Vec<f32>,
}

impl Mask {
    /// Interpret a binary 0/255 image as opacities 0.0/1.0.
    #[must_use]
    pub fn from_binary(mask: &GrayImage) -> Self {
        Self {
            width: mask.width(),
            height: mask.height(),
            alpha: mask
                .pixels()
                .map(|p| if p[0] > 127 { 1.0 } else { 0.0 })
                .collect(),
        }
    }

    /// `(width, height)` of the mask.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Opacity at `(x, y)`.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.alpha[y as usize * self.width as usize + x as usize]
    }

    /// All opacities, row-major.
    #[must_use]
    pub fn alpha(&self) -> &[f32] {
        &self.alpha
    }

    /// Whether every opacity is exactly 0 or 1.
    #[must_use]
    pub fn is_binary(&self) -> bool {
        self.alpha.iter().all(|&a| a == 0.0 || a == 1.0)
    }

    /// Fraction of the frame that is foreground, weighted by opacity.
    #[must_use]
    pub fn coverage(&self) -> f32 {
        if self.alpha.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let n = self.alpha.len() as f32;
        self.alpha.iter().sum::<f32>() / n
    }

    /// Opacities scaled to `[0, 255]`.
    #[must_use]
    pub fn to_gray(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([round_u8(self.get(x, y) * 255.0)])
        })
    }
}

/// Fill background regions that are enclosed by foreground and smaller
/// than `min_area` pixels.
///
/// Background regions touching the frame are never filled: they are part of
/// the backdrop, not holes in the subject.
#[must_use]
pub fn remove_small_holes(mask: &GrayImage, min_area: u32) -> GrayImage {
    let (width, height) = mask.dimensions();
    let inverted = GrayImage::from_fn(width, height, |x, y| {
        Luma([if mask.get_pixel(x, y)[0] > 127 { 0 } else { 255 }])
    });
    // holes are 4-connected so diagonal foreground steps still enclose them
    let labels = connected_components(&inverted, Connectivity::Four, Luma([0u8]));

    let regions = labels.pixels().map(|p| p[0]).max().unwrap_or(0) as usize;
    let mut area = vec![0u32; regions + 1];
    let mut touches_frame = vec![false; regions + 1];
    for (x, y, label) in labels.enumerate_pixels() {
        let l = label[0] as usize;
        if l == 0 {
            continue;
        }
        area[l] += 1;
        if x == 0 || y == 0 || x + 1 == width || y + 1 == height {
            touches_frame[l] = true;
        }
    }

    let mut filled = 0u32;
    let out = GrayImage::from_fn(width, height, |x, y| {
        let l = labels.get_pixel(x, y)[0] as usize;
        let fg = if l == 0 {
            true
        } else if !touches_frame[l] && area[l] < min_area {
            filled += 1;
            true
        } else {
            false
        };
        Luma([if fg { 255 } else { 0 }])
    });
    tracing::trace!(regions, filled, "filled enclosed holes");
    out
}

/// Pull the mask boundary toward strong intensity edges.
///
/// Closes small gaps, opens away isolated specks with a 2x2 element (so
/// strands two pixels wide survive), then forces every
/// (slightly dilated) Canny edge pixel into the foreground so thin
/// structures such as hair survive. With `enabled == false` the mask is
/// returned unchanged.
#[must_use]
pub fn refine_edges(
    image: &RgbImage,
    mask: &GrayImage,
    enabled: bool,
    params: &SegmentationParams,
) -> GrayImage {
    if !enabled {
        return mask.clone();
    }
    let (low, high) = params.refine_canny;
    let edges = imageproc::edges::canny(&to_gray(image), low, high);
    let edges = dilate(&edges, Norm::LInf, 1);

    let closed = close(mask, Norm::LInf, 1);
    let mut refined = open_2x2(&closed);
    for (px, edge) in refined.pixels_mut().zip(edges.pixels()) {
        if edge[0] > 0 {
            *px = Luma([255]);
        }
    }
    refined
}

/// Opening with a 2x2 square.
///
/// `imageproc` applies the element's offsets as-is in both passes, so the
/// dilation uses the mirrored anchor to land strands back where they were.
fn open_2x2(mask: &GrayImage) -> GrayImage {
    let square = GrayImage::from_pixel(2, 2, Luma([255]));
    let forward = StructuringElement::from_image(&square, 0, 0);
    let mirrored = StructuringElement::from_image(&square, 1, 1);
    grayscale_dilate(&grayscale_erode(mask, &forward), &mirrored)
}

/// Soften a binary mask into opacities with a Gaussian of size `2 * radius + 1`.
///
/// A zero radius leaves the mask binary.
#[must_use]
pub fn feather(mask: &GrayImage, radius: u32) -> Mask {
    let mut out = Mask::from_binary(mask);
    if radius == 0 {
        return out;
    }
    let ksize = 2 * radius as usize + 1;
    let blurred = gaussian_blur_plane(&out.alpha, out.width as usize, out.height as usize, ksize);
    out.alpha = blurred.into_iter().map(|a| a.clamp(0.0, 1.0)).collect();
    out
}
