//! Seed masks standing in for real subject detection.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_ellipse_mut;

/// A source of a coarse binary subject silhouette (255 = subject).
///
/// The textured, natural and abstract strategies OR this seed into their
/// edge evidence, so any reasonable guess of where the subject sits can be
/// plugged in.
pub trait SubjectPrior: std::fmt::Debug + Send + Sync {
    /// Produce a `width x height` seed mask.
    fn seed(&self, width: u32, height: u32) -> GrayImage;
}

/// Filled ellipse centered on the frame.
///
/// The default covers 70% of the width and 90% of the height, the typical
/// footprint of a centered portrait.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenteredEllipse {
    /// Horizontal semi-axis as a fraction of the image width.
    pub rx_fraction: f32,
    /// Vertical semi-axis as a fraction of the image height.
    pub ry_fraction: f32,
}

impl Default for CenteredEllipse {
    fn default() -> Self {
        Self {
            rx_fraction: 0.35,
            ry_fraction: 0.45,
        }
    }
}

impl SubjectPrior for CenteredEllipse {
    fn seed(&self, width: u32, height: u32) -> GrayImage {
        let mut mask = GrayImage::new(width, height);
        if width == 0 || height == 0 {
            return mask;
        }
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_possible_wrap,
            clippy::cast_precision_loss
        )]
        let (center, rx, ry) = (
            ((width / 2) as i32, (height / 2) as i32),
            (width as f32 * self.rx_fraction) as i32,
            (height as f32 * self.ry_fraction) as i32,
        );
        draw_filled_ellipse_mut(&mut mask, center, rx, ry, Luma([255u8]));
        mask
    }
}

/// A caller-supplied seed, resized with nearest-neighbour sampling when the
/// target image has different dimensions.
#[derive(Debug, Clone)]
pub struct FixedPrior(pub GrayImage);

impl SubjectPrior for FixedPrior {
    fn seed(&self, width: u32, height: u32) -> GrayImage {
        let seed = if self.0.dimensions() == (width, height) {
            self.0.clone()
        } else {
            imageops::resize(&self.0, width, height, FilterType::Nearest)
        };
        GrayImage::from_fn(width, height, |x, y| {
            Luma([if seed.get_pixel(x, y)[0] > 127 { 255 } else { 0 }])
        })
    }
}
