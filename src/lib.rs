//! Affine transforms, hand-rolled convolution and heuristic background
//! removal for photos.
//!
//! Three independent engines share one error type and a handful of color
//! helpers:
//!
//! - [`transform`]: 3x3 affine matrices and inverse-mapped bilinear
//!   resampling with mirrored borders.
//! - [`convolution`]: square-kernel convolution with reflect-101 padding,
//!   plus the separable Gaussian blur used everywhere else.
//! - [`segmentation`]: scene-aware foreground guesses, mask cleanup and
//!   compositing onto transparency, a flat color or a blurred backdrop.
//!
//! # Quick Start
//!
//! ```no_run
//! use photolab::{apply_affine, AffineMatrix};
//!
//! let img = image::open("photo.jpg").unwrap().to_rgb8();
//! let (w, h) = img.dimensions();
//! let rotated = apply_affine(&img, &AffineMatrix::rotation_about_center(w, h, 30.0), None).unwrap();
//! rotated.save("rotated.jpg").unwrap();
//! ```
//!
//! # Background removal
//!
//! ```no_run
//! use photolab::{remove_background, save_image, OutputMode, RemovalOptions};
//!
//! let img = image::open("portrait.jpg").unwrap();
//! let opts = RemovalOptions {
//!     output: OutputMode::Transparent,
//!     ..RemovalOptions::default()
//! };
//! let cutout = remove_background(&img, &opts).unwrap();
//! save_image(&cutout, std::path::Path::new("portrait.png")).unwrap();
//! ```
//!
//! Every operation returns a new image; inputs are never modified.

#![deny(missing_docs)]

pub mod codec;
pub mod color;
pub mod convolution;
pub mod error;
pub mod filters;
pub mod segmentation;
pub mod transform;

pub use codec::{default_output_path, encode_image, is_supported_image, open_image, save_image};
pub use color::parse_color;
pub use convolution::{convolve, Kernel};
pub use error::{Error, Result};
pub use segmentation::prior::{CenteredEllipse, FixedPrior, SubjectPrior};
pub use segmentation::refine::Mask;
pub use segmentation::{
    foreground_mask, remove_background, resolve_scene, BackgroundRemover, OutputMode,
    RemovalOptions, Scene, SceneType, SegmentationParams,
};
pub use transform::{apply_affine, scaled_output_size, AffineMatrix, ReflectAxis};
