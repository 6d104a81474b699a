//! Heuristic background removal.
//!
//! Removal runs in two independent halves:
//!
//! 1. **Guess**: a scene-specific strategy ([`Scene`]) turns the photo into a
//!    raw binary foreground mask. [`SceneType::Auto`] is resolved to a
//!    concrete [`Scene`] by a single classification step beforehand.
//! 2. **Clean up and composite**: the raw mask goes through hole removal,
//!    edge-aware refinement and feathering, then the [`OutputMode`] decides
//!    what the backdrop becomes.
//!
//! ```no_run
//! use photolab::{remove_background, OutputMode, RemovalOptions, SceneType};
//!
//! let img = image::open("portrait.jpg").unwrap();
//! let opts = RemovalOptions {
//!     scene: SceneType::Auto,
//!     output: OutputMode::Transparent,
//!     ..RemovalOptions::default()
//! };
//! let cutout = remove_background(&img, &opts).unwrap();
//! cutout.save("portrait.png").unwrap();
//! ```

pub mod composite;
pub mod prior;
pub mod refine;
pub mod scene;

use std::fmt;
use std::str::FromStr;

use image::{DynamicImage, GrayImage, Rgb, RgbImage};

use crate::error::{Error, Result};

use prior::{CenteredEllipse, SubjectPrior};
use refine::Mask;

/// Backdrop classification requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SceneType {
    /// Measure the border and pick solid, gradient or textured.
    #[default]
    Auto,
    /// Uniform studio backdrop (`studio` is accepted as an alias).
    Solid,
    /// Smoothly varying backdrop.
    Gradient,
    /// Busy, high-frequency backdrop.
    Textured,
    /// Outdoor scenery.
    Natural,
    /// Plain backdrop with a stricter subject threshold.
    Minimalist,
    /// Graphic or patterned backdrop.
    Abstract,
    /// Faded, low-contrast photos.
    Vintage,
}

/// A resolved scene; has no `Auto` case, so resolution cannot recurse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scene {
    /// See [`SceneType::Solid`].
    Solid,
    /// See [`SceneType::Gradient`].
    Gradient,
    /// See [`SceneType::Textured`].
    Textured,
    /// See [`SceneType::Natural`].
    Natural,
    /// See [`SceneType::Minimalist`].
    Minimalist,
    /// See [`SceneType::Abstract`].
    Abstract,
    /// See [`SceneType::Vintage`].
    Vintage,
}

impl SceneType {
    /// The concrete scene, or `None` for [`SceneType::Auto`].
    #[must_use]
    pub fn concrete(self) -> Option<Scene> {
        match self {
            Self::Auto => None,
            Self::Solid => Some(Scene::Solid),
            Self::Gradient => Some(Scene::Gradient),
            Self::Textured => Some(Scene::Textured),
            Self::Natural => Some(Scene::Natural),
            Self::Minimalist => Some(Scene::Minimalist),
            Self::Abstract => Some(Scene::Abstract),
            Self::Vintage => Some(Scene::Vintage),
        }
    }
}

impl From<Scene> for SceneType {
    fn from(scene: Scene) -> Self {
        match scene {
            Scene::Solid => Self::Solid,
            Scene::Gradient => Self::Gradient,
            Scene::Textured => Self::Textured,
            Scene::Natural => Self::Natural,
            Scene::Minimalist => Self::Minimalist,
            Scene::Abstract => Self::Abstract,
            Scene::Vintage => Self::Vintage,
        }
    }
}

impl FromStr for SceneType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "solid" | "studio" => Ok(Self::Solid),
            "gradient" => Ok(Self::Gradient),
            "textured" => Ok(Self::Textured),
            "natural" => Ok(Self::Natural),
            "minimalist" => Ok(Self::Minimalist),
            "abstract" => Ok(Self::Abstract),
            "vintage" => Ok(Self::Vintage),
            _ => Err(Error::UnknownSceneType(s.to_string())),
        }
    }
}

impl fmt::Display for SceneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::Solid => "solid",
            Self::Gradient => "gradient",
            Self::Textured => "textured",
            Self::Natural => "natural",
            Self::Minimalist => "minimalist",
            Self::Abstract => "abstract",
            Self::Vintage => "vintage",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        SceneType::from(*self).fmt(f)
    }
}

/// What replaces the background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// RGBA with the mask as alpha.
    #[default]
    Transparent,
    /// RGB blended over [`RemovalOptions::solid_color`].
    SolidColor,
    /// RGB blended over a blurred copy of the photo.
    Blurred,
    /// The feathered mask itself as a grayscale image.
    CustomMask,
}

impl FromStr for OutputMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "transparent" => Ok(Self::Transparent),
            "solid_color" | "solid" => Ok(Self::SolidColor),
            "blurred" | "blur" => Ok(Self::Blurred),
            "custom_mask" | "mask" => Ok(Self::CustomMask),
            _ => Err(Error::UnknownOutputMode(s.to_string())),
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Transparent => "transparent",
            Self::SolidColor => "solid_color",
            Self::Blurred => "blurred",
            Self::CustomMask => "custom_mask",
        })
    }
}

/// Per-request removal options.
#[derive(Debug, Clone)]
pub struct RemovalOptions {
    /// Backdrop classification, or `Auto`.
    pub scene: SceneType,
    /// What to produce.
    pub output: OutputMode,
    /// Backdrop color for [`OutputMode::SolidColor`]; white when `None`.
    pub solid_color: Option<Rgb<u8>>,
    /// Feathering radius in pixels; 0 keeps the mask binary.
    pub feather_radius: u32,
    /// Pull the mask toward strong edges (keeps hair and fine detail).
    pub refine_edges: bool,
    /// Gaussian kernel size of the blurred backdrop (forced odd, at least 21).
    pub blur_kernel_size: usize,
}

impl Default for RemovalOptions {
    fn default() -> Self {
        Self {
            scene: SceneType::Auto,
            output: OutputMode::Transparent,
            solid_color: None,
            feather_radius: 3,
            refine_edges: true,
            blur_kernel_size: 25,
        }
    }
}

/// Smallest Gaussian kernel used for the blurred backdrop.
pub const MIN_BACKDROP_BLUR: usize = 21;

/// Empirical tuning constants of the segmentation heuristics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentationParams {
    /// Minimum border band thickness in pixels.
    pub border_min_thickness: u32,
    /// Band thickness is `min(width, height) / border_divisor` when larger.
    pub border_divisor: u32,
    /// Auto: border lightness std-dev below this means a solid backdrop.
    pub auto_solid_max_std: f32,
    /// Auto: below this (and above the solid limit) means a gradient.
    pub auto_gradient_max_std: f32,
    /// Solid: distance percentile separating subject from backdrop.
    pub solid_percentile: f32,
    /// Minimalist: stricter distance percentile.
    pub minimalist_percentile: f32,
    /// Natural: minimum lightness difference from the border median.
    pub natural_min_contrast: f32,
    /// Gradient: adaptive threshold window size.
    pub adaptive_block_size: usize,
    /// Gradient: amount subtracted from the local mean.
    pub adaptive_bias: f32,
    /// Gradient: Canny (low, high).
    pub gradient_canny: (f32, f32),
    /// Textured: Canny (low, high).
    pub textured_canny: (f32, f32),
    /// Natural: Canny (low, high).
    pub natural_canny: (f32, f32),
    /// Abstract: Canny (low, high).
    pub abstract_canny: (f32, f32),
    /// Edge refinement: Canny (low, high).
    pub refine_canny: (f32, f32),
    /// Textured: prior dilation radius (3 = 7x7).
    pub prior_dilation_radius: u8,
    /// Textured: edge dilation radius (2 = 5x5).
    pub edge_dilation_radius: u8,
    /// Abstract: closing radius (2 = 5x5).
    pub abstract_closing_radius: u8,
    /// Vintage: lightness pre-blur kernel size.
    pub vintage_blur_size: usize,
    /// Vintage: opening radius (1 = 3x3).
    pub vintage_opening_radius: u8,
    /// Enclosed background regions smaller than this become foreground.
    pub hole_min_area: u32,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            border_min_thickness: 5,
            border_divisor: 20,
            auto_solid_max_std: 5.0,
            auto_gradient_max_std: 15.0,
            solid_percentile: 60.0,
            minimalist_percentile: 70.0,
            natural_min_contrast: 15.0,
            adaptive_block_size: 21,
            adaptive_bias: 5.0,
            gradient_canny: (50.0, 150.0),
            textured_canny: (80.0, 160.0),
            natural_canny: (80.0, 200.0),
            abstract_canny: (50.0, 150.0),
            refine_canny: (50.0, 150.0),
            prior_dilation_radius: 3,
            edge_dilation_radius: 2,
            abstract_closing_radius: 2,
            vintage_blur_size: 5,
            vintage_opening_radius: 1,
            hole_min_area: 100,
        }
    }
}

/// The background removal engine.
///
/// Holds only configuration; every call is independent and never mutates
/// the input image, so one remover can serve concurrent requests.
#[derive(Debug)]
pub struct BackgroundRemover {
    params: SegmentationParams,
    prior: Box<dyn SubjectPrior>,
}

impl Default for BackgroundRemover {
    fn default() -> Self {
        Self::new()
    }
}

impl BackgroundRemover {
    /// Engine with default tuning and the centered-ellipse prior.
    #[must_use]
    pub fn new() -> Self {
        Self::with_params(SegmentationParams::default())
    }

    /// Engine with custom tuning.
    #[must_use]
    pub fn with_params(params: SegmentationParams) -> Self {
        Self {
            params,
            prior: Box::new(CenteredEllipse::default()),
        }
    }

    /// Replace the subject prior.
    #[must_use]
    pub fn with_prior(mut self, prior: impl SubjectPrior + 'static) -> Self {
        self.prior = Box::new(prior);
        self
    }

    /// Tuning in use.
    #[must_use]
    pub fn params(&self) -> &SegmentationParams {
        &self.params
    }

    /// Resolve `scene` to a concrete strategy, classifying at most once.
    #[must_use]
    pub fn resolve_scene(&self, image: &RgbImage, scene: SceneType) -> Scene {
        if let Some(concrete) = scene.concrete() {
            return concrete;
        }
        let (resolved, std) = scene::classify(image, &self.params);
        tracing::debug!(border_std = std, scene = %resolved, "auto scene classification");
        resolved
    }

    /// Raw binary (0/255) mask of a concrete scene strategy, before cleanup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyImage`] for a zero-sized image.
    pub fn raw_mask(&self, image: &RgbImage, scene: Scene) -> Result<GrayImage> {
        ensure_non_empty(image)?;
        Ok(scene::raw_mask(image, scene, &self.params, self.prior.as_ref()))
    }

    /// Cleaned-up and feathered foreground opacity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyImage`] for a zero-sized image.
    pub fn foreground_mask(&self, image: &RgbImage, options: &RemovalOptions) -> Result<Mask> {
        let scene = self.resolve_scene(image, options.scene);
        let raw = self.raw_mask(image, scene)?;
        let holes_filled = refine::remove_small_holes(&raw, self.params.hole_min_area);
        let refined = refine::refine_edges(image, &holes_filled, options.refine_edges, &self.params);
        let mask = refine::feather(&refined, options.feather_radius);
        tracing::debug!(
            %scene,
            coverage = mask.coverage(),
            feather = options.feather_radius,
            "foreground mask ready"
        );
        Ok(mask)
    }

    /// Remove the background of an RGB photo.
    ///
    /// Returns an RGBA image for [`OutputMode::Transparent`], a grayscale
    /// mask for [`OutputMode::CustomMask`], and RGB otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyImage`] for a zero-sized image.
    pub fn remove(&self, image: &RgbImage, options: &RemovalOptions) -> Result<DynamicImage> {
        let mask = self.foreground_mask(image, options)?;
        let out = match options.output {
            OutputMode::CustomMask => DynamicImage::ImageLuma8(mask.to_gray()),
            OutputMode::Transparent => DynamicImage::ImageRgba8(composite::with_alpha(image, &mask)),
            OutputMode::SolidColor => {
                let color = options.solid_color.unwrap_or(Rgb([255, 255, 255]));
                DynamicImage::ImageRgb8(composite::over_solid(image, &mask, color))
            }
            OutputMode::Blurred => {
                let ksize = options.blur_kernel_size.max(MIN_BACKDROP_BLUR);
                DynamicImage::ImageRgb8(composite::over_blurred(image, &mask, ksize))
            }
        };
        Ok(out)
    }
}

/// Remove the background of a decoded 3-channel image with the default engine.
///
/// # Errors
///
/// - [`Error::ChannelCount`] unless the image has exactly three channels.
/// - [`Error::EmptyImage`] for a zero-sized image.
pub fn remove_background(image: &DynamicImage, options: &RemovalOptions) -> Result<DynamicImage> {
    let channels = image.color().channel_count();
    if channels != 3 {
        return Err(Error::ChannelCount {
            expected: 3,
            actual: channels,
        });
    }
    let rgb = match image {
        DynamicImage::ImageRgb8(rgb) => std::borrow::Cow::Borrowed(rgb),
        other => std::borrow::Cow::Owned(other.to_rgb8()),
    };
    BackgroundRemover::new().remove(&rgb, options)
}

/// Concrete scene `scene` resolves to under `params`.
#[must_use]
pub fn resolve_scene(image: &RgbImage, scene: SceneType, params: &SegmentationParams) -> Scene {
    BackgroundRemover::with_params(*params).resolve_scene(image, scene)
}

/// Feathered foreground opacity under `params`, before any compositing.
///
/// # Errors
///
/// Returns [`Error::EmptyImage`] for a zero-sized image.
pub fn foreground_mask(
    image: &RgbImage,
    options: &RemovalOptions,
    params: &SegmentationParams,
) -> Result<Mask> {
    BackgroundRemover::with_params(*params).foreground_mask(image, options)
}

fn ensure_non_empty(image: &RgbImage) -> Result<()> {
    if image.width() == 0 || image.height() == 0 {
        return Err(Error::EmptyImage {
            context: "remove_background",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    use super::prior::FixedPrior;
    use super::refine::tests::enclosed_background_sizes;

    const ALL_SCENES: [Scene; 7] = [
        Scene::Solid,
        Scene::Gradient,
        Scene::Textured,
        Scene::Natural,
        Scene::Minimalist,
        Scene::Abstract,
        Scene::Vintage,
    ];

    fn studio(size: u32) -> RgbImage {
        RgbImage::from_fn(size, size, |x, y| {
            let (lo, hi) = (size / 3, 2 * size / 3);
            if (lo..hi).contains(&x) && (lo..hi).contains(&y) {
                Rgb([30, 160, 60])
            } else {
                Rgb([128, 128, 128])
            }
        })
    }

    /// Speckled frame with a bright disc subject.
    fn busy(size: u32) -> RgbImage {
        RgbImage::from_fn(size, size, |x, y| {
            #[allow(clippy::cast_possible_wrap)]
            let (dx, dy) = (x as i32 - size as i32 / 2, y as i32 - size as i32 / 2);
            if dx * dx + dy * dy < (size as i32 / 4).pow(2) {
                Rgb([240, 220, 200])
            } else {
                #[allow(clippy::cast_possible_truncation)]
                let v = ((x * 73 + y * 151) % 97 + 40) as u8;
                Rgb([v, v / 2, 255 - v])
            }
        })
    }

    #[test]
    fn scene_names_parse_case_insensitively() {
        assert_eq!("AUTO".parse::<SceneType>().unwrap(), SceneType::Auto);
        assert_eq!("Studio".parse::<SceneType>().unwrap(), SceneType::Solid);
        assert_eq!(" vintage ".parse::<SceneType>().unwrap(), SceneType::Vintage);
        assert!(matches!(
            "watercolor".parse::<SceneType>(),
            Err(Error::UnknownSceneType(_))
        ));
        for scene in ALL_SCENES {
            let name = scene.to_string();
            assert_eq!(name.parse::<SceneType>().unwrap().concrete(), Some(scene));
        }
    }

    #[test]
    fn output_modes_parse_case_insensitively() {
        assert_eq!("Transparent".parse::<OutputMode>().unwrap(), OutputMode::Transparent);
        assert_eq!("SOLID_COLOR".parse::<OutputMode>().unwrap(), OutputMode::SolidColor);
        assert_eq!("custom-mask".parse::<OutputMode>().unwrap(), OutputMode::CustomMask);
        assert_eq!("blurred".parse::<OutputMode>().unwrap(), OutputMode::Blurred);
        assert!(matches!(
            "sepia".parse::<OutputMode>(),
            Err(Error::UnknownOutputMode(_))
        ));
        assert_eq!(OutputMode::SolidColor.to_string(), "solid_color");
    }

    #[test]
    fn auto_resolves_studio_photo_to_solid() {
        let remover = BackgroundRemover::new();
        assert_eq!(remover.resolve_scene(&studio(100), SceneType::Auto), Scene::Solid);
        assert_eq!(remover.resolve_scene(&studio(100), SceneType::Vintage), Scene::Vintage);
    }

    #[test]
    fn hole_removal_leaves_no_small_enclosed_background() {
        let remover = BackgroundRemover::new();
        let p = remover.params();
        for img in [studio(80), busy(80)] {
            for scene in ALL_SCENES {
                let raw = remover.raw_mask(&img, scene).unwrap();
                let cleaned = refine::remove_small_holes(&raw, p.hole_min_area);
                assert!(
                    enclosed_background_sizes(&cleaned).iter().all(|&a| a >= p.hole_min_area),
                    "small hole left by {scene}"
                );
            }
        }
    }

    #[test]
    fn transparent_output_keeps_rgb_untouched() {
        let img = busy(64);
        for scene in [SceneType::Auto, SceneType::Textured, SceneType::Solid] {
            let opts = RemovalOptions {
                scene,
                ..RemovalOptions::default()
            };
            let out = BackgroundRemover::new().remove(&img, &opts).unwrap();
            let rgba = out.as_rgba8().expect("transparent output is RGBA");
            assert_eq!(rgba.dimensions(), img.dimensions());
            for (x, y, px) in rgba.enumerate_pixels() {
                assert_eq!(&px.0[..3], &img.get_pixel(x, y).0[..]);
            }
        }
    }

    #[test]
    fn studio_subject_is_opaque_and_backdrop_clear() {
        let img = studio(90);
        let opts = RemovalOptions {
            feather_radius: 0,
            ..RemovalOptions::default()
        };
        let mask = BackgroundRemover::new().foreground_mask(&img, &opts).unwrap();
        assert!(mask.is_binary());
        assert!((mask.get(45, 45) - 1.0).abs() < f32::EPSILON);
        assert!(mask.get(3, 3).abs() < f32::EPSILON);
    }

    #[test]
    fn custom_mask_is_single_channel() {
        let opts = RemovalOptions {
            output: OutputMode::CustomMask,
            ..RemovalOptions::default()
        };
        let out = BackgroundRemover::new().remove(&studio(60), &opts).unwrap();
        let mask = out.as_luma8().expect("mask output is grayscale");
        assert_eq!(mask.dimensions(), (60, 60));
        assert_eq!(mask.get_pixel(30, 30)[0], 255);
    }

    #[test]
    fn solid_color_defaults_to_white() {
        let opts = RemovalOptions {
            output: OutputMode::SolidColor,
            feather_radius: 0,
            ..RemovalOptions::default()
        };
        let out = BackgroundRemover::new().remove(&studio(90), &opts).unwrap();
        let rgb = out.as_rgb8().expect("solid output is RGB");
        assert_eq!(rgb.get_pixel(2, 2), &Rgb([255, 255, 255]));
        assert_eq!(rgb.get_pixel(45, 45), &Rgb([30, 160, 60]));
    }

    #[test]
    fn blurred_output_is_rgb_same_size() {
        let img = busy(48);
        let opts = RemovalOptions {
            output: OutputMode::Blurred,
            blur_kernel_size: 4,
            ..RemovalOptions::default()
        };
        let out = BackgroundRemover::new().remove(&img, &opts).unwrap();
        assert_eq!(out.as_rgb8().map(RgbImage::dimensions), Some((48, 48)));
    }

    #[test]
    fn non_rgb_inputs_are_rejected() {
        let opts = RemovalOptions::default();
        let rgba = DynamicImage::new_rgba8(10, 10);
        assert!(matches!(
            remove_background(&rgba, &opts),
            Err(Error::ChannelCount { expected: 3, actual: 4 })
        ));
        let gray = DynamicImage::ImageLuma8(GrayImage::new(10, 10));
        assert!(matches!(
            remove_background(&gray, &opts),
            Err(Error::ChannelCount { actual: 1, .. })
        ));
        let empty = DynamicImage::new_rgb8(0, 0);
        assert!(matches!(
            remove_background(&empty, &opts),
            Err(Error::EmptyImage { .. })
        ));
    }

    #[test]
    fn input_is_not_mutated() {
        let img = DynamicImage::ImageRgb8(busy(40));
        let before = img.clone();
        let _ = remove_background(&img, &RemovalOptions::default()).unwrap();
        assert_eq!(img, before);
    }

    #[test]
    fn custom_prior_drives_textured_strategy() {
        let seed = GrayImage::from_fn(50, 50, |x, _| Luma([if x < 10 { 255 } else { 0 }]));
        let img = RgbImage::from_pixel(50, 50, Rgb([90, 90, 90]));
        let remover = BackgroundRemover::new().with_prior(FixedPrior(seed));
        let raw = remover.raw_mask(&img, Scene::Textured).unwrap();
        assert_eq!(raw.get_pixel(2, 25)[0], 255);
        assert_eq!(raw.get_pixel(40, 25)[0], 0);
    }
}
