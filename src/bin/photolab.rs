use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};
use image::{DynamicImage, Rgb, RgbImage};
use tracing_subscriber::EnvFilter;

use photolab::filters::{self, BLUR_KERNEL_SIZES, EDGE_CANNY_THRESHOLDS};
use photolab::{
    apply_affine, default_output_path, open_image, parse_color, remove_background, save_image,
    scaled_output_size, AffineMatrix, OutputMode, ReflectAxis, RemovalOptions, SceneType,
};

#[derive(Parser)]
#[command(
    name = "photolab",
    about = "Affine transforms, convolution filters and heuristic background removal",
    version,
    after_help = "Output defaults to {name}_{operation}.{ext} next to the input.\n\
                  Transparent and mask results are always written as PNG."
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Paths {
    /// Input image file
    input: PathBuf,

    /// Output file (default: {name}_{operation}.{ext})
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Apply a geometric transformation
    Transform {
        #[command(flatten)]
        paths: Paths,
        #[command(subcommand)]
        op: TransformOp,
    },
    /// Apply a filter
    Filter {
        #[command(flatten)]
        paths: Paths,
        #[command(subcommand)]
        op: FilterOp,
    },
    /// Remove the background
    Background {
        #[command(flatten)]
        paths: Paths,
        #[command(flatten)]
        args: BackgroundArgs,
    },
    /// Print per-channel intensity histogram summaries
    Histogram {
        /// Input image file
        input: PathBuf,
    },
}

#[derive(Subcommand)]
enum TransformOp {
    /// Shift by (dx, dy) pixels
    Translate {
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        dx: f64,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        dy: f64,
    },
    /// Scale along X and Y; the canvas grows or shrinks to fit
    Scale {
        #[arg(long, default_value_t = 1.0)]
        sx: f64,
        #[arg(long, default_value_t = 1.0)]
        sy: f64,
    },
    /// Rotate about the image center
    Rotate {
        /// Angle in degrees
        #[arg(long, allow_hyphen_values = true)]
        angle: f64,
    },
    /// Shear along X and Y
    Shear {
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        x: f64,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        y: f64,
    },
    /// Mirror the image
    Reflect {
        #[arg(long, value_enum)]
        axis: AxisArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum AxisArg {
    Horizontal,
    Vertical,
    Diagonal,
}

impl From<AxisArg> for ReflectAxis {
    fn from(axis: AxisArg) -> Self {
        match axis {
            AxisArg::Horizontal => Self::Horizontal,
            AxisArg::Vertical => Self::Vertical,
            AxisArg::Diagonal => Self::Diagonal,
        }
    }
}

#[derive(Subcommand)]
enum FilterOp {
    /// Box blur (grayscale)
    Blur {
        #[arg(long, default_value_t = 5, value_parser = parse_blur_kernel)]
        kernel: usize,
    },
    /// Sharpen (grayscale)
    Sharpen,
    /// Convert to grayscale
    Grayscale,
    /// Edge map
    Edges {
        #[arg(long, value_enum, default_value_t = EdgeMethod::Canny)]
        method: EdgeMethod,
    },
    /// Linear brightness / contrast adjustment
    Brightness {
        /// Offset added to every channel (-100..=100)
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        brightness: f32,
        /// Contrast in percent (-100..=100)
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        contrast: f32,
    },
    /// Black out dim pixels by HSV thresholding
    HsvThreshold,
}

#[derive(Clone, Copy, ValueEnum)]
enum EdgeMethod {
    Sobel,
    Canny,
}

#[derive(Args)]
struct BackgroundArgs {
    /// Backdrop type: auto, solid (studio), gradient, textured, natural, minimalist, abstract, vintage
    #[arg(long, default_value = "auto")]
    scene: SceneType,

    /// Output: transparent, solid-color, blurred, custom-mask
    #[arg(long, default_value = "transparent")]
    mode: OutputMode,

    /// Backdrop color for solid-color mode (#rrggbb, r,g,b or a name)
    #[arg(long, value_parser = parse_color)]
    color: Option<Rgb<u8>>,

    /// Feathering radius in pixels (0 keeps the mask hard)
    #[arg(long, default_value_t = 3)]
    feather: u32,

    /// Skip edge-aware refinement
    #[arg(long)]
    no_refine: bool,

    /// Gaussian kernel size of the blurred backdrop
    #[arg(long, default_value_t = 25)]
    blur_kernel: usize,
}

fn parse_blur_kernel(s: &str) -> Result<usize, String> {
    let k: usize = s.parse().map_err(|_| format!("not a number: {s}"))?;
    if BLUR_KERNEL_SIZES.contains(&k) {
        Ok(k)
    } else {
        Err(format!("kernel size must be one of {BLUR_KERNEL_SIZES:?}"))
    }
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(command: Command) -> photolab::Result<()> {
    match command {
        Command::Transform { paths, op } => {
            let img = open(&paths.input)?;
            let (suffix, out) = transform(&img, &op)?;
            write(&out, &paths, suffix, false)
        }
        Command::Filter { paths, op } => {
            let rgb = open(&paths.input)?.to_rgb8();
            let (suffix, out) = filter(&rgb, &op)?;
            write(&DynamicImage::ImageRgb8(out), &paths, suffix, false)
        }
        Command::Background { paths, args } => {
            let rgb = DynamicImage::ImageRgb8(open(&paths.input)?.to_rgb8());
            let opts = RemovalOptions {
                scene: args.scene,
                output: args.mode,
                solid_color: args.color,
                feather_radius: args.feather,
                refine_edges: !args.no_refine,
                blur_kernel_size: args.blur_kernel,
            };
            let out = remove_background(&rgb, &opts)?;
            let force_png = matches!(args.mode, OutputMode::Transparent | OutputMode::CustomMask);
            write(&out, &paths, "nobg", force_png)
        }
        Command::Histogram { input } => {
            let rgb = open(&input)?.to_rgb8();
            print_histogram(&rgb, &input);
            Ok(())
        }
    }
}

fn open(path: &Path) -> photolab::Result<DynamicImage> {
    let img = open_image(path)?;
    tracing::info!(path = %path.display(), width = img.width(), height = img.height(), "loaded image");
    Ok(img)
}

fn write(img: &DynamicImage, paths: &Paths, suffix: &str, force_png: bool) -> photolab::Result<()> {
    let mut path = paths
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&paths.input, suffix));
    if force_png {
        path.set_extension("png");
    }
    save_image(img, &path)?;
    eprintln!("[OK] {}", path.display());
    Ok(())
}

fn transform(img: &DynamicImage, op: &TransformOp) -> photolab::Result<(&'static str, DynamicImage)> {
    let (w, h) = (img.width(), img.height());
    let (suffix, matrix, size) = match *op {
        TransformOp::Translate { dx, dy } => ("translate", AffineMatrix::translation(dx, dy), None),
        TransformOp::Scale { sx, sy } => (
            "scale",
            AffineMatrix::scaling(sx, sy),
            Some(scaled_output_size(w, h, sx, sy)),
        ),
        TransformOp::Rotate { angle } => ("rotate", AffineMatrix::rotation_about_center(w, h, angle), None),
        TransformOp::Shear { x, y } => ("shear", AffineMatrix::shearing(x, y), None),
        TransformOp::Reflect { axis } => {
            let axis = ReflectAxis::from(axis);
            let size = matches!(axis, ReflectAxis::Diagonal).then_some((h, w));
            ("reflect", AffineMatrix::reflection(axis, w, h), size)
        }
    };

    let out = if img.color().has_alpha() {
        DynamicImage::ImageRgba8(apply_affine(&img.to_rgba8(), &matrix, size)?)
    } else {
        DynamicImage::ImageRgb8(apply_affine(&img.to_rgb8(), &matrix, size)?)
    };
    Ok((suffix, out))
}

fn filter(rgb: &RgbImage, op: &FilterOp) -> photolab::Result<(&'static str, RgbImage)> {
    Ok(match *op {
        FilterOp::Blur { kernel } => ("blur", filters::box_blur(rgb, kernel)?),
        FilterOp::Sharpen => ("sharpen", filters::sharpen(rgb)?),
        FilterOp::Grayscale => ("grayscale", filters::grayscale(rgb)),
        FilterOp::Edges { method: EdgeMethod::Sobel } => ("edges", filters::sobel_edges(rgb)),
        FilterOp::Edges { method: EdgeMethod::Canny } => {
            let (low, high) = EDGE_CANNY_THRESHOLDS;
            ("edges", filters::canny_edges(rgb, low, high))
        }
        FilterOp::Brightness { brightness, contrast } => (
            "adjusted",
            filters::adjust_brightness_contrast(rgb, brightness, contrast),
        ),
        FilterOp::HsvThreshold => ("hsv", filters::hsv_threshold_removal(rgb)),
    })
}

fn print_histogram(rgb: &RgbImage, path: &Path) {
    let bins = filters::histogram(rgb);
    println!("{} ({}x{})", path.display(), rgb.width(), rgb.height());
    for (name, channel) in ["R", "G", "B"].iter().zip(bins.iter()) {
        let total: u64 = channel.iter().map(|&c| u64::from(c)).sum();
        let weighted: u64 = channel
            .iter()
            .zip(0u64..)
            .map(|(&c, v)| u64::from(c) * v)
            .sum();
        let (peak, peak_count) = channel
            .iter()
            .enumerate()
            .max_by_key(|&(_, &c)| c)
            .map_or((0, 0), |(v, &c)| (v, c));
        #[allow(clippy::cast_precision_loss)]
        let mean = if total == 0 { 0.0 } else { weighted as f64 / total as f64 };
        println!("  {name}: mean {mean:6.1}  peak {peak:3} ({peak_count} px)");
    }
}
