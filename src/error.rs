//! Error types for the photolab crate.

/// Errors that can occur while transforming, filtering or segmenting an image.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The image has a zero width or height.
    #[error("{context}: image dimensions must be non-zero")]
    EmptyImage {
        /// Operation that rejected the image.
        context: &'static str,
    },

    /// The image has the wrong number of channels for the operation.
    #[error("expected a {expected}-channel image, got {actual} channels")]
    ChannelCount {
        /// Channel count the operation requires.
        expected: u8,
        /// Channel count of the supplied image.
        actual: u8,
    },

    /// A scene type string did not name any known background type.
    #[error("unknown scene type: {0:?}")]
    UnknownSceneType(String),

    /// An output mode string did not name any known compositing mode.
    #[error("unsupported output mode: {0:?}")]
    UnknownOutputMode(String),

    /// A convolution kernel is empty, not square, or has an even side.
    #[error("kernel must be square with an odd side, got {rows}x{cols}")]
    InvalidKernel {
        /// Number of kernel rows.
        rows: usize,
        /// Number of kernel columns.
        cols: usize,
    },

    /// The affine matrix cannot be inverted, so no source pixel can be found.
    #[error("degenerate affine mapping (determinant {determinant:e})")]
    DegenerateTransform {
        /// Determinant of the linear part of the matrix.
        determinant: f64,
    },

    /// A requested output size has a zero dimension.
    #[error("invalid output size {width}x{height}")]
    InvalidOutputSize {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },

    /// A color string could not be parsed.
    #[error("invalid color: {0:?}")]
    InvalidColor(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred during image decoding or encoding.
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
