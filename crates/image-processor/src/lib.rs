//! Image processing pipeline for thermal receipt printer output.
//!
//! Turns an arbitrary RGBA raster into a byte-aligned, pure black/white
//! bitmap and packs it into the `GS v 0` raster-image command:
//!
//! trim margins → normalize width → Floyd-Steinberg dither → pack.

pub mod dither;
pub mod export;
pub mod luminance;
pub mod pack;
pub mod pipeline;
pub mod raster;
pub mod resize;
pub mod trim;

// Re-exports for convenience
pub use dither::floyd_steinberg_dither;
pub use export::encode_png;
pub use pack::{PackedCommand, pack_bitmap};
pub use pipeline::{PaperWidth, PipelineConfig, decode_raster, prepare_for_print};
pub use raster::{PrintableBitmap, RasterBuffer};
pub use resize::normalize_width;
pub use trim::trim_margins;

/// Standard 58mm thermal paper width in device pixels.
pub const PAPER_WIDTH: u32 = 384;

/// Errors raised by the image pipeline.
///
/// Every variant is a caller contract violation; none of them is retried.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Source image is empty ({width}x{height})")]
    EmptyInput { width: u32, height: u32 },

    #[error("Invalid image dimensions: {0}")]
    InvalidDimensions(String),

    #[error("Width {0} is not a multiple of 8")]
    UnalignedWidth(u32),

    #[error("Bitmap height {0} exceeds the 65535 row limit of the raster command")]
    HeightOverflow(u32),

    #[error("Pixel ({x}, {y}) is not pure black or white")]
    NotBinary { x: u32, y: u32 },

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),
}

impl ImageError {
    /// All pipeline errors describe bad input rather than a transient fault.
    pub fn is_input_error(&self) -> bool {
        !matches!(self, ImageError::Encode(_))
    }
}

/// Result type alias for image pipeline operations.
pub type Result<T> = std::result::Result<T, ImageError>;
