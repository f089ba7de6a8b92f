//! End-to-end preparation of a source raster for printing.

use tracing::{debug, info};

use crate::dither::{DEFAULT_DITHER_THRESHOLD, LEGACY_DITHER_THRESHOLD, floyd_steinberg_dither};
use crate::luminance::DEFAULT_WHITE_THRESHOLD;
use crate::raster::{PrintableBitmap, RasterBuffer, ensure_non_empty};
use crate::resize::normalize_width;
use crate::trim::trim_margins;
use crate::{ImageError, PAPER_WIDTH, Result};

/// Supported paper widths and their printable dot counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperWidth {
    /// 58mm paper, 384 dots.
    Mm58,
    /// 80mm paper, 576 dots.
    Mm80,
}

impl PaperWidth {
    pub fn dots(self) -> u32 {
        match self {
            PaperWidth::Mm58 => PAPER_WIDTH,
            PaperWidth::Mm80 => 576,
        }
    }

    /// Look up the paper width matching a dot count.
    pub fn from_dots(dots: u32) -> Option<Self> {
        match dots {
            384 => Some(PaperWidth::Mm58),
            576 => Some(PaperWidth::Mm80),
            _ => None,
        }
    }
}

/// Per-profile constants consumed by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Output width in device pixels (multiple of 8).
    pub target_width: u32,

    /// Luminance below which a pixel becomes a printed dot.
    pub dither_threshold: u8,

    /// Luminance at or above which a border pixel counts as blank margin.
    pub white_threshold: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_width: PaperWidth::Mm58.dots(),
            dither_threshold: DEFAULT_DITHER_THRESHOLD,
            white_threshold: DEFAULT_WHITE_THRESHOLD,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Profile of the older 58mm/80mm print path (threshold 128).
    pub fn legacy() -> Self {
        Self {
            dither_threshold: LEGACY_DITHER_THRESHOLD,
            ..Self::default()
        }
    }

    /// Builder: set paper width.
    pub fn with_paper(mut self, paper: PaperWidth) -> Self {
        self.target_width = paper.dots();
        self
    }

    /// Builder: set an explicit target width.
    ///
    /// The width is checked when the pipeline runs: anything that is not a
    /// positive multiple of 8 fails with `UnalignedWidth`.
    pub fn with_target_width(mut self, width: u32) -> Self {
        self.target_width = width;
        self
    }

    /// Builder: set dither threshold.
    pub fn with_dither_threshold(mut self, val: u8) -> Self {
        self.dither_threshold = val;
        self
    }

    /// Builder: set white threshold used by margin trimming.
    pub fn with_white_threshold(mut self, val: f32) -> Self {
        self.white_threshold = val;
        self
    }
}

/// Decode encoded image bytes (PNG, JPEG, ...) into an RGBA raster.
pub fn decode_raster(bytes: &[u8]) -> Result<RasterBuffer> {
    if bytes.is_empty() {
        return Err(ImageError::Decode("no image data".into()));
    }
    let img = image::load_from_memory(bytes)
        .map_err(|e| ImageError::Decode(e.to_string()))?
        .to_rgba8();
    ensure_non_empty(&img)?;
    debug!(width = img.width(), height = img.height(), "Decoded source image");
    Ok(img)
}

/// Trim, normalize and dither a source raster into a printable bitmap.
pub fn prepare_for_print(raster: RasterBuffer, config: &PipelineConfig) -> Result<PrintableBitmap> {
    ensure_non_empty(&raster)?;
    if config.target_width == 0 || config.target_width % 8 != 0 {
        return Err(ImageError::UnalignedWidth(config.target_width));
    }
    let (src_w, src_h) = raster.dimensions();

    let trimmed = trim_margins(raster, config.white_threshold);
    let normalized = normalize_width(trimmed, config.target_width)?;
    let bitmap = floyd_steinberg_dither(normalized, config.dither_threshold)?;

    info!(
        src_w,
        src_h,
        width = bitmap.width(),
        height = bitmap.height(),
        "Prepared bitmap for print"
    );
    Ok(bitmap)
}
