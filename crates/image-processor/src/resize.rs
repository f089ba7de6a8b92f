//! Width normalization for thermal printer output.
//!
//! Rescales a raster to the printer's exact dot width using Lanczos3
//! filtering, centering the content on a white canvas.

use image::imageops::{self, FilterType};
use tracing::debug;

use crate::raster::{RasterBuffer, WHITE, ensure_non_empty, flatten_onto_white};
use crate::{ImageError, Result};

/// Printed bitmaps are never shorter than one byte-row band.
const MIN_HEIGHT: u32 = 8;

/// Rescale `img` so it is exactly `target_width` pixels wide.
///
/// The aspect ratio is preserved; the output height is whatever the
/// uniform scale produces (at least 8 rows). An input already at the target
/// width is not resampled. Either way the output is opaque: transparency is
/// composited over white.
pub fn normalize_width(mut img: RasterBuffer, target_width: u32) -> Result<RasterBuffer> {
    ensure_non_empty(&img)?;
    if target_width == 0 || target_width % 8 != 0 {
        return Err(ImageError::UnalignedWidth(target_width));
    }

    let (orig_w, orig_h) = img.dimensions();
    if orig_w == target_width {
        debug!(width = target_width, "Image already at target width, skipping resize");
        flatten_onto_white(&mut img);
        return Ok(img);
    }

    let scale = f64::from(target_width) / f64::from(orig_w);
    let scaled_width = ((f64::from(orig_w) * scale).round() as u32).clamp(1, target_width);
    let scaled_height = ((f64::from(orig_h) * scale).round() as u32).max(MIN_HEIGHT);

    debug!(
        orig_w,
        orig_h,
        scaled_width,
        scaled_height,
        target_width,
        "Resizing image to target width"
    );

    let scaled = imageops::resize(&img, scaled_width, scaled_height, FilterType::Lanczos3);

    let mut canvas = RasterBuffer::from_pixel(target_width, scaled_height, WHITE);
    let offset_x = (target_width - scaled_width) / 2;
    imageops::overlay(&mut canvas, &scaled, i64::from(offset_x), 0);

    Ok(canvas)
}
