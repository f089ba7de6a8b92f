//! Floyd-Steinberg error-diffusion dithering.
//!
//! Works on luminance only, since the printer output is binary. Error is
//! accumulated in a single `width * height` buffer and pushed to the
//! unprocessed neighbors:
//! - Right:        7/16
//! - Bottom-left:  3/16
//! - Bottom:       5/16
//! - Bottom-right: 1/16

use tracing::debug;

use crate::luminance::luminance;
use crate::raster::{BLACK, PrintableBitmap, RasterBuffer, WHITE, ensure_non_empty};
use crate::{ImageError, Result};

/// Default luminance threshold for the dither decision.
pub const DEFAULT_DITHER_THRESHOLD: u8 = 112;

/// Threshold used by the older 58mm/80mm print path.
pub const LEGACY_DITHER_THRESHOLD: u8 = 128;

/// Dither `img` in place, replacing every pixel with opaque black or white.
pub fn dither_in_place(img: &mut RasterBuffer, threshold: u8) {
    let (width, height) = img.dimensions();
    debug!(width, height, threshold, "Applying Floyd-Steinberg dithering");

    let (w, h) = (width as usize, height as usize);
    let threshold = f32::from(threshold);
    let mut error = vec![0f32; w * h];

    for y in 0..h {
        for x in 0..w {
            let px = img.get_pixel_mut(x as u32, y as u32);
            let [r, g, b, _] = px.0;
            let adjusted = luminance(r, g, b) + error[y * w + x];
            let (out, value) = if adjusted >= threshold {
                (WHITE, 255.0)
            } else {
                (BLACK, 0.0)
            };
            *px = out;

            distribute_error(&mut error, x, y, w, h, adjusted - value);
        }
    }

    debug!("Floyd-Steinberg dithering complete");
}

/// Dither a width-normalized raster into a [`PrintableBitmap`].
pub fn floyd_steinberg_dither(mut img: RasterBuffer, threshold: u8) -> Result<PrintableBitmap> {
    ensure_non_empty(&img)?;
    if img.width() % 8 != 0 {
        return Err(ImageError::UnalignedWidth(img.width()));
    }
    dither_in_place(&mut img, threshold);
    Ok(PrintableBitmap::from_dithered(img))
}

/// Distribute quantization error to neighboring pixels.
fn distribute_error(buffer: &mut [f32], x: usize, y: usize, w: usize, h: usize, err: f32) {
    let idx = y * w + x;

    // Right: 7/16
    if x + 1 < w {
        buffer[idx + 1] += err * 7.0 / 16.0;
    }
    if y + 1 < h {
        // Bottom-left: 3/16
        if x > 0 {
            buffer[idx + w - 1] += err * 3.0 / 16.0;
        }
        // Bottom: 5/16
        buffer[idx + w] += err * 5.0 / 16.0;
        // Bottom-right: 1/16
        if x + 1 < w {
            buffer[idx + w + 1] += err / 16.0;
        }
    }
}
