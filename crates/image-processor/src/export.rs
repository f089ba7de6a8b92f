//! Lossless export of a printable bitmap for previews.

use std::io::Cursor;

use image::ImageFormat;

use crate::raster::PrintableBitmap;
use crate::{ImageError, Result};

/// Encode the bitmap as PNG bytes.
pub fn encode_png(bitmap: &PrintableBitmap) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    bitmap
        .as_raster()
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| ImageError::Encode(e.to_string()))?;
    Ok(out.into_inner())
}
