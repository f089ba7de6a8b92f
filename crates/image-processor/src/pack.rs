//! Packing into the `GS v 0` raster-image command.
//!
//! Layout: `1D 76 30 00 xL xH yL yH` followed by `(width / 8) * height`
//! payload bytes, row-major, MSB first, bit set = print a dot.

use tracing::debug;

use crate::luminance::is_dark_for_print;
use crate::raster::PrintableBitmap;
use crate::{ImageError, Result};

/// Raster command prefix: `GS v 0`, normal density.
const RASTER_PREFIX: [u8; 4] = [0x1d, 0x76, 0x30, 0x00];

/// Length of the fixed raster command header.
pub const HEADER_LEN: usize = 8;

/// Largest height the 16-bit row count can express.
const MAX_HEIGHT: u32 = u16::MAX as u32;

/// Immutable packed raster command ready for transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedCommand {
    bytes: Vec<u8>,
}

impl PackedCommand {
    /// Full command bytes, header included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Raster payload after the 8-byte header.
    pub fn payload(&self) -> &[u8] {
        self.bytes.get(HEADER_LEN..).unwrap_or(&[])
    }

    /// Bytes per row as encoded in the header.
    pub fn bytes_per_row(&self) -> usize {
        usize::from(self.bytes[4]) | usize::from(self.bytes[5]) << 8
    }

    /// Row count as encoded in the header.
    pub fn height(&self) -> u32 {
        u32::from(self.bytes[6]) | u32::from(self.bytes[7]) << 8
    }

    /// Pixel width reconstructed from the header.
    pub fn width(&self) -> u32 {
        self.bytes_per_row() as u32 * 8
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Pack a bitmap into a raster command.
///
/// Each pixel is re-checked against `dither_threshold` instead of trusting
/// the binarized colors, so transparent pixels never print.
pub fn pack_bitmap(bitmap: &PrintableBitmap, dither_threshold: u8) -> Result<PackedCommand> {
    let (width, height) = (bitmap.width(), bitmap.height());
    if height > MAX_HEIGHT {
        return Err(ImageError::HeightOverflow(height));
    }
    let bytes_per_row = bitmap.bytes_per_row();
    let row_bytes = u16::try_from(bytes_per_row).map_err(|_| {
        ImageError::InvalidDimensions(format!("{bytes_per_row} bytes per row exceeds header range"))
    })?;

    let raster = bitmap.as_raster();
    let mut bytes = Vec::with_capacity(HEADER_LEN + bytes_per_row * height as usize);
    bytes.extend_from_slice(&RASTER_PREFIX);
    bytes.extend_from_slice(&row_bytes.to_le_bytes());
    bytes.extend_from_slice(&(height as u16).to_le_bytes());

    for y in 0..height {
        for byte_idx in 0..bytes_per_row as u32 {
            let mut byte = 0u8;
            for bit in 0..8 {
                let px = raster.get_pixel(byte_idx * 8 + bit, y);
                if is_dark_for_print(px.0, dither_threshold) {
                    byte |= 1 << (7 - bit);
                }
            }
            bytes.push(byte);
        }
    }

    debug!(width, height, total_bytes = bytes.len(), "Packed raster command");
    Ok(PackedCommand { bytes })
}
