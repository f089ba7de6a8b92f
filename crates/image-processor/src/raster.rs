//! Raster buffer types flowing through the pipeline.

use image::{Rgba, RgbaImage};

use crate::{ImageError, Result};

/// Row-major RGBA8 pixel grid (`data.len() == width * height * 4`).
pub type RasterBuffer = RgbaImage;

/// Opaque paper white.
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Opaque printed dot.
pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Reject zero-dimension buffers before they enter the pipeline.
pub fn ensure_non_empty(img: &RasterBuffer) -> Result<()> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(ImageError::EmptyInput { width, height });
    }
    Ok(())
}

/// Composite every pixel over paper white, leaving the raster fully opaque.
///
/// Fully transparent pixels become white regardless of their stored color.
pub fn flatten_onto_white(img: &mut RasterBuffer) {
    for px in img.pixels_mut() {
        let [r, g, b, a] = px.0;
        if a == u8::MAX {
            continue;
        }
        let blend = |c: u8| {
            let (c, a) = (u32::from(c), u32::from(a));
            ((c * a + 255 * (255 - a) + 127) / 255) as u8
        };
        *px = Rgba([blend(r), blend(g), blend(b), u8::MAX]);
    }
}

/// A finalized raster ready for packing.
///
/// Width is a multiple of 8 and every pixel is either [`BLACK`] or [`WHITE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintableBitmap {
    image: RgbaImage,
}

impl PrintableBitmap {
    /// Validate an already binarized raster.
    pub fn try_from_raster(image: RgbaImage) -> Result<Self> {
        ensure_non_empty(&image)?;
        if image.width() % 8 != 0 {
            return Err(ImageError::UnalignedWidth(image.width()));
        }
        if let Some((x, y, _)) = image
            .enumerate_pixels()
            .find(|(_, _, px)| **px != BLACK && **px != WHITE)
        {
            return Err(ImageError::NotBinary { x, y });
        }
        Ok(Self { image })
    }

    /// Wrap a raster the dither engine has just binarized.
    pub(crate) fn from_dithered(image: RgbaImage) -> Self {
        debug_assert!(image.width() % 8 == 0);
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Number of packed bytes per printed row.
    pub fn bytes_per_row(&self) -> usize {
        (self.image.width() / 8) as usize
    }

    pub fn is_black(&self, x: u32, y: u32) -> bool {
        *self.image.get_pixel(x, y) == BLACK
    }

    pub fn as_raster(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_raster(self) -> RgbaImage {
        self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_buffer_rejected() {
        let img = RgbaImage::new(0, 10);
        assert!(matches!(
            ensure_non_empty(&img),
            Err(ImageError::EmptyInput { width: 0, height: 10 })
        ));
    }

    #[test]
    fn test_flatten_onto_white() {
        let mut img = RgbaImage::from_pixel(3, 1, Rgba([0, 0, 0, 0]));
        img.put_pixel(1, 0, BLACK);
        img.put_pixel(2, 0, Rgba([0, 0, 0, 128]));
        flatten_onto_white(&mut img);
        assert_eq!(*img.get_pixel(0, 0), WHITE);
        assert_eq!(*img.get_pixel(1, 0), BLACK);
        assert_eq!(*img.get_pixel(2, 0), Rgba([127, 127, 127, 255]));
    }

    #[test]
    fn test_printable_requires_aligned_width() {
        let img = RgbaImage::from_pixel(10, 2, WHITE);
        assert!(matches!(
            PrintableBitmap::try_from_raster(img),
            Err(ImageError::UnalignedWidth(10))
        ));
    }

    #[test]
    fn test_printable_requires_binary_pixels() {
        let mut img = RgbaImage::from_pixel(8, 2, WHITE);
        img.put_pixel(3, 1, Rgba([128, 128, 128, 255]));
        assert!(matches!(
            PrintableBitmap::try_from_raster(img),
            Err(ImageError::NotBinary { x: 3, y: 1 })
        ));
    }

    #[test]
    fn test_printable_accepts_black_and_white() {
        let mut img = RgbaImage::from_pixel(16, 3, WHITE);
        img.put_pixel(0, 0, BLACK);
        let bitmap = PrintableBitmap::try_from_raster(img).unwrap();
        assert_eq!(bitmap.bytes_per_row(), 2);
        assert!(bitmap.is_black(0, 0));
        assert!(!bitmap.is_black(1, 0));
    }
}
