//! Margin trimming.
//!
//! Strips near-white or transparent rows and columns from the borders of a
//! raster, then widens the kept window to a multiple of 8 pixels so the
//! result packs into whole bytes.

use image::imageops;
use tracing::debug;

use crate::luminance::is_near_white;
use crate::raster::RasterBuffer;

/// Inclusive pixel window kept after trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    left: u32,
    right: u32,
    top: u32,
    bottom: u32,
}

impl Window {
    fn width(&self) -> u32 {
        self.right - self.left + 1
    }

    fn height(&self) -> u32 {
        self.bottom - self.top + 1
    }
}

/// Remove blank margins from `img`.
///
/// A blank image is returned unchanged. An image narrower than a single byte
/// keeps its full width and only loses blank rows.
pub fn trim_margins(img: RasterBuffer, white_threshold: f32) -> RasterBuffer {
    let (width, height) = img.dimensions();
    let Some(content) = content_window(&img, white_threshold) else {
        debug!(width, height, "No content found, skipping trim");
        return img;
    };

    let window = align_window(content, width).unwrap_or_else(|| {
        debug!(width, "Image narrower than one byte, trimming rows only");
        Window {
            left: 0,
            right: width - 1,
            ..content
        }
    });

    if window.left == 0 && window.top == 0 && window.width() == width && window.height() == height
    {
        return img;
    }

    debug!(
        width,
        height,
        left = window.left,
        top = window.top,
        trimmed_width = window.width(),
        trimmed_height = window.height(),
        "Trimming margins"
    );

    imageops::crop_imm(&img, window.left, window.top, window.width(), window.height()).to_image()
}

/// Bounding box of non-blank pixels, or `None` when everything is blank.
fn content_window(img: &RasterBuffer, white_threshold: f32) -> Option<Window> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return None;
    }

    let blank = |x: u32, y: u32| is_near_white(img.get_pixel(x, y).0, white_threshold);
    let row_blank = |y: u32| (0..width).all(|x| blank(x, y));

    let top = (0..height).find(|&y| !row_blank(y))?;
    let bottom = (top..height).rev().find(|&y| !row_blank(y))?;

    let col_blank = |x: u32| (top..=bottom).all(|y| blank(x, y));
    let left = (0..width).find(|&x| !col_blank(x))?;
    let right = (left..width).rev().find(|&x| !col_blank(x))?;

    Some(Window {
        left,
        right,
        top,
        bottom,
    })
}

/// Grow the window horizontally to a multiple of 8, clamped to `buf_width`.
///
/// The deficit is split evenly with the odd pixel on the right. Padding a
/// clamped side cannot absorb moves to the other side; once both sides hit
/// the buffer edge the window shrinks from the right instead.
fn align_window(mut window: Window, buf_width: u32) -> Option<Window> {
    let rem = window.width() % 8;
    if rem == 0 {
        return Some(window);
    }

    let deficit = 8 - rem;
    let pad_left = deficit / 2;
    let pad_right = deficit - pad_left;

    let left_room = window.left;
    let right_room = buf_width - 1 - window.right;

    let mut grow_left = pad_left.min(left_room);
    let mut grow_right = pad_right.min(right_room);
    let mut leftover = deficit - grow_left - grow_right;

    let extra_right = leftover.min(right_room - grow_right);
    grow_right += extra_right;
    leftover -= extra_right;

    let extra_left = leftover.min(left_room - grow_left);
    grow_left += extra_left;
    leftover -= extra_left;

    window.left -= grow_left;
    window.right += grow_right;

    if leftover > 0 {
        let excess = window.width() % 8;
        if window.width() < 8 {
            return None;
        }
        window.right -= excess;
    }

    Some(window)
}
