//! Luminance and threshold helpers shared by trimming, dithering and packing.

/// Alpha at or below this value is treated as background.
const TRANSPARENT_ALPHA: u8 = 10;

/// Default luminance above which a pixel counts as paper white.
pub const DEFAULT_WHITE_THRESHOLD: f32 = 250.0;

/// ITU-R BT.601 luma of an RGB triple, in the 0.0..=255.0 range.
pub fn luminance(r: u8, g: u8, b: u8) -> f32 {
    0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b)
}

/// Whether a pixel belongs to the blank margin around the content.
///
/// Near-transparent pixels are background regardless of their color.
pub fn is_near_white(px: [u8; 4], white_threshold: f32) -> bool {
    let [r, g, b, a] = px;
    a <= TRANSPARENT_ALPHA || luminance(r, g, b) >= white_threshold
}

/// Whether a pixel should burn a dot on paper.
///
/// Fully transparent pixels never print, whatever their color.
pub fn is_dark_for_print(px: [u8; 4], dither_threshold: u8) -> bool {
    let [r, g, b, a] = px;
    a != 0 && luminance(r, g, b) < f32::from(dither_threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luminance_extremes() {
        assert!(luminance(0, 0, 0).abs() < f32::EPSILON);
        assert!((luminance(255, 255, 255) - 255.0).abs() < 0.01);
    }

    #[test]
    fn test_luminance_weights() {
        assert!((luminance(255, 0, 0) - 76.245).abs() < 0.01);
        assert!((luminance(0, 255, 0) - 149.685).abs() < 0.01);
        assert!((luminance(0, 0, 255) - 29.07).abs() < 0.01);
    }

    #[test]
    fn test_transparent_is_near_white() {
        assert!(is_near_white([0, 0, 0, 10], DEFAULT_WHITE_THRESHOLD));
        assert!(!is_near_white([0, 0, 0, 11], DEFAULT_WHITE_THRESHOLD));
    }

    #[test]
    fn test_near_white_threshold() {
        assert!(is_near_white([251, 251, 251, 255], DEFAULT_WHITE_THRESHOLD));
        assert!(!is_near_white([248, 248, 248, 255], DEFAULT_WHITE_THRESHOLD));
    }

    #[test]
    fn test_dark_for_print() {
        assert!(is_dark_for_print([0, 0, 0, 255], 112));
        assert!(is_dark_for_print([111, 111, 111, 1], 112));
        assert!(!is_dark_for_print([113, 113, 113, 255], 112));
        assert!(!is_dark_for_print([0, 0, 0, 0], 112));
    }
}
