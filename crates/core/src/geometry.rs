//! Shape geometry and the positional heuristics built on it.
//!
//! All values are EMUs (914400 per inch), the unit presentation files use.
//! None of these predicates look at text.

use serde::{Deserialize, Serialize};

/// EMUs per inch.
pub const EMU_PER_INCH: i64 = 914_400;

/// Position and size of a shape on its slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Rect {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Centre point of the rectangle.
    pub fn center(&self) -> (i64, i64) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }
}

/// Slide dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideSize {
    pub width: i64,
    pub height: i64,
}

impl Default for SlideSize {
    /// 4:3 at 10in x 7.5in.
    fn default() -> Self {
        Self {
            width: 9_144_000,
            height: 6_858_000,
        }
    }
}

/// A picture wide and tall enough to be a slide background.
pub fn is_large_background(rect: &Rect) -> bool {
    rect.width > 8_000_000 && rect.height > 5_000_000
}

/// A rounded rectangle big enough to be a section title box overlay.
pub fn is_title_box(rect: &Rect) -> bool {
    rect.width > 6_000_000 && rect.height > 2_000_000
}

/// Left edge lies in the rightmost 15% of the slide.
///
/// Compendium decks print page furniture there; hymn numbers never sit in it.
pub fn is_in_right_corner(rect: &Rect, slide: &SlideSize) -> bool {
    rect.x as f64 > slide.width as f64 * 0.85
}

/// Top edge lies inside the title bar band of a service slide.
pub fn is_in_title_band(rect: &Rect) -> bool {
    rect.y <= 500_000
}

/// Top edge lies within the first inch of the slide.
pub fn is_in_header_area(rect: &Rect) -> bool {
    rect.y <= 1_000_000
}

/// Left edge is past the 5in mark, where offertory QR codes are placed.
pub fn is_on_right_half(rect: &Rect) -> bool {
    rect.x > 5 * EMU_PER_INCH
}

/// A non-text, non-picture shape that is decoration rather than content.
///
/// Content sits in the central 60% of the slide; anything whose centre falls
/// in the 20% margins, or that is small in both dimensions, is decoration.
pub fn is_decorative(rect: &Rect, slide: &SlideSize) -> bool {
    let (cx, cy) = rect.center();
    let h_margin = slide.width as f64 * 0.2;
    let v_margin = slide.height as f64 * 0.2;

    let outside_content = (cx as f64) < h_margin
        || (cx as f64) > slide.width as f64 - h_margin
        || (cy as f64) < v_margin
        || (cy as f64) > slide.height as f64 - v_margin;

    let small = (rect.width as f64) < slide.width as f64 * 0.4
        && (rect.height as f64) < slide.height as f64 * 0.4;

    outside_content || small
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_large_background() {
        assert!(is_large_background(&Rect::new(0, 0, 9_144_000, 6_858_000)));
        assert!(!is_large_background(&Rect::new(0, 0, 9_144_000, 4_000_000)));
        assert!(!is_large_background(&Rect::new(0, 0, 3_000_000, 6_858_000)));
    }

    #[test]
    fn test_title_box() {
        assert!(is_title_box(&Rect::new(1_000_000, 2_000_000, 7_000_000, 2_500_000)));
        assert!(!is_title_box(&Rect::new(1_000_000, 2_000_000, 7_000_000, 1_000_000)));
    }

    #[test]
    fn test_right_corner() {
        let slide = SlideSize::default();
        assert!(is_in_right_corner(&Rect::new(8_500_000, 0, 500_000, 300_000), &slide));
        assert!(!is_in_right_corner(&Rect::new(4_000_000, 0, 500_000, 300_000), &slide));
    }

    #[test]
    fn test_bands() {
        assert!(is_in_title_band(&Rect::new(0, 0, 9_144_000, 486_000)));
        assert!(!is_in_title_band(&Rect::new(0, 600_000, 9_144_000, 486_000)));
        assert!(is_in_header_area(&Rect::new(0, 900_000, 100, 100)));
        assert!(is_on_right_half(&Rect::new(6_373_368, 987_552, 2_779_776, 2_862_072)));
    }

    #[test]
    fn test_decorative() {
        let slide = SlideSize::default();
        // Small checkmark in a corner
        assert!(is_decorative(&Rect::new(100_000, 100_000, 300_000, 300_000), &slide));
        // Small shape in the centre is still decoration
        assert!(is_decorative(&Rect::new(4_400_000, 3_300_000, 300_000, 300_000), &slide));
        // Large centred content frame
        assert!(!is_decorative(&Rect::new(1_000_000, 1_000_000, 7_144_000, 4_858_000), &slide));
    }
}
