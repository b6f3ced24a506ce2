//! Placement of invisible text runs over detected regions.

use crate::ocr::Polygon;

pub const MIN_FONT_SIZE: f64 = 1.0;
pub const MAX_FONT_SIZE: f64 = 100.0;

/// Initial font size as a fraction of the region height.
const HEIGHT_FILL: f64 = 0.9;

/// Advance width in em: Latin-1 is half width, everything else full width.
pub fn char_advance(c: char) -> f64 {
    if (c as u32) <= 0xFF {
        0.5
    } else {
        1.0
    }
}

pub fn text_width(text: &str, font_size: f64) -> f64 {
    text.chars().map(char_advance).sum::<f64>() * font_size
}

/// Shrinks from 0.9 × height one point at a time until the run fits the
/// width or hits the floor, then clamps to the supported range.
pub fn fit_font_size(text: &str, width: f64, height: f64) -> f64 {
    let mut size = HEIGHT_FILL * height;
    while text_width(text, size) > width && size > MIN_FONT_SIZE {
        size -= 1.0;
    }
    size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
}

/// Region in top-down image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl TextRect {
    /// Corners 0 and 2 of the polygon, both shifted down by `y_offset`.
    pub fn from_polygon(polygon: &Polygon, y_offset: f64) -> Option<Self> {
        let p0 = polygon.first()?;
        let p2 = polygon.get(2)?;
        Some(Self {
            x0: p0[0],
            y0: p0[1] + y_offset,
            x1: p2[0],
            y1: p2[1] + y_offset,
        })
    }

    pub fn width(&self) -> f64 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.y1 - self.y0).max(0.0)
    }
}

/// One text run in PDF user space (origin bottom-left).
#[derive(Debug, Clone, PartialEq)]
pub struct TextPlacement {
    pub x: f64,
    pub baseline: f64,
    pub font_size: f64,
    pub text: String,
}

/// Lays out `text` at the region's top-left corner, which becomes the
/// baseline. Blank text yields nothing.
pub fn place_text(
    polygon: &Polygon,
    text: &str,
    page_height: f64,
    y_offset: f64,
) -> Option<TextPlacement> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let rect = TextRect::from_polygon(polygon, y_offset)?;
    Some(TextPlacement {
        x: rect.x0,
        baseline: page_height - rect.y0,
        font_size: fit_font_size(text, rect.width(), rect.height()),
        text: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_polygon(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
        vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1]]
    }

    #[test]
    fn test_text_width_metric() {
        assert_eq!(text_width("ab", 10.0), 10.0);
        assert_eq!(text_width("扫描", 10.0), 20.0);
        assert_eq!(text_width("é", 10.0), 5.0);
    }

    #[test]
    fn test_fit_font_size_fits_width() {
        // 0.9 × 20 = 18 fits: 4 × 0.5 × 18 = 36 ≤ 100.
        assert_eq!(fit_font_size("abcd", 100.0, 20.0), 18.0);
        // 10 CJK chars in 100pt: 18 → 10.
        assert_eq!(fit_font_size("一二三四五六七八九十", 100.0, 20.0), 10.0);
    }

    #[test]
    fn test_fit_font_size_clamps() {
        assert_eq!(fit_font_size("x", 10_000.0, 500.0), MAX_FONT_SIZE);
        assert_eq!(fit_font_size("very long text here", 0.0, 20.0), MIN_FONT_SIZE);
        assert_eq!(fit_font_size("x", 100.0, 0.0), MIN_FONT_SIZE);
    }

    #[test]
    fn test_rect_applies_offset_and_clamps() {
        let rect = TextRect::from_polygon(&rect_polygon(10.0, 20.0, 5.0, 40.0), 30.0).unwrap();
        assert_eq!(rect.y0, 50.0);
        assert_eq!(rect.y1, 70.0);
        assert_eq!(rect.width(), 0.0);
        assert_eq!(rect.height(), 20.0);
    }

    #[test]
    fn test_place_text_baseline_in_pdf_space() {
        let placement = place_text(&rect_polygon(10.0, 100.0, 210.0, 120.0), " Hi ", 1000.0, 30.0)
            .unwrap();
        assert_eq!(placement.x, 10.0);
        assert_eq!(placement.baseline, 870.0);
        assert_eq!(placement.font_size, 18.0);
        assert_eq!(placement.text, "Hi");
    }

    #[test]
    fn test_place_text_skips_blank() {
        assert!(place_text(&rect_polygon(0.0, 0.0, 10.0, 10.0), "   ", 100.0, 30.0).is_none());
    }
}
