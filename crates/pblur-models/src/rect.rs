use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in pixel coordinates, corner form.
///
/// Detector adapters produce these fresh for every frame; they are never
/// retained across frames. A rect is well-formed when `x1 < x2` and
/// `y1 < y2` after clamping to the frame bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PixelRect {
    /// X coordinate of the top-left corner.
    pub x1: i32,
    /// Y coordinate of the top-left corner.
    pub y1: i32,
    /// X coordinate of the bottom-right corner (exclusive).
    pub x2: i32,
    /// Y coordinate of the bottom-right corner (exclusive).
    pub y2: i32,
}

impl PixelRect {
    /// Create a new rectangle from corner coordinates.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    /// Area in pixels. Zero when the rect is degenerate.
    pub fn area(&self) -> i64 {
        if self.is_empty() {
            return 0;
        }
        self.width() as i64 * self.height() as i64
    }

    /// True when the rect covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.x2 <= self.x1 || self.y2 <= self.y1
    }

    /// Clamp the rect to `width` x `height` frame bounds.
    ///
    /// Returns `None` when the clamped extent is empty (the caller skips
    /// such regions instead of treating them as an error).
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<PixelRect> {
        let clamped = PixelRect {
            x1: self.x1.clamp(0, width as i32),
            y1: self.y1.clamp(0, height as i32),
            x2: self.x2.clamp(0, width as i32),
            y2: self.y2.clamp(0, height as i32),
        };
        if clamped.is_empty() {
            None
        } else {
            Some(clamped)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area() {
        let rect = PixelRect::new(10, 20, 30, 50);
        assert_eq!(rect.width(), 20);
        assert_eq!(rect.height(), 30);
        assert_eq!(rect.area(), 600);
    }

    #[test]
    fn test_degenerate_rect_has_zero_area() {
        assert_eq!(PixelRect::new(10, 10, 10, 40).area(), 0);
        assert_eq!(PixelRect::new(10, 10, 5, 40).area(), 0);
    }

    #[test]
    fn test_clamp_inside_bounds_is_identity() {
        let rect = PixelRect::new(5, 5, 50, 50);
        assert_eq!(rect.clamp_to(100, 100), Some(rect));
    }

    #[test]
    fn test_clamp_trims_overhang() {
        let rect = PixelRect::new(-10, -10, 120, 90);
        assert_eq!(rect.clamp_to(100, 80), Some(PixelRect::new(0, 0, 100, 80)));
    }

    #[test]
    fn test_clamp_fully_outside_is_none() {
        let rect = PixelRect::new(200, 200, 300, 300);
        assert_eq!(rect.clamp_to(100, 100), None);
    }
}
