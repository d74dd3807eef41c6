/// Integer rectangle in hardware pixels.
///
/// Used for viewports, target bounds and the touch key table, where values are
/// whole pixels and clamping must not drift.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl PixelRect {
    #[inline]
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Builds a rectangle from inclusive corner coordinates.
    #[inline]
    pub const fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }

    #[inline]
    pub const fn right(self) -> i32 {
        self.x + self.w
    }

    #[inline]
    pub const fn bottom(self) -> i32 {
        self.y + self.h
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// Inclusive hit test on both edges.
    #[inline]
    pub fn contains_inclusive(self, x: i32, y: i32) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    #[inline]
    pub fn to_rect(self) -> super::Rect {
        super::Rect::new(self.x as f32, self.y as f32, self.w as f32, self.h as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_hit_test_is_inclusive() {
        let r = PixelRect::from_corners(1, 328, 91, 498);
        assert_eq!((r.w, r.h), (90, 170));
        assert!(r.contains_inclusive(1, 328));
        assert!(r.contains_inclusive(91, 498));
        assert!(!r.contains_inclusive(92, 400));
        assert!(!r.contains_inclusive(0, 400));
    }
}
