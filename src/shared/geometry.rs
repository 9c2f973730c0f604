//! Geometry value types shared by the reconciler and the native platform layer.
//!
//! All quantities are signed pixels, matching the native coordinate space where
//! frames can sit partially off-screen.

use serde::{Deserialize, Serialize};

/// Screen position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Width and height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// True when both dimensions are known (strictly positive)
    pub fn is_known(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Window rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Thickness of the decorative frame around a client area (borders, caption, menu bar)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Insets {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Insets {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    /// Total extra width the frame adds to the client area
    pub fn horizontal(&self) -> i32 {
        self.left + self.right
    }

    /// Total extra height the frame adds to the client area
    pub fn vertical(&self) -> i32 {
        self.top + self.bottom
    }

    /// Frame rectangle that encloses a client area of `size` at frame position `origin`
    pub fn outer(&self, origin: Point, size: Size) -> Rect {
        Rect::new(
            origin.x,
            origin.y,
            size.width.saturating_add(self.horizontal()),
            size.height.saturating_add(self.vertical()),
        )
    }

    /// Client size left over inside a frame rectangle
    pub fn inner_size(&self, frame: &Rect) -> Size {
        Size::new(
            (frame.width - self.horizontal()).max(0),
            (frame.height - self.vertical()).max(0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outer_and_inner_are_inverse() {
        let insets = Insets::new(4, 23, 4, 4);
        let frame = insets.outer(Point::new(10, 10), Size::new(300, 200));
        assert_eq!(frame, Rect::new(10, 10, 308, 227));
        assert_eq!(insets.inner_size(&frame), Size::new(300, 200));
    }

    #[test]
    fn test_inner_size_never_negative() {
        let insets = Insets::new(4, 23, 4, 4);
        assert_eq!(insets.inner_size(&Rect::new(0, 0, 2, 2)), Size::new(0, 0));
    }
}
