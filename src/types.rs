//! Geometry primitives shared by reconciliation, persistence and overlays

use serde::{Deserialize, Serialize};

/// Top-left corner in the global desktop coordinate space
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Width and height in pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle: origin plus resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Position,
    pub size: Dimensions,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            origin: Position::new(x, y),
            size: Dimensions::new(width, height),
        }
    }

    pub fn left(&self) -> i64 {
        i64::from(self.origin.x)
    }

    pub fn right(&self) -> i64 {
        i64::from(self.origin.x) + i64::from(self.size.width)
    }

    pub fn top(&self) -> i64 {
        i64::from(self.origin.y)
    }

    pub fn bottom(&self) -> i64 {
        i64::from(self.origin.y) + i64::from(self.size.height)
    }
}

/// Running bounding box over a set of rectangles.
///
/// Starts at the degenerate (0,0)-(0,0) box, so the origin is always part of
/// the result. An empty accumulation yields an empty rectangle at (0,0).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundingBox {
    left: i64,
    top: i64,
    right: i64,
    bottom: i64,
}

impl BoundingBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(&mut self, rect: &Rect) {
        self.left = self.left.min(rect.left());
        self.top = self.top.min(rect.top());
        self.right = self.right.max(rect.right());
        self.bottom = self.bottom.max(rect.bottom());
    }

    /// Collapse into a rectangle, saturating coordinates that do not fit
    pub fn to_rect(self) -> Rect {
        let left = self.left.clamp(i64::from(i32::MIN), i64::from(i32::MAX));
        let top = self.top.clamp(i64::from(i32::MIN), i64::from(i32::MAX));
        let width = (self.right - left).clamp(0, i64::from(u32::MAX));
        let height = (self.bottom - top).clamp(0, i64::from(u32::MAX));
        Rect::new(left as i32, top as i32, width as u32, height as u32)
    }
}
