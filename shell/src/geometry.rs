//! Integer pixel geometry shared by the window-system abstraction and the
//! panel containers.
//!
//! Positions and sizes are in screen pixels. Rectangles carry their
//! top-left corner; `right()`/`bottom()` are one pixel beyond the far
//! edges, so a 10-pixel-wide rect at x=0 has `right() == 10`.

use serde::{Deserialize, Serialize};

/// A point in screen coordinates.
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

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Which corner of a rectangle stays fixed while the opposite dimensions
/// change during a resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gravity {
    /// Top-left corner stays fixed.
    NorthWest,
    /// Top-right corner stays fixed.
    NorthEast,
    /// Bottom-left corner stays fixed.
    SouthWest,
    /// Bottom-right corner stays fixed.
    SouthEast,
}

/// An axis-aligned rectangle in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_parts(position: Point, size: Size) -> Self {
        Self {
            x: position.x,
            y: position.y,
            width: size.width,
            height: size.height,
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// One pixel beyond the right edge.
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// One pixel beyond the bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x < self.right()
            && point.y >= self.y
            && point.y < self.bottom()
    }

    /// Resize the rect in place, holding the corner named by `gravity`
    /// fixed.
    pub fn resize(&mut self, size: Size, gravity: Gravity) {
        match gravity {
            Gravity::NorthWest => {}
            Gravity::NorthEast => {
                self.x += self.width - size.width;
            }
            Gravity::SouthWest => {
                self.y += self.height - size.height;
            }
            Gravity::SouthEast => {
                self.x += self.width - size.width;
                self.y += self.height - size.height;
            }
        }
        self.width = size.width;
        self.height = size.height;
    }
}
