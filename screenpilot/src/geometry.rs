//! Axis-aligned pixel geometry and OCR text observations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned rectangle in viewport pixel coordinates.
///
/// Invariant: `x1 <= x2` and `y1 <= y2`. The constructor normalizes corner
/// order, so a rectangle built from any two opposite corners is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Rect {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    /// Reduce an OCR quadrilateral to an axis-aligned rectangle using its
    /// first (top-left) and third (bottom-right) points.
    pub fn from_quad(quad: [(i32, i32); 4]) -> Self {
        Self::new(quad[0].0, quad[0].1, quad[2].0, quad[2].1)
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    pub fn center(&self) -> (i32, i32) {
        ((self.x1 + self.x2) / 2, (self.y1 + self.y2) / 2)
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x1 && x <= self.x2 && y >= self.y1 && y <= self.y2
    }

    /// Grow the rectangle by `margin` pixels on every side. The low edges are
    /// clamped at zero; use [`Rect::clamp_to`] to bound the high edges.
    pub fn expand(&self, margin: i32) -> Self {
        Self::new(
            (self.x1 - margin).max(0),
            (self.y1 - margin).max(0),
            self.x2 + margin,
            self.y2 + margin,
        )
    }

    /// Clamp the rectangle to a `width` x `height` viewport.
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        Self::new(
            self.x1.clamp(0, width as i32),
            self.y1.clamp(0, height as i32),
            self.x2.clamp(0, width as i32),
            self.y2.clamp(0, height as i32),
        )
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x1 + dx, self.y1 + dy, self.x2 + dx, self.y2 + dy)
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x1, self.y1, self.x2, self.y2)
    }
}

/// One recognized text span: the text, where it was seen, and how confident
/// the OCR engine was about it.
///
/// Produced only by the perception adapter (and tests); never constructed by
/// hand in application code.
#[derive(Debug, Clone, PartialEq)]
pub struct TextObservation {
    pub text: String,
    pub bounds: Rect,
    pub confidence: f32,
}
