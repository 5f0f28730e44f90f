//! Axis-aligned page geometry.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in page coordinates (points, origin top-left).
///
/// Serialized as the four-element array `[x0, y0, x1, y1]`, which is the
/// bounding-box shape exposed to document viewers.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct Region {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Region {
    /// Build a region from two corners, normalizing so that `x0 <= x1` and `y0 <= y1`.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Smallest region containing both `self` and `other`.
    pub fn union(&self, other: &Region) -> Region {
        Region {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Grow the region by `pad` on every side.
    pub fn expand(&self, pad: f32) -> Region {
        Region {
            x0: self.x0 - pad,
            y0: self.y0 - pad,
            x1: self.x1 + pad,
            y1: self.y1 + pad,
        }
    }

    /// True when the two regions share interior area. Touching edges do not count.
    pub fn intersects(&self, other: &Region) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }

    /// True when `self`, grown by `pad`, intersects `other`.
    pub fn is_close(&self, other: &Region, pad: f32) -> bool {
        self.expand(pad).intersects(other)
    }

    /// True when `other` lies entirely inside `self`.
    pub fn contains(&self, other: &Region) -> bool {
        self.x0 <= other.x0 && self.y0 <= other.y0 && self.x1 >= other.x1 && self.y1 >= other.y1
    }
}

impl From<[f32; 4]> for Region {
    fn from(v: [f32; 4]) -> Self {
        Region::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Region> for [f32; 4] {
    fn from(r: Region) -> Self {
        [r.x0, r.y0, r.x1, r.y1]
    }
}
