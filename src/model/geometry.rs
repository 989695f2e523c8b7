//! Rectangles in page space.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle `(x0, y0, x1, y1)` in points.
///
/// Unless stated otherwise the origin is the top-left page corner with `y`
/// growing downward, so `y0` is the top edge.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    /// Create a rectangle from its corners.
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// True when the rectangle has positive width and height.
    pub fn is_valid(&self) -> bool {
        self.x0 < self.x1 && self.y0 < self.y1 && self.area().is_finite()
    }

    /// Overlapping region, or `None` when the rectangles only touch or are apart.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let r = Rect::new(
            self.x0.max(other.x0),
            self.y0.max(other.y0),
            self.x1.min(other.x1),
            self.y1.min(other.y1),
        );
        (r.x0 < r.x1 && r.y0 < r.y1).then_some(r)
    }

    pub fn intersection_area(&self, other: &Rect) -> f32 {
        self.intersection(other).map_or(0.0, |r| r.area())
    }

    /// Share of this rectangle's area covered by `other`, in `[0, 1]`.
    pub fn overlap_ratio(&self, other: &Rect) -> f32 {
        let area = self.area();
        if area <= 0.0 {
            return 0.0;
        }
        self.intersection_area(other) / area
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::new(
            self.x0.min(other.x0),
            self.y0.min(other.y0),
            self.x1.max(other.x1),
            self.y1.max(other.y1),
        )
    }

    /// Grow by `by` points on every side.
    pub fn expand(&self, by: f32) -> Rect {
        Rect::new(self.x0 - by, self.y0 - by, self.x1 + by, self.y1 + by)
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    /// True when `other` lies entirely inside (edges inclusive).
    pub fn contains(&self, other: &Rect) -> bool {
        other.x0 >= self.x0 && other.x1 <= self.x1 && other.y0 >= self.y0 && other.y1 <= self.y1
    }

    /// Mirror between top-left and bottom-left origin for a page of `page_height`.
    ///
    /// The new `y0` is `page_height - y1` and the new `y1` is `page_height - y0`,
    /// so the result stays normalized.
    pub fn flip_y(&self, page_height: f32) -> Rect {
        Rect::new(self.x0, page_height - self.y1, self.x1, page_height - self.y0)
    }

    /// Divide all coordinates, e.g. to map raster pixels back to points.
    pub fn scale_down(&self, factor: f32) -> Rect {
        Rect::new(
            self.x0 / factor,
            self.y0 / factor,
            self.x1 / factor,
            self.y1 / factor,
        )
    }

    /// Reorder corners so that `x0 <= x1` and `y0 <= y1`.
    pub fn normalized(&self) -> Rect {
        Rect::new(
            self.x0.min(self.x1),
            self.y0.min(self.y1),
            self.x0.max(self.x1),
            self.y0.max(self.y1),
        )
    }

    /// Bounding box of a set of points.
    pub fn from_points(points: &[(f32, f32)]) -> Option<Rect> {
        let (first, rest) = points.split_first()?;
        let mut r = Rect::new(first.0, first.1, first.0, first.1);
        for &(x, y) in rest {
            r.x0 = r.x0.min(x);
            r.y0 = r.y0.min(y);
            r.x1 = r.x1.max(x);
            r.y1 = r.y1.max(y);
        }
        Some(r)
    }
}

impl From<[f32; 4]> for Rect {
    fn from(v: [f32; 4]) -> Self {
        Rect::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Rect> for [f32; 4] {
    fn from(r: Rect) -> Self {
        [r.x0, r.y0, r.x1, r.y1]
    }
}
