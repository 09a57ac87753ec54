//! Axis-aligned bounding boxes used as spatial query keys.

use geo::{coord, Rect};
use rstar::AABB;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned bounding rectangle
///
/// Corners are normalised on construction, so `min_x <= max_x` and
/// `min_y <= max_y` always hold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Corners")]
pub struct Envelope {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

/// Serialized form, normalised through [`Envelope::new`] on the way in
#[derive(Deserialize)]
struct Corners {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl From<Corners> for Envelope {
    fn from(c: Corners) -> Self {
        Envelope::new(c.min_x, c.min_y, c.max_x, c.max_y)
    }
}

impl Envelope {
    /// Create an envelope from two opposite corners in any order
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            min_x: x1.min(x2),
            min_y: y1.min(y2),
            max_x: x1.max(x2),
            max_y: y1.max(y2),
        }
    }

    /// Degenerate envelope covering a single point
    pub fn from_point(x: f64, y: f64) -> Self {
        Self::new(x, y, x, y)
    }

    /// Smallest envelope covering every input, `None` for an empty input
    pub fn from_envelopes<I>(envelopes: I) -> Option<Self>
    where
        I: IntoIterator<Item = Envelope>,
    {
        envelopes.into_iter().reduce(|acc, e| acc.union(&e))
    }

    pub fn min_x(&self) -> f64 {
        self.min_x
    }

    pub fn min_y(&self) -> f64 {
        self.min_y
    }

    pub fn max_x(&self) -> f64 {
        self.max_x
    }

    pub fn max_y(&self) -> f64 {
        self.max_y
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> [f64; 2] {
        [(self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0]
    }

    /// Check if two envelopes overlap (touching edges count)
    pub fn intersects(&self, other: &Envelope) -> bool {
        let x_overlap = self.min_x <= other.max_x && self.max_x >= other.min_x;
        let y_overlap = self.min_y <= other.max_y && self.max_y >= other.min_y;

        x_overlap && y_overlap
    }

    /// Check if `other` lies completely inside this envelope
    pub fn contains(&self, other: &Envelope) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Smallest envelope covering both inputs
    pub fn union(&self, other: &Envelope) -> Envelope {
        Envelope {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.min_x, y: self.min_y },
            coord! { x: self.max_x, y: self.max_y },
        )
    }

    pub fn to_aabb(&self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.min_x, self.min_y], [self.max_x, self.max_y])
    }
}

impl From<Rect<f64>> for Envelope {
    fn from(rect: Rect<f64>) -> Self {
        let min = rect.min();
        let max = rect.max();
        Envelope::new(min.x, min.y, max.x, max.y)
    }
}

impl From<AABB<[f64; 2]>> for Envelope {
    fn from(aabb: AABB<[f64; 2]>) -> Self {
        let lower = aabb.lower();
        let upper = aabb.upper();
        Envelope::new(lower[0], lower[1], upper[0], upper[1])
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.min_x, self.min_y, self.max_x, self.max_y)
    }
}
