//! Bounding box type and operations.

use serde::{Deserialize, Serialize};

use crate::crs::CrsDef;
use crate::geometry::Polygon;

/// An axis-aligned bounding box tied to a coordinate reference system.
///
/// For a geographic CRS the coordinates are in degrees, for projected CRSs
/// they are in meters. Carrying the CRS on the box itself lets the engine
/// reject mask/data CRS mismatches instead of silently comparing apples to
/// oranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub crs: CrsDef,
}

impl BBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64, crs: CrsDef) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
            crs,
        }
    }

    /// Create a bounding box covering a set of x/y coordinates.
    pub fn from_coords(xs: &[f64], ys: &[f64], crs: CrsDef) -> Self {
        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for &x in xs {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
        }
        for &y in ys {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
        Self::new(min_x, min_y, max_x, max_y, crs)
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Corner coordinates as `(min_x, min_y, max_x, max_y)`.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        (self.min_x, self.min_y, self.max_x, self.max_y)
    }

    /// Expand the box outward by `distance` on every side.
    ///
    /// The envelope of a round-buffered rectangle is the rectangle grown by
    /// the buffer distance, so this doubles as `buffer().envelope()` for
    /// degenerate (line or point) boxes as well.
    pub fn buffer(&self, distance: f64) -> Self {
        Self {
            min_x: self.min_x - distance,
            min_y: self.min_y - distance,
            max_x: self.max_x + distance,
            max_y: self.max_y + distance,
            crs: self.crs,
        }
    }

    /// Check if this bbox intersects another.
    pub fn intersects(&self, other: &BBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Check if a point is contained within this bbox (edges inclusive).
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Check if this bbox fully contains another.
    pub fn contains(&self, other: &BBox) -> bool {
        other.min_x >= self.min_x
            && other.min_y >= self.min_y
            && other.max_x <= self.max_x
            && other.max_y <= self.max_y
    }

    /// Convert to a closed rectangular polygon (counter-clockwise ring).
    pub fn to_polygon(&self) -> Polygon {
        Polygon::new(
            vec![
                (self.min_x, self.min_y),
                (self.max_x, self.min_y),
                (self.max_x, self.max_y),
                (self.min_x, self.max_y),
            ],
            self.crs,
        )
    }
}
