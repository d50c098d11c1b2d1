//! Polygon geometry for masking and clipping.

use serde::{Deserialize, Serialize};

use crate::bbox::BBox;
use crate::crs::CrsDef;

/// A simple polygon (single exterior ring, no holes) tied to a CRS.
///
/// The ring does not need to repeat its first vertex; it is treated as
/// implicitly closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    ring: Vec<(f64, f64)>,
    pub crs: CrsDef,
}

impl Polygon {
    /// Create a polygon from its exterior ring.
    pub fn new(ring: Vec<(f64, f64)>, crs: CrsDef) -> Self {
        Self { ring, crs }
    }

    /// The exterior ring vertices.
    pub fn ring(&self) -> &[(f64, f64)] {
        &self.ring
    }

    /// Axis-aligned bounding box of the ring.
    pub fn bbox(&self) -> BBox {
        let xs: Vec<f64> = self.ring.iter().map(|p| p.0).collect();
        let ys: Vec<f64> = self.ring.iter().map(|p| p.1).collect();
        BBox::from_coords(&xs, &ys, self.crs)
    }

    /// Point-in-polygon test by ray casting.
    ///
    /// Points exactly on an edge or vertex count as inside.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        let n = self.ring.len();
        if n < 3 {
            return false;
        }

        let mut inside = false;
        for i in 0..n {
            let (x1, y1) = self.ring[i];
            let (x2, y2) = self.ring[(i + 1) % n];

            if point_on_segment(x, y, x1, y1, x2, y2) {
                return true;
            }

            // Cast a ray to +x and count edge crossings
            if (y1 > y) != (y2 > y) {
                let x_cross = x1 + (y - y1) / (y2 - y1) * (x2 - x1);
                if x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Check whether any edge of this polygon intersects the segment
    /// `(ax, ay) - (bx, by)`.
    pub fn edge_intersects_segment(&self, ax: f64, ay: f64, bx: f64, by: f64) -> bool {
        let n = self.ring.len();
        for i in 0..n {
            let (x1, y1) = self.ring[i];
            let (x2, y2) = self.ring[(i + 1) % n];
            if segments_intersect(x1, y1, x2, y2, ax, ay, bx, by) {
                return true;
            }
        }
        false
    }
}

/// A collection of polygons sharing a CRS; membership is against their union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryCollection {
    polygons: Vec<Polygon>,
    pub crs: CrsDef,
}

impl GeometryCollection {
    /// Create a collection from polygons.
    ///
    /// All polygons must share `crs`; polygons carrying a different CRS are a
    /// caller bug and are rejected by the masking entry points.
    pub fn new(polygons: Vec<Polygon>, crs: CrsDef) -> Self {
        Self { polygons, crs }
    }

    /// The member polygons.
    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    /// Point membership against the union of all polygons.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.polygons.iter().any(|p| p.contains_point(x, y))
    }

    /// Bounding box covering every member polygon.
    pub fn bbox(&self) -> BBox {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for poly in &self.polygons {
            for &(x, y) in poly.ring() {
                xs.push(x);
                ys.push(y);
            }
        }
        BBox::from_coords(&xs, &ys, self.crs)
    }
}

impl From<Polygon> for GeometryCollection {
    fn from(polygon: Polygon) -> Self {
        let crs = polygon.crs;
        Self::new(vec![polygon], crs)
    }
}

impl From<BBox> for GeometryCollection {
    fn from(bbox: BBox) -> Self {
        let crs = bbox.crs;
        Self::new(vec![bbox.to_polygon()], crs)
    }
}

fn point_on_segment(px: f64, py: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> bool {
    let cross = (x2 - x1) * (py - y1) - (y2 - y1) * (px - x1);
    if cross.abs() > 1e-12 * ((x2 - x1).abs() + (y2 - y1).abs()).max(1.0) {
        return false;
    }
    px >= x1.min(x2) - 1e-12
        && px <= x1.max(x2) + 1e-12
        && py >= y1.min(y2) - 1e-12
        && py <= y1.max(y2) + 1e-12
}

fn orientation(ax: f64, ay: f64, bx: f64, by: f64, cx: f64, cy: f64) -> f64 {
    (bx - ax) * (cy - ay) - (by - ay) * (cx - ax)
}

fn segments_intersect(
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    x3: f64,
    y3: f64,
    x4: f64,
    y4: f64,
) -> bool {
    let d1 = orientation(x3, y3, x4, y4, x1, y1);
    let d2 = orientation(x3, y3, x4, y4, x2, y2);
    let d3 = orientation(x1, y1, x2, y2, x3, y3);
    let d4 = orientation(x1, y1, x2, y2, x4, y4);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    // Collinear touching cases
    (d1 == 0.0 && point_on_segment(x1, y1, x3, y3, x4, y4))
        || (d2 == 0.0 && point_on_segment(x2, y2, x3, y3, x4, y4))
        || (d3 == 0.0 && point_on_segment(x3, y3, x1, y1, x2, y2))
        || (d4 == 0.0 && point_on_segment(x4, y4, x1, y1, x2, y2))
}
