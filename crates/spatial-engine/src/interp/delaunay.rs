//! Delaunay triangulation of planar point sets (Bowyer-Watson).

use spatial_common::{Result, SpatialError};

/// Barycentric coordinates this far below zero still count as inside,
/// so points exactly on a hull edge are not rejected.
pub(crate) const BARY_EPS: f64 = 1e-12;

/// A Delaunay triangulation over a fixed planar point set.
pub struct Triangulation {
    pub points: Vec<(f64, f64)>,
    /// Vertex index triples, counter-clockwise.
    pub triangles: Vec<[usize; 3]>,
    /// Circumcenter of each triangle, aligned with `triangles`.
    pub circumcenters: Vec<(f64, f64)>,
}

impl Triangulation {
    /// Triangulate `points` by incremental insertion.
    ///
    /// Fails on fewer than three points or a fully collinear set. Callers
    /// must deduplicate coincident points first.
    pub fn build(points: &[(f64, f64)]) -> Result<Self> {
        if points.len() < 3 {
            return Err(SpatialError::config(
                "triangulation needs at least three points",
            ));
        }

        // Super-triangle comfortably containing every point
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &(x, y) in points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        let span = (max_x - min_x).max(max_y - min_y).max(1.0);
        let (cx, cy) = ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);

        let mut verts: Vec<(f64, f64)> = points.to_vec();
        let n = verts.len();
        verts.push((cx - 20.0 * span, cy - 10.0 * span));
        verts.push((cx + 20.0 * span, cy - 10.0 * span));
        verts.push((cx, cy + 20.0 * span));

        let mut triangles: Vec<[usize; 3]> = vec![[n, n + 1, n + 2]];
        for p in 0..n {
            let (px, py) = verts[p];

            // Triangles whose circumcircle contains the new point
            let mut bad: Vec<usize> = Vec::new();
            for (t, tri) in triangles.iter().enumerate() {
                if in_circumcircle(&verts, tri, px, py) {
                    bad.push(t);
                }
            }

            // Cavity boundary: edges used by exactly one bad triangle
            let mut boundary: Vec<(usize, usize)> = Vec::new();
            for &t in &bad {
                let [a, b, c] = triangles[t];
                for edge in [(a, b), (b, c), (c, a)] {
                    let twin = (edge.1, edge.0);
                    if let Some(i) = boundary.iter().position(|&e| e == twin) {
                        boundary.swap_remove(i);
                    } else {
                        boundary.push(edge);
                    }
                }
            }

            for &t in bad.iter().rev() {
                triangles.swap_remove(t);
            }
            for (a, b) in boundary {
                triangles.push([a, b, p]);
            }
        }

        triangles.retain(|tri| tri.iter().all(|&v| v < n));
        if triangles.is_empty() {
            return Err(SpatialError::config(
                "points are collinear, no triangulation exists",
            ));
        }

        let mut triangles = triangles;
        for tri in triangles.iter_mut() {
            if signed_area(&verts, tri) < 0.0 {
                tri.swap(1, 2);
            }
        }
        let circumcenters = triangles
            .iter()
            .map(|&[a, b, c]| circumcenter(verts[a], verts[b], verts[c]))
            .collect();

        Ok(Self {
            points: points.to_vec(),
            triangles,
            circumcenters,
        })
    }

    /// The triangle containing `(x, y)` and the barycentric coordinates of
    /// the point within it. `None` when the point is outside the hull.
    pub fn locate(&self, x: f64, y: f64) -> Option<(usize, [f64; 3])> {
        for (t, tri) in self.triangles.iter().enumerate() {
            if let Some(bary) = self.barycentric(tri, x, y) {
                return Some((t, bary));
            }
        }
        None
    }

    /// Triangles whose circumcircle contains `(x, y)`: the triangles a
    /// Bowyer-Watson insertion of the point would remove.
    pub fn envelope(&self, x: f64, y: f64) -> Vec<usize> {
        (0..self.triangles.len())
            .filter(|&t| in_circumcircle(&self.points, &self.triangles[t], x, y))
            .collect()
    }

    fn barycentric(&self, tri: &[usize; 3], x: f64, y: f64) -> Option<[f64; 3]> {
        let (x1, y1) = self.points[tri[0]];
        let (x2, y2) = self.points[tri[1]];
        let (x3, y3) = self.points[tri[2]];
        let det = (y2 - y3) * (x1 - x3) + (x3 - x2) * (y1 - y3);
        if det.abs() < f64::MIN_POSITIVE {
            return None;
        }
        let l1 = ((y2 - y3) * (x - x3) + (x3 - x2) * (y - y3)) / det;
        let l2 = ((y3 - y1) * (x - x3) + (x1 - x3) * (y - y3)) / det;
        let l3 = 1.0 - l1 - l2;
        if l1 >= -BARY_EPS && l2 >= -BARY_EPS && l3 >= -BARY_EPS {
            Some([l1.max(0.0), l2.max(0.0), l3.max(0.0)])
        } else {
            None
        }
    }
}

fn signed_area(verts: &[(f64, f64)], tri: &[usize; 3]) -> f64 {
    let (x1, y1) = verts[tri[0]];
    let (x2, y2) = verts[tri[1]];
    let (x3, y3) = verts[tri[2]];
    (x2 - x1) * (y3 - y1) - (x3 - x1) * (y2 - y1)
}

fn in_circumcircle(verts: &[(f64, f64)], tri: &[usize; 3], px: f64, py: f64) -> bool {
    let (x1, y1) = verts[tri[0]];
    let (x2, y2) = verts[tri[1]];
    let (x3, y3) = verts[tri[2]];

    // Orientation-corrected incircle determinant
    let orient = (x2 - x1) * (y3 - y1) - (x3 - x1) * (y2 - y1);
    let (ax, ay) = (x1 - px, y1 - py);
    let (bx, by) = (x2 - px, y2 - py);
    let (cx, cy) = (x3 - px, y3 - py);
    let det = (ax * ax + ay * ay) * (bx * cy - cx * by)
        - (bx * bx + by * by) * (ax * cy - cx * ay)
        + (cx * cx + cy * cy) * (ax * by - bx * ay);
    if orient >= 0.0 {
        det > 0.0
    } else {
        det < 0.0
    }
}

/// Circumcenter of the triangle `(a, b, c)`.
pub(crate) fn circumcenter(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> (f64, f64) {
    let d = 2.0 * (a.0 * (b.1 - c.1) + b.0 * (c.1 - a.1) + c.0 * (a.1 - b.1));
    if d.abs() < f64::MIN_POSITIVE {
        // Degenerate triangle; the centroid is the least-wrong answer
        return ((a.0 + b.0 + c.0) / 3.0, (a.1 + b.1 + c.1) / 3.0);
    }
    let a2 = a.0 * a.0 + a.1 * a.1;
    let b2 = b.0 * b.0 + b.1 * b.1;
    let c2 = c.0 * c.0 + c.1 * c.1;
    let ux = (a2 * (b.1 - c.1) + b2 * (c.1 - a.1) + c2 * (a.1 - b.1)) / d;
    let uy = (a2 * (c.0 - b.0) + b2 * (a.0 - c.0) + c2 * (b.0 - a.0)) / d;
    (ux, uy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Vec<(f64, f64)> {
        vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]
    }

    #[test]
    fn test_square_yields_two_triangles() {
        let tri = Triangulation::build(&unit_square()).unwrap();
        assert_eq!(tri.triangles.len(), 2);
        for t in &tri.triangles {
            assert!(signed_area(&tri.points, t) > 0.0, "triangles are CCW");
        }
    }

    #[test]
    fn test_locate_interior_point() {
        let tri = Triangulation::build(&unit_square()).unwrap();
        let (t, bary) = tri.locate(0.25, 0.25).unwrap();
        assert!(t < 2);
        let sum: f64 = bary.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!(bary.iter().all(|&b| b >= 0.0));
    }

    #[test]
    fn test_locate_outside_hull() {
        let tri = Triangulation::build(&unit_square()).unwrap();
        assert!(tri.locate(2.0, 2.0).is_none());
        assert!(tri.locate(-0.1, 0.5).is_none());
    }

    #[test]
    fn test_point_on_hull_edge_is_inside() {
        let tri = Triangulation::build(&unit_square()).unwrap();
        assert!(tri.locate(0.5, 0.0).is_some());
        assert!(tri.locate(0.0, 0.0).is_some(), "hull vertex counts too");
    }

    #[test]
    fn test_collinear_points_fail() {
        let pts = vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)];
        assert!(Triangulation::build(&pts).is_err());
    }

    #[test]
    fn test_delaunay_property_on_grid() {
        // No grid node may sit strictly inside another triangle's circumcircle
        let mut pts = Vec::new();
        for y in 0..3 {
            for x in 0..3 {
                pts.push((x as f64, y as f64 + 0.1 * x as f64));
            }
        }
        let tri = Triangulation::build(&pts).unwrap();
        for t in &tri.triangles {
            for (i, &p) in pts.iter().enumerate() {
                if t.contains(&i) {
                    continue;
                }
                let strictly_inside = {
                    let cc = circumcenter(pts[t[0]], pts[t[1]], pts[t[2]]);
                    let r2 = (pts[t[0]].0 - cc.0).powi(2) + (pts[t[0]].1 - cc.1).powi(2);
                    let d2 = (p.0 - cc.0).powi(2) + (p.1 - cc.1).powi(2);
                    d2 < r2 - 1e-9
                };
                assert!(!strictly_inside, "triangle {t:?} not Delaunay for point {i}");
            }
        }
    }

    #[test]
    fn test_circumcenter_right_triangle() {
        let cc = circumcenter((0.0, 0.0), (2.0, 0.0), (0.0, 2.0));
        assert!((cc.0 - 1.0).abs() < 1e-12);
        assert!((cc.1 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_envelope_contains_nearby_triangles() {
        let tri = Triangulation::build(&unit_square()).unwrap();
        // The square's center lies on both circumcircles
        let near = tri.envelope(0.4, 0.4);
        assert!(!near.is_empty());
    }
}
