//! Sibson natural-neighbor weights.
//!
//! The weight of each natural neighbor is the area its Voronoi cell would
//! lose to the target point if the point were inserted into the
//! triangulation. Areas are computed from circumcenters of the would-be new
//! triangles around the insertion cavity.

use super::delaunay::{circumcenter, Triangulation};

/// Natural-neighbor weights of `(x, y)` within the triangulation, as
/// `(source point index, normalized weight)` pairs.
///
/// `None` when the point lies outside the hull, coincides with a source
/// point, or the cavity geometry degenerates; callers then fall back to
/// nearest-neighbor.
pub(crate) fn natural_weights(
    tri: &Triangulation,
    x: f64,
    y: f64,
) -> Option<Vec<(usize, f64)>> {
    let bad = tri.envelope(x, y);
    if bad.is_empty() {
        return None;
    }
    for &t in &bad {
        for &v in &tri.triangles[t] {
            let (px, py) = tri.points[v];
            if (px - x).powi(2) + (py - y).powi(2) < 1e-24 {
                return None;
            }
        }
    }

    // A target on a hull edge makes the inserted circumcircles degenerate;
    // the Sibson limit there is linear interpolation along the edge
    if let Some(w) = hull_edge_weights(tri, x, y) {
        return Some(w);
    }

    // Cavity boundary: directed edges used by exactly one envelope triangle
    let mut boundary: Vec<(usize, usize)> = Vec::new();
    for &t in &bad {
        let [a, b, c] = tri.triangles[t];
        for edge in [(a, b), (b, c), (c, a)] {
            let twin = (edge.1, edge.0);
            if let Some(i) = boundary.iter().position(|&e| e == twin) {
                boundary.swap_remove(i);
            } else {
                boundary.push(edge);
            }
        }
    }
    let ring = order_ring(&boundary)?;
    let m = ring.len();
    if m < 3 {
        return None;
    }

    let target = (x, y);
    let mut p2 = ring[1];
    let mut c1 = circumcenter(target, tri.points[ring[0]], tri.points[p2]);
    let mut weights: Vec<(usize, f64)> = Vec::with_capacity(m);
    let mut total = 0.0;
    for i in 0..m {
        let p3 = ring[(i + 2) % m];
        let c2 = circumcenter(target, tri.points[p3], tri.points[p2]);

        // The cell piece stolen from p2 is bounded by the two new
        // circumcenters and those of the envelope triangles meeting p2
        let mut cell: Vec<(f64, f64)> = vec![c1, c2];
        for &t in &bad {
            if tri.triangles[t].contains(&p2) {
                cell.push(tri.circumcenters[t]);
            }
        }
        let hull = convex_hull(&mut cell);
        let area = polygon_area(&hull);
        total += area;
        weights.push((p2, area));

        c1 = c2;
        p2 = p3;
    }

    if !(total.is_finite() && total > 0.0) {
        return None;
    }
    for w in weights.iter_mut() {
        w.1 /= total;
    }
    Some(weights)
}

/// Linear weights between the endpoints of the hull edge the target sits
/// on, or `None` when the target is not on the hull boundary.
fn hull_edge_weights(tri: &Triangulation, x: f64, y: f64) -> Option<Vec<(usize, f64)>> {
    // Hull edges are the directed edges used by exactly one triangle
    let mut hull: Vec<(usize, usize)> = Vec::new();
    for triple in &tri.triangles {
        let [a, b, c] = *triple;
        for edge in [(a, b), (b, c), (c, a)] {
            let twin = (edge.1, edge.0);
            if let Some(i) = hull.iter().position(|&e| e == twin) {
                hull.swap_remove(i);
            } else {
                hull.push(edge);
            }
        }
    }
    for (a, b) in hull {
        let (ax, ay) = tri.points[a];
        let (bx, by) = tri.points[b];
        let (dx, dy) = (bx - ax, by - ay);
        let len2 = dx * dx + dy * dy;
        if len2 == 0.0 {
            continue;
        }
        let offset = (dx * (y - ay) - dy * (x - ax)).abs() / len2.sqrt();
        if offset > 1e-9 * len2.sqrt() {
            continue;
        }
        let t = (dx * (x - ax) + dy * (y - ay)) / len2;
        if !(0.0..=1.0).contains(&t) {
            continue;
        }
        return Some(vec![(a, 1.0 - t), (b, t)]);
    }
    None
}

/// Chain directed edges into a closed ring of vertices, or `None` if they
/// do not form one.
fn order_ring(edges: &[(usize, usize)]) -> Option<Vec<usize>> {
    let mut remaining = edges.to_vec();
    let (start, first_end) = remaining.swap_remove(0);
    let mut ring = vec![start];
    let mut cursor = first_end;
    while !remaining.is_empty() {
        let pos = remaining.iter().position(|&(a, _)| a == cursor)?;
        let (_, next) = remaining.swap_remove(pos);
        ring.push(cursor);
        cursor = next;
    }
    (cursor == start).then_some(ring)
}

/// Convex hull by monotone chain, counter-clockwise.
fn convex_hull(points: &mut Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    points.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    points.dedup();
    let n = points.len();
    if n < 3 {
        return points.clone();
    }
    let cross = |o: (f64, f64), a: (f64, f64), b: (f64, f64)| {
        (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
    };
    let mut hull: Vec<(f64, f64)> = Vec::with_capacity(2 * n);
    for &p in points.iter() {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in points.iter().rev() {
        while hull.len() >= lower_len
            && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

fn polygon_area(ring: &[(f64, f64)]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for i in 0..ring.len() {
        let (x1, y1) = ring[i];
        let (x2, y2) = ring[(i + 1) % ring.len()];
        twice += x1 * y2 - x2 * y1;
    }
    twice.abs() / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_tri() -> Triangulation {
        let mut pts = Vec::new();
        for y in 0..3 {
            for x in 0..3 {
                pts.push((x as f64, y as f64));
            }
        }
        Triangulation::build(&pts).unwrap()
    }

    #[test]
    fn test_weights_sum_to_one() {
        let tri = grid_tri();
        let w = natural_weights(&tri, 0.7, 1.3).unwrap();
        let sum: f64 = w.iter().map(|&(_, w)| w).sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(w.iter().all(|&(_, w)| w >= 0.0));
    }

    #[test]
    fn test_center_of_cell_weights_nearby_most() {
        let tri = grid_tri();
        // Slightly off the center node (1, 1): that node must dominate
        let w = natural_weights(&tri, 1.05, 1.02).unwrap();
        let (best, _) = w
            .iter()
            .fold((usize::MAX, 0.0), |acc, &(i, w)| if w > acc.1 { (i, w) } else { acc });
        assert_eq!(best, 4, "index of the (1, 1) grid node");
    }

    #[test]
    fn test_coincident_point_declines() {
        let tri = grid_tri();
        assert!(natural_weights(&tri, 1.0, 1.0).is_none());
    }

    #[test]
    fn test_outside_hull_declines() {
        let tri = grid_tri();
        assert!(natural_weights(&tri, 5.0, 5.0).is_none());
    }

    #[test]
    fn test_linear_reproduction() {
        // Natural-neighbor interpolation reproduces linear fields exactly
        let tri = grid_tri();
        let f = |x: f64, y: f64| 2.0 * x + 3.0 * y + 1.0;
        let w = natural_weights(&tri, 1.4, 0.6).unwrap();
        let value: f64 = w
            .iter()
            .map(|&(i, w)| {
                let (x, y) = tri.points[i];
                w * f(x, y)
            })
            .sum();
        assert!((value - f(1.4, 0.6)).abs() < 1e-9);
    }

    #[test]
    fn test_hull_edge_target_interpolates_along_edge() {
        // Unit-square corners plus the center; the target sits exactly on
        // the bottom hull edge, where the cavity geometry degenerates
        let pts = vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.5, 0.5)];
        let tri = Triangulation::build(&pts).unwrap();
        let f = |x: f64, y: f64| x + 10.0 * y;
        let w = natural_weights(&tri, 0.25, 0.0).unwrap();
        let value: f64 = w
            .iter()
            .map(|&(i, w)| {
                let (x, y) = tri.points[i];
                w * f(x, y)
            })
            .sum();
        assert!(
            (value - 0.25).abs() < 1e-9,
            "boundary target must follow the edge, got {value}"
        );
        // Only the two edge endpoints carry weight
        for &(i, w) in &w {
            assert!(
                i == 0 || i == 1 || w.abs() < 1e-12,
                "non-endpoint {i} has weight {w}"
            );
        }
    }

    #[test]
    fn test_hull_vertex_neighborhood_stays_exact() {
        // Just inside the hull near a corner the weights still sum to one
        let pts = vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.5, 0.5)];
        let tri = Triangulation::build(&pts).unwrap();
        let w = natural_weights(&tri, 0.3, 0.4).unwrap();
        let f = |x: f64, y: f64| x + 10.0 * y;
        let value: f64 = w
            .iter()
            .map(|&(i, w)| {
                let (x, y) = tri.points[i];
                w * f(x, y)
            })
            .sum();
        assert!((value - (0.3 + 4.0)).abs() < 1e-9, "interior stays exact");
    }

    #[test]
    fn test_polygon_area_unit_square() {
        let ring = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        assert!((polygon_area(&ring) - 1.0).abs() < 1e-12);
    }
}
