//! Cubic interpolation weights.
//!
//! Both forms are linear in the source values, so they reduce to weight
//! vectors the caller applies per data lane: 1D uses a Catmull-Rom style
//! Hermite spline with central-difference tangents, 2D a cubic Bezier
//! triangle over the Delaunay triangulation with least-squares vertex
//! gradients.

use std::collections::BTreeMap;

use super::delaunay::Triangulation;

/// Hermite-spline weights at `v` over a strictly ascending sample axis.
/// Indices refer to positions in `xs`. `None` outside the axis range.
pub(crate) fn cubic1d_weights(xs: &[f64], v: f64) -> Option<Vec<(usize, f64)>> {
    let n = xs.len();
    if n == 0 || v < xs[0] || v > xs[n - 1] {
        return None;
    }
    if n == 1 {
        return Some(vec![(0, 1.0)]);
    }

    let i = xs.partition_point(|&x| x < v).min(n - 1);
    if xs[i] == v {
        return Some(vec![(i, 1.0)]);
    }
    let i = i - 1;
    let h = xs[i + 1] - xs[i];
    let t = (v - xs[i]) / h;

    // Hermite basis
    let t2 = t * t;
    let t3 = t2 * t;
    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;

    let mut weights: BTreeMap<usize, f64> = BTreeMap::new();
    *weights.entry(i).or_default() += h00;
    *weights.entry(i + 1).or_default() += h01;
    add_tangent(&mut weights, xs, i, h10 * h);
    add_tangent(&mut weights, xs, i + 1, h11 * h);
    Some(weights.into_iter().collect())
}

/// Spread `scale * m_i` over sample values, where `m_i` is the
/// central-difference tangent at sample `i` (one-sided at the ends).
fn add_tangent(weights: &mut BTreeMap<usize, f64>, xs: &[f64], i: usize, scale: f64) {
    let n = xs.len();
    let (lo, hi) = (i.saturating_sub(1), (i + 1).min(n - 1));
    let span = xs[hi] - xs[lo];
    if span == 0.0 {
        return;
    }
    *weights.entry(hi).or_default() += scale / span;
    *weights.entry(lo).or_default() -= scale / span;
}

/// Cubic Bezier-triangle interpolator over a fixed triangulation.
///
/// Vertex gradients are estimated once from the triangulation's edge
/// neighborhoods; every query then yields a weight vector over the source
/// points.
pub(crate) struct CubicPatch<'a> {
    tri: &'a Triangulation,
    /// Per vertex: `(neighbor, x-coefficient, y-coefficient)` terms such
    /// that `grad = sum coeff * (f_neighbor - f_vertex)`.
    gradients: Vec<Vec<(usize, f64, f64)>>,
}

impl<'a> CubicPatch<'a> {
    pub(crate) fn new(tri: &'a Triangulation) -> Self {
        let n = tri.points.len();
        let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); n];
        for t in &tri.triangles {
            for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
                if !neighbors[a].contains(&b) {
                    neighbors[a].push(b);
                }
                if !neighbors[b].contains(&a) {
                    neighbors[b].push(a);
                }
            }
        }

        let gradients = (0..n)
            .map(|v| least_squares_gradient(tri, v, &neighbors[v]))
            .collect();
        Self { tri, gradients }
    }

    /// Interpolation weights for the target `(x, y)`, or `None` outside the
    /// hull.
    pub(crate) fn weights(&self, x: f64, y: f64) -> Option<Vec<(usize, f64)>> {
        let (t, bary) = self.tri.locate(x, y)?;
        let [v1, v2, v3] = self.tri.triangles[t];
        let [u, v, w] = bary;

        let mut acc: BTreeMap<usize, f64> = BTreeMap::new();

        // Bernstein coefficients of the ten control points
        let b300 = u * u * u;
        let b030 = v * v * v;
        let b003 = w * w * w;
        let b111 = 6.0 * u * v * w;

        self.add(&mut acc, v1, b300);
        self.add(&mut acc, v2, b030);
        self.add(&mut acc, v3, b003);

        // Edge control points: value + directional derivative / 3
        let edges = [
            (v1, v2, 3.0 * u * u * v),
            (v1, v3, 3.0 * u * u * w),
            (v2, v1, 3.0 * v * v * u),
            (v2, v3, 3.0 * v * v * w),
            (v3, v1, 3.0 * w * w * u),
            (v3, v2, 3.0 * w * w * v),
        ];
        for &(from, to, coeff) in &edges {
            // The interior control point reuses each edge point at 1/4
            let total = coeff + b111 / 4.0;
            self.add_edge_point(&mut acc, from, to, total);
        }

        // Interior point: mean of edge points pushed away from the vertex
        // mean; the edge share was folded in above, the vertex share is
        // subtracted here (E + (E - V) / 2 with E and V the two means)
        let vertex_share = -b111 / 6.0;
        self.add(&mut acc, v1, vertex_share);
        self.add(&mut acc, v2, vertex_share);
        self.add(&mut acc, v3, vertex_share);

        Some(acc.into_iter().filter(|&(_, w)| w != 0.0).collect())
    }

    fn add(&self, acc: &mut BTreeMap<usize, f64>, vertex: usize, weight: f64) {
        *acc.entry(vertex).or_default() += weight;
    }

    /// Weight contribution of the control point `f_from + grad_from . (p_to
    /// - p_from) / 3`.
    fn add_edge_point(
        &self,
        acc: &mut BTreeMap<usize, f64>,
        from: usize,
        to: usize,
        weight: f64,
    ) {
        self.add(acc, from, weight);
        let (fx, fy) = self.tri.points[from];
        let (tx, ty) = self.tri.points[to];
        let (dx, dy) = ((tx - fx) / 3.0, (ty - fy) / 3.0);
        for &(j, cx, cy) in &self.gradients[from] {
            let c = weight * (dx * cx + dy * cy);
            self.add(acc, j, c);
            self.add(acc, from, -c);
        }
    }
}

/// Least-squares plane-fit gradient coefficients at `vertex` over its edge
/// neighbors. Empty (zero gradient) when the neighborhood is degenerate.
fn least_squares_gradient(
    tri: &Triangulation,
    vertex: usize,
    neighbors: &[usize],
) -> Vec<(usize, f64, f64)> {
    let (px, py) = tri.points[vertex];
    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for &j in neighbors {
        let (dx, dy) = (tri.points[j].0 - px, tri.points[j].1 - py);
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    let det = sxx * syy - sxy * sxy;
    if det.abs() < 1e-300 {
        return Vec::new();
    }
    neighbors
        .iter()
        .map(|&j| {
            let (dx, dy) = (tri.points[j].0 - px, tri.points[j].1 - py);
            let cx = (syy * dx - sxy * dy) / det;
            let cy = (sxx * dy - sxy * dx) / det;
            (j, cx, cy)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(weights: &[(usize, f64)], values: &[f64]) -> f64 {
        weights.iter().map(|&(i, w)| w * values[i]).sum()
    }

    #[test]
    fn test_cubic1d_exact_at_samples() {
        let xs = [0.0, 1.0, 2.5, 4.0];
        let ys = [1.0, 3.0, -2.0, 0.5];
        for (i, &x) in xs.iter().enumerate() {
            let w = cubic1d_weights(&xs, x).unwrap();
            assert!((apply(&w, &ys) - ys[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_cubic1d_reproduces_linear() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x + 1.0).collect();
        for &v in &[0.3, 1.5, 2.9] {
            let w = cubic1d_weights(&xs, v).unwrap();
            assert!((apply(&w, &ys) - (2.0 * v + 1.0)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_cubic1d_outside_range() {
        let xs = [0.0, 1.0];
        assert!(cubic1d_weights(&xs, -0.1).is_none());
        assert!(cubic1d_weights(&xs, 1.1).is_none());
    }

    #[test]
    fn test_cubic2d_exact_at_vertices() {
        let pts = vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.5, 0.4)];
        let tri = Triangulation::build(&pts).unwrap();
        let patch = CubicPatch::new(&tri);
        let values = [1.0, 5.0, -3.0, 2.0, 0.7];
        for (i, &(x, y)) in pts.iter().enumerate() {
            let w = patch.weights(x, y).unwrap();
            assert!(
                (apply(&w, &values) - values[i]).abs() < 1e-9,
                "vertex {i} not reproduced"
            );
        }
    }

    #[test]
    fn test_cubic2d_reproduces_linear() {
        let mut pts = Vec::new();
        for y in 0..3 {
            for x in 0..3 {
                pts.push((x as f64, y as f64 + 0.05 * x as f64));
            }
        }
        let tri = Triangulation::build(&pts).unwrap();
        let patch = CubicPatch::new(&tri);
        let f = |x: f64, y: f64| 3.0 * x - 2.0 * y + 0.5;
        let values: Vec<f64> = pts.iter().map(|&(x, y)| f(x, y)).collect();
        for &(x, y) in &[(0.5, 0.5), (1.2, 1.7), (1.9, 0.3)] {
            let w = patch.weights(x, y).unwrap();
            assert!(
                (apply(&w, &values) - f(x, y)).abs() < 1e-9,
                "linear field not reproduced at ({x}, {y})"
            );
        }
    }

    #[test]
    fn test_cubic2d_outside_hull() {
        let pts = vec![(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)];
        let tri = Triangulation::build(&pts).unwrap();
        let patch = CubicPatch::new(&tri);
        assert!(patch.weights(2.0, 2.0).is_none());
    }
}
