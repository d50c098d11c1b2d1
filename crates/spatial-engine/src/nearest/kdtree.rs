//! A k-d tree for nearest-neighbor queries over low-dimensional points.

/// Balanced k-d tree over `n` points of `dim` coordinates each.
///
/// Built once over an immutable point set; queries return indices into the
/// original point order together with squared Euclidean distances.
pub struct KdTree {
    dim: usize,
    /// Point coordinates, `dim` per point, in original order.
    coords: Vec<f64>,
    /// Tree layout: the median of every subrange is that subtree's root.
    order: Vec<usize>,
}

impl KdTree {
    /// Build a tree over `coords`, interpreted as `coords.len() / dim`
    /// points of `dim` values each.
    pub fn build(coords: Vec<f64>, dim: usize) -> Self {
        assert!(dim > 0, "kd-tree dimension must be positive");
        assert_eq!(coords.len() % dim, 0, "coordinate buffer length mismatch");
        let n = coords.len() / dim;
        let mut order: Vec<usize> = (0..n).collect();
        let mut tree = Self { dim, coords, order: Vec::new() };
        tree.split(&mut order, 0);
        tree.order = order;
        tree
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn coord(&self, point: usize, axis: usize) -> f64 {
        self.coords[point * self.dim + axis]
    }

    fn split(&self, indices: &mut [usize], depth: usize) {
        if indices.len() <= 1 {
            return;
        }
        let axis = depth % self.dim;
        let mid = indices.len() / 2;
        indices.select_nth_unstable_by(mid, |&a, &b| {
            self.coord(a, axis).total_cmp(&self.coord(b, axis))
        });
        let (left, rest) = indices.split_at_mut(mid);
        self.split(left, depth + 1);
        self.split(&mut rest[1..], depth + 1);
    }

    /// The `k` points closest to `query`, nearest first, as
    /// `(point index, squared distance)` pairs. Returns fewer than `k`
    /// entries only when the tree holds fewer points.
    pub fn nearest(&self, query: &[f64], k: usize) -> Vec<(usize, f64)> {
        debug_assert_eq!(query.len(), self.dim);
        let mut best: Vec<(usize, f64)> = Vec::with_capacity(k + 1);
        if k > 0 {
            self.search(&self.order, 0, query, k, &mut best);
        }
        best
    }

    fn search(
        &self,
        indices: &[usize],
        depth: usize,
        query: &[f64],
        k: usize,
        best: &mut Vec<(usize, f64)>,
    ) {
        if indices.is_empty() {
            return;
        }
        let axis = depth % self.dim;
        let mid = indices.len() / 2;
        let node = indices[mid];

        let d2: f64 = (0..self.dim)
            .map(|a| {
                let d = query[a] - self.coord(node, a);
                d * d
            })
            .sum();
        self.offer(best, k, node, d2);

        let delta = query[axis] - self.coord(node, axis);
        let (near, far) = if delta < 0.0 {
            (&indices[..mid], &indices[mid + 1..])
        } else {
            (&indices[mid + 1..], &indices[..mid])
        };
        self.search(near, depth + 1, query, k, best);
        // Cross the splitting plane only if the far side can still improve
        if best.len() < k || delta * delta < best.last().map_or(f64::INFINITY, |b| b.1) {
            self.search(far, depth + 1, query, k, best);
        }
    }

    fn offer(&self, best: &mut Vec<(usize, f64)>, k: usize, index: usize, d2: f64) {
        let pos = best.partition_point(|b| b.1 <= d2);
        if pos < k {
            best.insert(pos, (index, d2));
            best.truncate(k);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_tree() -> KdTree {
        // 4x4 unit grid, row-major
        let mut coords = Vec::new();
        for y in 0..4 {
            for x in 0..4 {
                coords.push(x as f64);
                coords.push(y as f64);
            }
        }
        KdTree::build(coords, 2)
    }

    #[test]
    fn test_exact_hit() {
        let tree = grid_tree();
        let hits = tree.nearest(&[2.0, 3.0], 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, 3 * 4 + 2);
        assert_eq!(hits[0].1, 0.0);
    }

    #[test]
    fn test_nearest_of_offset_query() {
        let tree = grid_tree();
        let hits = tree.nearest(&[1.3, 1.9], 1);
        assert_eq!(hits[0].0, 2 * 4 + 1, "closest grid node is (1, 2)");
    }

    #[test]
    fn test_k_nearest_sorted_by_distance() {
        let tree = grid_tree();
        let hits = tree.nearest(&[0.0, 0.0], 3);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0], (0, 0.0));
        assert!(hits[1].1 <= hits[2].1);
        // Both second-nearest candidates are at distance 1
        assert_eq!(hits[1].1, 1.0);
        assert_eq!(hits[2].1, 1.0);
    }

    #[test]
    fn test_k_larger_than_tree() {
        let tree = KdTree::build(vec![0.0, 0.0, 1.0, 1.0], 2);
        let hits = tree.nearest(&[0.2, 0.2], 5);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_three_dimensional() {
        let coords = vec![
            0.0, 0.0, 0.0, //
            10.0, 0.0, 0.0, //
            0.0, 0.0, 5.0,
        ];
        let tree = KdTree::build(coords, 3);
        let hits = tree.nearest(&[0.0, 0.0, 4.0], 1);
        assert_eq!(hits[0].0, 2);
    }
}
