//! Scattered-data interpolation from point and stacked_point sources.

use std::collections::BTreeMap;

use ndarray::{ArrayD, IxDyn};
use spatial_common::{Result, SpatialError};
use tracing::warn;

use super::cubic::{cubic1d_weights, CubicPatch};
use super::delaunay::Triangulation;
use super::natural::natural_weights;
use super::structured::bracket;
use super::InterpMethod;
use crate::dataset::{Dataset, Variable};
use crate::dims::{HEIGHT, POINT, SOUTH_NORTH, SPATIAL_COORDS, WEST_EAST};
use crate::nearest::kdtree::KdTree;
use crate::stack::{spatial_stack, spatial_unstack, StackOptions};

/// Interpolation plan for one target point: a weighted combination of
/// source points, or NaN when no method applies there.
type Plan = Option<Vec<(usize, f64)>>;

/// Interpolate `source` onto the locations of `output_locs` over the given
/// coordinate dimensions.
///
/// Both datasets are flattened to point form; the result is restored to the
/// structure of `output_locs`. `linear` supports up to three simultaneous
/// dimensions (three-dimensional interpolation runs per height level, then
/// linearly between levels) and `cubic` up to two; targets outside the
/// source hull (or 1D range) become NaN. `natural` requires exactly two
/// dimensions and falls back to nearest-neighbor outside the hull and at
/// coincident points. `nearest` works in any number of dimensions.
pub fn interp_unstructured(
    source: &Dataset,
    output_locs: &Dataset,
    method: InterpMethod,
    dims: &[&str],
) -> Result<Dataset> {
    let src_crs = source.get_crs()?;
    let tgt_crs = output_locs.get_crs()?;
    if src_crs != tgt_crs {
        return Err(SpatialError::crs(format!(
            "source and target CRS differ ({src_crs} vs {tgt_crs}); reproject first"
        )));
    }
    if dims.is_empty() {
        return Err(SpatialError::config(
            "no dimensions given to interpolate over",
        ));
    }
    for dim in dims {
        if !SPATIAL_COORDS.contains(dim) {
            return Err(SpatialError::config(format!(
                "'{dim}' is not a spatial coordinate"
            )));
        }
    }

    let (src, _) = spatial_stack(source.clone(), &StackOptions::default())?;
    let (tgt, ticket) = spatial_stack(output_locs.clone(), &StackOptions::default())?;
    let src_cols = point_columns(&src, dims)?;
    let tgt_cols = point_columns(&tgt, dims)?;
    let n_tgt = tgt_cols[0].len();

    let plans = match (method, dims.len()) {
        (InterpMethod::Nearest, _) => nearest_plans(&src_cols, &tgt_cols),
        (InterpMethod::Linear, 1) => linear1d_plans(&src_cols[0], &tgt_cols[0]),
        (InterpMethod::Linear, 2) => linear2d_plans(&src_cols, &tgt_cols)?,
        (InterpMethod::Linear, 3) => match dims.iter().position(|&d| d == HEIGHT) {
            Some(level_axis) => linear3d_plans(&src_cols, &tgt_cols, level_axis)?,
            None => {
                return Err(SpatialError::config(
                    "three-dimensional interpolation requires a height axis",
                ));
            }
        },
        (InterpMethod::Linear, d) => {
            return Err(SpatialError::config(format!(
                "linear interpolation supports at most three dimensions, got {d}"
            )));
        }
        (InterpMethod::Cubic, 1) => cubic1d_plans(&src_cols[0], &tgt_cols[0]),
        (InterpMethod::Cubic, 2) => cubic2d_plans(&src_cols, &tgt_cols)?,
        (InterpMethod::Natural, 2) => natural_plans(&src_cols, &tgt_cols)?,
        (InterpMethod::Natural, d) => {
            return Err(SpatialError::config(format!(
                "natural neighbor interpolation requires exactly two dimensions, got {d}"
            )));
        }
        (m, d) => {
            return Err(SpatialError::config(format!(
                "{m} interpolation supports at most two dimensions, got {d}"
            )));
        }
    };
    debug_assert_eq!(plans.len(), n_tgt);

    let out = apply_plans(&src, &tgt, &plans)?;
    spatial_unstack(out, &ticket)
}

/// [`interp_unstructured`] onto the horizontal locations of `target`.
pub fn interp_unstructured_like(
    source: &Dataset,
    target: &Dataset,
    method: InterpMethod,
) -> Result<Dataset> {
    interp_unstructured(source, target, method, &[WEST_EAST, SOUTH_NORTH])
}

/// Point-indexed coordinate columns in the order of `dims`.
fn point_columns(point_form: &Dataset, dims: &[&str]) -> Result<Vec<Vec<f64>>> {
    dims.iter()
        .map(|dim| {
            let coord = point_form.coord(dim).ok_or_else(|| {
                SpatialError::structure(format!("missing coordinate '{dim}'"))
            })?;
            if coord.dim != POINT {
                return Err(SpatialError::structure(format!(
                    "coordinate '{dim}' is not point-indexed"
                )));
            }
            Ok(coord.values.to_vec())
        })
        .collect()
}

fn nearest_plans(src_cols: &[Vec<f64>], tgt_cols: &[Vec<f64>]) -> Vec<Plan> {
    let dim = src_cols.len();
    let n_src = src_cols[0].len();
    let mut coords = Vec::with_capacity(n_src * dim);
    for i in 0..n_src {
        for col in src_cols {
            coords.push(col[i]);
        }
    }
    let tree = KdTree::build(coords, dim);

    let n_tgt = tgt_cols[0].len();
    let mut query = vec![0.0; dim];
    (0..n_tgt)
        .map(|p| {
            for (a, col) in tgt_cols.iter().enumerate() {
                query[a] = col[p];
            }
            tree.nearest(&query, 1)
                .first()
                .map(|&(i, _)| vec![(i, 1.0)])
        })
        .collect()
}

fn linear1d_plans(src: &[f64], tgt: &[f64]) -> Vec<Plan> {
    let (xs, back) = dedup_sorted(src);
    tgt.iter()
        .map(|&v| {
            let (i, t) = bracket(&xs, v)?;
            if t == 0.0 {
                Some(vec![(back[i], 1.0)])
            } else {
                Some(vec![(back[i], 1.0 - t), (back[i + 1], t)])
            }
        })
        .collect()
}

fn cubic1d_plans(src: &[f64], tgt: &[f64]) -> Vec<Plan> {
    let (xs, back) = dedup_sorted(src);
    tgt.iter()
        .map(|&v| {
            let weights = cubic1d_weights(&xs, v)?;
            Some(weights.into_iter().map(|(i, w)| (back[i], w)).collect())
        })
        .collect()
}

fn linear2d_plans(src_cols: &[Vec<f64>], tgt_cols: &[Vec<f64>]) -> Result<Vec<Plan>> {
    let (points, back) = dedup_pairs(&src_cols[0], &src_cols[1]);
    let tri = Triangulation::build(&points)?;
    Ok((0..tgt_cols[0].len())
        .map(|p| {
            let (t, bary) = tri.locate(tgt_cols[0][p], tgt_cols[1][p])?;
            let verts = tri.triangles[t];
            Some(
                verts
                    .iter()
                    .zip(bary)
                    .filter(|(_, w)| *w != 0.0)
                    .map(|(&v, w)| (back[v], w))
                    .collect(),
            )
        })
        .collect())
}

/// Three-axis linear interpolation: a 2D plan within each height level,
/// combined linearly between the two levels bracketing the target height.
///
/// Levels with too few (or collinear) horizontal locations cannot carry a
/// triangulation; targets needing such a level become NaN.
fn linear3d_plans(
    src_cols: &[Vec<f64>],
    tgt_cols: &[Vec<f64>],
    level_axis: usize,
) -> Result<Vec<Plan>> {
    let (a, b) = match level_axis {
        0 => (1, 2),
        1 => (0, 2),
        _ => (0, 1),
    };
    let (levels, _) = dedup_sorted(&src_cols[level_axis]);

    // Per level: a triangulation of its horizontal locations and the map
    // from triangulation vertex back to the global source index
    let planes: Vec<Option<(Triangulation, Vec<usize>)>> = levels
        .iter()
        .map(|&z| {
            let members: Vec<usize> = src_cols[level_axis]
                .iter()
                .enumerate()
                .filter_map(|(i, &v)| (v.total_cmp(&z).is_eq()).then_some(i))
                .collect();
            let xs: Vec<f64> = members.iter().map(|&i| src_cols[a][i]).collect();
            let ys: Vec<f64> = members.iter().map(|&i| src_cols[b][i]).collect();
            let (points, back) = dedup_pairs(&xs, &ys);
            Triangulation::build(&points)
                .ok()
                .map(|tri| (tri, back.iter().map(|&j| members[j]).collect()))
        })
        .collect();

    Ok((0..tgt_cols[0].len())
        .map(|p| {
            let (i, t) = bracket(&levels, tgt_cols[level_axis][p])?;
            let (x, y) = (tgt_cols[a][p], tgt_cols[b][p]);
            let mut weights = planar_weights(planes[i].as_ref()?, x, y)?;
            if t != 0.0 {
                for w in weights.iter_mut() {
                    w.1 *= 1.0 - t;
                }
                let mut upper = planar_weights(planes[i + 1].as_ref()?, x, y)?;
                for w in upper.iter_mut() {
                    w.1 *= t;
                }
                weights.extend(upper);
            }
            Some(weights)
        })
        .collect())
}

/// Barycentric weights of `(x, y)` within one level's triangulation, mapped
/// to global source indices.
fn planar_weights(
    plane: &(Triangulation, Vec<usize>),
    x: f64,
    y: f64,
) -> Option<Vec<(usize, f64)>> {
    let (tri, back) = plane;
    let (t, bary) = tri.locate(x, y)?;
    Some(
        tri.triangles[t]
            .iter()
            .zip(bary)
            .filter(|(_, w)| *w != 0.0)
            .map(|(&v, w)| (back[v], w))
            .collect(),
    )
}

fn cubic2d_plans(src_cols: &[Vec<f64>], tgt_cols: &[Vec<f64>]) -> Result<Vec<Plan>> {
    let (points, back) = dedup_pairs(&src_cols[0], &src_cols[1]);
    let tri = Triangulation::build(&points)?;
    let patch = CubicPatch::new(&tri);
    Ok((0..tgt_cols[0].len())
        .map(|p| {
            let weights = patch.weights(tgt_cols[0][p], tgt_cols[1][p])?;
            Some(weights.into_iter().map(|(i, w)| (back[i], w)).collect())
        })
        .collect())
}

fn natural_plans(src_cols: &[Vec<f64>], tgt_cols: &[Vec<f64>]) -> Result<Vec<Plan>> {
    let (points, back) = dedup_pairs(&src_cols[0], &src_cols[1]);
    let tri = Triangulation::build(&points)?;

    let mut coords = Vec::with_capacity(points.len() * 2);
    for &(x, y) in &points {
        coords.push(x);
        coords.push(y);
    }
    let tree = KdTree::build(coords, 2);

    Ok((0..tgt_cols[0].len())
        .map(|p| {
            let (x, y) = (tgt_cols[0][p], tgt_cols[1][p]);
            match natural_weights(&tri, x, y) {
                Some(weights) => Some(
                    weights
                        .into_iter()
                        .map(|(i, w)| (back[i], w))
                        .collect::<Vec<_>>(),
                ),
                // Outside the hull or coincident with a source point
                None => tree
                    .nearest(&[x, y], 1)
                    .first()
                    .map(|&(i, _)| vec![(back[i], 1.0)]),
            }
        })
        .collect())
}

/// Ascending unique values with, per entry, the original index of its first
/// occurrence.
fn dedup_sorted(values: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]).then(a.cmp(&b)));
    let mut xs = Vec::new();
    let mut back = Vec::new();
    for i in order {
        if xs.last().map_or(true, |last: &f64| last.total_cmp(&values[i]).is_ne()) {
            xs.push(values[i]);
            back.push(i);
        }
    }
    (xs, back)
}

/// Unique `(x, y)` pairs (first occurrence wins) with their original indices.
fn dedup_pairs(xs: &[f64], ys: &[f64]) -> (Vec<(f64, f64)>, Vec<usize>) {
    let mut seen: BTreeMap<(u64, u64), ()> = BTreeMap::new();
    let mut points = Vec::new();
    let mut back = Vec::new();
    for i in 0..xs.len() {
        let key = (xs[i].to_bits(), ys[i].to_bits());
        if seen.insert(key, ()).is_none() {
            points.push((xs[i], ys[i]));
            back.push(i);
        }
    }
    (points, back)
}

/// Apply per-target weight plans to every point-indexed variable of the
/// source, yielding a point-form dataset on the target's coordinates.
fn apply_plans(src: &Dataset, tgt: &Dataset, plans: &[Plan]) -> Result<Dataset> {
    let n_tgt = plans.len();
    let mut out = Dataset::new(tgt.crs);
    out.attrs = tgt.attrs.clone();
    for (name, coord) in &tgt.coords {
        out.insert_coord(name, coord.clone());
    }

    for (name, var) in &src.variables {
        let Some(axis) = var.axis_of(POINT) else {
            out.insert_variable(name, var.clone())?;
            continue;
        };
        if !var.data.is_numeric() {
            warn!(variable = %name, "not numeric, skipped by interpolation");
            continue;
        }

        // Point axis last, lanes flattened in front
        let mut order: Vec<usize> = (0..var.dims.len()).filter(|&i| i != axis).collect();
        order.push(axis);
        let permuted = var.data.permuted(&order);
        let arr = permuted.as_numeric().expect("numeric checked above");
        let flat = arr.as_slice().expect("standard layout after permute");
        let n_src = *arr.shape().last().expect("point axis present");
        let n_lanes: usize = arr.shape()[..arr.ndim() - 1].iter().product();

        let mut result = vec![f64::NAN; n_lanes * n_tgt];
        for (p, plan) in plans.iter().enumerate() {
            let Some(weights) = plan else {
                continue;
            };
            for l in 0..n_lanes {
                let base = l * n_src;
                let mut acc = 0.0;
                for &(i, w) in weights {
                    acc += w * flat[base + i];
                }
                result[l * n_tgt + p] = acc;
            }
        }

        let mut dims: Vec<String> = order[..order.len() - 1]
            .iter()
            .map(|&i| var.dims[i].clone())
            .collect();
        dims.push(POINT.to_string());
        let mut shape: Vec<usize> = arr.shape()[..arr.ndim() - 1].to_vec();
        shape.push(n_tgt);
        let data = ArrayD::from_shape_vec(IxDyn(&shape), result)
            .map_err(|e| SpatialError::dimensions(e.to_string()))?;
        out.insert_variable(name, Variable::numeric(dims, data))?;
    }
    out.transpose_canonical();
    Ok(out)
}
