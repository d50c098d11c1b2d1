//! Separable interpolation from regular grids.

use ndarray::{ArrayD, Axis, IxDyn};
use spatial_common::{Result, SpatialError};
use tracing::warn;

use crate::dataset::{Coordinate, Dataset, Variable};
use crate::dims::{HEIGHT, POINT, SPATIAL_COORDS};
use crate::stack::{spatial_stack, spatial_unstack, StackOptions};
use crate::structure::{require_structure, SpatialStructure};

/// Interpolate a cuboid or raster onto the spatial coordinates of `target`.
///
/// Grid-shaped targets get classic separable per-axis linear interpolation
/// over the axes both datasets share; point-shaped targets get a per-point
/// multilinear lookup. Targets outside the source extent become NaN.
/// Non-numeric variables on the interpolated axes are skipped with a
/// warning; `exclude_dims` removes axes from consideration entirely.
pub fn interp_structured_like(
    source: &Dataset,
    target: &Dataset,
    exclude_dims: &[&str],
) -> Result<Dataset> {
    let src_structure = require_structure(source)?;
    if !matches!(
        src_structure,
        SpatialStructure::Cuboid | SpatialStructure::Raster
    ) {
        return Err(SpatialError::structure(format!(
            "structured interpolation requires a cuboid or raster source, got {src_structure}"
        )));
    }
    let src_crs = source.get_crs()?;
    let tgt_crs = target.get_crs()?;
    if src_crs != tgt_crs {
        return Err(SpatialError::crs(format!(
            "source and target CRS differ ({src_crs} vs {tgt_crs}); reproject first"
        )));
    }

    match require_structure(target)? {
        SpatialStructure::Cuboid | SpatialStructure::Raster => {
            let mut out = source.clone();
            for dim in SPATIAL_COORDS {
                if exclude_dims.contains(&dim) {
                    continue;
                }
                let Some(tgt_coord) = target.coord(dim) else {
                    continue;
                };
                if tgt_coord.dim != dim || !out.coord(dim).is_some_and(|c| c.dim == dim) {
                    continue;
                }
                let new_values = tgt_coord.values.to_vec();
                out = interp_axis(&out, dim, &new_values)?;
            }
            Ok(out)
        }
        SpatialStructure::Point | SpatialStructure::StackedPoint => {
            let (tgt, ticket) = spatial_stack(target.clone(), &StackOptions::default())?;
            let out = interp_to_points(source, &tgt, exclude_dims)?;
            spatial_unstack(out, &ticket)
        }
    }
}

/// Linear interpolation of every variable along one grid axis.
fn interp_axis(ds: &Dataset, dim: &str, new_values: &[f64]) -> Result<Dataset> {
    let axis_values = ds
        .coord(dim)
        .ok_or_else(|| SpatialError::structure(format!("missing coordinate '{dim}'")))?
        .values
        .to_vec();

    let mut out = Dataset::new(ds.crs);
    out.attrs = ds.attrs.clone();
    for (name, coord) in &ds.coords {
        if name == dim {
            continue;
        }
        if coord.dim == dim {
            return Err(SpatialError::structure(format!(
                "coordinate '{name}' rides interpolated dimension '{dim}'"
            )));
        }
        out.insert_coord(name, coord.clone());
    }
    out.insert_coord(dim, Coordinate::new(dim, new_values.to_vec().into()));

    for (name, var) in &ds.variables {
        let Some(axis) = var.axis_of(dim) else {
            out.insert_variable(name, var.clone())?;
            continue;
        };
        let Some(arr) = var.data.as_numeric() else {
            warn!(variable = %name, "not numeric, skipped by interpolation");
            continue;
        };

        let mut shape = arr.shape().to_vec();
        shape[axis] = new_values.len();
        let mut result = ArrayD::<f64>::zeros(IxDyn(&shape));
        for (j, &v) in new_values.iter().enumerate() {
            let mut lane = result.index_axis_mut(Axis(axis), j);
            match bracket(&axis_values, v) {
                Some((i, t)) if t == 0.0 => lane.assign(&arr.index_axis(Axis(axis), i)),
                Some((i, t)) => {
                    let a = arr.index_axis(Axis(axis), i);
                    let b = arr.index_axis(Axis(axis), i + 1);
                    lane.assign(&(&a * (1.0 - t) + &b * t));
                }
                None => lane.fill(f64::NAN),
            }
        }
        out.insert_variable(name, Variable::numeric(var.dims.clone(), result))?;
    }
    Ok(out)
}

/// Multilinear per-point sampling of a grid at flattened target points.
fn interp_to_points(source: &Dataset, tgt: &Dataset, exclude_dims: &[&str]) -> Result<Dataset> {
    // Axes eligible for interpolation: grid-own on the source, present as a
    // point coordinate on the target
    let mut axes: Vec<(&str, Vec<f64>, Vec<f64>)> = Vec::new();
    for dim in SPATIAL_COORDS {
        if exclude_dims.contains(&dim) {
            continue;
        }
        let Some(src_coord) = source.coord(dim) else {
            continue;
        };
        let Some(tgt_coord) = tgt.coord(dim) else {
            continue;
        };
        if src_coord.dim == dim && tgt_coord.dim == POINT {
            axes.push((dim, src_coord.values.to_vec(), tgt_coord.values.to_vec()));
        }
    }
    if axes.is_empty() {
        return Err(SpatialError::config(
            "no common spatial dimension to interpolate over",
        ));
    }
    let n_pts = axes[0].2.len();

    let mut out = Dataset::new(tgt.crs);
    out.attrs = tgt.attrs.clone();
    for (name, coord) in &tgt.coords {
        out.insert_coord(name, coord.clone());
    }

    for (name, var) in &source.variables {
        let var_axes: Vec<&(&str, Vec<f64>, Vec<f64>)> =
            axes.iter().filter(|(d, _, _)| var.has_dim(d)).collect();
        if var_axes.is_empty() {
            out.insert_variable(name, var.clone())?;
            continue;
        }
        let Some(_) = var.data.as_numeric() else {
            warn!(variable = %name, "not numeric, skipped by interpolation");
            continue;
        };

        // Interpolated axes last, in a fixed order
        let mut order: Vec<usize> = var
            .dims
            .iter()
            .enumerate()
            .filter(|(_, d)| !var_axes.iter().any(|(a, _, _)| d.as_str() == *a))
            .map(|(i, _)| i)
            .collect();
        let n_lead = order.len();
        for (dim, _, _) in &var_axes {
            order.push(var.axis_of(dim).expect("axis presence checked above"));
        }
        let permuted = var.data.permuted(&order);
        let arr = permuted.as_numeric().expect("numeric checked above");
        let flat = arr.as_slice().expect("standard layout after permute");

        let tail: Vec<usize> = arr.shape()[n_lead..].to_vec();
        let lane: usize = tail.iter().product();
        let n_lanes: usize = arr.shape()[..n_lead].iter().product();

        let mut result = vec![f64::NAN; n_lanes * n_pts];
        for p in 0..n_pts {
            let Some(corners) = corner_weights(&var_axes, &tail, p) else {
                continue;
            };
            for l in 0..n_lanes {
                let base = l * lane;
                let mut acc = 0.0;
                for &(offset, w) in &corners {
                    acc += w * flat[base + offset];
                }
                result[l * n_pts + p] = acc;
            }
        }

        let mut dims: Vec<String> = order[..n_lead]
            .iter()
            .map(|&i| var.dims[i].clone())
            .collect();
        dims.push(POINT.to_string());
        let mut shape: Vec<usize> = arr.shape()[..n_lead].to_vec();
        shape.push(n_pts);
        let data = ArrayD::from_shape_vec(IxDyn(&shape), result)
            .map_err(|e| SpatialError::dimensions(e.to_string()))?;
        out.insert_variable(name, Variable::numeric(dims, data))?;
    }
    out.transpose_canonical();
    Ok(out)
}

/// Flat tail offsets and weights of the multilinear corners around target
/// point `p`, or `None` when any axis puts it outside the grid.
fn corner_weights(
    axes: &[&(&str, Vec<f64>, Vec<f64>)],
    tail: &[usize],
    p: usize,
) -> Option<Vec<(usize, f64)>> {
    let mut brackets = Vec::with_capacity(axes.len());
    for (_, src_vals, tgt_vals) in axes {
        brackets.push(bracket(src_vals, tgt_vals[p])?);
    }

    let k = brackets.len();
    let mut corners = Vec::with_capacity(1 << k);
    for mask in 0..(1usize << k) {
        let mut offset = 0usize;
        let mut weight = 1.0;
        for (a, &(i, t)) in brackets.iter().enumerate() {
            let hi = (mask >> a) & 1 == 1;
            let idx = if hi { i + 1 } else { i };
            weight *= if hi { t } else { 1.0 - t };
            offset = offset * tail[a] + idx.min(tail[a] - 1);
        }
        if weight != 0.0 {
            corners.push((offset, weight));
        }
    }
    Some(corners)
}

/// The grid interval containing `v` on an ascending or descending axis:
/// `(i, t)` with `axis[i] + t * (axis[i+1] - axis[i]) == v` (ascending
/// reading; mirrored for descending). `None` outside the axis range.
pub(crate) fn bracket(axis: &[f64], v: f64) -> Option<(usize, f64)> {
    let n = axis.len();
    if n == 0 {
        return None;
    }
    if n == 1 {
        return ((v - axis[0]).abs() <= 1e-9).then_some((0, 0.0));
    }
    let ascending = axis[n - 1] >= axis[0];
    if ascending {
        if v < axis[0] || v > axis[n - 1] {
            return None;
        }
        let i = axis.partition_point(|&x| x < v);
        if axis[i] == v {
            return Some((i, 0.0));
        }
        let t = (v - axis[i - 1]) / (axis[i] - axis[i - 1]);
        Some((i - 1, t))
    } else {
        if v > axis[0] || v < axis[n - 1] {
            return None;
        }
        let i = axis.partition_point(|&x| x > v);
        if axis[i] == v {
            return Some((i, 0.0));
        }
        let t = (axis[i - 1] - v) / (axis[i - 1] - axis[i]);
        Some((i - 1, t))
    }
}
