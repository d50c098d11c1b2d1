//! Conversion between the four spatial structures.
//!
//! `to_point` flattens any structure into a single `point` dimension;
//! `to_stacked_point` and `to_raster` rebuild the denser structures from
//! point form, failing when the points do not actually form one.

use std::collections::BTreeSet;

use ndarray::Array1;
use spatial_common::{Result, SpatialError};

use crate::dataset::{Coordinate, Dataset, Variable};
use crate::dims::{HEIGHT, POINT, SOUTH_NORTH, STACKED_POINT, WEST_EAST};
use crate::structure::{regularly_spaced, require_structure, SpatialStructure, SPACING_THRESH};

/// Flatten the structural dimensions into a single `point` dimension.
///
/// Variables carrying only some of the structural dimensions are broadcast
/// over the missing ones first. Point input is returned unchanged.
pub fn to_point(ds: &Dataset) -> Result<Dataset> {
    let structure = require_structure(ds)?;
    check_nonzero(ds, structure)?;

    match structure {
        SpatialStructure::Point => Ok(ds.clone()),
        SpatialStructure::StackedPoint => {
            let nsp = ds.dim_size(STACKED_POINT).unwrap_or(0);
            let sn = coord_values(ds, SOUTH_NORTH)?;
            let we = coord_values(ds, WEST_EAST)?;
            match ds.coord(HEIGHT).cloned() {
                Some(h) => {
                    let nz = h.len();
                    let mut out =
                        stacked_copy(ds, &[(HEIGHT, nz), (STACKED_POINT, nsp)], POINT)?;
                    out.insert_coord(HEIGHT, Coordinate::new(POINT, repeat(&h.values, nsp)));
                    out.insert_coord(SOUTH_NORTH, Coordinate::new(POINT, tile(&sn, nz)));
                    out.insert_coord(WEST_EAST, Coordinate::new(POINT, tile(&we, nz)));
                    out.transpose_canonical();
                    Ok(out)
                }
                None => {
                    let mut out = ds.clone();
                    out.rename_dim(STACKED_POINT, POINT);
                    Ok(out)
                }
            }
        }
        SpatialStructure::Cuboid => {
            let h = coord_values(ds, HEIGHT)?;
            let sn = coord_values(ds, SOUTH_NORTH)?;
            let we = coord_values(ds, WEST_EAST)?;
            let (nz, nsn, nwe) = (h.len(), sn.len(), we.len());
            let mut out = stacked_copy(
                ds,
                &[(HEIGHT, nz), (SOUTH_NORTH, nsn), (WEST_EAST, nwe)],
                POINT,
            )?;
            out.insert_coord(HEIGHT, Coordinate::new(POINT, repeat(&h, nsn * nwe)));
            out.insert_coord(SOUTH_NORTH, Coordinate::new(POINT, tile(&repeat(&sn, nwe), nz)));
            out.insert_coord(WEST_EAST, Coordinate::new(POINT, tile(&we, nz * nsn)));
            out.transpose_canonical();
            Ok(out)
        }
        SpatialStructure::Raster => {
            let sn = coord_values(ds, SOUTH_NORTH)?;
            let we = coord_values(ds, WEST_EAST)?;
            let (nsn, nwe) = (sn.len(), we.len());
            let mut out = stacked_copy(ds, &[(SOUTH_NORTH, nsn), (WEST_EAST, nwe)], POINT)?;
            out.insert_coord(SOUTH_NORTH, Coordinate::new(POINT, repeat(&sn, nwe)));
            out.insert_coord(WEST_EAST, Coordinate::new(POINT, tile(&we, nsn)));
            out.transpose_canonical();
            Ok(out)
        }
    }
}

/// Rebuild a stacked_point structure.
///
/// Cuboid and raster input stack only their horizontal dimensions; point
/// input is decomposed against the observed `(height, (south_north,
/// west_east))` combinations and fails when those do not form a complete
/// product.
pub fn to_stacked_point(ds: &Dataset) -> Result<Dataset> {
    to_stacked_point_impl(ds, &BTreeSet::new())
}

pub(crate) fn to_stacked_point_impl(
    ds: &Dataset,
    two_d_vars: &BTreeSet<String>,
) -> Result<Dataset> {
    let structure = require_structure(ds)?;
    check_nonzero(ds, structure)?;

    match structure {
        SpatialStructure::StackedPoint => Ok(ds.clone()),
        SpatialStructure::Cuboid | SpatialStructure::Raster => {
            let sn = coord_values(ds, SOUTH_NORTH)?;
            let we = coord_values(ds, WEST_EAST)?;
            let (nsn, nwe) = (sn.len(), we.len());
            let mut out =
                stacked_copy(ds, &[(SOUTH_NORTH, nsn), (WEST_EAST, nwe)], STACKED_POINT)?;
            out.insert_coord(SOUTH_NORTH, Coordinate::new(STACKED_POINT, repeat(&sn, nwe)));
            out.insert_coord(WEST_EAST, Coordinate::new(STACKED_POINT, tile(&we, nsn)));
            out.transpose_canonical();
            Ok(out)
        }
        SpatialStructure::Point => {
            let sn = coord_values(ds, SOUTH_NORTH)?;
            let we = coord_values(ds, WEST_EAST)?;
            let heights = ds.coord(HEIGHT).map(|c| c.values.to_vec());

            match heights {
                Some(h) => {
                    let uh = sorted_unique(&h);
                    let pairs = lexsorted_unique_pairs(&sn.to_vec(), &we.to_vec());
                    let (nz, nsp) = (uh.len(), pairs.len());
                    let np = sn.len();
                    if nz * nsp != np {
                        return Err(SpatialError::structure(
                            "data cannot be converted to a stacked point dataset",
                        ));
                    }
                    let perm = product_permutation(&h, &sn.to_vec(), &we.to_vec(), &uh, &pairs)
                        .ok_or_else(|| {
                            SpatialError::structure(
                                "data cannot be converted to a stacked point dataset",
                            )
                        })?;

                    let mut out = Dataset::new(ds.crs);
                    out.attrs = ds.attrs.clone();
                    for (name, var) in &ds.variables {
                        let var = match var.axis_of(POINT) {
                            Some(axis) => {
                                let squeeze = two_d_vars.contains(name);
                                split_point_var(var, axis, &perm, &[(HEIGHT, nz), (STACKED_POINT, nsp)], squeeze)?
                            }
                            None => var.clone(),
                        };
                        out.insert_variable(name, var)?;
                    }
                    for (name, coord) in &ds.coords {
                        if coord.dim != POINT {
                            out.insert_coord(name, coord.clone());
                        }
                    }
                    out.insert_coord(HEIGHT, Coordinate::new(HEIGHT, Array1::from(uh)));
                    out.insert_coord(
                        SOUTH_NORTH,
                        Coordinate::new(
                            STACKED_POINT,
                            Array1::from_iter(pairs.iter().map(|p| p.0)),
                        ),
                    );
                    out.insert_coord(
                        WEST_EAST,
                        Coordinate::new(
                            STACKED_POINT,
                            Array1::from_iter(pairs.iter().map(|p| p.1)),
                        ),
                    );
                    out.transpose_canonical();
                    Ok(out)
                }
                None => {
                    // No vertical axis: a stacked_point is just the points in
                    // lexicographic order.
                    let order = lexsort_order(&sn.to_vec(), &we.to_vec());
                    let mut out = ds.clone();
                    for var in out.variables.values_mut() {
                        if let Some(axis) = var.axis_of(POINT) {
                            var.data = var.data.selected(axis, &order);
                        }
                    }
                    for coord in out.coords.values_mut() {
                        if coord.dim == POINT {
                            let picked: Vec<f64> =
                                order.iter().map(|&i| coord.values[i]).collect();
                            coord.values = Array1::from(picked);
                        }
                    }
                    out.rename_dim(POINT, STACKED_POINT);
                    Ok(out)
                }
            }
        }
    }
}

/// Rebuild a raster (or cuboid, when a vertical axis exists) from point or
/// stacked_point input.
///
/// Fails when the horizontal locations are irregular or do not form a
/// complete grid; a regular grid is never invented from scattered points.
pub fn to_raster(ds: &Dataset) -> Result<Dataset> {
    to_raster_impl(ds, &BTreeSet::new())
}

pub(crate) fn to_raster_impl(ds: &Dataset, two_d_vars: &BTreeSet<String>) -> Result<Dataset> {
    let structure = require_structure(ds)?;
    check_nonzero(ds, structure)?;

    let point_form = match structure {
        SpatialStructure::Cuboid | SpatialStructure::Raster => return Ok(ds.clone()),
        SpatialStructure::StackedPoint => to_point(ds)?,
        SpatialStructure::Point => ds.clone(),
    };

    let sn = coord_values(&point_form, SOUTH_NORTH)?.to_vec();
    let we = coord_values(&point_form, WEST_EAST)?.to_vec();
    let heights = point_form.coord(HEIGHT).map(|c| c.values.to_vec());

    let uy = sorted_unique(&sn);
    let ux = sorted_unique(&we);
    let grid_error =
        || SpatialError::structure("data cannot be converted to a raster or cuboid dataset");
    if !regularly_spaced(&uy, SPACING_THRESH) || !regularly_spaced(&ux, SPACING_THRESH) {
        return Err(grid_error());
    }

    let (ny, nx) = (uy.len(), ux.len());
    let np = sn.len();
    let pairs: Vec<(f64, f64)> = {
        // Row-major grid order as a pair list, so the same permutation
        // machinery serves both decompositions
        let mut v = Vec::with_capacity(ny * nx);
        for &y in &uy {
            for &x in &ux {
                v.push((y, x));
            }
        }
        v
    };

    let (nz, uh) = match &heights {
        Some(h) => {
            let uh = sorted_unique(h);
            (uh.len(), Some(uh))
        }
        None => (1, None),
    };
    if nz * ny * nx != np {
        return Err(grid_error());
    }
    let flat = vec![0.0; np];
    let h_ref: &[f64] = heights.as_deref().unwrap_or(&flat);
    let uh_ref: Vec<f64> = uh.clone().unwrap_or_else(|| vec![0.0]);
    let perm =
        product_permutation(h_ref, &sn, &we, &uh_ref, &pairs).ok_or_else(grid_error)?;

    let splits: Vec<(&str, usize)> = if uh.is_some() {
        vec![(HEIGHT, nz), (SOUTH_NORTH, ny), (WEST_EAST, nx)]
    } else {
        vec![(SOUTH_NORTH, ny), (WEST_EAST, nx)]
    };

    let mut out = Dataset::new(point_form.crs);
    out.attrs = point_form.attrs.clone();
    for (name, var) in &point_form.variables {
        let var = match var.axis_of(POINT) {
            Some(axis) => {
                let squeeze = two_d_vars.contains(name) && uh.is_some();
                split_point_var(var, axis, &perm, &splits, squeeze)?
            }
            None => var.clone(),
        };
        out.insert_variable(name, var)?;
    }
    for (name, coord) in &point_form.coords {
        if coord.dim != POINT {
            out.insert_coord(name, coord.clone());
        }
    }
    if let Some(uh) = uh {
        out.insert_coord(HEIGHT, Coordinate::new(HEIGHT, Array1::from(uh)));
    }
    out.insert_coord(SOUTH_NORTH, Coordinate::new(SOUTH_NORTH, Array1::from(uy)));
    out.insert_coord(WEST_EAST, Coordinate::new(WEST_EAST, Array1::from(ux)));
    out.transpose_canonical();
    Ok(out)
}

fn check_nonzero(ds: &Dataset, structure: SpatialStructure) -> Result<()> {
    let dims: &[&str] = match structure {
        SpatialStructure::Point => &[POINT],
        SpatialStructure::StackedPoint => &[STACKED_POINT],
        SpatialStructure::Cuboid => &[HEIGHT, SOUTH_NORTH, WEST_EAST],
        SpatialStructure::Raster => &[SOUTH_NORTH, WEST_EAST],
    };
    for dim in dims {
        if ds.dim_size(dim).unwrap_or(0) == 0 {
            return Err(SpatialError::dimensions(format!(
                "structural dimension '{dim}' is empty"
            )));
        }
    }
    Ok(())
}

fn coord_values(ds: &Dataset, name: &str) -> Result<Array1<f64>> {
    ds.coord(name)
        .map(|c| c.values.clone())
        .ok_or_else(|| SpatialError::structure(format!("missing coordinate '{name}'")))
}

/// Copy `ds` with the given dimensions of every variable merged (in order)
/// into `new_dim`. Coordinates over the merged dimensions are dropped; the
/// caller re-inserts their flattened forms.
fn stacked_copy(ds: &Dataset, stack_dims: &[(&str, usize)], new_dim: &str) -> Result<Dataset> {
    let mut out = Dataset::new(ds.crs);
    out.attrs = ds.attrs.clone();
    for (name, coord) in &ds.coords {
        if !stack_dims.iter().any(|(d, _)| coord.dim == *d) {
            out.insert_coord(name, coord.clone());
        }
    }
    for (name, var) in &ds.variables {
        let var = if stack_dims.iter().any(|(d, _)| var.has_dim(d)) {
            stack_var(var, stack_dims, new_dim)?
        } else {
            var.clone()
        };
        out.insert_variable(name, var)?;
    }
    Ok(out)
}

/// Merge the given dimensions of one variable into `new_dim`, broadcasting
/// over any of them the variable lacks.
fn stack_var(var: &Variable, stack_dims: &[(&str, usize)], new_dim: &str) -> Result<Variable> {
    let mut dims = var.dims.clone();
    let mut data = var.data.clone();
    for &(dim, size) in stack_dims {
        if !dims.iter().any(|d| d == dim) {
            data = data.broadcast_axis(dims.len(), size);
            dims.push(dim.to_string());
        }
    }

    let mut order: Vec<usize> = dims
        .iter()
        .enumerate()
        .filter(|(_, d)| !stack_dims.iter().any(|(s, _)| d.as_str() == *s))
        .map(|(i, _)| i)
        .collect();
    let lead = order.len();
    for &(dim, _) in stack_dims {
        let i = dims
            .iter()
            .position(|d| d == dim)
            .ok_or_else(|| SpatialError::dimensions(format!("missing dimension '{dim}'")))?;
        order.push(i);
    }
    data = data.permuted(&order);
    let dims: Vec<String> = order.iter().map(|&i| dims[i].clone()).collect();

    let mut shape: Vec<usize> = data.shape()[..lead].to_vec();
    let merged: usize = data.shape()[lead..].iter().product();
    shape.push(merged);
    let data = data.reshaped(&shape)?;

    let mut out_dims: Vec<String> = dims[..lead].to_vec();
    out_dims.push(new_dim.to_string());
    Ok(Variable {
        dims: out_dims,
        data,
    })
}

/// Reorder a variable's point axis by `perm` and split it into the given
/// dimensions. With `squeeze`, the leading split axis is collapsed to its
/// first slice afterwards.
pub(crate) fn split_point_var(
    var: &Variable,
    axis: usize,
    perm: &[usize],
    splits: &[(&str, usize)],
    squeeze: bool,
) -> Result<Variable> {
    let data = var.data.selected(axis, perm);
    let mut shape: Vec<usize> = data.shape().to_vec();
    shape.splice(axis..=axis, splits.iter().map(|&(_, s)| s));
    let mut data = data.reshaped(&shape)?;
    let mut dims = var.dims.clone();
    dims.splice(axis..=axis, splits.iter().map(|&(d, _)| d.to_string()));
    if squeeze {
        data = data.index_axis(axis, 0);
        dims.remove(axis);
    }
    Ok(Variable { dims, data })
}

/// Each element repeated `times` in place: `[a, b] -> [a, a, b, b]`.
fn repeat(values: &Array1<f64>, times: usize) -> Array1<f64> {
    Array1::from_iter(values.iter().flat_map(|&v| std::iter::repeat(v).take(times)))
}

/// The whole array repeated `times`: `[a, b] -> [a, b, a, b]`.
fn tile(values: &Array1<f64>, times: usize) -> Array1<f64> {
    Array1::from_iter((0..times).flat_map(|_| values.iter().copied()))
}

fn sorted_unique(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    v.dedup_by(|a, b| a.total_cmp(b).is_eq());
    v
}

/// Unique `(south_north, west_east)` pairs in lexicographic order with
/// `south_north` as the primary key.
fn lexsorted_unique_pairs(sn: &[f64], we: &[f64]) -> Vec<(f64, f64)> {
    let mut pairs: Vec<(f64, f64)> = sn.iter().copied().zip(we.iter().copied()).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    pairs.dedup_by(|a, b| a.0.total_cmp(&b.0).is_eq() && a.1.total_cmp(&b.1).is_eq());
    pairs
}

/// Indices that order the points lexicographically by `(south_north,
/// west_east)`.
pub(crate) fn lexsort_order(sn: &[f64], we: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..sn.len()).collect();
    order.sort_by(|&a, &b| sn[a].total_cmp(&sn[b]).then(we[a].total_cmp(&we[b])));
    order
}

/// Permutation placing point `perm[hi * pairs.len() + si] = i` so the point
/// axis can be split into (vertical, horizontal) product form. `None` when
/// some combination is missing or duplicated.
fn product_permutation(
    h: &[f64],
    sn: &[f64],
    we: &[f64],
    uh: &[f64],
    pairs: &[(f64, f64)],
) -> Option<Vec<usize>> {
    let np = h.len();
    let nsp = pairs.len();
    let mut perm = vec![usize::MAX; np];
    for i in 0..np {
        let hi = uh.binary_search_by(|v| v.total_cmp(&h[i])).ok()?;
        let si = pairs
            .binary_search_by(|p| p.0.total_cmp(&sn[i]).then(p.1.total_cmp(&we[i])))
            .ok()?;
        let pos = hi * nsp + si;
        if perm[pos] != usize::MAX {
            return None;
        }
        perm[pos] = i;
    }
    Some(perm)
}
