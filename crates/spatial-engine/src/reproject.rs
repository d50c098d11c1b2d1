//! Coordinate reprojection of whole datasets.

use ndarray::Array1;
use projection::Transformer;
use spatial_common::{CrsDef, Result};
use tracing::debug;

use crate::convert::to_stacked_point;
use crate::dataset::Dataset;
use crate::dims::{SOUTH_NORTH, WEST_EAST};
use crate::structure::{require_structure, SpatialStructure};

/// Tolerance under which reprojected coordinates are considered the same
/// location and snapped to one value.
pub(crate) const REPLACE_CLOSE_TOL: f64 = 1e-9;

/// Reproject a dataset's horizontal coordinates to another CRS.
///
/// Cuboid and raster input is converted to stacked_point first, since
/// projection does not preserve regular spacing; this structural change is
/// part of the contract. Nearly-coincident output coordinates are snapped
/// together so projection noise cannot split one grid line into several.
pub fn reproject(ds: &Dataset, to: CrsDef) -> Result<Dataset> {
    let from = ds.get_crs()?;
    if from == to {
        return Ok(ds.clone());
    }

    let structure = require_structure(ds)?;
    let mut out = match structure {
        SpatialStructure::Cuboid | SpatialStructure::Raster => {
            debug!(%structure, "regular grid reprojected as stacked_point");
            to_stacked_point(ds)?
        }
        _ => ds.clone(),
    };

    let xs = out.coord(WEST_EAST).map(|c| c.values.to_vec());
    let ys = out.coord(SOUTH_NORTH).map(|c| c.values.to_vec());
    if let (Some(xs), Some(ys)) = (xs, ys) {
        let transformer = Transformer::between(from, to);
        let (mut xs, mut ys) = transformer.transform(&xs, &ys)?;
        replace_close(&mut xs, REPLACE_CLOSE_TOL);
        replace_close(&mut ys, REPLACE_CLOSE_TOL);
        if let Some(c) = out.coords.get_mut(WEST_EAST) {
            c.values = Array1::from(xs);
        }
        if let Some(c) = out.coords.get_mut(SOUTH_NORTH) {
            c.values = Array1::from(ys);
        }
    }
    out.set_crs(to);
    Ok(out)
}

/// Snap values closer than `tol` to a single representative, in place.
pub(crate) fn replace_close(values: &mut [f64], tol: f64) {
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted.dedup_by(|a, b| a.total_cmp(b).is_eq());
    if sorted.len() < 2 {
        return;
    }

    // Representative of each cluster is its first (smallest) member
    let mut reps: Vec<(f64, f64)> = Vec::with_capacity(sorted.len());
    let mut current = sorted[0];
    reps.push((sorted[0], current));
    for &v in &sorted[1..] {
        if v - current > tol {
            current = v;
        }
        reps.push((v, current));
    }

    for v in values.iter_mut() {
        if let Ok(i) = reps.binary_search_by(|(k, _)| k.total_cmp(v)) {
            *v = reps[i].1;
        }
    }
}
