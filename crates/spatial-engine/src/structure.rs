//! Structural classification of spatial datasets.
//!
//! Every valid dataset is in exactly one of four structures, detected from
//! which dimensions its coordinates are indexed by. The classifier itself
//! never fails: it reports `None` for unclassifiable data, and callers raise
//! a descriptive error where `None` is unacceptable.

use std::fmt;

use serde::{Deserialize, Serialize};
use spatial_common::{BBox, Result, SpatialError};

use crate::dataset::Dataset;
use crate::dims::{HEIGHT, POINT, SOUTH_NORTH, STACKED_POINT, WEST_EAST};

/// Tolerance below which coordinate spacing deviations are considered
/// regular, in length units.
pub const SPACING_THRESH: f64 = 1e-9;

/// The four mutually exclusive spatial structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpatialStructure {
    /// Fully unordered collection of 3D locations, dims `(point,)`.
    Point,
    /// Irregular horizontal locations sharing a common height axis,
    /// dims `(height, stacked_point)`.
    StackedPoint,
    /// Regular 3D grid, dims `(height, south_north, west_east)`.
    Cuboid,
    /// Regular 2D grid without a height dimension.
    Raster,
}

impl fmt::Display for SpatialStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Point => "point",
            Self::StackedPoint => "stacked_point",
            Self::Cuboid => "cuboid",
            Self::Raster => "raster",
        };
        write!(f, "{name}")
    }
}

/// Check that a coordinate axis is regularly spaced within `thresh`.
///
/// Single-element axes count as regular; duplicate consecutive values do
/// not (a grid axis must be strictly monotonic).
pub fn regularly_spaced(values: &[f64], thresh: f64) -> bool {
    if values.is_empty() {
        return false;
    }
    if values.len() == 1 {
        return true;
    }
    let mut min_step = f64::INFINITY;
    let mut max_step = f64::NEG_INFINITY;
    for pair in values.windows(2) {
        let step = pair[1] - pair[0];
        min_step = min_step.min(step);
        max_step = max_step.max(step);
    }
    // Same sign (monotonic) and near-constant step
    if min_step.signum() != max_step.signum() || min_step == 0.0 {
        return false;
    }
    (max_step - min_step).abs() <= thresh
}

/// Detect the spatial structure of a dataset.
///
/// Checks in priority order: point, stacked_point, then cuboid/raster with a
/// regular-spacing test. Returns `None` when no structure matches.
pub fn spatial_structure(ds: &Dataset) -> Option<SpatialStructure> {
    let we = ds.coord(WEST_EAST)?;
    let sn = ds.coord(SOUTH_NORTH)?;

    if we.dim == POINT && sn.dim == POINT {
        if let Some(h) = ds.coord(HEIGHT) {
            if h.dim != POINT {
                return None;
            }
        }
        return Some(SpatialStructure::Point);
    }

    if we.dim == STACKED_POINT && sn.dim == STACKED_POINT {
        if let Some(h) = ds.coord(HEIGHT) {
            if h.dim != HEIGHT {
                return None;
            }
        }
        return Some(SpatialStructure::StackedPoint);
    }

    if we.dim == WEST_EAST && sn.dim == SOUTH_NORTH {
        let regular = regularly_spaced(we.values.as_slice().unwrap_or(&[]), SPACING_THRESH)
            && regularly_spaced(sn.values.as_slice().unwrap_or(&[]), SPACING_THRESH);
        if !regular {
            return None;
        }
        return match ds.coord(HEIGHT) {
            Some(h) if h.dim == HEIGHT => Some(SpatialStructure::Cuboid),
            Some(_) => None,
            None => Some(SpatialStructure::Raster),
        };
    }

    None
}

/// Detect the structure or fail with a descriptive error.
pub fn require_structure(ds: &Dataset) -> Result<SpatialStructure> {
    spatial_structure(ds).ok_or_else(|| {
        SpatialError::structure("could not determine the spatial structure of the dataset")
    })
}

/// Number of spatial elements in a dataset of any structure.
pub fn count_spatial_points(ds: &Dataset) -> Result<usize> {
    let size = |dim: &str| ds.dim_size(dim).unwrap_or(1);
    match require_structure(ds)? {
        SpatialStructure::Cuboid => Ok(size(HEIGHT) * size(SOUTH_NORTH) * size(WEST_EAST)),
        SpatialStructure::Raster => Ok(size(SOUTH_NORTH) * size(WEST_EAST)),
        SpatialStructure::StackedPoint => Ok(size(HEIGHT) * size(STACKED_POINT)),
        SpatialStructure::Point => Ok(size(POINT)),
    }
}

/// Check that the spatial coordinates of two datasets are numerically equal.
pub fn are_spatially_equal(a: &Dataset, b: &Dataset) -> bool {
    let close = |x: &[f64], y: &[f64]| {
        x.len() == y.len()
            && x.iter()
                .zip(y)
                .all(|(u, v)| (u - v).abs() <= 1e-8 + 1e-5 * v.abs())
    };
    for name in [WEST_EAST, SOUTH_NORTH] {
        match (a.coord(name), b.coord(name)) {
            (Some(ca), Some(cb)) => {
                let (Some(xa), Some(xb)) = (ca.values.as_slice(), cb.values.as_slice()) else {
                    return false;
                };
                if !close(xa, xb) {
                    return false;
                }
            }
            _ => return false,
        }
    }
    true
}

/// Check that two datasets have the same spatial structure and shape.
pub fn equal_spatial_shape(a: &Dataset, b: &Dataset) -> Result<bool> {
    let (sa, sb) = (spatial_structure(a), spatial_structure(b));
    if sa != sb {
        return Ok(false);
    }
    let same = |dim: &str| a.dim_size(dim) == b.dim_size(dim);
    match sa {
        Some(SpatialStructure::Point) => Ok(same(POINT)),
        Some(SpatialStructure::StackedPoint) => Ok(same(STACKED_POINT) && same(HEIGHT)),
        Some(SpatialStructure::Cuboid) => {
            Ok(same(WEST_EAST) && same(SOUTH_NORTH) && same(HEIGHT))
        }
        Some(SpatialStructure::Raster) => Ok(same(WEST_EAST) && same(SOUTH_NORTH)),
        None => Err(SpatialError::structure(
            "could not determine the spatial structure of the dataset",
        )),
    }
}

/// Bounding box of a dataset's horizontal coordinates, in its own CRS.
///
/// Works for every structure: the box spans the extrema of the `west_east`
/// and `south_north` coordinate values however they are indexed.
pub fn get_bbox(ds: &Dataset) -> Result<BBox> {
    let crs = ds.get_crs()?;
    require_structure(ds)?;
    let extent = |name: &str| -> Result<(f64, f64)> {
        let c = ds
            .coord(name)
            .ok_or_else(|| SpatialError::dimensions(format!("missing coordinate '{name}'")))?;
        let min = c.values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = c.values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        Ok((min, max))
    };
    let (min_x, max_x) = extent(WEST_EAST)?;
    let (min_y, max_y) = extent(SOUTH_NORTH)?;
    Ok(BBox::new(min_x, min_y, max_x, max_y, crs))
}

/// Check whether the spatial extent of cuboid `a` covers every coordinate of
/// `b` in all three axes.
pub fn covers(a: &Dataset, b: &Dataset) -> Result<bool> {
    if spatial_structure(a) != Some(SpatialStructure::Cuboid) {
        return Err(SpatialError::structure(format!(
            "covers requires a cuboid, got {:?}",
            spatial_structure(a)
        )));
    }

    for name in [WEST_EAST, SOUTH_NORTH, HEIGHT] {
        let ca = a
            .coord(name)
            .ok_or_else(|| SpatialError::dimensions(format!("missing coordinate '{name}'")))?;
        let cb = b
            .coord(name)
            .ok_or_else(|| SpatialError::dimensions(format!("missing coordinate '{name}'")))?;
        let min = ca.values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = ca.values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if cb.values.iter().any(|&v| v < min || v > max) {
            return Ok(false);
        }
    }
    Ok(true)
}
