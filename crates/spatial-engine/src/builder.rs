//! Zero-filled dataset construction from coordinate arrays.

use ndarray::{Array1, ArrayD, IxDyn};
use spatial_common::{CrsDef, Result, SpatialError};

use crate::dataset::{Coordinate, Dataset, Variable};
use crate::dims::{HEIGHT, POINT, SOUTH_NORTH, STACKED_POINT, WEST_EAST};
use crate::structure::{regularly_spaced, SPACING_THRESH};

/// Which structure [`create_dataset`] should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetStructure {
    /// Try cuboid first, then stacked_point, then point.
    #[default]
    Auto,
    Cuboid,
    StackedPoint,
    Point,
}

/// Create a zero-filled single-variable dataset from 1D coordinate arrays.
///
/// With [`TargetStructure::Auto`], a cuboid is chosen when both horizontal
/// arrays are regularly spaced (they may have different lengths); otherwise
/// a stacked_point when the horizontal arrays match in length but heights
/// differ; otherwise a point when all three lengths match.
///
/// The result carries one variable named `output` with the correct dimension
/// wiring and the given CRS attached.
pub fn create_dataset(
    west_east: &[f64],
    south_north: &[f64],
    height: &[f64],
    crs: CrsDef,
    structure: TargetStructure,
) -> Result<Dataset> {
    let (x, y, z) = (west_east, south_north, height);

    let structure = match structure {
        TargetStructure::Auto => {
            if has_grid_axes(x, y) {
                TargetStructure::Cuboid
            } else if y.len() == x.len() && x.len() != z.len() {
                TargetStructure::StackedPoint
            } else if y.len() == x.len() && y.len() == z.len() {
                TargetStructure::Point
            } else {
                return Err(SpatialError::structure(
                    "Cannot identify struct of input data.",
                ));
            }
        }
        other => other,
    };

    let mut ds = Dataset::new(Some(crs));
    let (shape, dims): (Vec<usize>, Vec<&str>) = match structure {
        TargetStructure::Cuboid => {
            if !has_grid_axes(x, y) {
                return Err(SpatialError::structure(
                    "data cannot be converted to a raster or cuboid dataset",
                ));
            }
            ds.insert_coord(HEIGHT, Coordinate::new(HEIGHT, Array1::from(z.to_vec())));
            ds.insert_coord(SOUTH_NORTH, Coordinate::new(SOUTH_NORTH, Array1::from(y.to_vec())));
            ds.insert_coord(WEST_EAST, Coordinate::new(WEST_EAST, Array1::from(x.to_vec())));
            (vec![z.len(), y.len(), x.len()], vec![HEIGHT, SOUTH_NORTH, WEST_EAST])
        }
        TargetStructure::StackedPoint => {
            if y.len() != x.len() {
                return Err(SpatialError::dimensions(
                    "south_north and west_east sizes do not match",
                ));
            }
            ds.insert_coord(HEIGHT, Coordinate::new(HEIGHT, Array1::from(z.to_vec())));
            ds.insert_coord(SOUTH_NORTH, Coordinate::new(STACKED_POINT, Array1::from(y.to_vec())));
            ds.insert_coord(WEST_EAST, Coordinate::new(STACKED_POINT, Array1::from(x.to_vec())));
            (vec![z.len(), x.len()], vec![HEIGHT, STACKED_POINT])
        }
        TargetStructure::Point => {
            if y.len() != x.len() || y.len() != z.len() {
                return Err(SpatialError::dimensions(
                    "a point dataset cannot be made from input arrays of differing sizes",
                ));
            }
            ds.insert_coord(HEIGHT, Coordinate::new(POINT, Array1::from(z.to_vec())));
            ds.insert_coord(SOUTH_NORTH, Coordinate::new(POINT, Array1::from(y.to_vec())));
            ds.insert_coord(WEST_EAST, Coordinate::new(POINT, Array1::from(x.to_vec())));
            (vec![x.len()], vec![POINT])
        }
        TargetStructure::Auto => unreachable!("auto resolved above"),
    };

    let data = ArrayD::zeros(IxDyn(&shape));
    let var = Variable::numeric(dims.iter().map(|s| s.to_string()).collect(), data);
    ds.insert_variable("output", var)?;
    Ok(ds)
}

fn has_grid_axes(x: &[f64], y: &[f64]) -> bool {
    regularly_spaced(x, SPACING_THRESH) && regularly_spaced(y, SPACING_THRESH)
}
