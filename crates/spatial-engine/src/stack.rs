//! Flatten-and-restore round trip around point form.
//!
//! Most algorithms here (nearest neighbor, unstructured interpolation,
//! point-in-polygon tests) want a flat list of points regardless of how the
//! caller's data is laid out. [`spatial_stack`] produces that flat form plus
//! a [`StackTicket`] describing everything needed to reverse the trip;
//! [`spatial_unstack`] replays the ticket to restore the original layout,
//! CRS, and point order.

use std::collections::{BTreeMap, BTreeSet};

use spatial_common::{CrsDef, Result, SpatialError};
use tracing::debug;

use crate::convert::{split_point_var, to_point};
use crate::dataset::{Coordinate, Dataset};
use crate::dims::{HEIGHT, POINT, SOUTH_NORTH, STACKED_POINT, WEST_EAST};
use crate::reproject::reproject;
use crate::structure::{require_structure, SpatialStructure};

/// Options for [`spatial_stack`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StackOptions {
    /// Reproject to this CRS before flattening. The original CRS is recorded
    /// in the ticket and restored on unstack.
    pub target_crs: Option<CrsDef>,
    /// Drop the vertical axis entirely, for inherently 2D algorithms. The
    /// restored dataset then has no height either.
    pub remove_height: bool,
}

/// Everything [`spatial_unstack`] needs to reverse a [`spatial_stack`].
///
/// A default (empty) ticket records nothing; unstacking with it returns the
/// input as point form with canonical dimension order, the best effort
/// available without provenance.
#[derive(Debug, Clone, Default)]
pub struct StackTicket {
    structure: Option<SpatialStructure>,
    /// Original CRS as well-known text, recorded only when the stack
    /// reprojected.
    crs_wkt: Option<String>,
    /// Original structural coordinate arrays, in their original order.
    axes: Vec<TicketAxis>,
    /// Variables that had horizontal but no vertical dimension before
    /// flattening broadcast them over height.
    two_d_vars: BTreeSet<String>,
}

#[derive(Debug, Clone)]
struct TicketAxis {
    name: String,
    dim: String,
    values: Vec<f64>,
}

impl StackTicket {
    /// The structure the stacked dataset came from, if recorded.
    pub fn original_structure(&self) -> Option<SpatialStructure> {
        self.structure
    }
}

/// Flatten a dataset to point structure, returning the flattened dataset and
/// the ticket that reverses the operation.
pub fn spatial_stack(ds: Dataset, opts: &StackOptions) -> Result<(Dataset, StackTicket)> {
    let mut ds = ds;
    if opts.remove_height {
        drop_height(&mut ds);
    }

    let structure = require_structure(&ds)?;
    let mut ticket = StackTicket {
        structure: Some(structure),
        ..StackTicket::default()
    };

    if ds.has_dim(HEIGHT) {
        for (name, var) in &ds.variables {
            let horizontal = var.has_dim(SOUTH_NORTH)
                || var.has_dim(WEST_EAST)
                || var.has_dim(STACKED_POINT);
            if horizontal && !var.has_dim(HEIGHT) {
                ticket.two_d_vars.insert(name.clone());
            }
        }
    }
    for name in [HEIGHT, SOUTH_NORTH, WEST_EAST] {
        if let Some(coord) = ds.coord(name) {
            if coord.dim != POINT {
                ticket.axes.push(TicketAxis {
                    name: name.to_string(),
                    dim: coord.dim.clone(),
                    values: coord.values.to_vec(),
                });
            }
        }
    }

    if let Some(target) = opts.target_crs {
        let source = ds.get_crs()?;
        if source != target {
            ticket.crs_wkt = Some(source.to_wkt());
            ds = reproject(&ds, target)?;
        }
    }

    let flat = to_point(&ds)?;
    debug!(
        structure = %structure,
        points = flat.dim_size(POINT).unwrap_or(0),
        "stacked dataset to point form"
    );
    Ok((flat, ticket))
}

/// Reverse a [`spatial_stack`], restoring CRS, structure, and point order.
pub fn spatial_unstack(ds: Dataset, ticket: &StackTicket) -> Result<Dataset> {
    let Some(structure) = ticket.structure else {
        let mut out = to_point(&ds)?;
        out.transpose_canonical();
        return Ok(out);
    };

    let mut ds = ds;
    if let Some(wkt) = &ticket.crs_wkt {
        let original = CrsDef::from_wkt(wkt)?;
        ds = reproject(&ds, original)?;
    }
    let point_form = to_point(&ds)?;

    match structure {
        SpatialStructure::Point => {
            let mut out = point_form;
            out.transpose_canonical();
            Ok(out)
        }
        SpatialStructure::StackedPoint => restore_stacked(&point_form, ticket),
        SpatialStructure::Cuboid | SpatialStructure::Raster => {
            restore_grid(&point_form, ticket)
        }
    }
}

fn drop_height(ds: &mut Dataset) {
    ds.coords.remove(HEIGHT);
    for var in ds.variables.values_mut() {
        if let Some(axis) = var.axis_of(HEIGHT) {
            var.data = var.data.index_axis(axis, 0);
            var.dims.remove(axis);
        }
    }
}

fn ticket_axis<'a>(ticket: &'a StackTicket, name: &str) -> Option<&'a TicketAxis> {
    ticket.axes.iter().find(|a| a.name == name)
}

fn restore_error() -> SpatialError {
    SpatialError::structure("stacked points no longer match the recorded original structure")
}

fn restore_grid(point_form: &Dataset, ticket: &StackTicket) -> Result<Dataset> {
    let h_axis = ticket_axis(ticket, HEIGHT);
    let y_axis = ticket_axis(ticket, SOUTH_NORTH).ok_or_else(restore_error)?;
    let x_axis = ticket_axis(ticket, WEST_EAST).ok_or_else(restore_error)?;
    let (ny, nx) = (y_axis.values.len(), x_axis.values.len());
    let nz = h_axis.map_or(1, |a| a.values.len());

    let sn = point_coord(point_form, SOUTH_NORTH)?;
    let we = point_coord(point_form, WEST_EAST)?;
    let np = sn.len();
    if nz * ny * nx != np {
        return Err(restore_error());
    }

    let y_lookup = AxisLookup::new(&y_axis.values);
    let x_lookup = AxisLookup::new(&x_axis.values);
    let h_lookup = h_axis.map(|a| AxisLookup::new(&a.values));
    let heights = point_form.coord(HEIGHT).map(|c| c.values.to_vec());

    let mut perm = vec![usize::MAX; np];
    for i in 0..np {
        let yi = y_lookup.index_of(sn[i]);
        let xi = x_lookup.index_of(we[i]);
        let hi = match (&h_lookup, &heights) {
            (Some(lookup), Some(h)) => lookup.index_of(h[i]),
            _ => 0,
        };
        let pos = (hi * ny + yi) * nx + xi;
        if perm[pos] != usize::MAX {
            return Err(restore_error());
        }
        perm[pos] = i;
    }

    let mut splits: Vec<(&str, usize)> = Vec::new();
    if let Some(a) = h_axis {
        splits.push((HEIGHT, a.values.len()));
    }
    splits.push((SOUTH_NORTH, ny));
    splits.push((WEST_EAST, nx));

    let mut out = rebuilt_shell(point_form);
    for (name, var) in &point_form.variables {
        let var = match var.axis_of(POINT) {
            Some(axis) => {
                let squeeze = ticket.two_d_vars.contains(name) && h_axis.is_some();
                split_point_var(var, axis, &perm, &splits, squeeze)?
            }
            None => var.clone(),
        };
        out.insert_variable(name, var)?;
    }
    for axis in [Some(y_axis), Some(x_axis), h_axis].into_iter().flatten() {
        out.insert_coord(
            &axis.name,
            Coordinate::new(axis.dim.clone(), axis.values.clone().into()),
        );
    }
    out.transpose_canonical();
    Ok(out)
}

fn restore_stacked(point_form: &Dataset, ticket: &StackTicket) -> Result<Dataset> {
    let y_axis = ticket_axis(ticket, SOUTH_NORTH).ok_or_else(restore_error)?;
    let x_axis = ticket_axis(ticket, WEST_EAST).ok_or_else(restore_error)?;
    let h_axis = ticket_axis(ticket, HEIGHT);
    let nsp = y_axis.values.len();
    let nz = h_axis.map_or(1, |a| a.values.len());

    let sn = point_coord(point_form, SOUTH_NORTH)?;
    let we = point_coord(point_form, WEST_EAST)?;
    let np = sn.len();
    if nz * nsp != np {
        return Err(restore_error());
    }

    // Map each original stacked location, via its per-axis cluster indices,
    // back to its position in the original point order
    let y_lookup = AxisLookup::new(&y_axis.values);
    let x_lookup = AxisLookup::new(&x_axis.values);
    let mut pair_index: BTreeMap<(usize, usize), usize> = BTreeMap::new();
    for si in 0..nsp {
        let key = (
            y_lookup.index_of(y_axis.values[si]),
            x_lookup.index_of(x_axis.values[si]),
        );
        if pair_index.insert(key, si).is_some() {
            return Err(restore_error());
        }
    }

    let h_lookup = h_axis.map(|a| AxisLookup::new(&a.values));
    let heights = point_form.coord(HEIGHT).map(|c| c.values.to_vec());

    let mut perm = vec![usize::MAX; np];
    for i in 0..np {
        let key = (y_lookup.index_of(sn[i]), x_lookup.index_of(we[i]));
        let si = *pair_index.get(&key).ok_or_else(restore_error)?;
        let hi = match (&h_lookup, &heights) {
            (Some(lookup), Some(h)) => lookup.index_of(h[i]),
            _ => 0,
        };
        let pos = hi * nsp + si;
        if perm[pos] != usize::MAX {
            return Err(restore_error());
        }
        perm[pos] = i;
    }

    let mut splits: Vec<(&str, usize)> = Vec::new();
    if let Some(a) = h_axis {
        splits.push((HEIGHT, a.values.len()));
    }
    splits.push((STACKED_POINT, nsp));

    let mut out = rebuilt_shell(point_form);
    for (name, var) in &point_form.variables {
        let var = match var.axis_of(POINT) {
            Some(axis) => {
                let squeeze = ticket.two_d_vars.contains(name) && h_axis.is_some();
                split_point_var(var, axis, &perm, &splits, squeeze)?
            }
            None => var.clone(),
        };
        out.insert_variable(name, var)?;
    }
    out.insert_coord(
        SOUTH_NORTH,
        Coordinate::new(STACKED_POINT, y_axis.values.clone().into()),
    );
    out.insert_coord(
        WEST_EAST,
        Coordinate::new(STACKED_POINT, x_axis.values.clone().into()),
    );
    if let Some(a) = h_axis {
        out.insert_coord(HEIGHT, Coordinate::new(HEIGHT, a.values.clone().into()));
    }
    out.transpose_canonical();
    Ok(out)
}

/// New dataset carrying over the CRS, attrs, and non-point coordinates.
fn rebuilt_shell(point_form: &Dataset) -> Dataset {
    let mut out = Dataset::new(point_form.crs);
    out.attrs = point_form.attrs.clone();
    for (name, coord) in &point_form.coords {
        if coord.dim != POINT {
            out.insert_coord(name, coord.clone());
        }
    }
    out
}

fn point_coord(ds: &Dataset, name: &str) -> Result<Vec<f64>> {
    let coord = ds
        .coord(name)
        .ok_or_else(|| SpatialError::structure(format!("missing coordinate '{name}'")))?;
    if coord.dim != POINT {
        return Err(SpatialError::structure(format!(
            "coordinate '{name}' is not point-indexed"
        )));
    }
    Ok(coord.values.to_vec())
}

/// Nearest-value lookup into an axis, tolerant of the floating-point noise a
/// projection round trip leaves on coordinates.
struct AxisLookup {
    sorted: Vec<f64>,
    original_index: Vec<usize>,
}

impl AxisLookup {
    fn new(values: &[f64]) -> Self {
        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        let sorted: Vec<f64> = order.iter().map(|&i| values[i]).collect();
        Self {
            sorted,
            original_index: order,
        }
    }

    /// Index, in the original axis order, of the value closest to `v`.
    fn index_of(&self, v: f64) -> usize {
        let n = self.sorted.len();
        let i = self.sorted.partition_point(|&x| x < v);
        let best = if i == 0 {
            0
        } else if i == n {
            n - 1
        } else if (v - self.sorted[i - 1]).abs() <= (self.sorted[i] - v).abs() {
            i - 1
        } else {
            i
        };
        self.original_index[best]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{create_dataset, TargetStructure};
    use crate::dataset::Variable;
    use crate::structure::spatial_structure;
    use ndarray::{ArrayD, IxDyn};

    fn utm() -> CrsDef {
        CrsDef::Utm {
            zone: 32,
            north: true,
        }
    }

    fn filled(mut ds: Dataset) -> Dataset {
        for var in ds.variables.values_mut() {
            let arr = var.data.as_numeric_mut().unwrap();
            let n = arr.len();
            *arr = ArrayD::from_shape_vec(
                IxDyn(arr.shape()),
                (0..n).map(|i| i as f64).collect(),
            )
            .unwrap();
        }
        ds
    }

    #[test]
    fn test_cuboid_round_trip() {
        let src = filled(
            create_dataset(
                &[0.0, 100.0, 200.0],
                &[0.0, 100.0],
                &[10.0, 50.0],
                utm(),
                TargetStructure::Cuboid,
            )
            .unwrap(),
        );
        let (flat, ticket) = spatial_stack(src.clone(), &StackOptions::default()).unwrap();
        assert_eq!(spatial_structure(&flat), Some(SpatialStructure::Point));
        let back = spatial_unstack(flat, &ticket).unwrap();
        assert_eq!(back, src);
    }

    #[test]
    fn test_descending_axis_round_trip() {
        // North-up rasters store south_north descending; restoration must
        // keep that order
        let src = filled(
            create_dataset(
                &[0.0, 1.0],
                &[5.0, 4.0, 3.0],
                &[10.0],
                utm(),
                TargetStructure::Cuboid,
            )
            .unwrap(),
        );
        let (flat, ticket) = spatial_stack(src.clone(), &StackOptions::default()).unwrap();
        let back = spatial_unstack(flat, &ticket).unwrap();
        assert_eq!(back, src);
    }

    #[test]
    fn test_stacked_point_order_restored() {
        // Stacked points deliberately not in lexicographic order
        let src = filled(
            create_dataset(
                &[7.0, 1.0, 3.0],
                &[2.0, 9.0, 4.0],
                &[10.0, 50.0],
                utm(),
                TargetStructure::StackedPoint,
            )
            .unwrap(),
        );
        let (flat, ticket) = spatial_stack(src.clone(), &StackOptions::default()).unwrap();
        let back = spatial_unstack(flat, &ticket).unwrap();
        assert_eq!(back, src);
    }

    #[test]
    fn test_reprojecting_stack_round_trip() {
        let src = filled(
            create_dataset(
                &[10.0, 10.5, 11.0],
                &[55.0, 55.5],
                &[80.0],
                CrsDef::Geographic,
                TargetStructure::Cuboid,
            )
            .unwrap(),
        );
        let opts = StackOptions {
            target_crs: Some(utm()),
            remove_height: false,
        };
        let (flat, ticket) = spatial_stack(src.clone(), &opts).unwrap();
        assert_eq!(flat.get_crs().unwrap(), utm());

        let back = spatial_unstack(flat, &ticket).unwrap();
        assert_eq!(spatial_structure(&back), Some(SpatialStructure::Cuboid));
        assert_eq!(back.get_crs().unwrap(), CrsDef::Geographic);
        // Coordinates restored exactly, data in original positions
        assert_eq!(back.coords, src.coords);
        assert_eq!(back.variables, src.variables);
    }

    #[test]
    fn test_remove_height() {
        let src = filled(
            create_dataset(
                &[0.0, 1.0],
                &[0.0, 1.0],
                &[10.0, 50.0],
                utm(),
                TargetStructure::Cuboid,
            )
            .unwrap(),
        );
        let opts = StackOptions {
            target_crs: None,
            remove_height: true,
        };
        let (flat, ticket) = spatial_stack(src, &opts).unwrap();
        assert!(!flat.has_dim(HEIGHT));
        assert!(flat.coord(HEIGHT).is_none());

        let back = spatial_unstack(flat, &ticket).unwrap();
        assert_eq!(spatial_structure(&back), Some(SpatialStructure::Raster));
    }

    #[test]
    fn test_empty_ticket_best_effort() {
        let src = filled(
            create_dataset(
                &[0.0, 1.0],
                &[0.0, 1.0],
                &[10.0],
                utm(),
                TargetStructure::Cuboid,
            )
            .unwrap(),
        );
        let out = spatial_unstack(src, &StackTicket::default()).unwrap();
        assert_eq!(spatial_structure(&out), Some(SpatialStructure::Point));
    }

    #[test]
    fn test_two_d_variable_survives_round_trip() {
        let mut src = filled(
            create_dataset(
                &[0.0, 1.0],
                &[0.0, 1.0],
                &[10.0, 50.0],
                utm(),
                TargetStructure::Cuboid,
            )
            .unwrap(),
        );
        let elev = Variable::numeric(
            vec![SOUTH_NORTH.to_string(), WEST_EAST.to_string()],
            ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![1.0, 2.0, 3.0, 4.0]).unwrap(),
        );
        src.insert_variable("elevation", elev.clone()).unwrap();

        let (flat, ticket) = spatial_stack(src.clone(), &StackOptions::default()).unwrap();
        let back = spatial_unstack(flat, &ticket).unwrap();
        assert_eq!(back.variables["elevation"], elev);
        assert_eq!(back.variables["output"], src.variables["output"]);
    }
}
