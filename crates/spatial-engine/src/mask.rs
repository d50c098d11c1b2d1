//! Masking and clipping against polygon geometries.

use ndarray::Array1;
use spatial_common::{GeometryCollection, Result, SpatialError};
use tracing::warn;

use crate::dataset::Dataset;
use crate::dims::{POINT, SOUTH_NORTH, STACKED_POINT, WEST_EAST};
use crate::structure::{require_structure, SpatialStructure};

/// Policy knobs for [`mask`] and [`clip`].
#[derive(Debug, Clone, Copy)]
pub struct MaskOptions {
    /// Count a grid cell as member when the geometry touches any part of it,
    /// not only its center.
    pub all_touched: bool,
    /// Keep the outside instead of the inside.
    pub invert: bool,
    /// Fill value for non-member cells.
    pub nodata: f64,
}

impl Default for MaskOptions {
    fn default() -> Self {
        Self {
            all_touched: false,
            invert: false,
            nodata: f64::NAN,
        }
    }
}

/// Null every cell or point outside the geometry, keeping the shape.
///
/// Grid cells are tested at their centers unless `all_touched` is set;
/// points are tested directly. Non-numeric variables are left untouched.
pub fn mask(ds: &Dataset, geometry: &GeometryCollection, opts: &MaskOptions) -> Result<Dataset> {
    check_crs(ds, geometry)?;
    let mut out = ds.clone();
    match require_structure(ds)? {
        SpatialStructure::Cuboid | SpatialStructure::Raster => {
            let members = grid_membership(ds, geometry, opts)?;
            apply_grid_mask(&mut out, &members, opts.nodata)?;
        }
        SpatialStructure::Point | SpatialStructure::StackedPoint => {
            let (dim, members) = point_membership(ds, geometry, opts)?;
            apply_point_mask(&mut out, &dim, &members, opts.nodata);
        }
    }
    Ok(out)
}

/// Drop everything outside the geometry.
///
/// Grids are cropped to the smallest index window holding all member cells,
/// with any non-member cells inside the window nulled; point structures drop
/// the non-member points outright. Fails when nothing is inside.
pub fn clip(ds: &Dataset, geometry: &GeometryCollection, opts: &MaskOptions) -> Result<Dataset> {
    check_crs(ds, geometry)?;
    match require_structure(ds)? {
        SpatialStructure::Cuboid | SpatialStructure::Raster => {
            let members = grid_membership(ds, geometry, opts)?;
            let rows: Vec<usize> = (0..members.ny)
                .filter(|&y| (0..members.nx).any(|x| members.get(y, x)))
                .collect();
            let cols: Vec<usize> = (0..members.nx)
                .filter(|&x| (0..members.ny).any(|y| members.get(y, x)))
                .collect();
            if rows.is_empty() {
                return Err(SpatialError::config(
                    "geometry does not intersect the dataset",
                ));
            }

            let mut out = ds.clone();
            select_dim(&mut out, SOUTH_NORTH, &rows);
            select_dim(&mut out, WEST_EAST, &cols);
            let mut bits = Vec::with_capacity(rows.len() * cols.len());
            for &y in &rows {
                for &x in &cols {
                    bits.push(members.get(y, x));
                }
            }
            let window = Membership {
                ny: rows.len(),
                nx: cols.len(),
                bits,
            };
            apply_grid_mask(&mut out, &window, opts.nodata)?;
            Ok(out)
        }
        SpatialStructure::Point | SpatialStructure::StackedPoint => {
            let (dim, members) = point_membership(ds, geometry, opts)?;
            let keep: Vec<usize> = members
                .iter()
                .enumerate()
                .filter_map(|(i, &m)| m.then_some(i))
                .collect();
            if keep.is_empty() {
                return Err(SpatialError::config(
                    "geometry does not intersect the dataset",
                ));
            }
            let mut out = ds.clone();
            select_dim(&mut out, &dim, &keep);
            Ok(out)
        }
    }
}

/// [`clip`] with the geometry's bounding box buffered by a multiple of the
/// grid spacing, so interpolation near the clip edge keeps enough support.
///
/// Warns, without failing, when the buffered region reaches past the
/// dataset's own extent.
pub fn clip_with_margin(
    ds: &Dataset,
    geometry: &GeometryCollection,
    margin_dx_factor: f64,
) -> Result<Dataset> {
    check_crs(ds, geometry)?;
    if !matches!(
        require_structure(ds)?,
        SpatialStructure::Cuboid | SpatialStructure::Raster
    ) {
        return Err(SpatialError::structure(
            "margin clipping requires a cuboid or raster dataset",
        ));
    }
    let (dx, dy) = grid_spacing(ds)?;
    let margin = margin_dx_factor * dx.abs().max(dy.abs());
    let buffered = geometry.bbox().buffer(margin);

    let we = coord_slice(ds, WEST_EAST)?;
    let sn = coord_slice(ds, SOUTH_NORTH)?;
    let bounds = spatial_common::BBox::from_coords(&we, &sn, ds.get_crs()?);
    if !bounds.contains(&buffered) {
        warn!(
            margin,
            "buffered clip region extends beyond the dataset bounds"
        );
    }

    clip(ds, &buffered.into(), &MaskOptions::default())
}

fn check_crs(ds: &Dataset, geometry: &GeometryCollection) -> Result<()> {
    let crs = ds.get_crs()?;
    if crs != geometry.crs {
        return Err(SpatialError::crs(format!(
            "geometry CRS {} does not match dataset CRS {crs}",
            geometry.crs
        )));
    }
    Ok(())
}

/// Row-major cell membership of a grid.
struct Membership {
    ny: usize,
    nx: usize,
    bits: Vec<bool>,
}

impl Membership {
    fn get(&self, y: usize, x: usize) -> bool {
        self.bits[y * self.nx + x]
    }
}

fn grid_membership(
    ds: &Dataset,
    geometry: &GeometryCollection,
    opts: &MaskOptions,
) -> Result<Membership> {
    let we = coord_slice(ds, WEST_EAST)?;
    let sn = coord_slice(ds, SOUTH_NORTH)?;
    let (dx, dy) = grid_spacing(ds)?;

    let mut bits = Vec::with_capacity(sn.len() * we.len());
    for &y in &sn {
        for &x in &we {
            let mut member = geometry.contains_point(x, y);
            if !member && opts.all_touched {
                member = cell_touched(geometry, x, y, dx.abs(), dy.abs());
            }
            bits.push(member != opts.invert);
        }
    }
    Ok(Membership {
        ny: sn.len(),
        nx: we.len(),
        bits,
    })
}

/// Whether the geometry touches any part of the cell centered at `(x, y)`.
fn cell_touched(geometry: &GeometryCollection, x: f64, y: f64, dx: f64, dy: f64) -> bool {
    let (x0, x1) = (x - dx / 2.0, x + dx / 2.0);
    let (y0, y1) = (y - dy / 2.0, y + dy / 2.0);

    let corners = [(x0, y0), (x1, y0), (x1, y1), (x0, y1)];
    if corners.iter().any(|&(cx, cy)| geometry.contains_point(cx, cy)) {
        return true;
    }
    for poly in geometry.polygons() {
        for &(vx, vy) in poly.ring() {
            if vx >= x0 && vx <= x1 && vy >= y0 && vy <= y1 {
                return true;
            }
        }
        let edges = [
            (x0, y0, x1, y0),
            (x1, y0, x1, y1),
            (x1, y1, x0, y1),
            (x0, y1, x0, y0),
        ];
        if edges
            .iter()
            .any(|&(ax, ay, bx, by)| poly.edge_intersects_segment(ax, ay, bx, by))
        {
            return true;
        }
    }
    false
}

fn apply_grid_mask(ds: &mut Dataset, members: &Membership, nodata: f64) -> Result<()> {
    for var in ds.variables.values_mut() {
        let (Some(sn_axis), Some(we_axis)) = (var.axis_of(SOUTH_NORTH), var.axis_of(WEST_EAST))
        else {
            continue;
        };
        let Some(arr) = var.data.as_numeric_mut() else {
            continue;
        };
        for (idx, v) in arr.indexed_iter_mut() {
            if !members.get(idx[sn_axis], idx[we_axis]) {
                *v = nodata;
            }
        }
    }
    Ok(())
}

/// Per-point membership and the dimension it is indexed by.
fn point_membership(
    ds: &Dataset,
    geometry: &GeometryCollection,
    opts: &MaskOptions,
) -> Result<(String, Vec<bool>)> {
    let we = ds
        .coord(WEST_EAST)
        .ok_or_else(|| SpatialError::structure("missing coordinate 'west_east'"))?;
    let sn = ds
        .coord(SOUTH_NORTH)
        .ok_or_else(|| SpatialError::structure("missing coordinate 'south_north'"))?;
    let dim = we.dim.clone();
    debug_assert!(dim == POINT || dim == STACKED_POINT);

    let members = we
        .values
        .iter()
        .zip(sn.values.iter())
        .map(|(&x, &y)| geometry.contains_point(x, y) != opts.invert)
        .collect();
    Ok((dim, members))
}

fn apply_point_mask(ds: &mut Dataset, dim: &str, members: &[bool], nodata: f64) {
    for var in ds.variables.values_mut() {
        let Some(axis) = var.axis_of(dim) else {
            continue;
        };
        let Some(arr) = var.data.as_numeric_mut() else {
            continue;
        };
        for (idx, v) in arr.indexed_iter_mut() {
            if !members[idx[axis]] {
                *v = nodata;
            }
        }
    }
}

/// Subset coordinates and variables along a dimension.
fn select_dim(ds: &mut Dataset, dim: &str, indices: &[usize]) {
    for coord in ds.coords.values_mut() {
        if coord.dim == dim {
            let picked: Vec<f64> = indices.iter().map(|&i| coord.values[i]).collect();
            coord.values = Array1::from(picked);
        }
    }
    for var in ds.variables.values_mut() {
        if let Some(axis) = var.axis_of(dim) {
            var.data = var.data.selected(axis, indices);
        }
    }
}

fn coord_slice(ds: &Dataset, name: &str) -> Result<Vec<f64>> {
    ds.coord(name)
        .map(|c| c.values.to_vec())
        .ok_or_else(|| SpatialError::structure(format!("missing coordinate '{name}'")))
}

/// Grid spacing along `west_east` and `south_north`; zero for single-line
/// axes.
fn grid_spacing(ds: &Dataset) -> Result<(f64, f64)> {
    let we = coord_slice(ds, WEST_EAST)?;
    let sn = coord_slice(ds, SOUTH_NORTH)?;
    let dx = if we.len() > 1 { we[1] - we[0] } else { 0.0 };
    let dy = if sn.len() > 1 { sn[1] - sn[0] } else { 0.0 };
    Ok((dx, dy))
}
