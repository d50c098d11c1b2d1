//! Nearest source points for every target point.

pub mod kdtree;

use spatial_common::{Result, SpatialError};
use tracing::warn;

use crate::dataset::{Dataset, Variable};
use crate::dims::{HEIGHT, POINT, RANK, SOUTH_NORTH, WEST_EAST};
use crate::stack::{spatial_stack, spatial_unstack, StackOptions};
use kdtree::KdTree;

/// Options for [`nearest_points`].
#[derive(Debug, Clone)]
pub struct NearestOptions {
    /// How many source points to return per target point.
    pub n_nearest: usize,
    /// Coordinates the distance is measured over. Defaults to all three
    /// spatial coordinates; heightless (raster) data needs an explicit
    /// horizontal-only list.
    pub dims: Vec<String>,
    /// Attach a `distance` variable with the Euclidean distances.
    pub include_distance: bool,
}

impl Default for NearestOptions {
    fn default() -> Self {
        Self {
            n_nearest: 1,
            dims: vec![
                WEST_EAST.to_string(),
                SOUTH_NORTH.to_string(),
                HEIGHT.to_string(),
            ],
            include_distance: false,
        }
    }
}

/// Sample `source` at the points of it closest to each point of `target`.
///
/// Both datasets are flattened to point form and a k-d tree is built over
/// the source coordinates named in `opts.dims`. With `n_nearest == 1` the
/// result is restored to `target`'s original structure; with more neighbors
/// every variable gains a trailing `rank` dimension (nearest first) and the
/// result stays in point form, which has no structure to restore to.
///
/// Both datasets must carry the same CRS. A geographic CRS only gets a
/// warning: degrees are not a metric, but the lookup still works when the
/// caller knows the domain is small.
pub fn nearest_points(
    source: &Dataset,
    target: &Dataset,
    opts: &NearestOptions,
) -> Result<Dataset> {
    if opts.n_nearest == 0 {
        return Err(SpatialError::config("n_nearest must be at least 1"));
    }
    let source_crs = source.get_crs()?;
    let target_crs = target.get_crs()?;
    if source_crs != target_crs {
        return Err(SpatialError::crs(format!(
            "source and target CRS differ ({source_crs} vs {target_crs}); reproject first"
        )));
    }
    if source_crs.is_geographic() {
        warn!("nearest-point distances computed in degrees, not meters");
    }

    let (src, _) = spatial_stack(source.clone(), &StackOptions::default())?;
    let (tgt, tgt_ticket) = spatial_stack(target.clone(), &StackOptions::default())?;

    let dim = opts.dims.len();
    if dim == 0 {
        return Err(SpatialError::config("no dimensions given to measure over"));
    }
    let src_coords = coord_matrix(&src, &opts.dims)?;
    let tgt_coords = coord_matrix(&tgt, &opts.dims)?;
    let n_src = src_coords.len() / dim;
    let n_tgt = tgt_coords.len() / dim;
    let k = opts.n_nearest;
    if k > n_src {
        return Err(SpatialError::config(format!(
            "requested {k} neighbors but the source has only {n_src} points"
        )));
    }

    let tree = KdTree::build(src_coords, dim);
    // Rank-minor gather order, so the point axis splits into (point, rank)
    let mut gather: Vec<usize> = Vec::with_capacity(n_tgt * k);
    let mut distances: Vec<f64> = Vec::with_capacity(n_tgt * k);
    for j in 0..n_tgt {
        let query = &tgt_coords[j * dim..(j + 1) * dim];
        let hits = tree.nearest(query, k);
        for (index, d2) in hits {
            gather.push(index);
            distances.push(d2.sqrt());
        }
    }

    let mut out = Dataset::new(tgt.crs);
    out.attrs = tgt.attrs.clone();
    for (name, coord) in &tgt.coords {
        out.insert_coord(name, coord.clone());
    }
    for (name, var) in &src.variables {
        let Some(axis) = var.axis_of(POINT) else {
            continue;
        };
        let picked = var.data.selected(axis, &gather);
        let mut dims = var.dims.clone();
        let mut shape = picked.shape().to_vec();
        let (data, dims) = if k == 1 {
            (picked, dims)
        } else {
            shape.splice(axis..=axis, [n_tgt, k]);
            dims.splice(axis..=axis, [POINT.to_string(), RANK.to_string()]);
            (picked.reshaped(&shape)?, dims)
        };
        out.insert_variable(name, Variable { dims, data })?;
    }
    if opts.include_distance {
        let (shape, dims): (Vec<usize>, Vec<&str>) = if k == 1 {
            (vec![n_tgt], vec![POINT])
        } else {
            (vec![n_tgt, k], vec![POINT, RANK])
        };
        let data = ndarray::ArrayD::from_shape_vec(ndarray::IxDyn(&shape), distances)
            .map_err(|e| SpatialError::dimensions(e.to_string()))?;
        out.insert_variable(
            "distance",
            Variable::numeric(dims.iter().map(|s| s.to_string()).collect(), data),
        )?;
    }
    out.transpose_canonical();

    if k == 1 {
        spatial_unstack(out, &tgt_ticket)
    } else {
        Ok(out)
    }
}

/// Point-major coordinate buffer over the named coordinates.
fn coord_matrix(point_form: &Dataset, dims: &[String]) -> Result<Vec<f64>> {
    let mut columns = Vec::with_capacity(dims.len());
    for name in dims {
        let coord = point_form.coord(name).ok_or_else(|| {
            SpatialError::structure(format!("missing coordinate '{name}'"))
        })?;
        columns.push(&coord.values);
    }
    let n = columns.first().map_or(0, |c| c.len());
    let mut flat = Vec::with_capacity(n * dims.len());
    for i in 0..n {
        for col in &columns {
            flat.push(col[i]);
        }
    }
    Ok(flat)
}
