//! Labeled multi-dimensional container types.
//!
//! A [`Dataset`] bundles data variables and coordinate arrays that share
//! named dimensions, plus an optional CRS. It is the in-memory currency of
//! the whole engine: every transform takes datasets and returns datasets.

use std::collections::BTreeMap;

use ndarray::{Array1, ArrayD, Axis, IxDyn};
use spatial_common::{CrsDef, Result, SpatialError};

use crate::dims::CANONICAL_DIM_ORDER;

/// Values of a data variable.
///
/// Numeric variables are what the interpolators operate on; text variables
/// (e.g. mast names) ride along through structural transforms and are
/// warned-and-skipped by interpolation.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableData {
    Numeric(ArrayD<f64>),
    Text(ArrayD<String>),
}

impl VariableData {
    /// A zero-filled numeric array of the given shape.
    pub fn zeros(shape: &[usize]) -> Self {
        Self::Numeric(ArrayD::zeros(IxDyn(shape)))
    }

    /// Array shape.
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Numeric(a) => a.shape(),
            Self::Text(a) => a.shape(),
        }
    }

    /// Number of axes.
    pub fn ndim(&self) -> usize {
        match self {
            Self::Numeric(a) => a.ndim(),
            Self::Text(a) => a.ndim(),
        }
    }

    /// True for numeric data.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric(_))
    }

    /// Borrow the numeric array, if this is numeric data.
    pub fn as_numeric(&self) -> Option<&ArrayD<f64>> {
        match self {
            Self::Numeric(a) => Some(a),
            Self::Text(_) => None,
        }
    }

    /// Mutably borrow the numeric array, if this is numeric data.
    pub fn as_numeric_mut(&mut self) -> Option<&mut ArrayD<f64>> {
        match self {
            Self::Numeric(a) => Some(a),
            Self::Text(_) => None,
        }
    }

    /// Reshape, preserving logical (row-major) element order.
    pub fn reshaped(&self, shape: &[usize]) -> Result<Self> {
        let n_old: usize = self.shape().iter().product();
        let n_new: usize = shape.iter().product();
        if n_old != n_new {
            return Err(SpatialError::dimensions(format!(
                "cannot reshape {:?} into {:?}",
                self.shape(),
                shape
            )));
        }
        Ok(match self {
            Self::Numeric(a) => {
                let flat: Vec<f64> = a.iter().copied().collect();
                Self::Numeric(
                    ArrayD::from_shape_vec(IxDyn(shape), flat)
                        .map_err(|e| SpatialError::dimensions(e.to_string()))?,
                )
            }
            Self::Text(a) => {
                let flat: Vec<String> = a.iter().cloned().collect();
                Self::Text(
                    ArrayD::from_shape_vec(IxDyn(shape), flat)
                        .map_err(|e| SpatialError::dimensions(e.to_string()))?,
                )
            }
        })
    }

    /// Permute axes.
    pub fn permuted(&self, perm: &[usize]) -> Self {
        match self {
            Self::Numeric(a) => {
                Self::Numeric(a.clone().permuted_axes(IxDyn(perm)).as_standard_layout().to_owned())
            }
            Self::Text(a) => {
                Self::Text(a.clone().permuted_axes(IxDyn(perm)).as_standard_layout().to_owned())
            }
        }
    }

    /// Select indices along an axis (the axis keeps its place, resized).
    pub fn selected(&self, axis: usize, indices: &[usize]) -> Self {
        match self {
            Self::Numeric(a) => Self::Numeric(a.select(Axis(axis), indices)),
            Self::Text(a) => Self::Text(a.select(Axis(axis), indices)),
        }
    }

    /// Take a single index along an axis, dropping the axis.
    pub fn index_axis(&self, axis: usize, index: usize) -> Self {
        match self {
            Self::Numeric(a) => Self::Numeric(a.index_axis(Axis(axis), index).to_owned()),
            Self::Text(a) => Self::Text(a.index_axis(Axis(axis), index).to_owned()),
        }
    }

    /// Insert a new axis of the given size at `axis`, repeating the data
    /// along it.
    pub fn broadcast_axis(&self, axis: usize, size: usize) -> Self {
        let mut shape = self.shape().to_vec();
        shape.insert(axis, size);
        match self {
            Self::Numeric(a) => {
                let expanded = a.clone().insert_axis(Axis(axis));
                Self::Numeric(
                    expanded
                        .broadcast(IxDyn(&shape))
                        .expect("size-1 axis broadcast cannot fail")
                        .to_owned(),
                )
            }
            Self::Text(a) => {
                let expanded = a.clone().insert_axis(Axis(axis));
                Self::Text(
                    expanded
                        .broadcast(IxDyn(&shape))
                        .expect("size-1 axis broadcast cannot fail")
                        .to_owned(),
                )
            }
        }
    }
}

/// A data variable: an ND array with named dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Dimension names, one per array axis.
    pub dims: Vec<String>,
    pub data: VariableData,
}

impl Variable {
    /// Create a numeric variable.
    pub fn numeric(dims: Vec<String>, values: ArrayD<f64>) -> Self {
        Self {
            dims,
            data: VariableData::Numeric(values),
        }
    }

    /// Create a text variable.
    pub fn text(dims: Vec<String>, values: ArrayD<String>) -> Self {
        Self {
            dims,
            data: VariableData::Text(values),
        }
    }

    /// Axis index of a dimension name, if the variable has it.
    pub fn axis_of(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    /// True if the variable has the dimension.
    pub fn has_dim(&self, dim: &str) -> bool {
        self.axis_of(dim).is_some()
    }
}

/// A 1D coordinate array indexed by a single named dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinate {
    /// The dimension this coordinate is indexed by. For a cuboid's
    /// `west_east` coordinate this is `west_east` itself; in point form it
    /// is `point`.
    pub dim: String,
    pub values: Array1<f64>,
}

impl Coordinate {
    pub fn new(dim: impl Into<String>, values: Array1<f64>) -> Self {
        Self {
            dim: dim.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A labeled bundle of data variables and coordinates sharing dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub variables: BTreeMap<String, Variable>,
    pub coords: BTreeMap<String, Coordinate>,
    pub crs: Option<CrsDef>,
    /// Free-form provenance metadata. Never consulted for correctness.
    pub attrs: BTreeMap<String, String>,
}

impl Dataset {
    /// Create an empty dataset, optionally tagged with a CRS.
    pub fn new(crs: Option<CrsDef>) -> Self {
        Self {
            variables: BTreeMap::new(),
            coords: BTreeMap::new(),
            crs,
            attrs: BTreeMap::new(),
        }
    }

    /// The dataset's CRS.
    ///
    /// Cross-object operations (reprojection, nearest-neighbor, masking)
    /// require a CRS; pure structural conversion does not.
    pub fn get_crs(&self) -> Result<CrsDef> {
        self.crs
            .ok_or_else(|| SpatialError::crs("no CRS found on dataset; set one with set_crs"))
    }

    /// Attach or replace the CRS.
    pub fn set_crs(&mut self, crs: CrsDef) {
        self.crs = Some(crs);
    }

    /// Look up a coordinate by name.
    pub fn coord(&self, name: &str) -> Option<&Coordinate> {
        self.coords.get(name)
    }

    /// Insert a coordinate.
    pub fn insert_coord(&mut self, name: impl Into<String>, coord: Coordinate) {
        self.coords.insert(name.into(), coord);
    }

    /// Insert a variable, validating its shape against known dimension sizes.
    pub fn insert_variable(&mut self, name: impl Into<String>, var: Variable) -> Result<()> {
        if var.dims.len() != var.data.ndim() {
            return Err(SpatialError::dimensions(format!(
                "variable has {} dims but {} axes",
                var.dims.len(),
                var.data.ndim()
            )));
        }
        for (dim, &size) in var.dims.iter().zip(var.data.shape()) {
            if let Some(known) = self.dim_size(dim) {
                if known != size {
                    return Err(SpatialError::dimensions(format!(
                        "dimension '{dim}' has size {known} but variable axis has size {size}"
                    )));
                }
            }
        }
        self.variables.insert(name.into(), var);
        Ok(())
    }

    /// The size of a named dimension, from coordinates first, then variables.
    pub fn dim_size(&self, dim: &str) -> Option<usize> {
        for coord in self.coords.values() {
            if coord.dim == dim {
                return Some(coord.len());
            }
        }
        for var in self.variables.values() {
            if let Some(axis) = var.axis_of(dim) {
                return Some(var.data.shape()[axis]);
            }
        }
        None
    }

    /// True if any coordinate or variable uses the dimension.
    pub fn has_dim(&self, dim: &str) -> bool {
        self.dim_size(dim).is_some()
    }

    /// Rename a dimension everywhere it appears.
    pub fn rename_dim(&mut self, old: &str, new: &str) {
        for coord in self.coords.values_mut() {
            if coord.dim == old {
                coord.dim = new.to_string();
            }
        }
        for var in self.variables.values_mut() {
            for dim in var.dims.iter_mut() {
                if dim == old {
                    *dim = new.to_string();
                }
            }
        }
    }

    /// Reorder every variable's axes so spatial dimensions trail in
    /// canonical order (`..., height, south_north, west_east` etc.), the
    /// storage convention downstream writers expect.
    pub fn transpose_canonical(&mut self) {
        for var in self.variables.values_mut() {
            let mut order: Vec<usize> = Vec::with_capacity(var.dims.len());
            // Non-canonical dims keep their relative order up front
            for (i, dim) in var.dims.iter().enumerate() {
                if !CANONICAL_DIM_ORDER.contains(&dim.as_str()) {
                    order.push(i);
                }
            }
            for name in CANONICAL_DIM_ORDER {
                if let Some(i) = var.dims.iter().position(|d| d == name) {
                    order.push(i);
                }
            }
            if order.iter().enumerate().all(|(a, &b)| a == b) {
                continue;
            }
            let new_dims: Vec<String> = order.iter().map(|&i| var.dims[i].clone()).collect();
            var.data = var.data.permuted(&order);
            var.dims = new_dims;
        }
    }
}
