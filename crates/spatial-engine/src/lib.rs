//! Spatial structures and interpolation for gridded and scattered wind data.
//!
//! Datasets come in four interchangeable layouts:
//!
//! - **cuboid**: regular `(height, south_north, west_east)` grid
//! - **raster**: regular 2D `(south_north, west_east)` grid
//! - **stacked_point**: irregular horizontal locations with a shared
//!   height axis
//! - **point**: a flat list of `(height, south_north, west_east)` triples
//!
//! The engine classifies layouts, converts between them losslessly, and
//! builds the common operations on top of that round trip: reprojection,
//! structured and scattered interpolation, polygon masking and clipping,
//! and nearest-point lookup.
//!
//! # Example
//!
//! ```ignore
//! use spatial_engine::{create_dataset, spatial_stack, spatial_unstack};
//! use spatial_engine::{StackOptions, TargetStructure};
//! use spatial_common::CrsDef;
//!
//! let grid = create_dataset(
//!     &[0.0, 100.0, 200.0],
//!     &[0.0, 100.0],
//!     &[10.0],
//!     CrsDef::Utm { zone: 32, north: true },
//!     TargetStructure::Auto,
//! )?;
//!
//! // Flatten to points, do point-wise work, restore the grid
//! let (points, ticket) = spatial_stack(grid, &StackOptions::default())?;
//! let grid = spatial_unstack(points, &ticket)?;
//! # Ok::<(), spatial_common::SpatialError>(())
//! ```

pub mod builder;
pub mod convert;
pub mod dataset;
pub mod dims;
pub mod interp;
pub mod mask;
pub mod nearest;
pub mod reproject;
pub mod stack;
pub mod structure;

pub use builder::{create_dataset, TargetStructure};
pub use convert::{to_point, to_raster, to_stacked_point};
pub use dataset::{Coordinate, Dataset, Variable, VariableData};
pub use interp::{
    interp_structured_like, interp_unstructured, interp_unstructured_like, InterpMethod,
};
pub use mask::{clip, clip_with_margin, mask, MaskOptions};
pub use nearest::{nearest_points, NearestOptions};
pub use reproject::reproject;
pub use stack::{spatial_stack, spatial_unstack, StackOptions, StackTicket};
pub use structure::{
    are_spatially_equal, count_spatial_points, covers, equal_spatial_shape, get_bbox,
    spatial_structure,
    SpatialStructure,
};
