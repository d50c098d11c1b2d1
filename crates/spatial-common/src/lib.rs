//! Common spatial types shared by the wind-spatial crates.
//!
//! Contains the value objects that cross crate boundaries: bounding boxes,
//! polygon geometry for masking, CRS identifiers and the shared error enum.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod geometry;

pub use bbox::BBox;
pub use crs::CrsDef;
pub use error::{Result, SpatialError};
pub use geometry::{GeometryCollection, Polygon};
