//! Coordinate reference system transformations.
//!
//! Implements map projections from scratch without external dependencies.
//! All projections use spherical forms; the engine's contract is a
//! self-consistent, exactly invertible transform, not geodetic-grade datum
//! handling.

pub mod mercator;
pub mod transform;
pub mod transverse;

pub use mercator::WebMercator;
pub use transform::{reproject_bbox, Transformer};
pub use transverse::TransverseMercator;
