//! Error types shared across the spatial crates.

use thiserror::Error;

/// Errors that can occur during spatial transformations.
#[derive(Error, Debug)]
pub enum SpatialError {
    /// The spatial structure of the data cannot be determined, or an
    /// operation requires a structure the input does not have.
    #[error("spatial structure error: {0}")]
    StructuralAmbiguity(String),

    /// Coordinate arrays or dimension sets are incompatible.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Missing CRS, or CRS mismatch between objects that must share one.
    #[error("CRS error: {0}")]
    Crs(String),

    /// Invalid method name, unsupported axis count or similar caller error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Projection math failure (point outside the projection's domain).
    #[error("projection error: {0}")]
    Projection(String),
}

impl SpatialError {
    /// Create a StructuralAmbiguity error.
    pub fn structure(msg: impl Into<String>) -> Self {
        Self::StructuralAmbiguity(msg.into())
    }

    /// Create a DimensionMismatch error.
    pub fn dimensions(msg: impl Into<String>) -> Self {
        Self::DimensionMismatch(msg.into())
    }

    /// Create a Crs error.
    pub fn crs(msg: impl Into<String>) -> Self {
        Self::Crs(msg.into())
    }

    /// Create a Configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a Projection error.
    pub fn projection(msg: impl Into<String>) -> Self {
        Self::Projection(msg.into())
    }
}

/// Result type for spatial operations.
pub type Result<T> = std::result::Result<T, SpatialError>;
