//! Interpolation between spatial datasets.

pub mod delaunay;
pub mod structured;
pub mod unstructured;

mod cubic;
mod natural;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use spatial_common::SpatialError;

pub use structured::interp_structured_like;
pub use unstructured::{interp_unstructured, interp_unstructured_like};

/// Scattered-data interpolation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpMethod {
    /// Value of the closest source point.
    Nearest,
    /// Piecewise linear: table lookup in 1D, barycentric over the Delaunay
    /// triangulation in 2D.
    Linear,
    /// Piecewise cubic: Hermite spline in 1D, Bezier triangles in 2D.
    Cubic,
    /// Sibson natural neighbor, falling back to nearest outside the hull
    /// and at coincident points.
    Natural,
}

impl fmt::Display for InterpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Nearest => "nearest",
            Self::Linear => "linear",
            Self::Cubic => "cubic",
            Self::Natural => "natural",
        };
        f.write_str(name)
    }
}

impl FromStr for InterpMethod {
    type Err = SpatialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nearest" => Ok(Self::Nearest),
            "linear" => Ok(Self::Linear),
            "cubic" => Ok(Self::Cubic),
            "natural" => Ok(Self::Natural),
            other => Err(SpatialError::config(format!(
                "unknown interpolation method '{other}'"
            ))),
        }
    }
}
