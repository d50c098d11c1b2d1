//! Dimension and coordinate naming conventions.
//!
//! The engine recognizes a closed set of spatial dimension names; everything
//! else (e.g. `sector`) is carried through transformations untouched.

/// Vertical dimension/coordinate name.
pub const HEIGHT: &str = "height";
/// Northing dimension/coordinate name.
pub const SOUTH_NORTH: &str = "south_north";
/// Easting dimension/coordinate name.
pub const WEST_EAST: &str = "west_east";
/// Fully unordered 3D location dimension.
pub const POINT: &str = "point";
/// Irregular horizontal location dimension sharing a common height axis.
pub const STACKED_POINT: &str = "stacked_point";
/// Closeness-rank dimension produced by multi-neighbor lookups.
pub const RANK: &str = "rank";

/// The three spatial coordinate names, in canonical order.
pub const SPATIAL_COORDS: [&str; 3] = [HEIGHT, SOUTH_NORTH, WEST_EAST];
/// The horizontal coordinate names.
pub const HORIZONTAL_COORDS: [&str; 2] = [SOUTH_NORTH, WEST_EAST];

/// Canonical trailing order for spatial dimensions.
///
/// Downstream storage conventions expect spatial dimensions last, ordered
/// `..., height, south_north, west_east` (cuboid), `..., height,
/// stacked_point`, or `..., point`.
pub const CANONICAL_DIM_ORDER: [&str; 6] =
    [HEIGHT, SOUTH_NORTH, WEST_EAST, STACKED_POINT, POINT, RANK];

/// Check whether a dimension name is one of the spatial structure dimensions.
pub fn is_spatial_dim(name: &str) -> bool {
    matches!(
        name,
        HEIGHT | SOUTH_NORTH | WEST_EAST | POINT | STACKED_POINT
    )
}
