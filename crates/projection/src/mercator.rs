//! Web Mercator projection (EPSG:3857).
//!
//! Spherical Mercator on the WGS84 semi-major axis, the defining convention
//! of the Web Mercator CRS.

use std::f64::consts::PI;

use spatial_common::{Result, SpatialError};

/// WGS84 semi-major axis in meters, the Web Mercator sphere radius.
pub const WEB_MERCATOR_RADIUS: f64 = 6378137.0;

/// Web Mercator projection.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebMercator;

impl WebMercator {
    /// Project geographic coordinates (degrees) to meters.
    ///
    /// Fails for latitudes at or beyond the poles, where the projection
    /// diverges.
    pub fn forward(&self, lon_deg: f64, lat_deg: f64) -> Result<(f64, f64)> {
        if lat_deg.abs() >= 90.0 {
            return Err(SpatialError::projection(format!(
                "latitude {lat_deg} is outside the Web Mercator domain"
            )));
        }
        let lon = lon_deg.to_radians();
        let lat = lat_deg.to_radians();

        let x = WEB_MERCATOR_RADIUS * lon;
        let y = WEB_MERCATOR_RADIUS * (PI / 4.0 + lat / 2.0).tan().ln();
        Ok((x, y))
    }

    /// Unproject meters back to geographic coordinates (degrees).
    pub fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let lon = x / WEB_MERCATOR_RADIUS;
        let lat = 2.0 * (y / WEB_MERCATOR_RADIUS).exp().atan() - PI / 2.0;
        Ok((lon.to_degrees(), lat.to_degrees()))
    }
}
