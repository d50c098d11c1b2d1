//! Transverse Mercator projection and UTM zone parameters.
//!
//! Spherical form of the projection: a Mercator cylinder rotated to be
//! tangent along a chosen central meridian. UTM zones are transverse
//! Mercator with a 0.9996 scale factor, 500 km false easting and a 10,000 km
//! false northing in the southern hemisphere.

use spatial_common::{Result, SpatialError};

/// Mean earth radius in meters used for the spherical projection form.
pub const EARTH_RADIUS: f64 = 6371008.8;

/// Transverse Mercator projection parameters.
#[derive(Debug, Clone)]
pub struct TransverseMercator {
    /// Central meridian in radians
    pub lon0: f64,
    /// Scale factor at the central meridian
    pub k0: f64,
    /// False easting (meters)
    pub false_easting: f64,
    /// False northing (meters)
    pub false_northing: f64,
    /// Earth radius (meters)
    pub radius: f64,
}

impl TransverseMercator {
    /// Create a projection for a UTM zone.
    ///
    /// Zone 1 is centered at 177°W; each zone is 6° wide.
    pub fn utm(zone: u8, north: bool) -> Self {
        let lon0_deg = -183.0 + 6.0 * zone as f64;
        Self {
            lon0: lon0_deg.to_radians(),
            k0: 0.9996,
            false_easting: 500_000.0,
            false_northing: if north { 0.0 } else { 10_000_000.0 },
            radius: EARTH_RADIUS,
        }
    }

    /// Project geographic coordinates (degrees) to easting/northing (meters).
    ///
    /// Fails for points 90° away from the central meridian, where the
    /// cylinder unrolls to infinity.
    pub fn forward(&self, lon_deg: f64, lat_deg: f64) -> Result<(f64, f64)> {
        let lon = lon_deg.to_radians();
        let lat = lat_deg.to_radians();

        let mut dlon = lon - self.lon0;
        while dlon > std::f64::consts::PI {
            dlon -= 2.0 * std::f64::consts::PI;
        }
        while dlon < -std::f64::consts::PI {
            dlon += 2.0 * std::f64::consts::PI;
        }

        let b = lat.cos() * dlon.sin();
        if 1.0 - b.abs() < 1e-12 {
            return Err(SpatialError::projection(format!(
                "point ({lon_deg}, {lat_deg}) is outside the transverse Mercator domain"
            )));
        }

        let x = self.k0 * self.radius * b.atanh();
        let y = self.k0 * self.radius * (lat.tan() / dlon.cos()).atan();

        Ok((x + self.false_easting, y + self.false_northing))
    }

    /// Unproject easting/northing (meters) back to geographic degrees.
    pub fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let xn = (x - self.false_easting) / (self.k0 * self.radius);
        let yn = (y - self.false_northing) / (self.k0 * self.radius);

        let lat = (yn.sin() / xn.cosh()).asin();
        let lon = self.lon0 + (xn.sinh() / yn.cos()).atan();

        Ok((lon.to_degrees(), lat.to_degrees()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_central_meridian() {
        // On the central meridian at the equator, easting is the false easting
        let proj = TransverseMercator::utm(32, true);
        let (x, y) = proj.forward(9.0, 0.0).unwrap();
        assert!((x - 500_000.0).abs() < 1e-6, "easting should be 500km, got {x}");
        assert!(y.abs() < 1e-6, "northing at equator should be 0, got {y}");
    }

    #[test]
    fn test_south_false_northing() {
        let proj = TransverseMercator::utm(33, false);
        let (_, y) = proj.forward(15.0, -0.001).unwrap();
        assert!(
            y < 10_000_000.0 && y > 9_999_000.0,
            "just south of the equator northing should be just below 10,000km, got {y}"
        );
    }

    #[test]
    fn test_roundtrip() {
        let proj = TransverseMercator::utm(32, true);
        for &(lon, lat) in &[(9.0, 55.0), (7.3, 62.1), (11.9, 48.2)] {
            let (x, y) = proj.forward(lon, lat).unwrap();
            let (lon2, lat2) = proj.inverse(x, y).unwrap();
            assert!((lon - lon2).abs() < 1e-9, "lon roundtrip: {lon} vs {lon2}");
            assert!((lat - lat2).abs() < 1e-9, "lat roundtrip: {lat} vs {lat2}");
        }
    }

    #[test]
    fn test_antipodal_rejected() {
        let proj = TransverseMercator::utm(32, true);
        // 90 degrees away from the central meridian at the equator
        assert!(proj.forward(99.0, 0.0).is_err());
    }
}
