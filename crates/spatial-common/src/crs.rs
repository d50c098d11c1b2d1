//! Coordinate Reference System identifiers.
//!
//! The engine supports a closed set of reference systems; the actual
//! projection math lives in the `projection` crate.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SpatialError};

/// Well-known CRS definitions supported by the spatial engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrsDef {
    /// WGS84 Geographic (lon/lat in degrees), EPSG:4326.
    Geographic,
    /// Web Mercator (meters), EPSG:3857.
    WebMercator,
    /// Universal Transverse Mercator zone (meters).
    /// EPSG:326xx for the northern hemisphere, EPSG:327xx for the southern.
    Utm { zone: u8, north: bool },
}

impl CrsDef {
    /// Parse a CRS from an EPSG code.
    pub fn from_epsg(code: u32) -> Result<Self> {
        match code {
            4326 => Ok(CrsDef::Geographic),
            3857 | 900913 => Ok(CrsDef::WebMercator),
            32601..=32660 => Ok(CrsDef::Utm {
                zone: (code - 32600) as u8,
                north: true,
            }),
            32701..=32760 => Ok(CrsDef::Utm {
                zone: (code - 32700) as u8,
                north: false,
            }),
            _ => Err(SpatialError::crs(format!("unsupported EPSG code: {code}"))),
        }
    }

    /// Parse a CRS string such as "EPSG:4326".
    pub fn from_user_input(s: &str) -> Result<Self> {
        let normalized = s.trim().to_uppercase();
        if let Some(code) = normalized.strip_prefix("EPSG:") {
            let code: u32 = code
                .parse()
                .map_err(|_| SpatialError::crs(format!("invalid EPSG code: {s}")))?;
            return Self::from_epsg(code);
        }
        Err(SpatialError::crs(format!("unsupported CRS string: {s}")))
    }

    /// The EPSG code of this CRS.
    pub fn epsg(&self) -> u32 {
        match self {
            CrsDef::Geographic => 4326,
            CrsDef::WebMercator => 3857,
            CrsDef::Utm { zone, north: true } => 32600 + *zone as u32,
            CrsDef::Utm { zone, north: false } => 32700 + *zone as u32,
        }
    }

    /// Check if this is a geographic (degree-based) CRS.
    ///
    /// Euclidean distances are not metrically meaningful in a geographic CRS,
    /// which matters for nearest-neighbor lookups.
    pub fn is_geographic(&self) -> bool {
        matches!(self, CrsDef::Geographic)
    }

    /// Serialize to a well-known-text style string.
    ///
    /// The representation is intentionally minimal: it carries the EPSG
    /// authority code, which is all the engine needs to reconstruct the CRS.
    pub fn to_wkt(&self) -> String {
        let name = match self {
            CrsDef::Geographic => "WGS 84".to_string(),
            CrsDef::WebMercator => "WGS 84 / Pseudo-Mercator".to_string(),
            CrsDef::Utm { zone, north } => format!(
                "WGS 84 / UTM zone {}{}",
                zone,
                if *north { "N" } else { "S" }
            ),
        };
        format!("PROJCRS[\"{}\",ID[\"EPSG\",{}]]", name, self.epsg())
    }

    /// Parse a CRS back from the WKT produced by [`CrsDef::to_wkt`].
    pub fn from_wkt(wkt: &str) -> Result<Self> {
        let marker = "ID[\"EPSG\",";
        let start = wkt
            .find(marker)
            .ok_or_else(|| SpatialError::crs(format!("no EPSG id in WKT: {wkt}")))?;
        let rest = &wkt[start + marker.len()..];
        let end = rest
            .find(']')
            .ok_or_else(|| SpatialError::crs(format!("malformed WKT: {wkt}")))?;
        let code: u32 = rest[..end]
            .parse()
            .map_err(|_| SpatialError::crs(format!("invalid EPSG id in WKT: {wkt}")))?;
        Self::from_epsg(code)
    }
}

impl fmt::Display for CrsDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_epsg() {
        assert_eq!(CrsDef::from_epsg(4326).unwrap(), CrsDef::Geographic);
        assert_eq!(CrsDef::from_epsg(3857).unwrap(), CrsDef::WebMercator);
        assert_eq!(
            CrsDef::from_epsg(32633).unwrap(),
            CrsDef::Utm {
                zone: 33,
                north: true
            }
        );
        assert!(CrsDef::from_epsg(99999).is_err());
    }

    #[test]
    fn test_parse_user_input() {
        assert_eq!(
            CrsDef::from_user_input("EPSG:4326").unwrap(),
            CrsDef::Geographic
        );
        assert_eq!(
            CrsDef::from_user_input("epsg:32733").unwrap(),
            CrsDef::Utm {
                zone: 33,
                north: false
            }
        );
        assert!(CrsDef::from_user_input("bogus").is_err());
    }

    #[test]
    fn test_wkt_roundtrip() {
        for crs in [
            CrsDef::Geographic,
            CrsDef::WebMercator,
            CrsDef::Utm {
                zone: 32,
                north: true,
            },
        ] {
            let wkt = crs.to_wkt();
            assert_eq!(CrsDef::from_wkt(&wkt).unwrap(), crs, "wkt was {wkt}");
        }
    }

    #[test]
    fn test_is_geographic() {
        assert!(CrsDef::Geographic.is_geographic());
        assert!(!CrsDef::WebMercator.is_geographic());
    }
}
