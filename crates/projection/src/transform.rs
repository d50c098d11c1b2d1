//! CRS-to-CRS coordinate transformation.

use spatial_common::{BBox, CrsDef, Result};

use crate::mercator::WebMercator;
use crate::transverse::TransverseMercator;

/// A transformer between two coordinate reference systems.
///
/// Transformation pivots through geographic coordinates: the source
/// projection is inverted to lon/lat, and the target projection applied
/// forward. The identity case is short-circuited.
#[derive(Debug, Clone)]
pub struct Transformer {
    from: CrsDef,
    to: CrsDef,
}

impl Transformer {
    /// Create a transformer between two CRSs.
    pub fn between(from: CrsDef, to: CrsDef) -> Self {
        Self { from, to }
    }

    /// Transform a single coordinate pair.
    pub fn transform_point(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        if self.from == self.to {
            return Ok((x, y));
        }
        let (lon, lat) = to_geographic(self.from, x, y)?;
        from_geographic(self.to, lon, lat)
    }

    /// Transform parallel x/y coordinate slices.
    pub fn transform(&self, xs: &[f64], ys: &[f64]) -> Result<(Vec<f64>, Vec<f64>)> {
        let mut out_x = Vec::with_capacity(xs.len());
        let mut out_y = Vec::with_capacity(ys.len());
        for (&x, &y) in xs.iter().zip(ys) {
            let (tx, ty) = self.transform_point(x, y)?;
            out_x.push(tx);
            out_y.push(ty);
        }
        Ok((out_x, out_y))
    }
}

fn to_geographic(crs: CrsDef, x: f64, y: f64) -> Result<(f64, f64)> {
    match crs {
        CrsDef::Geographic => Ok((x, y)),
        CrsDef::WebMercator => WebMercator.inverse(x, y),
        CrsDef::Utm { zone, north } => TransverseMercator::utm(zone, north).inverse(x, y),
    }
}

fn from_geographic(crs: CrsDef, lon: f64, lat: f64) -> Result<(f64, f64)> {
    match crs {
        CrsDef::Geographic => Ok((lon, lat)),
        CrsDef::WebMercator => WebMercator.forward(lon, lat),
        CrsDef::Utm { zone, north } => TransverseMercator::utm(zone, north).forward(lon, lat),
    }
}

/// Reproject a bounding box to another CRS.
///
/// A projected rectangle is generally not a rectangle in another CRS, so the
/// box edges are densified before taking the envelope of the transformed
/// points.
pub fn reproject_bbox(bbox: &BBox, to: CrsDef) -> Result<BBox> {
    if bbox.crs == to {
        return Ok(*bbox);
    }
    let transformer = Transformer::between(bbox.crs, to);

    const SAMPLES: usize = 10;
    let mut xs = Vec::with_capacity(4 * (SAMPLES + 1));
    let mut ys = Vec::with_capacity(4 * (SAMPLES + 1));
    for t in 0..=SAMPLES {
        let frac = t as f64 / SAMPLES as f64;
        let x = bbox.min_x + frac * bbox.width();
        let y = bbox.min_y + frac * bbox.height();
        // Bottom, top, left, right edges
        xs.extend([x, x, bbox.min_x, bbox.max_x]);
        ys.extend([bbox.min_y, bbox.max_y, y, y]);
    }

    let (tx, ty) = transformer.transform(&xs, &ys)?;
    Ok(BBox::from_coords(&tx, &ty, to))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let t = Transformer::between(CrsDef::WebMercator, CrsDef::WebMercator);
        let (x, y) = t.transform_point(123.4, 567.8).unwrap();
        assert_eq!((x, y), (123.4, 567.8));
    }

    #[test]
    fn test_geographic_to_mercator_roundtrip() {
        let fwd = Transformer::between(CrsDef::Geographic, CrsDef::WebMercator);
        let inv = Transformer::between(CrsDef::WebMercator, CrsDef::Geographic);

        let (x, y) = fwd.transform_point(12.5, 55.6).unwrap();
        let (lon, lat) = inv.transform_point(x, y).unwrap();
        assert!((lon - 12.5).abs() < 1e-9, "lon roundtrip, got {lon}");
        assert!((lat - 55.6).abs() < 1e-9, "lat roundtrip, got {lat}");
    }

    #[test]
    fn test_projected_to_projected() {
        // UTM32N -> WebMercator pivots through geographic
        let utm = CrsDef::Utm {
            zone: 32,
            north: true,
        };
        let t = Transformer::between(utm, CrsDef::WebMercator);
        let back = Transformer::between(CrsDef::WebMercator, utm);

        let (x, y) = t.transform_point(500_000.0, 6_100_000.0).unwrap();
        let (x2, y2) = back.transform_point(x, y).unwrap();
        assert!((x2 - 500_000.0).abs() < 1e-4, "easting roundtrip, got {x2}");
        assert!((y2 - 6_100_000.0).abs() < 1e-4, "northing roundtrip, got {y2}");
    }

    #[test]
    fn test_reproject_bbox_envelope() {
        let bbox = BBox::new(8.0, 54.0, 10.0, 56.0, CrsDef::Geographic);
        let out = reproject_bbox(&bbox, CrsDef::WebMercator).unwrap();
        assert_eq!(out.crs, CrsDef::WebMercator);
        assert!(out.width() > 0.0 && out.height() > 0.0);

        // The envelope must cover the transformed corners
        let t = Transformer::between(CrsDef::Geographic, CrsDef::WebMercator);
        let (cx, cy) = t.transform_point(9.0, 55.0).unwrap();
        assert!(out.contains_point(cx, cy), "center must be inside envelope");
    }
}
