//! Local Projection
//!
//! Equirectangular projection centered on a geometry's extent. Geographic
//! coordinates (degrees) map to meters on a local tangent plane, which is
//! accurate enough for buffers and offsets of a few hundred kilometers.

use geo::{BoundingRect, Coord, MapCoords};
use geo_types::Geometry as GeoGeometry;

/// Mean earth radius in meters (IUGG)
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalProjection {
    lon0: f64,
    lat0: f64,
    cos_lat0: f64,
}

impl LocalProjection {
    pub fn new(lon0: f64, lat0: f64) -> Self {
        // Keep the scale factor away from zero near the poles
        let cos_lat0 = lat0.to_radians().cos().max(1e-6);
        Self {
            lon0,
            lat0,
            cos_lat0,
        }
    }

    /// Projection centered on the extent of `geometry`.
    pub fn around(geometry: &GeoGeometry<f64>) -> Option<Self> {
        let rect = geometry.bounding_rect()?;
        let center = rect.center();
        Some(Self::new(center.x, center.y))
    }

    pub fn forward(&self, c: Coord<f64>) -> Coord<f64> {
        Coord {
            x: EARTH_RADIUS_M * (c.x - self.lon0).to_radians() * self.cos_lat0,
            y: EARTH_RADIUS_M * (c.y - self.lat0).to_radians(),
        }
    }

    pub fn inverse(&self, c: Coord<f64>) -> Coord<f64> {
        Coord {
            x: self.lon0 + (c.x / (EARTH_RADIUS_M * self.cos_lat0)).to_degrees(),
            y: self.lat0 + (c.y / EARTH_RADIUS_M).to_degrees(),
        }
    }

    pub fn project(&self, geometry: &GeoGeometry<f64>) -> GeoGeometry<f64> {
        let proj = *self;
        geometry.map_coords(move |c| proj.forward(c))
    }

    pub fn unproject(&self, geometry: &GeoGeometry<f64>) -> GeoGeometry<f64> {
        let proj = *self;
        geometry.map_coords(move |c| proj.inverse(c))
    }
}

/// Great-circle interpolation between two lon/lat coordinates.
///
/// Returns `segments - 1` interior points, excluding both ends.
pub fn great_circle_points(a: Coord<f64>, b: Coord<f64>, segments: usize) -> Vec<Coord<f64>> {
    let to_vec = |c: Coord<f64>| {
        let (lon, lat) = (c.x.to_radians(), c.y.to_radians());
        [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
    };
    let va = to_vec(a);
    let vb = to_vec(b);
    let dot = (va[0] * vb[0] + va[1] * vb[1] + va[2] * vb[2]).clamp(-1.0, 1.0);
    let omega = dot.acos();
    if segments < 2 || omega.abs() < 1e-12 {
        return Vec::new();
    }
    let sin_omega = omega.sin();

    (1..segments)
        .map(|i| {
            let t = i as f64 / segments as f64;
            let wa = ((1.0 - t) * omega).sin() / sin_omega;
            let wb = (t * omega).sin() / sin_omega;
            let v = [
                wa * va[0] + wb * vb[0],
                wa * va[1] + wb * vb[1],
                wa * va[2] + wb * vb[2],
            ];
            let lat = v[2].atan2((v[0] * v[0] + v[1] * v[1]).sqrt());
            let lon = v[1].atan2(v[0]);
            Coord {
                x: lon.to_degrees(),
                y: lat.to_degrees(),
            }
        })
        .collect()
}

/// Great-circle distance in meters.
pub fn great_circle_distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let (lat1, lat2) = (a.y.to_radians(), b.y.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.x - a.x).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}
