//! Densify
//!
//! Inserts vertices so that no segment is longer than a maximum length.
//! The planar variant interpolates straight lines in coordinate units; the
//! geodesic variant measures in meters and follows great circles.

use geo_types::{
    Coord, Geometry as GeoGeometry, LineString, MultiLineString, MultiPolygon, Polygon,
};

use super::projection::{great_circle_distance, great_circle_points};

fn densify_ring<L, I>(
    line: &LineString<f64>,
    length: L,
    interpolate: I,
    max: f64,
) -> LineString<f64>
where
    L: Fn(Coord<f64>, Coord<f64>) -> f64,
    I: Fn(Coord<f64>, Coord<f64>, usize) -> Vec<Coord<f64>>,
{
    let mut out = Vec::with_capacity(line.0.len());
    for segment in line.lines() {
        out.push(segment.start);
        let pieces = (length(segment.start, segment.end) / max).ceil() as usize;
        if pieces > 1 {
            out.extend(interpolate(segment.start, segment.end, pieces));
        }
    }
    if let Some(last) = line.0.last() {
        out.push(*last);
    }
    LineString::new(out)
}

fn map_lines(
    geometry: &GeoGeometry<f64>,
    f: &dyn Fn(&LineString<f64>) -> LineString<f64>,
) -> GeoGeometry<f64> {
    let polygon = |p: &Polygon<f64>| {
        Polygon::new(f(p.exterior()), p.interiors().iter().map(f).collect())
    };
    match geometry {
        GeoGeometry::Line(line) => {
            GeoGeometry::LineString(f(&LineString::from(vec![line.start, line.end])))
        }
        GeoGeometry::LineString(ls) => GeoGeometry::LineString(f(ls)),
        GeoGeometry::MultiLineString(mls) => {
            GeoGeometry::MultiLineString(MultiLineString::new(mls.iter().map(f).collect()))
        }
        GeoGeometry::Polygon(p) => GeoGeometry::Polygon(polygon(p)),
        GeoGeometry::MultiPolygon(mp) => {
            GeoGeometry::MultiPolygon(MultiPolygon::new(mp.iter().map(polygon).collect()))
        }
        GeoGeometry::Rect(rect) => GeoGeometry::Polygon(polygon(&rect.to_polygon())),
        GeoGeometry::Triangle(t) => GeoGeometry::Polygon(polygon(&t.to_polygon())),
        other => other.clone(),
    }
}

/// Planar densify; `max` in coordinate units.
pub fn densify_planar(geometry: &GeoGeometry<f64>, max: f64) -> GeoGeometry<f64> {
    let length = |a: Coord<f64>, b: Coord<f64>| (b.x - a.x).hypot(b.y - a.y);
    let interpolate = |a: Coord<f64>, b: Coord<f64>, n: usize| {
        (1..n)
            .map(|i| {
                let t = i as f64 / n as f64;
                Coord {
                    x: a.x + (b.x - a.x) * t,
                    y: a.y + (b.y - a.y) * t,
                }
            })
            .collect::<Vec<_>>()
    };
    map_lines(geometry, &|ls| densify_ring(ls, length, interpolate, max))
}

/// Geodesic densify of lon/lat geometry; `max_meters` along the great circle.
pub fn densify_geodesic(geometry: &GeoGeometry<f64>, max_meters: f64) -> GeoGeometry<f64> {
    map_lines(geometry, &|ls| {
        densify_ring(ls, great_circle_distance, great_circle_points, max_meters)
    })
}
