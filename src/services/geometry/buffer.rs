//! Buffer and Offset Construction
//!
//! Planar buffers built from primitives: a point becomes a disc, a segment
//! becomes a capsule (convex hull of the discs at both ends), and a buffer
//! is the union of those pieces. Polygons grow by their boundary capsules
//! and shrink by subtracting them. All distances are in coordinate units.

use std::f64::consts::TAU;

use geo::{BooleanOps, ConvexHull};
use geo_types::{
    Coord, Geometry as GeoGeometry, LineString, MultiPoint, MultiPolygon, Point, Polygon,
};

use map_analysis_core::{CoreError, CoreResult};

/// Regular polygon approximating a circle.
pub fn disc(center: Coord<f64>, radius: f64, segments: u32) -> Polygon<f64> {
    let segments = segments.max(8);
    let mut ring: Vec<Coord<f64>> = (0..segments)
        .map(|i| {
            let angle = TAU * i as f64 / segments as f64;
            Coord {
                x: center.x + radius * angle.cos(),
                y: center.y + radius * angle.sin(),
            }
        })
        .collect();
    ring.push(ring[0]);
    Polygon::new(LineString::new(ring), Vec::new())
}

/// Stadium shape around segment `a`-`b`.
pub fn capsule(a: Coord<f64>, b: Coord<f64>, radius: f64, segments: u32) -> Polygon<f64> {
    if a == b {
        return disc(a, radius, segments);
    }
    let points: Vec<Point<f64>> = disc(a, radius, segments)
        .exterior()
        .points()
        .chain(disc(b, radius, segments).exterior().points())
        .collect();
    MultiPoint::new(points).convex_hull()
}

fn union_all(pieces: impl IntoIterator<Item = Polygon<f64>>) -> MultiPolygon<f64> {
    pieces
        .into_iter()
        .fold(MultiPolygon::new(Vec::new()), |acc, piece| {
            acc.union(&MultiPolygon::new(vec![piece]))
        })
}

fn segment_capsules<'a>(
    line: &'a LineString<f64>,
    radius: f64,
    segments: u32,
) -> impl Iterator<Item = Polygon<f64>> + 'a {
    line.lines()
        .map(move |segment| capsule(segment.start, segment.end, radius, segments))
}

fn ring_capsules(polygon: &Polygon<f64>, radius: f64, segments: u32) -> Vec<Polygon<f64>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .flat_map(|ring| segment_capsules(ring, radius, segments))
        .collect()
}

fn line_buffer(line: &LineString<f64>, radius: f64, segments: u32) -> MultiPolygon<f64> {
    match line.0.as_slice() {
        [] => MultiPolygon::new(Vec::new()),
        [only] => MultiPolygon::new(vec![disc(*only, radius, segments)]),
        _ => union_all(segment_capsules(line, radius, segments)),
    }
}

fn polygon_buffer(polygon: &Polygon<f64>, distance: f64, segments: u32) -> MultiPolygon<f64> {
    let body = MultiPolygon::new(vec![polygon.clone()]);
    let boundary = union_all(ring_capsules(polygon, distance.abs(), segments));
    if distance > 0.0 {
        body.union(&boundary)
    } else {
        body.difference(&boundary)
    }
}

/// Buffer one geometry by `distance` coordinate units.
///
/// Negative distances are only meaningful for areas; other geometries
/// yield an error.
pub fn buffer_geometry(
    geometry: &GeoGeometry<f64>,
    distance: f64,
    segments: u32,
) -> CoreResult<MultiPolygon<f64>> {
    if !distance.is_finite() || distance == 0.0 {
        return Err(CoreError::geometry(format!(
            "invalid buffer distance {}",
            distance
        )));
    }
    let is_area = matches!(
        geometry,
        GeoGeometry::Polygon(_)
            | GeoGeometry::MultiPolygon(_)
            | GeoGeometry::Rect(_)
            | GeoGeometry::Triangle(_)
    );
    if distance < 0.0 && !is_area {
        return Err(CoreError::geometry(
            "negative buffer distances apply to polygons only",
        ));
    }

    let radius = distance.abs();
    let result = match geometry {
        GeoGeometry::Point(p) => MultiPolygon::new(vec![disc(p.0, radius, segments)]),
        GeoGeometry::MultiPoint(mp) => union_all(mp.iter().map(|p| disc(p.0, radius, segments))),
        GeoGeometry::Line(line) => {
            MultiPolygon::new(vec![capsule(line.start, line.end, radius, segments)])
        }
        GeoGeometry::LineString(ls) => line_buffer(ls, radius, segments),
        GeoGeometry::MultiLineString(mls) => mls
            .iter()
            .map(|ls| line_buffer(ls, radius, segments))
            .fold(MultiPolygon::new(Vec::new()), |acc, part| acc.union(&part)),
        GeoGeometry::Polygon(p) => polygon_buffer(p, distance, segments),
        GeoGeometry::MultiPolygon(mp) => mp
            .iter()
            .map(|p| polygon_buffer(p, distance, segments))
            .fold(MultiPolygon::new(Vec::new()), |acc, part| acc.union(&part)),
        GeoGeometry::Rect(rect) => polygon_buffer(&rect.to_polygon(), distance, segments),
        GeoGeometry::Triangle(t) => polygon_buffer(&t.to_polygon(), distance, segments),
        GeoGeometry::GeometryCollection(gc) => {
            let mut acc = MultiPolygon::new(Vec::new());
            for part in gc.iter() {
                acc = acc.union(&buffer_geometry(part, distance, segments)?);
            }
            acc
        }
    };
    Ok(result)
}

// ============================================================================
// Offset
// ============================================================================

const MITER_LIMIT: f64 = 4.0;

fn left_normal(a: Coord<f64>, b: Coord<f64>) -> Coord<f64> {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len = dx.hypot(dy);
    Coord {
        x: -dy / len,
        y: dx / len,
    }
}

fn shift(c: Coord<f64>, n: Coord<f64>, d: f64) -> Coord<f64> {
    Coord {
        x: c.x + n.x * d,
        y: c.y + n.y * d,
    }
}

/// Intersection of the infinite lines through `p1 + t*d1` and `p2 + s*d2`.
fn line_line(p1: Coord<f64>, d1: Coord<f64>, p2: Coord<f64>, d2: Coord<f64>) -> Option<Coord<f64>> {
    let cross = d1.x * d2.y - d1.y * d2.x;
    if cross.abs() < 1e-12 {
        return None;
    }
    let t = ((p2.x - p1.x) * d2.y - (p2.y - p1.y) * d2.x) / cross;
    Some(Coord {
        x: p1.x + t * d1.x,
        y: p1.y + t * d1.y,
    })
}

/// Offset a polyline part; positive distances shift it to the left of its
/// direction of travel. Joins are mitred, falling back to a bevel when the
/// miter would exceed four times the distance.
pub fn offset_line(line: &LineString<f64>, distance: f64) -> CoreResult<LineString<f64>> {
    let mut pts: Vec<Coord<f64>> = Vec::with_capacity(line.0.len());
    for c in &line.0 {
        if pts.last() != Some(c) {
            pts.push(*c);
        }
    }
    if pts.len() < 2 {
        return Err(CoreError::geometry("cannot offset a degenerate polyline"));
    }

    let normals: Vec<Coord<f64>> = pts.windows(2).map(|w| left_normal(w[0], w[1])).collect();
    let mut out = Vec::with_capacity(pts.len() + 2);
    out.push(shift(pts[0], normals[0], distance));

    for k in 1..pts.len() - 1 {
        let (n_prev, n_next) = (normals[k - 1], normals[k]);
        let dir_prev = Coord {
            x: pts[k].x - pts[k - 1].x,
            y: pts[k].y - pts[k - 1].y,
        };
        let dir_next = Coord {
            x: pts[k + 1].x - pts[k].x,
            y: pts[k + 1].y - pts[k].y,
        };
        let a = shift(pts[k], n_prev, distance);
        let b = shift(pts[k], n_next, distance);
        match line_line(a, dir_prev, b, dir_next) {
            Some(miter)
                if (miter.x - pts[k].x).hypot(miter.y - pts[k].y)
                    <= MITER_LIMIT * distance.abs() =>
            {
                out.push(miter)
            }
            Some(_) => {
                out.push(a);
                out.push(b);
            }
            None => out.push(b),
        }
    }

    let last = pts.len() - 1;
    out.push(shift(pts[last], normals[last - 1], distance));
    Ok(LineString::new(out))
}
