//! GeoEngine
//!
//! `GeometryEngine` implementation backed by the `geo` crate. Predicates
//! are evaluated through the DE-9IM matrix; set operations use `BooleanOps`.
//! Projected inputs are treated as planar meters. Geographic inputs use
//! geodesic measures, and are projected into a local plane for buffers and
//! offsets.

use geo::line_intersection::line_intersection;
use geo::orient::{Direction, Orient};
use geo::{
    Area, BooleanOps, ConvexHull, CoordsIter, Euclidean, Geodesic, GeodesicArea, Length,
    LineIntersection, Relate, Simplify,
};
use geo_types::{
    Coord, Geometry as GeoGeometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point,
    Polygon,
};

use map_analysis_core::{
    CoreError, CoreResult, Geometry, GeometryEngine, LinearUnit, Shape, SpatialReference,
};

use super::buffer::{buffer_geometry, offset_line};
use super::densify::{densify_geodesic, densify_planar};
use super::projection::LocalProjection;

/// Tunables of the reference engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoEngineConfig {
    /// Vertices per full circle in buffers
    pub circle_segments: u32,
    /// Width of the gap a cutter leaves between pieces, in map units
    pub cut_tolerance: f64,
}

impl Default for GeoEngineConfig {
    fn default() -> Self {
        Self {
            circle_segments: 64,
            cut_tolerance: 1e-6,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GeoEngine {
    config: GeoEngineConfig,
}

// ============================================================================
// Conversion helpers
// ============================================================================

/// Geometry in `geo` form with extents expanded to polygons.
fn geo_of(geometry: &Geometry) -> GeoGeometry<f64> {
    match geometry.to_geo() {
        GeoGeometry::Rect(rect) => GeoGeometry::Polygon(rect.to_polygon()),
        other => other,
    }
}

fn areas_of(geometry: &Geometry) -> Option<MultiPolygon<f64>> {
    match &geometry.shape {
        Shape::Polygon(mp) => Some(mp.clone()),
        Shape::Extent(rect) => Some(MultiPolygon::new(vec![rect.to_polygon()])),
        _ => None,
    }
}

fn lines_of(geometry: &Geometry) -> Option<MultiLineString<f64>> {
    match &geometry.shape {
        Shape::Polyline(mls) => Some(mls.clone()),
        _ => None,
    }
}

fn points_of(geometry: &Geometry) -> Option<MultiPoint<f64>> {
    match &geometry.shape {
        Shape::Point(p) => Some(MultiPoint::new(vec![*p])),
        Shape::Multipoint(mp) => Some(mp.clone()),
        _ => None,
    }
}

fn area_geometry(mp: MultiPolygon<f64>, sr: SpatialReference) -> Option<Geometry> {
    let geometry = Geometry::new(Shape::Polygon(mp), sr);
    (!geometry.is_empty()).then_some(geometry)
}

fn line_geometry(mls: MultiLineString<f64>, sr: SpatialReference) -> Option<Geometry> {
    let parts: Vec<_> = mls.0.into_iter().filter(|ls| ls.0.len() >= 2).collect();
    if parts.is_empty() {
        None
    } else {
        Some(Geometry::new(Shape::Polyline(MultiLineString::new(parts)), sr))
    }
}

fn point_geometry(points: Vec<Point<f64>>, sr: SpatialReference) -> Option<Geometry> {
    match points.as_slice() {
        [] => None,
        [only] => Some(Geometry::new(Shape::Point(*only), sr)),
        _ => Some(Geometry::new(Shape::Multipoint(MultiPoint::new(points)), sr)),
    }
}

/// Single geometry from a `geo` result; collections must not reach here.
fn single(geometry: GeoGeometry<f64>, sr: SpatialReference) -> CoreResult<Geometry> {
    Geometry::from_geo(geometry, sr)
        .into_iter()
        .next()
        .ok_or_else(|| CoreError::geometry("operation produced an empty geometry"))
}

fn same_reference<'a>(
    geometries: impl IntoIterator<Item = &'a Geometry>,
) -> CoreResult<SpatialReference> {
    let mut iter = geometries.into_iter();
    let first = iter
        .next()
        .ok_or_else(|| CoreError::geometry("no geometries given"))?;
    if let Some(other) = iter.find(|g| g.spatial_reference != first.spatial_reference) {
        return Err(CoreError::geometry(format!(
            "spatial reference mismatch: {} vs {}",
            first.spatial_reference.wkid, other.spatial_reference.wkid
        )));
    }
    Ok(first.spatial_reference)
}

impl GeoEngine {
    pub fn new(config: GeoEngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeoEngineConfig {
        &self.config
    }

    fn relate_matches(&self, a: &Geometry, b: &Geometry, pattern: &str) -> CoreResult<bool> {
        geo_of(a)
            .relate(&geo_of(b))
            .matches(pattern)
            .map_err(|e| {
                CoreError::geometry(format!("invalid DE-9IM pattern {}: {:?}", pattern, e))
            })
    }

    fn buffer_one(
        &self,
        geometry: &GeoGeometry<f64>,
        distance: f64,
    ) -> CoreResult<MultiPolygon<f64>> {
        buffer_geometry(geometry, distance, self.config.circle_segments)
    }

    /// Run a planar construction in a local metric plane around a
    /// geographic geometry.
    fn in_local_plane<F>(&self, geometry: &Geometry, op: F) -> CoreResult<Geometry>
    where
        F: FnOnce(&GeoGeometry<f64>) -> CoreResult<GeoGeometry<f64>>,
    {
        let geo = geo_of(geometry);
        let projection = LocalProjection::around(&geo)
            .ok_or_else(|| CoreError::geometry("cannot project an empty geometry"))?;
        let planar = op(&projection.project(&geo))?;
        single(projection.unproject(&planar), geometry.spatial_reference)
    }

    fn offset_planar(
        &self,
        geometry: &GeoGeometry<f64>,
        distance: f64,
    ) -> CoreResult<GeoGeometry<f64>> {
        match geometry {
            GeoGeometry::Point(_) | GeoGeometry::MultiPoint(_) => {
                Err(CoreError::geometry("cannot offset point geometries"))
            }
            GeoGeometry::LineString(ls) => Ok(GeoGeometry::LineString(offset_line(ls, distance)?)),
            GeoGeometry::MultiLineString(mls) => {
                let parts = mls
                    .iter()
                    .map(|ls| offset_line(ls, distance))
                    .collect::<CoreResult<Vec<_>>>()?;
                Ok(GeoGeometry::MultiLineString(MultiLineString::new(parts)))
            }
            area => Ok(GeoGeometry::MultiPolygon(self.buffer_one(area, distance)?)),
        }
    }

    fn hull(&self, coords: Vec<Coord<f64>>, sr: SpatialReference) -> CoreResult<Geometry> {
        let points: MultiPoint<f64> = coords.into_iter().map(Point::from).collect();
        let polygon = points.convex_hull();
        if polygon.unsigned_area() > 0.0 {
            return Ok(Geometry::new(
                Shape::Polygon(MultiPolygon::new(vec![polygon])),
                sr,
            ));
        }
        // Degenerate hulls keep the lower dimension
        let mut ring: Vec<Coord<f64>> = polygon.exterior().0.clone();
        ring.dedup();
        if ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }
        match ring.as_slice() {
            [] => Err(CoreError::geometry("convex hull of no coordinates")),
            [only] => Ok(Geometry::new(Shape::Point(Point::from(*only)), sr)),
            _ => Ok(Geometry::polyline(vec![LineString::new(ring)], sr)),
        }
    }
}

// ============================================================================
// GeometryEngine
// ============================================================================

impl GeometryEngine for GeoEngine {
    fn intersects(&self, a: &Geometry, b: &Geometry) -> CoreResult<bool> {
        Ok(geo_of(a).relate(&geo_of(b)).is_intersects())
    }

    fn contains(&self, a: &Geometry, b: &Geometry) -> CoreResult<bool> {
        Ok(geo_of(a).relate(&geo_of(b)).is_contains())
    }

    fn within(&self, a: &Geometry, b: &Geometry) -> CoreResult<bool> {
        Ok(geo_of(a).relate(&geo_of(b)).is_within())
    }

    fn overlaps(&self, a: &Geometry, b: &Geometry) -> CoreResult<bool> {
        let (da, db) = (a.geometry_type().dimension(), b.geometry_type().dimension());
        match (da, db) {
            (1, 1) => self.relate_matches(a, b, "1*T***T**"),
            _ if da == db => self.relate_matches(a, b, "T*T***T**"),
            _ => Ok(false),
        }
    }

    fn touches(&self, a: &Geometry, b: &Geometry) -> CoreResult<bool> {
        if a.geometry_type().is_point() && b.geometry_type().is_point() {
            return Ok(false);
        }
        Ok(self.relate_matches(a, b, "FT*******")?
            || self.relate_matches(a, b, "F**T*****")?
            || self.relate_matches(a, b, "F***T****")?)
    }

    fn crosses(&self, a: &Geometry, b: &Geometry) -> CoreResult<bool> {
        let (da, db) = (a.geometry_type().dimension(), b.geometry_type().dimension());
        match (da, db) {
            (1, 1) => self.relate_matches(a, b, "0********"),
            _ if da < db => self.relate_matches(a, b, "T*T******"),
            _ if da > db => self.relate_matches(a, b, "T*****T**"),
            _ => Ok(false),
        }
    }

    fn equals(&self, a: &Geometry, b: &Geometry) -> CoreResult<bool> {
        self.relate_matches(a, b, "T*F**FFF*")
    }

    fn union(&self, geometries: &[Geometry]) -> CoreResult<Geometry> {
        let sr = same_reference(geometries)?;
        let dimension = geometries[0].geometry_type().dimension();
        if geometries
            .iter()
            .any(|g| g.geometry_type().dimension() != dimension)
        {
            return Err(CoreError::geometry(
                "cannot union geometries of different dimensions",
            ));
        }

        let merged = match dimension {
            0 => {
                let mut points: Vec<Point<f64>> = Vec::new();
                for p in geometries.iter().filter_map(points_of).flat_map(|mp| mp.0) {
                    if !points.contains(&p) {
                        points.push(p);
                    }
                }
                point_geometry(points, sr)
            }
            1 => {
                let parts = geometries
                    .iter()
                    .filter_map(lines_of)
                    .flat_map(|mls| mls.0)
                    .collect();
                line_geometry(MultiLineString::new(parts), sr)
            }
            _ => {
                let merged = geometries
                    .iter()
                    .filter_map(areas_of)
                    .fold(MultiPolygon::new(Vec::new()), |acc, mp| acc.union(&mp));
                area_geometry(merged, sr)
            }
        };
        merged.ok_or_else(|| CoreError::geometry("union produced an empty geometry"))
    }

    fn intersect(&self, a: &Geometry, b: &Geometry) -> CoreResult<Option<Geometry>> {
        let sr = same_reference([a, b])?;
        if let (Some(pa), Some(pb)) = (areas_of(a), areas_of(b)) {
            return Ok(area_geometry(pa.intersection(&pb), sr));
        }
        if let (Some(la), Some(pb)) = (lines_of(a), areas_of(b)) {
            return Ok(line_geometry(pb.clip(&la, false), sr));
        }
        if let (Some(pa), Some(lb)) = (areas_of(a), lines_of(b)) {
            return Ok(line_geometry(pa.clip(&lb, false), sr));
        }
        if let Some(points) = points_of(a) {
            let other = geo_of(b);
            let kept = points
                .0
                .into_iter()
                .filter(|p| GeoGeometry::Point(*p).relate(&other).is_intersects())
                .collect();
            return Ok(point_geometry(kept, sr));
        }
        if let Some(points) = points_of(b) {
            let other = geo_of(a);
            let kept = points
                .0
                .into_iter()
                .filter(|p| GeoGeometry::Point(*p).relate(&other).is_intersects())
                .collect();
            return Ok(point_geometry(kept, sr));
        }

        // Line against line: the crossing points
        let (la, lb) = match (lines_of(a), lines_of(b)) {
            (Some(la), Some(lb)) => (la, lb),
            _ => return Err(CoreError::geometry("unsupported geometry combination")),
        };
        let mut points: Vec<Point<f64>> = Vec::new();
        for sa in la.iter().flat_map(|ls| ls.lines()) {
            for sb in lb.iter().flat_map(|ls| ls.lines()) {
                let found = match line_intersection(sa, sb) {
                    Some(LineIntersection::SinglePoint { intersection, .. }) => {
                        vec![Point::from(intersection)]
                    }
                    Some(LineIntersection::Collinear { intersection }) => {
                        vec![Point::from(intersection.start), Point::from(intersection.end)]
                    }
                    None => Vec::new(),
                };
                for p in found {
                    if !points.contains(&p) {
                        points.push(p);
                    }
                }
            }
        }
        Ok(point_geometry(points, sr))
    }

    fn difference(&self, a: &Geometry, b: &Geometry) -> CoreResult<Option<Geometry>> {
        let sr = same_reference([a, b])?;
        if let (Some(pa), Some(pb)) = (areas_of(a), areas_of(b)) {
            return Ok(area_geometry(pa.difference(&pb), sr));
        }
        if let (Some(la), Some(pb)) = (lines_of(a), areas_of(b)) {
            return Ok(line_geometry(pb.clip(&la, true), sr));
        }
        if let Some(points) = points_of(a) {
            let other = geo_of(b);
            let kept = points
                .0
                .into_iter()
                .filter(|p| !GeoGeometry::Point(*p).relate(&other).is_intersects())
                .collect();
            return Ok(point_geometry(kept, sr));
        }
        // Removing a lower-dimensional geometry leaves the area unchanged
        Ok(Some(a.clone()))
    }

    fn convex_hull(&self, geometries: &[Geometry], merge: bool) -> CoreResult<Vec<Geometry>> {
        let sr = same_reference(geometries)?;
        if merge {
            let coords: Vec<Coord<f64>> = geometries
                .iter()
                .flat_map(|g| geo_of(g).coords_iter().collect::<Vec<_>>())
                .collect();
            return Ok(vec![self.hull(coords, sr)?]);
        }
        geometries
            .iter()
            .map(|g| self.hull(geo_of(g).coords_iter().collect(), sr))
            .collect()
    }

    fn planar_area(&self, geometry: &Geometry) -> CoreResult<f64> {
        Ok(geo_of(geometry).unsigned_area())
    }

    fn geodesic_area(&self, geometry: &Geometry) -> CoreResult<f64> {
        Ok(areas_of(geometry)
            // Geodesic area reads a clockwise shell as its complement.
            .map(|mp| mp.orient(Direction::Default).geodesic_area_unsigned())
            .unwrap_or(0.0))
    }

    fn planar_length(&self, geometry: &Geometry) -> CoreResult<f64> {
        Ok(match &geometry.shape {
            Shape::Polyline(mls) => mls.length::<Euclidean>(),
            _ => match areas_of(geometry) {
                Some(mp) => mp
                    .iter()
                    .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
                    .map(|ring| ring.length::<Euclidean>())
                    .sum(),
                None => 0.0,
            },
        })
    }

    fn geodesic_length(&self, geometry: &Geometry) -> CoreResult<f64> {
        Ok(match &geometry.shape {
            Shape::Polyline(mls) => mls.length::<Geodesic>(),
            _ => match areas_of(geometry) {
                Some(mp) => mp
                    .iter()
                    .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
                    .map(|ring| ring.length::<Geodesic>())
                    .sum(),
                None => 0.0,
            },
        })
    }

    fn buffer(
        &self,
        geometries: &[Geometry],
        distance: f64,
        unit: LinearUnit,
    ) -> CoreResult<Vec<Geometry>> {
        let meters = unit.to_meters(distance);
        geometries
            .iter()
            .map(|g| {
                let buffered = self.buffer_one(&geo_of(g), meters)?;
                area_geometry(buffered, g.spatial_reference)
                    .ok_or_else(|| CoreError::geometry("buffer produced an empty polygon"))
            })
            .collect()
    }

    fn geodesic_buffer(
        &self,
        geometries: &[Geometry],
        distance: f64,
        unit: LinearUnit,
    ) -> CoreResult<Vec<Geometry>> {
        let meters = unit.to_meters(distance);
        geometries
            .iter()
            .map(|g| {
                self.in_local_plane(g, |planar| {
                    Ok(GeoGeometry::MultiPolygon(self.buffer_one(planar, meters)?))
                })
            })
            .collect()
    }

    fn offset(&self, geometry: &Geometry, distance: f64, unit: LinearUnit) -> CoreResult<Geometry> {
        let planar = self.offset_planar(&geo_of(geometry), unit.to_meters(distance))?;
        single(planar, geometry.spatial_reference)
    }

    fn geodesic_offset(
        &self,
        geometry: &Geometry,
        distance: f64,
        unit: LinearUnit,
    ) -> CoreResult<Geometry> {
        let meters = unit.to_meters(distance);
        if geometry.geometry_type().is_point() {
            return Err(CoreError::geometry("cannot offset point geometries"));
        }
        self.in_local_plane(geometry, |planar| self.offset_planar(planar, meters))
    }

    fn densify(
        &self,
        geometry: &Geometry,
        max_segment: f64,
        unit: LinearUnit,
    ) -> CoreResult<Geometry> {
        let max = unit.to_meters(max_segment);
        if !max.is_finite() || max <= 0.0 {
            return Err(CoreError::geometry("densify length must be positive"));
        }
        single(densify_planar(&geo_of(geometry), max), geometry.spatial_reference)
    }

    fn geodesic_densify(
        &self,
        geometry: &Geometry,
        max_segment: f64,
        unit: LinearUnit,
    ) -> CoreResult<Geometry> {
        let max = unit.to_meters(max_segment);
        if !max.is_finite() || max <= 0.0 {
            return Err(CoreError::geometry("densify length must be positive"));
        }
        single(densify_geodesic(&geo_of(geometry), max), geometry.spatial_reference)
    }

    fn simplify(&self, geometry: &Geometry, tolerance: f64) -> CoreResult<Geometry> {
        let simplified = match &geometry.shape {
            Shape::Polyline(mls) => Shape::Polyline(mls.simplify(&tolerance)),
            Shape::Polygon(mp) => Shape::Polygon(mp.simplify(&tolerance)),
            other => other.clone(),
        };
        let result = Geometry::new(simplified, geometry.spatial_reference);
        if result.is_empty() {
            return Err(CoreError::geometry(format!(
                "geometry collapsed when simplified with tolerance {}",
                tolerance
            )));
        }
        Ok(result)
    }

    fn cut(&self, geometry: &Geometry, cutter: &Geometry) -> CoreResult<Vec<Geometry>> {
        let sr = same_reference([geometry, cutter])?;
        if lines_of(cutter).is_none() {
            return Err(CoreError::geometry("cutter must be a polyline"));
        }
        let gap = self.buffer_one(&geo_of(cutter), self.config.cut_tolerance / 2.0)?;

        let pieces: Vec<Geometry> = if let Some(area) = areas_of(geometry) {
            area.difference(&gap)
                .0
                .into_iter()
                .map(|p: Polygon<f64>| Geometry::polygon(vec![p], sr))
                .collect()
        } else if let Some(lines) = lines_of(geometry) {
            gap.clip(&lines, true)
                .0
                .into_iter()
                .filter(|ls| ls.0.len() >= 2)
                .map(|ls| Geometry::polyline(vec![ls], sr))
                .collect()
        } else {
            return Err(CoreError::geometry("cannot cut point geometries"));
        };

        // A cutter that misses leaves one piece: not cut
        if pieces.len() <= 1 {
            return Ok(Vec::new());
        }
        Ok(pieces)
    }
}
