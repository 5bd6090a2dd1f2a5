//! Geometry Model
//!
//! Typed geometry union shared by layer sources, the geometry engine and the
//! analysis tools. Every geometry carries its `SpatialReference`, so the
//! planar/geodesic decision is a pure function of the value.

use geo_types::{
    Geometry as GeoGeometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point,
    Polygon, Rect,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// SpatialReference
// ============================================================================

/// Coordinate system of a geometry or layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatialReference {
    /// Well-known id (e.g. 4326, 3857)
    pub wkid: u32,
    /// Whether coordinates are longitude/latitude degrees
    pub is_geographic: bool,
}

impl SpatialReference {
    pub fn new(wkid: u32, is_geographic: bool) -> Self {
        Self {
            wkid,
            is_geographic,
        }
    }

    /// WGS84 longitude/latitude.
    pub fn wgs84() -> Self {
        Self::new(4326, true)
    }

    /// Web Mercator (meters).
    pub fn web_mercator() -> Self {
        Self::new(3857, false)
    }
}

// ============================================================================
// GeometryType
// ============================================================================

/// Geometry type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryType {
    Point,
    Multipoint,
    Polyline,
    Polygon,
    Extent,
}

impl GeometryType {
    /// Topological dimension: 0 for points, 1 for lines, 2 for areas.
    pub fn dimension(&self) -> u8 {
        match self {
            GeometryType::Point | GeometryType::Multipoint => 0,
            GeometryType::Polyline => 1,
            GeometryType::Polygon | GeometryType::Extent => 2,
        }
    }

    pub fn is_point(&self) -> bool {
        self.dimension() == 0
    }

    pub fn is_line(&self) -> bool {
        self.dimension() == 1
    }

    pub fn is_area(&self) -> bool {
        self.dimension() == 2
    }
}

impl std::fmt::Display for GeometryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeometryType::Point => write!(f, "point"),
            GeometryType::Multipoint => write!(f, "multipoint"),
            GeometryType::Polyline => write!(f, "polyline"),
            GeometryType::Polygon => write!(f, "polygon"),
            GeometryType::Extent => write!(f, "extent"),
        }
    }
}

impl std::str::FromStr for GeometryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "point" => Ok(GeometryType::Point),
            "multipoint" => Ok(GeometryType::Multipoint),
            "polyline" => Ok(GeometryType::Polyline),
            "polygon" => Ok(GeometryType::Polygon),
            "extent" => Ok(GeometryType::Extent),
            _ => Err(format!("Unknown geometry type: {}", s)),
        }
    }
}

// ============================================================================
// MetricModel
// ============================================================================

/// Numeric model used for buffer, area, length, offset and densify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricModel {
    Planar,
    Geodesic,
}

impl MetricModel {
    /// Geodesic iff the spatial reference is geographic.
    pub fn for_reference(sr: &SpatialReference) -> Self {
        if sr.is_geographic {
            MetricModel::Geodesic
        } else {
            MetricModel::Planar
        }
    }
}

// ============================================================================
// LinearUnit
// ============================================================================

/// Linear distance unit for tool parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LinearUnit {
    #[default]
    Meters,
    Kilometers,
    Feet,
    Yards,
    Miles,
    NauticalMiles,
}

impl LinearUnit {
    /// Number of meters in one unit.
    pub fn meters_per_unit(&self) -> f64 {
        match self {
            LinearUnit::Meters => 1.0,
            LinearUnit::Kilometers => 1000.0,
            LinearUnit::Feet => 0.3048,
            LinearUnit::Yards => 0.9144,
            LinearUnit::Miles => 1609.344,
            LinearUnit::NauticalMiles => 1852.0,
        }
    }

    /// Convert a distance in this unit to meters.
    pub fn to_meters(&self, value: f64) -> f64 {
        value * self.meters_per_unit()
    }

    /// Short label used in generated layer names.
    pub fn abbreviation(&self) -> &'static str {
        match self {
            LinearUnit::Meters => "m",
            LinearUnit::Kilometers => "km",
            LinearUnit::Feet => "ft",
            LinearUnit::Yards => "yd",
            LinearUnit::Miles => "mi",
            LinearUnit::NauticalMiles => "nmi",
        }
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// Coordinate payload of a geometry, one variant per geometry type.
///
/// Polylines and polygons are always stored in their multi-part form so that
/// single-part and multi-part results share one representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates", rename_all = "snake_case")]
pub enum Shape {
    Point(Point<f64>),
    Multipoint(MultiPoint<f64>),
    Polyline(MultiLineString<f64>),
    Polygon(MultiPolygon<f64>),
    Extent(Rect<f64>),
}

/// A geometry together with its spatial reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geometry {
    pub shape: Shape,
    pub spatial_reference: SpatialReference,
}

impl Geometry {
    pub fn new(shape: Shape, spatial_reference: SpatialReference) -> Self {
        Self {
            shape,
            spatial_reference,
        }
    }

    pub fn point(x: f64, y: f64, sr: SpatialReference) -> Self {
        Self::new(Shape::Point(Point::new(x, y)), sr)
    }

    pub fn polyline(paths: Vec<LineString<f64>>, sr: SpatialReference) -> Self {
        Self::new(Shape::Polyline(MultiLineString::new(paths)), sr)
    }

    pub fn polygon(polygons: Vec<Polygon<f64>>, sr: SpatialReference) -> Self {
        Self::new(Shape::Polygon(MultiPolygon::new(polygons)), sr)
    }

    pub fn geometry_type(&self) -> GeometryType {
        match &self.shape {
            Shape::Point(_) => GeometryType::Point,
            Shape::Multipoint(_) => GeometryType::Multipoint,
            Shape::Polyline(_) => GeometryType::Polyline,
            Shape::Polygon(_) => GeometryType::Polygon,
            Shape::Extent(_) => GeometryType::Extent,
        }
    }

    pub fn metric_model(&self) -> MetricModel {
        MetricModel::for_reference(&self.spatial_reference)
    }

    /// True when the payload has no coordinates.
    pub fn is_empty(&self) -> bool {
        match &self.shape {
            Shape::Point(_) | Shape::Extent(_) => false,
            Shape::Multipoint(mp) => mp.0.is_empty(),
            Shape::Polyline(mls) => mls.0.iter().all(|ls| ls.0.len() < 2),
            Shape::Polygon(mp) => mp.0.iter().all(|p| p.exterior().0.len() < 4),
        }
    }

    /// Convert into a `geo-types` geometry for the engine.
    pub fn to_geo(&self) -> GeoGeometry<f64> {
        match &self.shape {
            Shape::Point(p) => GeoGeometry::Point(*p),
            Shape::Multipoint(mp) => GeoGeometry::MultiPoint(mp.clone()),
            Shape::Polyline(mls) => GeoGeometry::MultiLineString(mls.clone()),
            Shape::Polygon(mp) => GeoGeometry::MultiPolygon(mp.clone()),
            Shape::Extent(rect) => GeoGeometry::Rect(*rect),
        }
    }

    /// Build from a `geo-types` geometry. Collections are flattened into
    /// the parts they contain, so this may return several geometries.
    pub fn from_geo(geometry: GeoGeometry<f64>, sr: SpatialReference) -> Vec<Geometry> {
        let shape = match geometry {
            GeoGeometry::Point(p) => Shape::Point(p),
            GeoGeometry::MultiPoint(mp) => Shape::Multipoint(mp),
            GeoGeometry::Line(line) => {
                Shape::Polyline(MultiLineString::new(vec![LineString::from(vec![
                    line.start, line.end,
                ])]))
            }
            GeoGeometry::LineString(ls) => Shape::Polyline(MultiLineString::new(vec![ls])),
            GeoGeometry::MultiLineString(mls) => Shape::Polyline(mls),
            GeoGeometry::Polygon(p) => Shape::Polygon(MultiPolygon::new(vec![p])),
            GeoGeometry::MultiPolygon(mp) => Shape::Polygon(mp),
            GeoGeometry::Rect(rect) => Shape::Extent(rect),
            GeoGeometry::Triangle(t) => Shape::Polygon(MultiPolygon::new(vec![t.to_polygon()])),
            GeoGeometry::GeometryCollection(gc) => {
                return gc
                    .0
                    .into_iter()
                    .flat_map(|g| Geometry::from_geo(g, sr))
                    .collect();
            }
        };
        let geometry = Geometry::new(shape, sr);
        if geometry.is_empty() {
            Vec::new()
        } else {
            vec![geometry]
        }
    }
}
