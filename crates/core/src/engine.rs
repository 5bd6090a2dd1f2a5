//! Geometry Engine Capability
//!
//! The analysis tools never do computational geometry themselves. They call
//! a `GeometryEngine`, which exposes predicates, set operations, metrics and
//! transforms in planar and geodesic variants. `MetricModel` picks the
//! variant from the input spatial reference.

use crate::error::CoreResult;
use crate::geometry::{Geometry, LinearUnit, MetricModel};

/// Binary spatial predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialRelationship {
    Intersects,
    Contains,
    Within,
    Overlaps,
    Touches,
    Crosses,
}

impl std::fmt::Display for SpatialRelationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpatialRelationship::Intersects => write!(f, "intersects"),
            SpatialRelationship::Contains => write!(f, "contains"),
            SpatialRelationship::Within => write!(f, "within"),
            SpatialRelationship::Overlaps => write!(f, "overlaps"),
            SpatialRelationship::Touches => write!(f, "touches"),
            SpatialRelationship::Crosses => write!(f, "crosses"),
        }
    }
}

impl std::str::FromStr for SpatialRelationship {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intersects" => Ok(SpatialRelationship::Intersects),
            "contains" => Ok(SpatialRelationship::Contains),
            "within" => Ok(SpatialRelationship::Within),
            "overlaps" => Ok(SpatialRelationship::Overlaps),
            "touches" => Ok(SpatialRelationship::Touches),
            "crosses" => Ok(SpatialRelationship::Crosses),
            _ => Err(format!("Unknown spatial relationship: {}", s)),
        }
    }
}

/// Computational geometry capability consumed by the analysis tools.
///
/// Set operations return `None` when the result is empty. Every method may
/// fail with `CoreError::Geometry`; callers decide whether that aborts the
/// run or is skipped.
pub trait GeometryEngine: Send + Sync {
    // -- Predicates --

    fn intersects(&self, a: &Geometry, b: &Geometry) -> CoreResult<bool>;
    fn contains(&self, a: &Geometry, b: &Geometry) -> CoreResult<bool>;
    fn within(&self, a: &Geometry, b: &Geometry) -> CoreResult<bool>;
    fn overlaps(&self, a: &Geometry, b: &Geometry) -> CoreResult<bool>;
    fn touches(&self, a: &Geometry, b: &Geometry) -> CoreResult<bool>;
    fn crosses(&self, a: &Geometry, b: &Geometry) -> CoreResult<bool>;
    fn equals(&self, a: &Geometry, b: &Geometry) -> CoreResult<bool>;

    // -- Set operations --

    /// Union of all geometries into one. Inputs must share a dimension.
    fn union(&self, geometries: &[Geometry]) -> CoreResult<Geometry>;
    fn intersect(&self, a: &Geometry, b: &Geometry) -> CoreResult<Option<Geometry>>;
    fn difference(&self, a: &Geometry, b: &Geometry) -> CoreResult<Option<Geometry>>;
    /// One hull over everything when `merge`, otherwise one hull per input.
    fn convex_hull(&self, geometries: &[Geometry], merge: bool) -> CoreResult<Vec<Geometry>>;

    // -- Metrics --

    fn planar_area(&self, geometry: &Geometry) -> CoreResult<f64>;
    fn geodesic_area(&self, geometry: &Geometry) -> CoreResult<f64>;
    fn planar_length(&self, geometry: &Geometry) -> CoreResult<f64>;
    fn geodesic_length(&self, geometry: &Geometry) -> CoreResult<f64>;

    // -- Transforms --

    /// One buffer polygon per input geometry.
    fn buffer(&self, geometries: &[Geometry], distance: f64, unit: LinearUnit)
        -> CoreResult<Vec<Geometry>>;
    fn geodesic_buffer(
        &self,
        geometries: &[Geometry],
        distance: f64,
        unit: LinearUnit,
    ) -> CoreResult<Vec<Geometry>>;
    fn offset(&self, geometry: &Geometry, distance: f64, unit: LinearUnit) -> CoreResult<Geometry>;
    fn geodesic_offset(
        &self,
        geometry: &Geometry,
        distance: f64,
        unit: LinearUnit,
    ) -> CoreResult<Geometry>;
    fn densify(&self, geometry: &Geometry, max_segment: f64, unit: LinearUnit)
        -> CoreResult<Geometry>;
    fn geodesic_densify(
        &self,
        geometry: &Geometry,
        max_segment: f64,
        unit: LinearUnit,
    ) -> CoreResult<Geometry>;
    fn simplify(&self, geometry: &Geometry, tolerance: f64) -> CoreResult<Geometry>;
    /// Split `geometry` by a polyline. Empty when the cutter does not split it.
    fn cut(&self, geometry: &Geometry, cutter: &Geometry) -> CoreResult<Vec<Geometry>>;

    /// Evaluate a relationship by name.
    fn relate(
        &self,
        a: &Geometry,
        b: &Geometry,
        relationship: SpatialRelationship,
    ) -> CoreResult<bool> {
        match relationship {
            SpatialRelationship::Intersects => self.intersects(a, b),
            SpatialRelationship::Contains => self.contains(a, b),
            SpatialRelationship::Within => self.within(a, b),
            SpatialRelationship::Overlaps => self.overlaps(a, b),
            SpatialRelationship::Touches => self.touches(a, b),
            SpatialRelationship::Crosses => self.crosses(a, b),
        }
    }
}

impl MetricModel {
    pub fn area(self, engine: &dyn GeometryEngine, geometry: &Geometry) -> CoreResult<f64> {
        match self {
            MetricModel::Planar => engine.planar_area(geometry),
            MetricModel::Geodesic => engine.geodesic_area(geometry),
        }
    }

    pub fn length(self, engine: &dyn GeometryEngine, geometry: &Geometry) -> CoreResult<f64> {
        match self {
            MetricModel::Planar => engine.planar_length(geometry),
            MetricModel::Geodesic => engine.geodesic_length(geometry),
        }
    }

    pub fn buffer(
        self,
        engine: &dyn GeometryEngine,
        geometries: &[Geometry],
        distance: f64,
        unit: LinearUnit,
    ) -> CoreResult<Vec<Geometry>> {
        match self {
            MetricModel::Planar => engine.buffer(geometries, distance, unit),
            MetricModel::Geodesic => engine.geodesic_buffer(geometries, distance, unit),
        }
    }

    pub fn offset(
        self,
        engine: &dyn GeometryEngine,
        geometry: &Geometry,
        distance: f64,
        unit: LinearUnit,
    ) -> CoreResult<Geometry> {
        match self {
            MetricModel::Planar => engine.offset(geometry, distance, unit),
            MetricModel::Geodesic => engine.geodesic_offset(geometry, distance, unit),
        }
    }

    pub fn densify(
        self,
        engine: &dyn GeometryEngine,
        geometry: &Geometry,
        max_segment: f64,
        unit: LinearUnit,
    ) -> CoreResult<Geometry> {
        match self {
            MetricModel::Planar => engine.densify(geometry, max_segment, unit),
            MetricModel::Geodesic => engine.geodesic_densify(geometry, max_segment, unit),
        }
    }
}
