//! Shared fixtures for the integration suite.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use geo_types::{LineString, Polygon};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use map_analysis::services::geometry::GeoEngine;
use map_analysis::services::output_layers::snapshot;
use map_analysis::{
    AnalysisSession, FeatureLayer, InMemoryMapView, OutputLayer, OutputLayerHandle,
};
use map_analysis_core::{
    CoreError, CoreResult, FeatureSet, FieldType, FixedClock, Geometry, GeometryEngine,
    GeometryRecord, GeometryType, LayerRef, LayerSource, LinearUnit, Renderer, SchemaField,
    SequentialIdGenerator, SourceKind, SpatialReference,
};

// ============================================================================
// Geometry helpers
// ============================================================================

pub fn sr() -> SpatialReference {
    SpatialReference::web_mercator()
}

pub fn point(x: f64, y: f64) -> Geometry {
    Geometry::point(x, y, sr())
}

pub fn square(x: f64, y: f64, size: f64) -> Geometry {
    Geometry::polygon(
        vec![Polygon::new(
            LineString::from(vec![
                (x, y),
                (x + size, y),
                (x + size, y + size),
                (x, y + size),
                (x, y),
            ]),
            vec![],
        )],
        sr(),
    )
}

// ============================================================================
// Layers
// ============================================================================

/// Point layer with a `name` field holding `p1`, `p2`, ...
pub fn points_layer(id: &str, title: &str, coords: &[(f64, f64)]) -> Arc<FeatureLayer> {
    let records = coords
        .iter()
        .enumerate()
        .map(|(i, (x, y))| {
            GeometryRecord::with_geometry(point(*x, *y)).attr("name", format!("p{}", i + 1))
        })
        .collect();
    Arc::new(
        FeatureLayer::new(id, title, GeometryType::Point, sr())
            .with_fields(vec![
                SchemaField::oid(),
                SchemaField::new("name", FieldType::String),
            ])
            .with_records(records),
    )
}

/// Square polygons with a `zone` attribute each.
pub fn polygons_layer(
    id: &str,
    title: &str,
    squares: &[(f64, f64, f64, &str)],
) -> Arc<FeatureLayer> {
    let records = squares
        .iter()
        .map(|(x, y, size, zone)| {
            GeometryRecord::with_geometry(square(*x, *y, *size)).attr("zone", *zone)
        })
        .collect();
    Arc::new(
        FeatureLayer::new(id, title, GeometryType::Polygon, sr())
            .with_fields(vec![SchemaField::new("zone", FieldType::String)])
            .with_records(records),
    )
}

// ============================================================================
// Session
// ============================================================================

pub fn session_with_view() -> (AnalysisSession, Arc<InMemoryMapView>) {
    let view = Arc::new(InMemoryMapView::new());
    let session = AnalysisSession::new(view.clone())
        .with_clock(Arc::new(FixedClock::at(14, 5)))
        .with_id_generator(Arc::new(SequentialIdGenerator::new("layer")));
    (session, view)
}

pub fn session() -> AnalysisSession {
    session_with_view().0
}

pub fn layer(handle: &OutputLayerHandle) -> OutputLayer {
    snapshot(handle).unwrap()
}

pub fn core_error(err: &map_analysis::AppError) -> &CoreError {
    err.as_core().expect("expected a pipeline error")
}

// ============================================================================
// FlakyEngine
// ============================================================================

/// `GeoEngine` wrapper with injectable failures.
#[derive(Default)]
pub struct FlakyEngine {
    pub inner: GeoEngine,
    /// Buffer distances that fail
    pub failing_distances: Vec<f64>,
    /// Fired on the first buffer call
    pub cancel_on_buffer: Option<CancellationToken>,
    /// Predicate calls made so far; the listed call numbers fail
    pub failing_predicate_calls: Vec<usize>,
    pub predicate_calls: Mutex<usize>,
}

impl FlakyEngine {
    fn predicate<T>(&self, result: impl FnOnce() -> CoreResult<T>) -> CoreResult<T> {
        let call = {
            let mut calls = self.predicate_calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        if self.failing_predicate_calls.contains(&call) {
            return Err(CoreError::geometry(format!(
                "injected predicate failure #{}",
                call
            )));
        }
        result()
    }

    fn before_buffer(&self, distance: f64) -> CoreResult<()> {
        if let Some(token) = &self.cancel_on_buffer {
            token.cancel();
        }
        if self.failing_distances.contains(&distance) {
            return Err(CoreError::geometry(format!(
                "injected buffer failure at {}",
                distance
            )));
        }
        Ok(())
    }
}

impl GeometryEngine for FlakyEngine {
    fn intersects(&self, a: &Geometry, b: &Geometry) -> CoreResult<bool> {
        self.predicate(|| self.inner.intersects(a, b))
    }
    fn contains(&self, a: &Geometry, b: &Geometry) -> CoreResult<bool> {
        self.predicate(|| self.inner.contains(a, b))
    }
    fn within(&self, a: &Geometry, b: &Geometry) -> CoreResult<bool> {
        self.predicate(|| self.inner.within(a, b))
    }
    fn overlaps(&self, a: &Geometry, b: &Geometry) -> CoreResult<bool> {
        self.predicate(|| self.inner.overlaps(a, b))
    }
    fn touches(&self, a: &Geometry, b: &Geometry) -> CoreResult<bool> {
        self.predicate(|| self.inner.touches(a, b))
    }
    fn crosses(&self, a: &Geometry, b: &Geometry) -> CoreResult<bool> {
        self.predicate(|| self.inner.crosses(a, b))
    }
    fn equals(&self, a: &Geometry, b: &Geometry) -> CoreResult<bool> {
        self.predicate(|| self.inner.equals(a, b))
    }
    fn union(&self, geometries: &[Geometry]) -> CoreResult<Geometry> {
        self.inner.union(geometries)
    }
    fn intersect(&self, a: &Geometry, b: &Geometry) -> CoreResult<Option<Geometry>> {
        self.inner.intersect(a, b)
    }
    fn difference(&self, a: &Geometry, b: &Geometry) -> CoreResult<Option<Geometry>> {
        self.inner.difference(a, b)
    }
    fn convex_hull(&self, geometries: &[Geometry], merge: bool) -> CoreResult<Vec<Geometry>> {
        self.inner.convex_hull(geometries, merge)
    }
    fn planar_area(&self, geometry: &Geometry) -> CoreResult<f64> {
        self.inner.planar_area(geometry)
    }
    fn geodesic_area(&self, geometry: &Geometry) -> CoreResult<f64> {
        self.inner.geodesic_area(geometry)
    }
    fn planar_length(&self, geometry: &Geometry) -> CoreResult<f64> {
        self.inner.planar_length(geometry)
    }
    fn geodesic_length(&self, geometry: &Geometry) -> CoreResult<f64> {
        self.inner.geodesic_length(geometry)
    }
    fn buffer(
        &self,
        geometries: &[Geometry],
        distance: f64,
        unit: LinearUnit,
    ) -> CoreResult<Vec<Geometry>> {
        self.before_buffer(distance)?;
        self.inner.buffer(geometries, distance, unit)
    }
    fn geodesic_buffer(
        &self,
        geometries: &[Geometry],
        distance: f64,
        unit: LinearUnit,
    ) -> CoreResult<Vec<Geometry>> {
        self.before_buffer(distance)?;
        self.inner.geodesic_buffer(geometries, distance, unit)
    }
    fn offset(&self, geometry: &Geometry, distance: f64, unit: LinearUnit) -> CoreResult<Geometry> {
        self.inner.offset(geometry, distance, unit)
    }
    fn geodesic_offset(
        &self,
        geometry: &Geometry,
        distance: f64,
        unit: LinearUnit,
    ) -> CoreResult<Geometry> {
        self.inner.geodesic_offset(geometry, distance, unit)
    }
    fn densify(
        &self,
        geometry: &Geometry,
        max_segment: f64,
        unit: LinearUnit,
    ) -> CoreResult<Geometry> {
        self.inner.densify(geometry, max_segment, unit)
    }
    fn geodesic_densify(
        &self,
        geometry: &Geometry,
        max_segment: f64,
        unit: LinearUnit,
    ) -> CoreResult<Geometry> {
        self.inner.geodesic_densify(geometry, max_segment, unit)
    }
    fn simplify(&self, geometry: &Geometry, tolerance: f64) -> CoreResult<Geometry> {
        self.inner.simplify(geometry, tolerance)
    }
    fn cut(&self, geometry: &Geometry, cutter: &Geometry) -> CoreResult<Vec<Geometry>> {
        self.inner.cut(geometry, cutter)
    }
}

// ============================================================================
// GatedLayer
// ============================================================================

/// Layer whose query blocks until the gate is opened.
pub struct GatedLayer {
    inner: Arc<FeatureLayer>,
    pub gate: Arc<Notify>,
}

impl GatedLayer {
    pub fn new(inner: Arc<FeatureLayer>) -> Self {
        Self {
            inner,
            gate: Arc::new(Notify::new()),
        }
    }
}

#[async_trait]
impl LayerSource for GatedLayer {
    fn id(&self) -> &str {
        self.inner.id()
    }
    fn title(&self) -> &str {
        self.inner.title()
    }
    fn kind(&self) -> SourceKind {
        self.inner.kind()
    }
    fn geometry_type(&self) -> Option<GeometryType> {
        self.inner.geometry_type()
    }
    fn spatial_reference(&self) -> SpatialReference {
        self.inner.spatial_reference()
    }
    fn fields(&self) -> Vec<SchemaField> {
        self.inner.fields()
    }
    fn renderer(&self) -> Option<Renderer> {
        self.inner.renderer()
    }
    async fn feature_count(&self) -> CoreResult<usize> {
        self.inner.feature_count().await
    }
    async fn query_all(&self) -> CoreResult<FeatureSet> {
        self.gate.notified().await;
        self.inner.query_all().await
    }
}

pub fn as_layer<T: LayerSource + 'static>(layer: Arc<T>) -> LayerRef {
    layer
}
