//! Geographic Input Integration Tests
//!
//! Runs on WGS84 layers, which the tools measure geodesically in meters.

use std::sync::Arc;

use geo::BoundingRect;
use geo_types::{LineString, Polygon};

use map_analysis::services::geometry::GeoEngine;
use map_analysis::FeatureLayer;
use map_analysis_core::{
    AnalysisOperationSpec, BufferParams, FieldType, Geometry, GeometryEngine, GeometryRecord,
    GeometryType, LinearUnit, ModifyOperation, OverlayOperation, SchemaField, Shape,
    SpatialReference, ToolParameters,
};

use super::common::*;

fn wgs84() -> SpatialReference {
    SpatialReference::wgs84()
}

fn degree_square(x: f64, y: f64, size: f64) -> Geometry {
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
        wgs84(),
    )
}

fn squares_layer(id: &str, title: &str, squares: &[(f64, f64, f64)]) -> Arc<FeatureLayer> {
    let records = squares
        .iter()
        .map(|(x, y, size)| GeometryRecord::with_geometry(degree_square(*x, *y, *size)))
        .collect();
    Arc::new(
        FeatureLayer::new(id, title, GeometryType::Polygon, wgs84())
            .with_fields(vec![SchemaField::oid()])
            .with_records(records),
    )
}

fn within(value: f64, expected: f64, tolerance: f64) -> bool {
    (value - expected).abs() / expected < tolerance
}

#[tokio::test]
async fn test_geographic_buffer_is_measured_in_meters() {
    let session = session();
    let wells = Arc::new(
        FeatureLayer::new("wells", "Wells", GeometryType::Point, wgs84())
            .with_fields(vec![SchemaField::oid()])
            .with_records(vec![GeometryRecord::with_geometry(Geometry::point(
                10.0,
                45.0,
                wgs84(),
            ))]),
    );
    let spec = AnalysisOperationSpec::new(ToolParameters::Buffer(BufferParams {
        distances: vec![100.0],
        unit: LinearUnit::Meters,
        dissolve: Some(true),
    }))
    .with_input(as_layer(wells));

    let output = layer(&session.run(spec).await.unwrap().output);
    let geometry = output.records[0].geometry.as_ref().unwrap();
    assert_eq!(geometry.spatial_reference, wgs84());

    let area = GeoEngine::default().geodesic_area(geometry).unwrap();
    let expected = std::f64::consts::PI * 100.0 * 100.0;
    assert!(within(area, expected, 0.03), "buffer area {}", area);

    // 100 m is about 0.0013 degrees of latitude.
    let bounds = geometry.to_geo().bounding_rect().unwrap();
    assert!(bounds.height() < 0.002 && bounds.height() > 0.0015);
}

#[tokio::test]
async fn test_geographic_overlay_reports_geodesic_metrics() {
    let session = session();
    let a = squares_layer("a", "Parcels", &[(0.0, 0.0, 1.0)]);
    let b = squares_layer("b", "Flood", &[(0.5, 0.5, 1.0)]);
    let spec = AnalysisOperationSpec::new(ToolParameters::Overlay {
        operation: OverlayOperation::Intersect,
    })
    .with_inputs([as_layer(a), as_layer(b)]);

    let output = layer(&session.run(spec).await.unwrap().output);
    assert_eq!(output.records.len(), 1);
    let record = &output.records[0];

    let area = record.get("area").and_then(|v| v.as_f64()).unwrap();
    assert!(within(area, 3.08e9, 0.01), "overlay area {}", area);

    // Perimeter of a half-degree square near the equator.
    let length = record.get("length").and_then(|v| v.as_f64()).unwrap();
    assert!(length > 2.2e5 && length < 2.24e5, "overlay length {}", length);
}

#[tokio::test]
async fn test_geographic_densify_follows_meters() {
    let session = session();
    let line = Geometry::polyline(vec![LineString::from(vec![(0.0, 0.0), (1.0, 0.0)])], wgs84());
    let roads = Arc::new(
        FeatureLayer::new("roads", "Roads", GeometryType::Polyline, wgs84())
            .with_fields(vec![
                SchemaField::oid(),
                SchemaField::new("name", FieldType::String),
            ])
            .with_records(vec![GeometryRecord::with_geometry(line).attr("name", "equator")]),
    );
    let spec = AnalysisOperationSpec::new(ToolParameters::ModifyGeometry(
        ModifyOperation::Densify {
            max_segment_length: Some(10.0),
            unit: LinearUnit::Kilometers,
        },
    ))
    .with_input(as_layer(roads));

    let output = layer(&session.run(spec).await.unwrap().output);
    let geometry = output.records[0].geometry.as_ref().unwrap();
    // One degree of longitude at the equator is about 111.3 km: 12 pieces.
    match &geometry.shape {
        Shape::Polyline(paths) => assert_eq!(paths.0[0].0.len(), 13),
        other => panic!("expected a polyline, got {:?}", other),
    }

    let length = GeoEngine::default().geodesic_length(geometry).unwrap();
    assert!(within(length, 111_319.5, 0.005), "densified length {}", length);
}
