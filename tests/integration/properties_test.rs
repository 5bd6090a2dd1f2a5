//! Analysis Property Integration Tests
//!
//! Invariants that hold for any input: determinism, monotonicity,
//! cardinality and the geometry-type gate.

use std::sync::Arc;

use serde_json::json;

use map_analysis::services::geometry::GeoEngine;
use map_analysis::FeatureLayer;
use map_analysis_core::{
    AnalysisOperationSpec, BufferParams, CoreError, DissolveParams, FieldType, GeometryEngine,
    GeometryRecord, GeometryType, LinearUnit, SchemaField, ToolParameters, OID_FIELD,
};

use super::common::*;

fn buffer_spec(distance: f64) -> AnalysisOperationSpec {
    AnalysisOperationSpec::new(ToolParameters::Buffer(BufferParams {
        distances: vec![distance],
        unit: LinearUnit::Meters,
        dissolve: Some(true),
    }))
    .with_input(points_layer("p", "Points", &[(0.0, 0.0), (30.0, 0.0)]))
}

#[tokio::test]
async fn test_identical_runs_are_deterministic() {
    let first = session().run(buffer_spec(25.0)).await.unwrap();
    let second = session().run(buffer_spec(25.0)).await.unwrap();
    let (first, second) = (layer(&first.output), layer(&second.output));
    assert_eq!(first.records, second.records);
    assert_eq!(first.schema, second.schema);
    assert_eq!(first.title, second.title);
}

#[tokio::test]
async fn test_planar_buffer_area_grows_with_distance() {
    let engine = GeoEngine::default();
    let mut previous = 0.0;
    for distance in [5.0, 10.0, 40.0, 100.0] {
        let output = layer(&session().run(buffer_spec(distance)).await.unwrap().output);
        let geometry = output.records[0].geometry.as_ref().unwrap();
        let area = engine.planar_area(geometry).unwrap();
        assert!(
            area > previous,
            "area {} at {} m is not above {}",
            area,
            distance,
            previous
        );
        previous = area;
    }
}

#[tokio::test]
async fn test_dissolve_never_increases_feature_count() {
    let squares = [
        (0.0, 0.0, 10.0, "a"),
        (5.0, 5.0, 10.0, "a"),
        (100.0, 0.0, 10.0, "b"),
        (200.0, 0.0, 10.0, "c"),
    ];
    for field in [None, Some("zone".to_string())] {
        let spec = AnalysisOperationSpec::new(ToolParameters::Dissolve(DissolveParams {
            dissolve_field: field.clone(),
        }))
        .with_input(polygons_layer("z", "Zones", &squares));
        let output = layer(&session().run(spec).await.unwrap().output);
        assert!(output.records.len() <= squares.len());
        match field {
            None => assert_eq!(output.records.len(), 1),
            Some(_) => assert_eq!(output.records.len(), 3),
        }
    }
}

#[tokio::test]
async fn test_merge_sums_features_and_keeps_first_schema() {
    let session = session();
    let roads_a = Arc::new(
        FeatureLayer::new("a", "Roads A", GeometryType::Point, sr())
            .with_fields(vec![
                SchemaField::new("OBJECTID", FieldType::Oid),
                SchemaField::new("name", FieldType::String),
            ])
            .with_records(vec![
                GeometryRecord::with_geometry(point(0.0, 0.0)).attr("name", "x"),
                GeometryRecord::with_geometry(point(1.0, 0.0)).attr("name", "y"),
            ]),
    );
    let roads_b = Arc::new(
        FeatureLayer::new("b", "Roads B", GeometryType::Point, sr())
            .with_fields(vec![
                SchemaField::new("name", FieldType::String),
                SchemaField::new("lanes", FieldType::Integer),
            ])
            .with_records(vec![
                GeometryRecord::with_geometry(point(2.0, 0.0))
                    .attr("name", "z")
                    .attr("lanes", 2),
                GeometryRecord::with_geometry(point(3.0, 0.0)).attr("lanes", 4),
                GeometryRecord::with_geometry(point(4.0, 0.0)).attr("name", "w"),
            ]),
    );
    let spec = AnalysisOperationSpec::new(ToolParameters::Merge)
        .with_inputs([as_layer(roads_a), as_layer(roads_b)]);

    let output = layer(&session.run(spec).await.unwrap().output);
    assert_eq!(output.records.len(), 5);
    let names: Vec<_> = output.schema.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec![OID_FIELD, "name"]);
    assert_eq!(output.records[2].get("name"), Some(&json!("z")));
    assert_eq!(output.records[3].get("name"), Some(&serde_json::Value::Null));
    assert!(output.records[2].get("lanes").is_none());
    assert_eq!(output.records[4].get(OID_FIELD), Some(&json!(5)));
    assert_eq!(output.title, "roadsa_merge_2layers_1405");
}

#[tokio::test]
async fn test_merge_of_mismatched_geometry_types_is_rejected() {
    let session = session();
    let points = points_layer("p", "Points", &[(0.0, 0.0)]);
    let polygons = polygons_layer("q", "Polygons", &[(0.0, 0.0, 1.0, "a")]);
    let spec = AnalysisOperationSpec::new(ToolParameters::Merge)
        .with_inputs([as_layer(points), as_layer(polygons)]);

    let err = session.run(spec).await.unwrap_err();
    assert!(matches!(core_error(&err), CoreError::Validation(_)));
    assert!(session.registry().is_empty());
}

#[tokio::test]
async fn test_same_layer_twice_is_rejected() {
    let session = session();
    let points = as_layer(points_layer("p", "Points", &[(0.0, 0.0)]));
    let spec = AnalysisOperationSpec::new(ToolParameters::Merge)
        .with_inputs([points.clone(), points]);

    let err = session.run(spec).await.unwrap_err();
    assert!(matches!(core_error(&err), CoreError::Validation(_)));
}
