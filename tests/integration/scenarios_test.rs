//! Analysis Scenario Integration Tests
//!
//! End-to-end runs through `AnalysisSession` with the geo-backed engine.

use std::sync::Arc;

use serde_json::{json, Value};

use map_analysis::{FeatureLayer, LayerState, OutputKind};
use map_analysis_core::{
    AnalysisOperationSpec, AttributeJoinParams, BufferParams, ClipMode, CoreError,
    DissolveParams, FieldType, GeometryRecord, GeometryType, LinearUnit, ModifyOperation,
    OverlayOperation, SchemaField, SpatialRelationship, ToolId, ToolParameters, OID_FIELD,
};
use map_analysis_tools::JOIN_COUNT_FIELD;

use super::common::*;

fn field_names(schema: &[SchemaField]) -> Vec<&str> {
    schema.iter().map(|f| f.name.as_str()).collect()
}

// ============================================================================
// Scenario A: buffer
// ============================================================================

#[tokio::test]
async fn test_buffer_three_points_two_distances_dissolves_to_one() {
    let session = session();
    let stations = points_layer(
        "stations",
        "Fire Stations",
        &[(0.0, 0.0), (1_000.0, 0.0), (5_000.0, 5_000.0)],
    );
    let spec = AnalysisOperationSpec::new(ToolParameters::Buffer(BufferParams {
        distances: vec![100.0, 200.0],
        unit: LinearUnit::Meters,
        dissolve: None,
    }))
    .with_input(stations);

    let result = session.run(spec).await.unwrap();
    let output = layer(&result.output);

    assert_eq!(output.records.len(), 1);
    assert_eq!(output.kind, OutputKind::FeatureLayer);
    assert_eq!(output.geometry_type, Some(GeometryType::Polygon));
    assert_eq!(field_names(&output.schema), vec![OID_FIELD]);
    assert_eq!(output.records[0].get(OID_FIELD), Some(&json!(1)));
    assert_eq!(output.title, "firestations_buffer_100-200m_1405");
    assert_eq!(output.state, LayerState::Created);
    assert!(!result.has_warnings());
}

#[tokio::test]
async fn test_buffer_without_dissolve_keeps_one_row_per_feature_and_distance() {
    let session = session();
    let stations = points_layer("stations", "Stations", &[(0.0, 0.0), (1_000.0, 0.0)]);
    let spec = AnalysisOperationSpec::new(ToolParameters::Buffer(BufferParams {
        distances: vec![100.0, 200.0],
        unit: LinearUnit::Meters,
        dissolve: Some(false),
    }))
    .with_input(stations);

    let output = layer(&session.run(spec).await.unwrap().output);
    assert_eq!(output.records.len(), 4);
    assert_eq!(output.records[0].get("name"), Some(&json!("p1")));
    let oids: Vec<_> = output.records.iter().map(|r| r.get(OID_FIELD).cloned()).collect();
    assert_eq!(
        oids,
        vec![Some(json!(1)), Some(json!(2)), Some(json!(3)), Some(json!(4))]
    );
}

#[tokio::test]
async fn test_buffer_failed_distance_is_skipped_with_warning() {
    let engine = FlakyEngine {
        failing_distances: vec![200.0],
        ..FlakyEngine::default()
    };
    let session = session().with_engine(Arc::new(engine));
    let spec = AnalysisOperationSpec::new(ToolParameters::Buffer(BufferParams {
        distances: vec![100.0, 200.0],
        unit: LinearUnit::Meters,
        dissolve: Some(false),
    }))
    .with_input(points_layer("s", "Stations", &[(0.0, 0.0)]));

    let result = session.run(spec).await.unwrap();
    assert_eq!(layer(&result.output).records.len(), 1);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].item, Some(1));
}

#[tokio::test]
async fn test_buffer_all_distances_failing_is_an_operation_error() {
    let engine = FlakyEngine {
        failing_distances: vec![100.0],
        ..FlakyEngine::default()
    };
    let session = session().with_engine(Arc::new(engine));
    let spec = AnalysisOperationSpec::new(ToolParameters::Buffer(BufferParams {
        distances: vec![100.0],
        unit: LinearUnit::Meters,
        dissolve: None,
    }))
    .with_input(points_layer("s", "Stations", &[(0.0, 0.0)]));

    let err = session.run(spec).await.unwrap_err();
    match core_error(&err) {
        CoreError::Operation(message) => assert_eq!(message, "no buffers created"),
        other => panic!("expected operation error, got {:?}", other),
    }
    assert!(session.registry().is_empty());
}

// ============================================================================
// Scenario B: spatial join
// ============================================================================

#[tokio::test]
async fn test_spatial_join_counts_matches_per_polygon() {
    let session = session();
    let parcels = polygons_layer(
        "parcels",
        "Parcels",
        &[
            (0.0, 0.0, 10.0, "a"),
            (20.0, 0.0, 10.0, "b"),
            (40.0, 0.0, 10.0, "c"),
            (60.0, 0.0, 10.0, "d"),
            (80.0, 0.0, 10.0, "e"),
        ],
    );
    let wells = points_layer("wells", "Wells", &[(5.0, 5.0), (6.0, 6.0), (45.0, 5.0)]);
    let spec = AnalysisOperationSpec::new(ToolParameters::SpatialJoin {
        relationship: SpatialRelationship::Intersects,
    })
    .with_inputs([as_layer(parcels), as_layer(wells)]);

    let output = layer(&session.run(spec).await.unwrap().output);
    assert_eq!(output.records.len(), 5);

    let counts: Vec<u64> = output
        .records
        .iter()
        .map(|r| r.get(JOIN_COUNT_FIELD).and_then(Value::as_u64).unwrap())
        .collect();
    assert_eq!(counts, vec![2, 0, 1, 0, 0]);

    assert_eq!(output.records[0].get("JOIN_name"), Some(&json!("p1")));
    assert_eq!(output.records[2].get("JOIN_name"), Some(&json!("p3")));
    assert_eq!(output.records[1].get("JOIN_name"), Some(&Value::Null));
    assert!(field_names(&output.schema).contains(&JOIN_COUNT_FIELD));
}

#[tokio::test]
async fn test_spatial_join_predicate_failure_zeroes_that_row() {
    // Call 1 is the first parcel against the only well.
    let engine = FlakyEngine {
        failing_predicate_calls: vec![1],
        ..FlakyEngine::default()
    };
    let session = session().with_engine(Arc::new(engine));
    let parcels = polygons_layer(
        "parcels",
        "Parcels",
        &[(0.0, 0.0, 10.0, "a"), (0.0, 0.0, 20.0, "b")],
    );
    let wells = points_layer("wells", "Wells", &[(5.0, 5.0)]);
    let spec = AnalysisOperationSpec::new(ToolParameters::SpatialJoin {
        relationship: SpatialRelationship::Intersects,
    })
    .with_inputs([as_layer(parcels), as_layer(wells)]);

    let result = session.run(spec).await.unwrap();
    let output = layer(&result.output);
    assert_eq!(output.records[0].get(JOIN_COUNT_FIELD), Some(&json!(0)));
    assert_eq!(output.records[1].get(JOIN_COUNT_FIELD), Some(&json!(1)));
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].item, Some(0));
}

// ============================================================================
// Scenario C: clip / cut
// ============================================================================

#[tokio::test]
async fn test_clip_without_overlap_fails() {
    let session = session();
    let parcels = polygons_layer("parcels", "Parcels", &[(0.0, 0.0, 10.0, "a")]);
    let zone = polygons_layer("zone", "Zone", &[(100.0, 100.0, 10.0, "z")]);
    let spec = AnalysisOperationSpec::new(ToolParameters::Clip {
        mode: ClipMode::Clip,
    })
    .with_inputs([as_layer(parcels), as_layer(zone)]);

    let err = session.run(spec).await.unwrap_err();
    match core_error(&err) {
        CoreError::Operation(message) => assert_eq!(message, "no clip results found"),
        other => panic!("expected operation error, got {:?}", other),
    }
    assert!(session.list(ToolId::Clip).is_empty());
}

#[tokio::test]
async fn test_clip_keeps_overlap_and_attributes() {
    let session = session();
    let parcels = polygons_layer("parcels", "Parcels", &[(0.0, 0.0, 10.0, "a")]);
    let zone = polygons_layer("zone", "Zone", &[(5.0, 5.0, 10.0, "z")]);
    let spec = AnalysisOperationSpec::new(ToolParameters::Clip {
        mode: ClipMode::Clip,
    })
    .with_inputs([as_layer(parcels), as_layer(zone)]);

    let output = layer(&session.run(spec).await.unwrap().output);
    assert_eq!(output.records.len(), 1);
    assert_eq!(output.records[0].get("zone"), Some(&json!("a")));
    assert_eq!(output.title, "parcels_clip_clip_1405");
}

#[tokio::test]
async fn test_cut_requires_polyline_cutter() {
    let session = session();
    let parcels = polygons_layer("parcels", "Parcels", &[(0.0, 0.0, 10.0, "a")]);
    let zone = polygons_layer("zone", "Zone", &[(5.0, 5.0, 10.0, "z")]);
    let spec = AnalysisOperationSpec::new(ToolParameters::Clip { mode: ClipMode::Cut })
        .with_inputs([as_layer(parcels), as_layer(zone)]);

    let err = session.run(spec).await.unwrap_err();
    assert!(matches!(core_error(&err), CoreError::Validation(_)));
}

// ============================================================================
// Scenario D: convex hull
// ============================================================================

#[tokio::test]
async fn test_convex_hull_merge_of_ten_points() {
    let session = session();
    let coords: Vec<(f64, f64)> = (0..10)
        .map(|i| {
            let angle = i as f64 * std::f64::consts::TAU / 10.0;
            (100.0 * angle.cos(), 100.0 * angle.sin())
        })
        .collect();
    let spec = AnalysisOperationSpec::new(ToolParameters::ConvexHull { merge: true })
        .with_input(points_layer("pts", "Samples", &coords));

    let output = layer(&session.run(spec).await.unwrap().output);
    assert_eq!(output.records.len(), 1);
    assert_eq!(output.geometry_type, Some(GeometryType::Polygon));
    assert_eq!(field_names(&output.schema), vec![OID_FIELD]);
    assert_eq!(output.records[0].attributes.len(), 1);
    assert_eq!(output.records[0].get(OID_FIELD), Some(&json!(1)));
}

// ============================================================================
// Scenario E: attribute join
// ============================================================================

#[tokio::test]
async fn test_attribute_join_keeps_unmatched_rows() {
    let session = session();
    let parcels = Arc::new(
        FeatureLayer::new("parcels", "Parcels", GeometryType::Polygon, sr())
            .with_fields(vec![SchemaField::new("code", FieldType::String)])
            .with_records(vec![
                GeometryRecord::with_geometry(square(0.0, 0.0, 10.0)).attr("code", "A"),
                GeometryRecord::with_geometry(square(20.0, 0.0, 10.0)).attr("code", "Z"),
            ]),
    );
    let owners = Arc::new(
        FeatureLayer::new("owners", "Owners", GeometryType::Point, sr())
            .with_fields(vec![
                SchemaField::new("parcel_code", FieldType::String),
                SchemaField::new("owner", FieldType::String),
            ])
            .with_records(vec![
                GeometryRecord::with_geometry(point(1.0, 1.0))
                    .attr("parcel_code", "A")
                    .attr("owner", "Ada"),
                GeometryRecord::with_geometry(point(2.0, 2.0))
                    .attr("parcel_code", "B")
                    .attr("owner", "Bo"),
            ]),
    );
    let spec = AnalysisOperationSpec::new(ToolParameters::AttributeJoin(AttributeJoinParams {
        target_field: "code".to_string(),
        join_field: "parcel_code".to_string(),
    }))
    .with_inputs([as_layer(parcels), as_layer(owners)]);

    let result = session.run(spec).await.unwrap();
    let output = layer(&result.output);
    assert_eq!(output.records.len(), 2);
    assert_eq!(output.records[0].get("JOIN_owner"), Some(&json!("Ada")));
    assert_eq!(output.records[1].get("code"), Some(&json!("Z")));
    assert_eq!(output.records[1].get("JOIN_owner"), Some(&Value::Null));
    assert!(!result.has_warnings());
}

#[tokio::test]
async fn test_attribute_join_missing_field_is_rejected_before_fetch() {
    let session = session();
    let parcels = polygons_layer("parcels", "Parcels", &[(0.0, 0.0, 10.0, "a")]);
    let wells = points_layer("wells", "Wells", &[(1.0, 1.0)]);
    parcels.detach();
    let spec = AnalysisOperationSpec::new(ToolParameters::AttributeJoin(AttributeJoinParams {
        target_field: "missing".to_string(),
        join_field: "name".to_string(),
    }))
    .with_inputs([as_layer(parcels), as_layer(wells)]);

    let err = session.run(spec).await.unwrap_err();
    assert!(matches!(core_error(&err), CoreError::Validation(_)));
}

// ============================================================================
// Overlay, dissolve, modify
// ============================================================================

#[tokio::test]
async fn test_overlay_intersect_in_source_order() {
    let session = session();
    let a = polygons_layer(
        "a",
        "Parcels",
        &[(0.0, 0.0, 10.0, "a1"), (20.0, 0.0, 10.0, "a2")],
    );
    let b = polygons_layer("b", "Flood", &[(5.0, 0.0, 20.0, "b1")]);
    let spec = AnalysisOperationSpec::new(ToolParameters::Overlay {
        operation: OverlayOperation::Intersect,
    })
    .with_inputs([as_layer(a), as_layer(b)]);

    let output = layer(&session.run(spec).await.unwrap().output);
    assert_eq!(output.records.len(), 2);
    assert_eq!(output.title, "parcels_overlay_intersect_1405");
    assert_eq!(output.records[0].get("operation_type"), Some(&json!("intersect")));
}

#[tokio::test]
async fn test_overlay_difference_fully_erased_is_an_operation_error() {
    let session = session();
    let a = polygons_layer("a", "Small", &[(2.0, 2.0, 2.0, "a")]);
    let b = polygons_layer("b", "Big", &[(0.0, 0.0, 10.0, "b")]);
    let spec = AnalysisOperationSpec::new(ToolParameters::Overlay {
        operation: OverlayOperation::Difference,
    })
    .with_inputs([as_layer(a), as_layer(b)]);

    let err = session.run(spec).await.unwrap_err();
    match core_error(&err) {
        CoreError::Operation(message) => assert_eq!(message, "no difference results found"),
        other => panic!("expected operation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_dissolve_by_field_groups_features() {
    let session = session();
    let zones = polygons_layer(
        "zones",
        "Zones",
        &[
            (0.0, 0.0, 10.0, "north"),
            (5.0, 0.0, 10.0, "north"),
            (50.0, 0.0, 10.0, "south"),
        ],
    );
    let spec = AnalysisOperationSpec::new(ToolParameters::Dissolve(DissolveParams {
        dissolve_field: Some("zone".to_string()),
    }))
    .with_input(zones);

    let output = layer(&session.run(spec).await.unwrap().output);
    assert_eq!(output.records.len(), 2);
    assert_eq!(output.title, "zones_dissolve_zone_1405");
}

#[tokio::test]
async fn test_simplify_keeps_attributes() {
    let session = session();
    let parcels = polygons_layer("parcels", "Parcels", &[(0.0, 0.0, 100.0, "a")]);
    let spec = AnalysisOperationSpec::new(ToolParameters::ModifyGeometry(
        ModifyOperation::Simplify { tolerance: Some(0.5) },
    ))
    .with_input(parcels);

    let output = layer(&session.run(spec).await.unwrap().output);
    assert_eq!(output.records.len(), 1);
    assert_eq!(output.records[0].get("zone"), Some(&json!("a")));
    assert_eq!(output.title, "parcels_modify_simplify_1405");
}
