//! Schema Merger
//!
//! Builds output attribute schemas from one or more input schemas and
//! coerces computed records into them.
//!
//! Rules:
//! - System fields (oid, shape and shape-metric columns) never take part.
//! - Single-input tools copy the input's non-system fields verbatim.
//! - Merge takes the first input's schema; all inputs must share a
//!   geometry type.
//! - Joins keep the target schema and append the join schema with a
//!   `JOIN_` prefix (spatial join also adds `Join_Count`).
//! - Overlay uses a fixed synthetic schema.
//! - Every output gets a regenerated `ObjectID`, sequential from 1.

use std::collections::HashSet;

use serde_json::Value;

use map_analysis_core::{
    Attributes, CoreError, CoreResult, FeatureSet, FieldType, GeometryRecord, SchemaField,
    OID_FIELD,
};

/// Prefix applied to join-layer field names.
pub const JOIN_PREFIX: &str = "JOIN_";

/// Alias prefix applied to join-layer field aliases.
pub const JOIN_ALIAS_PREFIX: &str = "Join: ";

/// Spatial join match count field.
pub const JOIN_COUNT_FIELD: &str = "Join_Count";

/// Overlay schema field names.
pub mod overlay_fields {
    pub const OPERATION_TYPE: &str = "operation_type";
    pub const SOURCE_LAYER_1: &str = "source_layer_1";
    pub const SOURCE_LAYER_2: &str = "source_layer_2";
    pub const RESULT_INDEX: &str = "result_index";
    pub const TOTAL_RESULTS: &str = "total_results";
    pub const AREA: &str = "area";
    pub const LENGTH: &str = "length";
    pub const CREATED_AT: &str = "created_at";
}

/// A join-layer field and the output field it is copied into.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinColumn {
    /// Field name in the join layer
    pub source: String,
    /// Renamed output field
    pub field: SchemaField,
}

pub struct SchemaMerger;

impl SchemaMerger {
    /// Non-system fields of a single input, tagged with the source title.
    pub fn single(input: &FeatureSet) -> Vec<SchemaField> {
        input
            .non_system_fields()
            .into_iter()
            .map(|f| f.with_source_tag(input.source_title.clone()))
            .collect()
    }

    /// Schema of a merge: the first input's non-system fields.
    ///
    /// Fails with `Validation("geometry type mismatch")` unless every input
    /// declares the same geometry type.
    pub fn merge(inputs: &[FeatureSet]) -> CoreResult<Vec<SchemaField>> {
        let first = inputs
            .first()
            .ok_or_else(|| CoreError::validation("merge requires at least one input"))?;
        Self::check_same_geometry_type(inputs.iter().map(|s| s.geometry_type))?;
        Ok(Self::single(first))
    }

    /// Shared geometry-type gate for merge, usable on source metadata
    /// before fetch and on fetched sets after.
    pub fn check_same_geometry_type<I, T>(types: I) -> CoreResult<()>
    where
        I: IntoIterator<Item = Option<T>>,
        T: PartialEq + std::fmt::Display,
    {
        let mut iter = types.into_iter();
        let first = match iter.next() {
            Some(first) => first,
            None => return Ok(()),
        };
        for other in iter {
            if other != first {
                return Err(CoreError::validation(format!(
                    "geometry type mismatch: {} vs {}",
                    describe(&first),
                    describe(&other)
                )));
            }
        }
        Ok(())
    }

    /// Output columns for the join layer's non-system fields, renamed with
    /// the `JOIN_` prefix and deduplicated against the target's fields.
    pub fn join_columns(target: &FeatureSet, join: &FeatureSet) -> Vec<JoinColumn> {
        let mut taken: HashSet<String> = Self::single(target)
            .into_iter()
            .map(|f| f.name)
            .collect();
        taken.insert(JOIN_COUNT_FIELD.to_string());

        Self::single(join)
            .into_iter()
            .map(|field| {
                let name = unique_name(&format!("{}{}", JOIN_PREFIX, field.name), &taken);
                taken.insert(name.clone());
                JoinColumn {
                    source: field.name.clone(),
                    field: SchemaField {
                        alias: format!("{}{}", JOIN_ALIAS_PREFIX, field.alias),
                        name,
                        field_type: field.field_type,
                        source_tag: field.source_tag,
                    },
                }
            })
            .collect()
    }

    /// Target fields followed by the renamed join fields, plus
    /// `Join_Count` when `with_count`.
    pub fn join(target: &FeatureSet, join: &FeatureSet, with_count: bool) -> Vec<SchemaField> {
        let mut fields: Vec<SchemaField> = Self::single(target)
            .into_iter()
            .filter(|f| !(with_count && f.name == JOIN_COUNT_FIELD))
            .collect();
        fields.extend(
            Self::join_columns(target, join)
                .into_iter()
                .map(|c| c.field),
        );
        if with_count {
            fields.push(
                SchemaField::new(JOIN_COUNT_FIELD, FieldType::Integer).with_alias("Join Count"),
            );
        }
        fields
    }

    /// Attributes of one joined row: the target's attributes plus the
    /// matched join record's attributes under their output names. Without
    /// a match the joined fields are null.
    pub fn join_attributes(
        target: &GeometryRecord,
        matched: Option<&GeometryRecord>,
        columns: &[JoinColumn],
    ) -> Attributes {
        let mut attributes = target.attributes.clone();
        for column in columns {
            let value = matched
                .and_then(|r| r.get(&column.source))
                .cloned()
                .unwrap_or(Value::Null);
            attributes.insert(column.field.name.clone(), value);
        }
        attributes
    }

    /// Fixed overlay schema.
    pub fn overlay() -> Vec<SchemaField> {
        use overlay_fields::*;
        vec![
            SchemaField::new(OPERATION_TYPE, FieldType::String).with_alias("Operation"),
            SchemaField::new(SOURCE_LAYER_1, FieldType::String).with_alias("Source Layer 1"),
            SchemaField::new(SOURCE_LAYER_2, FieldType::String).with_alias("Source Layer 2"),
            SchemaField::new(RESULT_INDEX, FieldType::Integer).with_alias("Result Index"),
            SchemaField::new(TOTAL_RESULTS, FieldType::Integer).with_alias("Total Results"),
            SchemaField::new(AREA, FieldType::Double).with_alias("Area"),
            SchemaField::new(LENGTH, FieldType::Double).with_alias("Length"),
            SchemaField::new(CREATED_AT, FieldType::Date).with_alias("Created At"),
        ]
    }

    /// Final schema: synthetic oid followed by `fields` minus any system
    /// fields that slipped through.
    pub fn finalize(fields: Vec<SchemaField>) -> Vec<SchemaField> {
        let mut schema = vec![SchemaField::oid()];
        schema.extend(fields.into_iter().filter(|f| !f.is_system()));
        schema
    }

    /// Coerce records into a finalized schema: unknown keys are dropped,
    /// missing keys are null-filled, and `ObjectID` is assigned from 1.
    pub fn coerce(records: Vec<GeometryRecord>, schema: &[SchemaField]) -> Vec<GeometryRecord> {
        records
            .into_iter()
            .enumerate()
            .map(|(i, record)| {
                let mut attributes = Attributes::new();
                for field in schema {
                    let value = if field.name == OID_FIELD {
                        Value::from(i as u64 + 1)
                    } else {
                        record
                            .attributes
                            .get(&field.name)
                            .cloned()
                            .unwrap_or(Value::Null)
                    };
                    attributes.insert(field.name.clone(), value);
                }
                GeometryRecord::new(record.geometry, attributes)
            })
            .collect()
    }
}

/// Non-system attributes of a record, for tools that carry input
/// attributes through.
pub fn carry_attributes(record: &GeometryRecord, fields: &[SchemaField]) -> Attributes {
    let mut attributes = Attributes::new();
    for field in fields {
        if let Some(value) = record.get(&field.name) {
            attributes.insert(field.name.clone(), value.clone());
        }
    }
    attributes
}

fn describe<T: std::fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "mixed".to_string(),
    }
}

fn unique_name(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}
