//! Feature and Schema Model
//!
//! `FeatureSet` is the immutable snapshot a layer source returns for one
//! analysis run; `SchemaField` describes one attribute column.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geometry::{Geometry, GeometryType, SpatialReference};

/// Attribute values keyed by field name.
pub type Attributes = Map<String, Value>;

/// Name of the synthetic object-id field generated for every output.
pub const OID_FIELD: &str = "ObjectID";

/// Field names that never take part in schema merges (compared case-insensitively).
pub const SYSTEM_FIELD_NAMES: [&str; 10] = [
    "oid",
    "objectid",
    "fid",
    "shape",
    "shape_length",
    "shape_area",
    "shape__length",
    "shape__area",
    "shape.len",
    "shape.area",
];

// ============================================================================
// SchemaField
// ============================================================================

/// Attribute column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Oid,
    Integer,
    Double,
    String,
    Date,
    Boolean,
}

impl FieldType {
    /// Best-effort type for a JSON value, used when inferring a schema
    /// from plain graphics.
    pub fn infer(value: &Value) -> Self {
        match value {
            Value::Bool(_) => FieldType::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => FieldType::Integer,
            Value::Number(_) => FieldType::Double,
            _ => FieldType::String,
        }
    }
}

/// One attribute column of a feature set or output layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaField {
    pub name: String,
    pub alias: String,
    pub field_type: FieldType,
    /// Where the field came from (layer title or tool), if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_tag: Option<String>,
}

impl SchemaField {
    /// Create a field whose alias equals its name.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            alias: name.clone(),
            name,
            field_type,
            source_tag: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    pub fn with_source_tag(mut self, tag: impl Into<String>) -> Self {
        self.source_tag = Some(tag.into());
        self
    }

    /// The synthetic object-id field.
    pub fn oid() -> Self {
        Self::new(OID_FIELD, FieldType::Oid)
    }

    /// System fields are regenerated or dropped, never merged.
    pub fn is_system(&self) -> bool {
        if self.field_type == FieldType::Oid {
            return true;
        }
        let lower = self.name.to_ascii_lowercase();
        SYSTEM_FIELD_NAMES.contains(&lower.as_str())
    }
}

// ============================================================================
// GeometryRecord / FeatureSet
// ============================================================================

/// A single feature: optional geometry plus attributes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeometryRecord {
    pub geometry: Option<Geometry>,
    pub attributes: Attributes,
}

impl GeometryRecord {
    pub fn new(geometry: Option<Geometry>, attributes: Attributes) -> Self {
        Self {
            geometry,
            attributes,
        }
    }

    pub fn with_geometry(geometry: Geometry) -> Self {
        Self::new(Some(geometry), Attributes::new())
    }

    /// Set an attribute value (builder style).
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

/// Immutable snapshot of one source, fetched for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSet {
    /// Absent only for heterogeneous graphic collections
    pub geometry_type: Option<GeometryType>,
    pub spatial_reference: SpatialReference,
    pub fields: Vec<SchemaField>,
    pub records: Vec<GeometryRecord>,
    /// Title of the layer this set was fetched from
    #[serde(default)]
    pub source_title: String,
}

impl FeatureSet {
    pub fn new(
        source_title: impl Into<String>,
        geometry_type: Option<GeometryType>,
        spatial_reference: SpatialReference,
        fields: Vec<SchemaField>,
        records: Vec<GeometryRecord>,
    ) -> Self {
        Self {
            geometry_type,
            spatial_reference,
            fields,
            records,
            source_title: source_title.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Non-null geometries in record order.
    pub fn geometries(&self) -> Vec<&Geometry> {
        self.records
            .iter()
            .filter_map(|r| r.geometry.as_ref())
            .collect()
    }

    /// Records that carry a geometry, in record order.
    pub fn records_with_geometry(&self) -> impl Iterator<Item = (&GeometryRecord, &Geometry)> {
        self.records
            .iter()
            .filter_map(|r| r.geometry.as_ref().map(|g| (r, g)))
    }

    /// Fields that participate in merges.
    pub fn non_system_fields(&self) -> Vec<SchemaField> {
        self.fields
            .iter()
            .filter(|f| !f.is_system())
            .cloned()
            .collect()
    }

    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }
}
