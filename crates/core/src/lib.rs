//! Map Analysis Core
//!
//! Foundational types and traits for the map analysis workspace. This crate
//! has no dependency on any concrete geometry library or host application.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `geometry` - Spatial references, geometry types, units, the `Geometry` union
//! - `feature` - Feature sets, records and schema fields
//! - `symbol` - Symbols and renderers
//! - `engine` - `GeometryEngine` capability and spatial relationships
//! - `source` - `LayerSource` adapter and concurrent fetch
//! - `spec` - Tool ids, tool parameters and `AnalysisOperationSpec`
//! - `context` - Clock, id generator and per-run `ToolContext`
//! - `tool_trait` - Analysis tool abstraction (`ToolDefinition`, `ToolExecutable`, `AnalysisTool`)

pub mod error;
pub mod geometry;
pub mod feature;
pub mod symbol;
pub mod engine;
pub mod source;
pub mod spec;
pub mod context;
pub mod tool_trait;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Geometry & Features ────────────────────────────────────────────────
pub use feature::{
    Attributes, FeatureSet, FieldType, GeometryRecord, SchemaField, OID_FIELD,
    SYSTEM_FIELD_NAMES,
};
pub use geometry::{Geometry, GeometryType, LinearUnit, MetricModel, Shape, SpatialReference};
pub use symbol::{Color, Renderer, Symbol, UniqueValueClass};

// ── Capabilities ───────────────────────────────────────────────────────
pub use engine::{GeometryEngine, SpatialRelationship};
pub use source::{fetch_all, fetch_non_empty, has_features, LayerRef, LayerSource, SourceKind};

// ── Operation Spec ─────────────────────────────────────────────────────
pub use spec::{
    AnalysisOperationSpec, AttributeJoinParams, BufferParams, ClipMode, DissolveParams,
    ModifyOperation, OverlayOperation, ToolId, ToolParameters,
};

// ── Run Context ────────────────────────────────────────────────────────
pub use context::{
    Clock, FixedClock, IdGenerator, SequentialIdGenerator, SystemClock, ToolContext,
    ToolDefaults, UuidIdGenerator,
};

// ── Analysis Tool Trait ────────────────────────────────────────────────
pub use tool_trait::{
    check_selection, AnalysisTool, InputArity, SymbologySource, ToolDefinition, ToolDescriptor,
    ToolExecutable, ToolOutput, ToolRegistry, Warning,
};
