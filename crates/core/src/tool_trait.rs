//! Analysis Tool Trait
//!
//! Core-layer tool abstraction with split definition/execution traits:
//!
//! - `ToolDefinition` - identity, input arity, symbology source
//! - `ToolExecutable` - validate, fetch, compute, assemble schema
//! - `AnalysisTool` - combined trait (auto-implemented via blanket impl)
//! - `ToolRegistry` - lookup by `ToolId` with ordered iteration
//!
//! The orchestrator drives every tool through the same pipeline; a tool only
//! decides what its own stages do.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::ToolContext;
use crate::error::{CoreError, CoreResult};
use crate::feature::{FeatureSet, GeometryRecord, SchemaField};
use crate::source::fetch_all;
use crate::spec::{AnalysisOperationSpec, ToolId};

// ============================================================================
// Supporting Types
// ============================================================================

/// Number of input layers a tool accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputArity {
    /// Exactly one layer
    Single,
    /// Exactly two layers (target, then join/clip layer)
    Pair,
    /// Two or more layers
    AtLeastTwo,
}

impl InputArity {
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            InputArity::Single => count == 1,
            InputArity::Pair => count == 2,
            InputArity::AtLeastTwo => count >= 2,
        }
    }
}

impl std::fmt::Display for InputArity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputArity::Single => write!(f, "exactly one input layer"),
            InputArity::Pair => write!(f, "exactly two input layers"),
            InputArity::AtLeastTwo => write!(f, "at least two input layers"),
        }
    }
}

/// Where an output layer's renderer comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbologySource {
    /// Clone the renderer of the input at this index when compatible
    Inherit(usize),
    /// Always use the tool's default symbol
    ToolDefault,
}

/// A partial failure that did not abort the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    /// Pipeline stage or tool step that produced the warning
    pub stage: String,
    pub message: String,
    /// Index of the skipped item (distance, pair, feature), if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<usize>,
}

impl Warning {
    pub fn new(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            message: message.into(),
            item: None,
        }
    }

    pub fn with_item(mut self, item: usize) -> Self {
        self.item = Some(item);
        self
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.item {
            Some(item) => write!(f, "[{}#{}] {}", self.stage, item, self.message),
            None => write!(f, "[{}] {}", self.stage, self.message),
        }
    }
}

/// Records computed by a tool, before schema coercion and oid assignment.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub features: Vec<GeometryRecord>,
    pub warnings: Vec<Warning>,
}

impl ToolOutput {
    pub fn new(features: Vec<GeometryRecord>) -> Self {
        Self {
            features,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<Warning>) -> Self {
        self.warnings = warnings;
        self
    }
}

// ============================================================================
// Trait Definitions
// ============================================================================

/// Tool identity and static metadata.
pub trait ToolDefinition: Send + Sync {
    fn id(&self) -> ToolId;

    /// Human-readable tool name.
    fn display_name(&self) -> &str;

    fn description(&self) -> &str;

    fn input_arity(&self) -> InputArity;

    fn symbology_source(&self) -> SymbologySource {
        SymbologySource::Inherit(0)
    }
}

/// Tool pipeline stages.
#[async_trait]
pub trait ToolExecutable: Send + Sync {
    /// Tool-specific preconditions. Runs before any fetch, so it may only
    /// look at parameters and source metadata.
    fn validate(&self, spec: &AnalysisOperationSpec) -> CoreResult<()>;

    /// Load the input feature sets. Defaults to a concurrent fetch of every
    /// input that fails if any input fails or is empty.
    async fn fetch(
        &self,
        _ctx: &ToolContext,
        spec: &AnalysisOperationSpec,
    ) -> CoreResult<Vec<FeatureSet>> {
        fetch_all(&spec.inputs).await
    }

    /// Produce output records. Must check `ctx.check_cancelled` between
    /// geometry iterations.
    fn compute(
        &self,
        ctx: &ToolContext,
        spec: &AnalysisOperationSpec,
        inputs: &[FeatureSet],
    ) -> CoreResult<ToolOutput>;

    /// Output schema, without the synthetic oid field.
    fn assemble_schema(
        &self,
        ctx: &ToolContext,
        spec: &AnalysisOperationSpec,
        inputs: &[FeatureSet],
    ) -> CoreResult<Vec<SchemaField>>;
}

/// Combined trait for analysis tools.
pub trait AnalysisTool: ToolDefinition + ToolExecutable {}

impl<T: ToolDefinition + ToolExecutable> AnalysisTool for T {}

/// Generic selection checks shared by every tool: the parameters belong to
/// the tool, the arity matches and no layer is selected twice.
pub fn check_selection(tool: &dyn AnalysisTool, spec: &AnalysisOperationSpec) -> CoreResult<()> {
    if spec.parameters.tool_id() != tool.id() || spec.tool_id != tool.id() {
        return Err(CoreError::validation(format!(
            "parameters for {} do not match tool {}",
            spec.parameters.tool_id(),
            tool.id()
        )));
    }

    let arity = tool.input_arity();
    if !arity.accepts(spec.inputs.len()) {
        return Err(CoreError::validation(format!(
            "{} requires {}, got {}",
            tool.display_name(),
            arity,
            spec.inputs.len()
        )));
    }

    let ids = spec.input_ids();
    for (i, id) in ids.iter().enumerate() {
        if ids[..i].contains(id) {
            return Err(CoreError::validation(format!(
                "layer '{}' is selected more than once",
                spec.inputs[i].title()
            )));
        }
    }
    Ok(())
}

// ============================================================================
// ToolRegistry
// ============================================================================

/// Catalog entry describing one registered tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub id: ToolId,
    pub display_name: String,
    pub description: String,
    pub input_arity: InputArity,
}

/// Registry of analysis tools keyed by `ToolId`, iterated in registration
/// order.
pub struct ToolRegistry {
    tools: HashMap<ToolId, Arc<dyn AnalysisTool>>,
    order: Vec<ToolId>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same id.
    pub fn register(&mut self, tool: Arc<dyn AnalysisTool>) {
        let id = tool.id();
        if !self.tools.contains_key(&id) {
            self.order.push(id);
        }
        self.tools.insert(id, tool);
    }

    pub fn unregister(&mut self, id: ToolId) -> Option<Arc<dyn AnalysisTool>> {
        self.order.retain(|t| *t != id);
        self.tools.remove(&id)
    }

    pub fn get(&self, id: ToolId) -> Option<Arc<dyn AnalysisTool>> {
        self.tools.get(&id).cloned()
    }

    /// Look up a tool, failing with `Validation` when it is not registered.
    pub fn require(&self, id: ToolId) -> CoreResult<Arc<dyn AnalysisTool>> {
        self.get(id)
            .ok_or_else(|| CoreError::validation(format!("tool not registered: {}", id)))
    }

    pub fn contains(&self, id: ToolId) -> bool {
        self.tools.contains_key(&id)
    }

    /// Tool ids in registration order.
    pub fn ids(&self) -> Vec<ToolId> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Descriptors of every registered tool, in registration order.
    pub fn catalog(&self) -> Vec<ToolDescriptor> {
        self.order
            .iter()
            .filter_map(|id| self.tools.get(id))
            .map(|tool| ToolDescriptor {
                id: tool.id(),
                display_name: tool.display_name().to_string(),
                description: tool.description().to_string(),
                input_arity: tool.input_arity(),
            })
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
