//! Analysis Operation Spec
//!
//! The closed tool catalog (`ToolId`), the typed parameters of each tool and
//! the immutable per-run request (`AnalysisOperationSpec`).

use serde::{Deserialize, Serialize};

use crate::engine::SpatialRelationship;
use crate::geometry::LinearUnit;
use crate::source::LayerRef;

// ============================================================================
// ToolId
// ============================================================================

/// Identifier of an analysis tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolId {
    Buffer,
    Dissolve,
    ConvexHull,
    Overlay,
    Clip,
    Merge,
    SpatialJoin,
    AttributeJoin,
    ModifyGeometry,
}

impl ToolId {
    /// Every tool, in catalog order.
    pub const ALL: [ToolId; 9] = [
        ToolId::Buffer,
        ToolId::Dissolve,
        ToolId::ConvexHull,
        ToolId::Overlay,
        ToolId::Clip,
        ToolId::Merge,
        ToolId::SpatialJoin,
        ToolId::AttributeJoin,
        ToolId::ModifyGeometry,
    ];

    /// Compact name used inside generated layer titles.
    pub fn slug(&self) -> &'static str {
        match self {
            ToolId::Buffer => "buffer",
            ToolId::Dissolve => "dissolve",
            ToolId::ConvexHull => "convexhull",
            ToolId::Overlay => "overlay",
            ToolId::Clip => "clip",
            ToolId::Merge => "merge",
            ToolId::SpatialJoin => "spatialjoin",
            ToolId::AttributeJoin => "attributejoin",
            ToolId::ModifyGeometry => "modify",
        }
    }
}

impl std::fmt::Display for ToolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolId::Buffer => write!(f, "buffer"),
            ToolId::Dissolve => write!(f, "dissolve"),
            ToolId::ConvexHull => write!(f, "convex_hull"),
            ToolId::Overlay => write!(f, "overlay"),
            ToolId::Clip => write!(f, "clip"),
            ToolId::Merge => write!(f, "merge"),
            ToolId::SpatialJoin => write!(f, "spatial_join"),
            ToolId::AttributeJoin => write!(f, "attribute_join"),
            ToolId::ModifyGeometry => write!(f, "modify_geometry"),
        }
    }
}

impl std::str::FromStr for ToolId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolId::ALL
            .iter()
            .copied()
            .find(|id| id.to_string() == s)
            .ok_or_else(|| format!("Unknown tool: {}", s))
    }
}

// ============================================================================
// Parameters
// ============================================================================

/// Buffer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferParams {
    pub distances: Vec<f64>,
    #[serde(default)]
    pub unit: LinearUnit,
    /// Union every buffer into one polygon. `None` uses the configured default.
    #[serde(default)]
    pub dissolve: Option<bool>,
}

/// Dissolve parameters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DissolveParams {
    /// Union per distinct value of this field instead of everything at once
    #[serde(default)]
    pub dissolve_field: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayOperation {
    Union,
    Intersect,
    Difference,
}

impl std::fmt::Display for OverlayOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlayOperation::Union => write!(f, "union"),
            OverlayOperation::Intersect => write!(f, "intersect"),
            OverlayOperation::Difference => write!(f, "difference"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipMode {
    Clip,
    Cut,
}

impl std::fmt::Display for ClipMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClipMode::Clip => write!(f, "clip"),
            ClipMode::Cut => write!(f, "cut"),
        }
    }
}

/// Attribute join key fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeJoinParams {
    pub target_field: String,
    pub join_field: String,
}

/// Per-geometry transform applied by the modify tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum ModifyOperation {
    Offset {
        distance: f64,
        #[serde(default)]
        unit: LinearUnit,
    },
    Densify {
        /// `None` uses the configured default segment length
        #[serde(default)]
        max_segment_length: Option<f64>,
        #[serde(default)]
        unit: LinearUnit,
    },
    Simplify {
        /// `None` uses the configured default tolerance
        #[serde(default)]
        tolerance: Option<f64>,
    },
}

impl ModifyOperation {
    pub fn name(&self) -> &'static str {
        match self {
            ModifyOperation::Offset { .. } => "offset",
            ModifyOperation::Densify { .. } => "densify",
            ModifyOperation::Simplify { .. } => "simplify",
        }
    }
}

/// Tool parameters, one variant per tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolParameters {
    Buffer(BufferParams),
    Dissolve(DissolveParams),
    ConvexHull { merge: bool },
    Overlay { operation: OverlayOperation },
    Clip { mode: ClipMode },
    Merge,
    SpatialJoin { relationship: SpatialRelationship },
    AttributeJoin(AttributeJoinParams),
    ModifyGeometry(ModifyOperation),
}

impl ToolParameters {
    /// The tool these parameters belong to.
    pub fn tool_id(&self) -> ToolId {
        match self {
            ToolParameters::Buffer(_) => ToolId::Buffer,
            ToolParameters::Dissolve(_) => ToolId::Dissolve,
            ToolParameters::ConvexHull { .. } => ToolId::ConvexHull,
            ToolParameters::Overlay { .. } => ToolId::Overlay,
            ToolParameters::Clip { .. } => ToolId::Clip,
            ToolParameters::Merge => ToolId::Merge,
            ToolParameters::SpatialJoin { .. } => ToolId::SpatialJoin,
            ToolParameters::AttributeJoin(_) => ToolId::AttributeJoin,
            ToolParameters::ModifyGeometry(_) => ToolId::ModifyGeometry,
        }
    }
}

// ============================================================================
// AnalysisOperationSpec
// ============================================================================

/// One analysis request. Immutable once built; never persisted.
#[derive(Clone)]
pub struct AnalysisOperationSpec {
    pub tool_id: ToolId,
    pub inputs: Vec<LayerRef>,
    pub parameters: ToolParameters,
    pub output_name_override: Option<String>,
}

impl AnalysisOperationSpec {
    /// Create a spec for the tool implied by `parameters`.
    pub fn new(parameters: ToolParameters) -> Self {
        Self {
            tool_id: parameters.tool_id(),
            inputs: Vec::new(),
            parameters,
            output_name_override: None,
        }
    }

    pub fn with_input(mut self, layer: LayerRef) -> Self {
        self.inputs.push(layer);
        self
    }

    pub fn with_inputs(mut self, layers: impl IntoIterator<Item = LayerRef>) -> Self {
        self.inputs.extend(layers);
        self
    }

    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name_override = Some(name.into());
        self
    }

    /// Ids of the selected input layers, in selection order.
    pub fn input_ids(&self) -> Vec<String> {
        self.inputs.iter().map(|l| l.id().to_string()).collect()
    }
}

impl std::fmt::Debug for AnalysisOperationSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisOperationSpec")
            .field("tool_id", &self.tool_id)
            .field("inputs", &self.input_ids())
            .field("parameters", &self.parameters)
            .field("output_name_override", &self.output_name_override)
            .finish()
    }
}
