//! Output Layer Models
//!
//! Derived layers produced by analysis runs, and their lifecycle states.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use map_analysis_core::{GeometryRecord, GeometryType, Renderer, SchemaField, ToolId};

/// How an output is materialized on the map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// Typed feature layer with a single geometry type
    FeatureLayer,
    /// Graphics container holding mixed geometry types
    GraphicsContainer,
}

/// Lifecycle state of an output layer
///
/// `Created -> (Visible <-> Hidden)* -> Deleted`. A created layer is drawn,
/// so toggling it hides it. `Deleted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerState {
    Created,
    Visible,
    Hidden,
    Deleted,
}

impl LayerState {
    pub fn is_visible(&self) -> bool {
        matches!(self, LayerState::Created | LayerState::Visible)
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, LayerState::Deleted)
    }

    /// State after a visibility toggle, `None` once deleted.
    pub fn toggled(&self) -> Option<LayerState> {
        match self {
            LayerState::Created | LayerState::Visible => Some(LayerState::Hidden),
            LayerState::Hidden => Some(LayerState::Visible),
            LayerState::Deleted => None,
        }
    }
}

impl std::fmt::Display for LayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerState::Created => write!(f, "created"),
            LayerState::Visible => write!(f, "visible"),
            LayerState::Hidden => write!(f, "hidden"),
            LayerState::Deleted => write!(f, "deleted"),
        }
    }
}

/// A derived layer owned by the output registry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputLayer {
    /// Globally unique, stable id
    pub id: String,
    pub tool_id: ToolId,
    pub title: String,
    pub kind: OutputKind,
    /// Absent for graphics containers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry_type: Option<GeometryType>,
    pub schema: Vec<SchemaField>,
    pub records: Vec<GeometryRecord>,
    pub renderer: Renderer,
    pub state: LayerState,
    pub created_at: DateTime<FixedOffset>,
    /// Titles of the input layers, in selection order
    pub source_titles: Vec<String>,
}

impl OutputLayer {
    pub fn feature_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_visible(&self) -> bool {
        self.state.is_visible()
    }
}
