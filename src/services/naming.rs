//! Output Naming
//!
//! Titles follow `{input}_{tool}_{param}_{HHmm}`. Two runs with identical
//! parameters in the same minute produce the same title; titles are
//! labels, not keys.

use std::sync::Arc;

use map_analysis_core::{AnalysisOperationSpec, Clock, ModifyOperation, ToolParameters};

const FALLBACK_INPUT_NAME: &str = "layer";

/// Lowercase ASCII alphanumerics of `title`, or `"layer"` when nothing is left.
pub fn clean_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if cleaned.is_empty() {
        FALLBACK_INPUT_NAME.to_string()
    } else {
        cleaned
    }
}

/// Tool-specific parameter label.
pub fn param_value(spec: &AnalysisOperationSpec) -> String {
    match &spec.parameters {
        ToolParameters::Buffer(params) => {
            let distances: Vec<String> = params.distances.iter().map(|d| d.to_string()).collect();
            format!("{}{}", distances.join("-"), params.unit.abbreviation())
        }
        ToolParameters::Dissolve(params) => params
            .dissolve_field
            .as_deref()
            .map(clean_name)
            .unwrap_or_else(|| "all".to_string()),
        ToolParameters::ConvexHull { merge: true } => "merged".to_string(),
        ToolParameters::ConvexHull { merge: false } => "each".to_string(),
        ToolParameters::Overlay { operation } => operation.to_string(),
        ToolParameters::Clip { mode } => mode.to_string(),
        ToolParameters::Merge => format!("{}layers", spec.inputs.len()),
        ToolParameters::SpatialJoin { relationship } => relationship.to_string(),
        ToolParameters::AttributeJoin(params) => clean_name(&params.target_field),
        ToolParameters::ModifyGeometry(operation) => match operation {
            ModifyOperation::Offset { distance, unit } => {
                format!("offset{}{}", distance, unit.abbreviation())
            }
            other => other.name().to_string(),
        },
    }
}

/// Generates output titles from the injected clock
#[derive(Clone)]
pub struct Namer {
    clock: Arc<dyn Clock>,
}

impl Namer {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Title for the output of `spec`. A non-blank override is returned
    /// verbatim.
    pub fn name(&self, spec: &AnalysisOperationSpec) -> String {
        if let Some(name) = spec
            .output_name_override
            .as_ref()
            .filter(|n| !n.trim().is_empty())
        {
            return name.clone();
        }

        let input = spec
            .inputs
            .first()
            .map(|layer| clean_name(layer.title()))
            .unwrap_or_else(|| FALLBACK_INPUT_NAME.to_string());
        format!(
            "{}_{}_{}_{}",
            input,
            spec.tool_id.slug(),
            param_value(spec),
            self.clock.now().format("%H%M")
        )
    }
}
