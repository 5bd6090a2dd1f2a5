//! Analysis Tool Handlers
//!
//! One module per catalog tool. Every handler implements `ToolDefinition`
//! and `ToolExecutable`; geometry work goes through `ctx.engine()`.

mod attribute_join;
mod buffer;
mod clip;
mod convex_hull;
mod dissolve;
mod merge;
mod modify;
mod overlay;
mod spatial_join;

pub use attribute_join::AttributeJoinTool;
pub use buffer::BufferTool;
pub use clip::ClipTool;
pub use convex_hull::ConvexHullTool;
pub use dissolve::DissolveTool;
pub use merge::MergeTool;
pub use modify::ModifyGeometryTool;
pub use overlay::OverlayTool;
pub use spatial_join::SpatialJoinTool;

use map_analysis_core::{
    AnalysisOperationSpec, CoreError, CoreResult, FeatureSet, Geometry, ToolId, ToolParameters,
};

/// Fetched input at `index`, failing with `Internal` if the pipeline
/// handed over fewer sets than the tool's arity.
pub(crate) fn input(inputs: &[FeatureSet], index: usize) -> CoreResult<&FeatureSet> {
    inputs
        .get(index)
        .ok_or_else(|| CoreError::internal(format!("missing input feature set {}", index)))
}

/// Owned non-null geometries of a feature set, in record order.
pub(crate) fn owned_geometries(set: &FeatureSet) -> Vec<Geometry> {
    set.geometries().into_iter().cloned().collect()
}

/// Fail with `Validation` unless the selected layer at `index` declares
/// a field named `field`.
pub(crate) fn require_field(
    spec: &AnalysisOperationSpec,
    index: usize,
    field: &str,
    role: &str,
) -> CoreResult<()> {
    if field.trim().is_empty() {
        return Err(CoreError::validation(format!("{} field is required", role)));
    }
    let layer = spec
        .inputs
        .get(index)
        .ok_or_else(|| CoreError::validation(format!("{} layer is required", role)))?;
    if layer.fields().iter().any(|f| f.name == field) {
        Ok(())
    } else {
        Err(CoreError::validation(format!(
            "{} field '{}' not found in layer '{}'",
            role,
            field,
            layer.title()
        )))
    }
}

/// Error for parameters that belong to another tool.
pub(crate) fn wrong_parameters(expected: ToolId, parameters: &ToolParameters) -> CoreError {
    CoreError::validation(format!(
        "expected {} parameters, got {}",
        expected,
        parameters.tool_id()
    ))
}
