//! Merge
//!
//! Concatenates the features of two or more layers of the same geometry
//! type. Geometry passes through untouched; attributes are coerced into the
//! first layer's schema by the pipeline.

use async_trait::async_trait;

use map_analysis_core::{
    AnalysisOperationSpec, CoreResult, FeatureSet, InputArity, SchemaField, SymbologySource,
    ToolContext, ToolDefinition, ToolExecutable, ToolId, ToolOutput, ToolParameters,
};

use super::wrong_parameters;
use crate::schema::SchemaMerger;

pub struct MergeTool;

impl ToolDefinition for MergeTool {
    fn id(&self) -> ToolId {
        ToolId::Merge
    }

    fn display_name(&self) -> &str {
        "Merge"
    }

    fn description(&self) -> &str {
        "Combine features from layers of the same geometry type"
    }

    fn input_arity(&self) -> InputArity {
        InputArity::AtLeastTwo
    }

    fn symbology_source(&self) -> SymbologySource {
        SymbologySource::ToolDefault
    }
}

#[async_trait]
impl ToolExecutable for MergeTool {
    fn validate(&self, spec: &AnalysisOperationSpec) -> CoreResult<()> {
        if !matches!(spec.parameters, ToolParameters::Merge) {
            return Err(wrong_parameters(ToolId::Merge, &spec.parameters));
        }
        SchemaMerger::check_same_geometry_type(spec.inputs.iter().map(|l| l.geometry_type()))
    }

    fn compute(
        &self,
        ctx: &ToolContext,
        _spec: &AnalysisOperationSpec,
        inputs: &[FeatureSet],
    ) -> CoreResult<ToolOutput> {
        SchemaMerger::check_same_geometry_type(inputs.iter().map(|s| s.geometry_type))?;
        ctx.check_cancelled("merge")?;
        let records: Vec<_> = inputs.iter().flat_map(|s| s.records.clone()).collect();
        tracing::info!(
            "[Merge] Merged {} layer(s) into {} feature(s)",
            inputs.len(),
            records.len()
        );
        Ok(ToolOutput::new(records))
    }

    fn assemble_schema(
        &self,
        _ctx: &ToolContext,
        _spec: &AnalysisOperationSpec,
        inputs: &[FeatureSet],
    ) -> CoreResult<Vec<SchemaField>> {
        SchemaMerger::merge(inputs)
    }
}
