//! Geometry Modify
//!
//! Applies one per-geometry transform (offset, densify, simplify). A failed
//! geometry is skipped with a warning; the run only fails when nothing is
//! left.

use async_trait::async_trait;

use map_analysis_core::{
    AnalysisOperationSpec, CoreError, CoreResult, FeatureSet, Geometry, GeometryRecord,
    InputArity, MetricModel, ModifyOperation, SchemaField, ToolContext, ToolDefinition,
    ToolExecutable, ToolId, ToolOutput, ToolParameters,
};

use super::{input, wrong_parameters};
use crate::executor::ItemResults;
use crate::schema::{carry_attributes, SchemaMerger};

pub struct ModifyGeometryTool;

impl ModifyGeometryTool {
    fn operation(spec: &AnalysisOperationSpec) -> CoreResult<&ModifyOperation> {
        match &spec.parameters {
            ToolParameters::ModifyGeometry(operation) => Ok(operation),
            other => Err(wrong_parameters(ToolId::ModifyGeometry, other)),
        }
    }

    fn apply(
        ctx: &ToolContext,
        operation: &ModifyOperation,
        geometry: &Geometry,
    ) -> CoreResult<Geometry> {
        let engine = ctx.engine();
        let model = MetricModel::for_reference(&geometry.spatial_reference);
        match operation {
            ModifyOperation::Offset { distance, unit } => {
                model.offset(engine, geometry, *distance, *unit)
            }
            ModifyOperation::Densify {
                max_segment_length,
                unit,
            } => {
                let length = max_segment_length.unwrap_or(ctx.defaults().densify_segment_length);
                model.densify(engine, geometry, length, *unit)
            }
            ModifyOperation::Simplify { tolerance } => {
                let tolerance = tolerance.unwrap_or(ctx.defaults().simplify_tolerance);
                engine.simplify(geometry, tolerance)
            }
        }
    }
}

impl ToolDefinition for ModifyGeometryTool {
    fn id(&self) -> ToolId {
        ToolId::ModifyGeometry
    }

    fn display_name(&self) -> &str {
        "Modify Geometry"
    }

    fn description(&self) -> &str {
        "Offset, densify or simplify each feature's geometry"
    }

    fn input_arity(&self) -> InputArity {
        InputArity::Single
    }
}

#[async_trait]
impl ToolExecutable for ModifyGeometryTool {
    fn validate(&self, spec: &AnalysisOperationSpec) -> CoreResult<()> {
        match Self::operation(spec)? {
            ModifyOperation::Offset { distance, .. } => {
                if !distance.is_finite() || *distance == 0.0 {
                    return Err(CoreError::validation(
                        "offset distance must be a non-zero number",
                    ));
                }
            }
            ModifyOperation::Densify {
                max_segment_length: Some(length),
                ..
            } => {
                if !length.is_finite() || *length <= 0.0 {
                    return Err(CoreError::validation(
                        "densify segment length must be greater than 0",
                    ));
                }
            }
            ModifyOperation::Simplify {
                tolerance: Some(tolerance),
            } => {
                if !tolerance.is_finite() || *tolerance < 0.0 {
                    return Err(CoreError::validation(
                        "simplify tolerance must not be negative",
                    ));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn compute(
        &self,
        ctx: &ToolContext,
        spec: &AnalysisOperationSpec,
        inputs: &[FeatureSet],
    ) -> CoreResult<ToolOutput> {
        let operation = Self::operation(spec)?;
        let source = input(inputs, 0)?;
        let fields = SchemaMerger::single(source);

        let mut results = ItemResults::new("modify");
        for (i, (record, geometry)) in source.records_with_geometry().enumerate() {
            ctx.check_cancelled("modify")?;
            if let Some(modified) = results.attempt(i, Self::apply(ctx, operation, geometry)) {
                results.push(GeometryRecord::new(
                    Some(modified),
                    carry_attributes(record, &fields),
                ));
            }
        }

        let failed = results.failed();
        let (records, warnings) = results.require_any("no results produced")?;
        tracing::info!(
            "[Modify] {} applied to {} feature(s), {} skipped",
            operation.name(),
            records.len(),
            failed
        );
        Ok(ToolOutput::new(records).with_warnings(warnings))
    }

    fn assemble_schema(
        &self,
        _ctx: &ToolContext,
        _spec: &AnalysisOperationSpec,
        inputs: &[FeatureSet],
    ) -> CoreResult<Vec<SchemaField>> {
        Ok(SchemaMerger::single(input(inputs, 0)?))
    }
}
