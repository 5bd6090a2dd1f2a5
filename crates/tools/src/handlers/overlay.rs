//! Overlay
//!
//! Union, intersect or difference of two layers. Results carry a fixed
//! descriptive schema instead of source attributes.
//!
//! - union: one engine call over both sets
//! - intersect: every pair in source order, failed pairs skipped
//! - difference: each set-1 geometry minus every set-2 geometry in turn,
//!   stopping once it is fully erased; failed subtractions skipped

use async_trait::async_trait;
use serde_json::Value;

use map_analysis_core::{
    AnalysisOperationSpec, CoreResult, FeatureSet, Geometry, GeometryRecord, InputArity,
    MetricModel, OverlayOperation, SchemaField, SymbologySource, ToolContext, ToolDefinition,
    ToolExecutable, ToolId, ToolOutput, ToolParameters, Warning,
};

use super::{input, owned_geometries, wrong_parameters};
use crate::executor::ItemResults;
use crate::schema::{overlay_fields, SchemaMerger};

pub struct OverlayTool;

impl OverlayTool {
    fn operation(spec: &AnalysisOperationSpec) -> CoreResult<OverlayOperation> {
        match &spec.parameters {
            ToolParameters::Overlay { operation } => Ok(*operation),
            other => Err(wrong_parameters(ToolId::Overlay, other)),
        }
    }

    fn intersect_pairs(
        ctx: &ToolContext,
        first: &[Geometry],
        second: &[Geometry],
        results: &mut ItemResults<Geometry>,
    ) -> CoreResult<()> {
        for (i, a) in first.iter().enumerate() {
            for (j, b) in second.iter().enumerate() {
                ctx.check_cancelled("overlay intersect")?;
                let index = i * second.len() + j;
                if let Some(Some(piece)) = results.attempt(index, ctx.engine().intersect(a, b)) {
                    results.push(piece);
                }
            }
        }
        Ok(())
    }

    fn subtract_all(
        ctx: &ToolContext,
        first: &[Geometry],
        second: &[Geometry],
        results: &mut ItemResults<Geometry>,
    ) -> CoreResult<()> {
        for (i, a) in first.iter().enumerate() {
            let mut remaining = Some(a.clone());
            for (j, b) in second.iter().enumerate() {
                ctx.check_cancelled("overlay difference")?;
                let current = match &remaining {
                    Some(current) => current,
                    None => break,
                };
                let index = i * second.len() + j;
                if let Some(next) = results.attempt(index, ctx.engine().difference(current, b)) {
                    remaining = next;
                }
            }
            if let Some(rest) = remaining {
                results.push(rest);
            }
        }
        Ok(())
    }

    /// Area for areal results, length (perimeter for areas) for linear and
    /// areal results. Metric failures leave the value null.
    fn metrics(
        ctx: &ToolContext,
        model: MetricModel,
        geometry: &Geometry,
        index: usize,
        warnings: &mut Vec<Warning>,
    ) -> (Value, Value) {
        let gt = geometry.geometry_type();
        let mut measure = |name: &str, result: CoreResult<f64>| match result {
            Ok(v) => Value::from(v),
            Err(err) => {
                tracing::warn!("[Overlay] {} of result {} failed: {}", name, index, err);
                warnings.push(Warning::new("overlay metrics", err.to_string()).with_item(index));
                Value::Null
            }
        };
        let area = if gt.is_area() {
            measure("area", model.area(ctx.engine(), geometry))
        } else {
            Value::from(0.0)
        };
        let length = if gt.is_point() {
            Value::from(0.0)
        } else {
            measure("length", model.length(ctx.engine(), geometry))
        };
        (area, length)
    }
}

impl ToolDefinition for OverlayTool {
    fn id(&self) -> ToolId {
        ToolId::Overlay
    }

    fn display_name(&self) -> &str {
        "Overlay"
    }

    fn description(&self) -> &str {
        "Union, intersect or difference of two layers"
    }

    fn input_arity(&self) -> InputArity {
        InputArity::Pair
    }

    fn symbology_source(&self) -> SymbologySource {
        SymbologySource::ToolDefault
    }
}

#[async_trait]
impl ToolExecutable for OverlayTool {
    fn validate(&self, spec: &AnalysisOperationSpec) -> CoreResult<()> {
        Self::operation(spec).map(|_| ())
    }

    fn compute(
        &self,
        ctx: &ToolContext,
        spec: &AnalysisOperationSpec,
        inputs: &[FeatureSet],
    ) -> CoreResult<ToolOutput> {
        let operation = Self::operation(spec)?;
        let first_set = input(inputs, 0)?;
        let second_set = input(inputs, 1)?;
        let first = owned_geometries(first_set);
        let second = owned_geometries(second_set);

        let mut results = ItemResults::new("overlay");
        match operation {
            OverlayOperation::Union => {
                ctx.check_cancelled("overlay union")?;
                let all: Vec<Geometry> = first.iter().chain(second.iter()).cloned().collect();
                results.push(ctx.engine().union(&all)?);
            }
            OverlayOperation::Intersect => {
                Self::intersect_pairs(ctx, &first, &second, &mut results)?
            }
            OverlayOperation::Difference => {
                Self::subtract_all(ctx, &first, &second, &mut results)?
            }
        }
        let (geometries, mut warnings) =
            results.require_any(format!("no {} results found", operation))?;

        let model = MetricModel::for_reference(&first_set.spatial_reference);
        let total = geometries.len();
        let created_at = ctx.now().to_rfc3339();
        let mut records = Vec::with_capacity(total);
        for (i, geometry) in geometries.into_iter().enumerate() {
            let (area, length) = Self::metrics(ctx, model, &geometry, i, &mut warnings);
            records.push(
                GeometryRecord::with_geometry(geometry)
                    .attr(overlay_fields::OPERATION_TYPE, operation.to_string())
                    .attr(overlay_fields::SOURCE_LAYER_1, first_set.source_title.clone())
                    .attr(overlay_fields::SOURCE_LAYER_2, second_set.source_title.clone())
                    .attr(overlay_fields::RESULT_INDEX, i as u64 + 1)
                    .attr(overlay_fields::TOTAL_RESULTS, total as u64)
                    .attr(overlay_fields::AREA, area)
                    .attr(overlay_fields::LENGTH, length)
                    .attr(overlay_fields::CREATED_AT, created_at.clone()),
            );
        }

        tracing::info!(
            "[Overlay] {} of '{}' and '{}' produced {} result(s)",
            operation,
            first_set.source_title,
            second_set.source_title,
            total
        );
        Ok(ToolOutput::new(records).with_warnings(warnings))
    }

    fn assemble_schema(
        &self,
        _ctx: &ToolContext,
        _spec: &AnalysisOperationSpec,
        _inputs: &[FeatureSet],
    ) -> CoreResult<Vec<SchemaField>> {
        Ok(SchemaMerger::overlay())
    }
}
