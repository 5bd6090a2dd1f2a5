//! Clip / Cut
//!
//! Clip intersects every input feature with every clip feature. Cut unions
//! all cutter polylines into one and splits each input feature with it.
//! Pieces keep the attributes of the input feature they came from; results
//! that span several geometry types become a mixed graphics output.

use async_trait::async_trait;

use map_analysis_core::{
    AnalysisOperationSpec, ClipMode, CoreError, CoreResult, FeatureSet, GeometryRecord,
    GeometryType, InputArity, SchemaField, ToolContext, ToolDefinition, ToolExecutable, ToolId,
    ToolOutput, ToolParameters,
};

use super::{input, owned_geometries, wrong_parameters};
use crate::executor::ItemResults;
use crate::schema::{carry_attributes, SchemaMerger};

pub struct ClipTool;

impl ClipTool {
    fn mode(spec: &AnalysisOperationSpec) -> CoreResult<ClipMode> {
        match &spec.parameters {
            ToolParameters::Clip { mode } => Ok(*mode),
            other => Err(wrong_parameters(ToolId::Clip, other)),
        }
    }

    fn clip(
        ctx: &ToolContext,
        source: &FeatureSet,
        clip_set: &FeatureSet,
    ) -> CoreResult<ItemResults<GeometryRecord>> {
        let fields = SchemaMerger::single(source);
        let clippers = owned_geometries(clip_set);
        let mut results = ItemResults::new("clip");
        for (i, (record, geometry)) in source.records_with_geometry().enumerate() {
            for (j, clipper) in clippers.iter().enumerate() {
                ctx.check_cancelled("clip")?;
                let index = i * clippers.len() + j;
                if let Some(Some(piece)) =
                    results.attempt(index, ctx.engine().intersect(geometry, clipper))
                {
                    results.push(GeometryRecord::new(
                        Some(piece),
                        carry_attributes(record, &fields),
                    ));
                }
            }
        }
        Ok(results)
    }

    fn cut(
        ctx: &ToolContext,
        source: &FeatureSet,
        cutter_set: &FeatureSet,
    ) -> CoreResult<ItemResults<GeometryRecord>> {
        let fields = SchemaMerger::single(source);
        ctx.check_cancelled("cut")?;
        let cutter = ctx.engine().union(&owned_geometries(cutter_set))?;

        let mut results = ItemResults::new("cut");
        for (i, (record, geometry)) in source.records_with_geometry().enumerate() {
            ctx.check_cancelled("cut")?;
            if let Some(pieces) = results.attempt(i, ctx.engine().cut(geometry, &cutter)) {
                results.extend(pieces.into_iter().map(|piece| {
                    GeometryRecord::new(Some(piece), carry_attributes(record, &fields))
                }));
            }
        }
        Ok(results)
    }
}

impl ToolDefinition for ClipTool {
    fn id(&self) -> ToolId {
        ToolId::Clip
    }

    fn display_name(&self) -> &str {
        "Clip"
    }

    fn description(&self) -> &str {
        "Clip features to another layer, or cut them with polylines"
    }

    fn input_arity(&self) -> InputArity {
        InputArity::Pair
    }
}

#[async_trait]
impl ToolExecutable for ClipTool {
    fn validate(&self, spec: &AnalysisOperationSpec) -> CoreResult<()> {
        if Self::mode(spec)? == ClipMode::Cut {
            let cutter = spec
                .inputs
                .get(1)
                .ok_or_else(|| CoreError::validation("cutter layer is required"))?;
            if cutter.geometry_type() != Some(GeometryType::Polyline) {
                return Err(CoreError::validation(format!(
                    "cutter layer '{}' must be a polyline layer",
                    cutter.title()
                )));
            }
        }
        Ok(())
    }

    fn compute(
        &self,
        ctx: &ToolContext,
        spec: &AnalysisOperationSpec,
        inputs: &[FeatureSet],
    ) -> CoreResult<ToolOutput> {
        let mode = Self::mode(spec)?;
        let source = input(inputs, 0)?;
        let other = input(inputs, 1)?;

        let results = match mode {
            ClipMode::Clip => Self::clip(ctx, source, other)?,
            ClipMode::Cut => Self::cut(ctx, source, other)?,
        };
        let (records, warnings) = results.require_any(format!("no {} results found", mode))?;
        tracing::info!(
            "[Clip] {} of '{}' by '{}' produced {} feature(s)",
            mode,
            source.source_title,
            other.source_title,
            records.len()
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
