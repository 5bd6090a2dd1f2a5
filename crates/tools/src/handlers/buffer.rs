//! Buffer
//!
//! Buffers every input geometry at each requested distance. By default all
//! buffers are unioned into a single polygon; with dissolve off, each buffer
//! keeps the attributes of the feature it came from.

use async_trait::async_trait;
use serde_json::Value;

use map_analysis_core::{
    AnalysisOperationSpec, BufferParams, CoreError, CoreResult, FeatureSet, FieldType,
    GeometryRecord, InputArity, MetricModel, SchemaField, ToolContext, ToolDefinition,
    ToolExecutable, ToolId, ToolOutput, ToolParameters,
};

use super::{input, owned_geometries, wrong_parameters};
use crate::executor::ItemResults;
use crate::schema::{carry_attributes, SchemaMerger};

pub const BUFFER_DISTANCE_FIELD: &str = "buffer_distance";
pub const BUFFER_UNIT_FIELD: &str = "buffer_unit";

pub struct BufferTool;

impl BufferTool {
    fn params(spec: &AnalysisOperationSpec) -> CoreResult<&BufferParams> {
        match &spec.parameters {
            ToolParameters::Buffer(params) => Ok(params),
            other => Err(wrong_parameters(ToolId::Buffer, other)),
        }
    }

    fn dissolve(ctx: &ToolContext, params: &BufferParams) -> bool {
        params.dissolve.unwrap_or(ctx.defaults().buffer_dissolve)
    }
}

impl ToolDefinition for BufferTool {
    fn id(&self) -> ToolId {
        ToolId::Buffer
    }

    fn display_name(&self) -> &str {
        "Buffer"
    }

    fn description(&self) -> &str {
        "Create polygons at one or more distances around input features"
    }

    fn input_arity(&self) -> InputArity {
        InputArity::Single
    }
}

#[async_trait]
impl ToolExecutable for BufferTool {
    fn validate(&self, spec: &AnalysisOperationSpec) -> CoreResult<()> {
        let params = Self::params(spec)?;
        if params.distances.is_empty() {
            return Err(CoreError::validation("at least one buffer distance is required"));
        }
        if let Some(bad) = params
            .distances
            .iter()
            .find(|d| !d.is_finite() || **d <= 0.0)
        {
            return Err(CoreError::validation(format!(
                "buffer distances must be greater than 0, got {}",
                bad
            )));
        }
        Ok(())
    }

    fn compute(
        &self,
        ctx: &ToolContext,
        spec: &AnalysisOperationSpec,
        inputs: &[FeatureSet],
    ) -> CoreResult<ToolOutput> {
        let params = Self::params(spec)?;
        let source = input(inputs, 0)?;
        let geometries = owned_geometries(source);
        let model = MetricModel::for_reference(&source.spatial_reference);
        let dissolve = Self::dissolve(ctx, params);
        let fields = SchemaMerger::single(source);

        tracing::debug!(
            "[Buffer] {} geometries x {} distance(s), {:?}, dissolve={}",
            geometries.len(),
            params.distances.len(),
            model,
            dissolve
        );

        let mut results = ItemResults::new("buffer");
        for (i, distance) in params.distances.iter().enumerate() {
            ctx.check_cancelled("buffer")?;
            let buffered = match results.attempt(
                i,
                model.buffer(ctx.engine(), &geometries, *distance, params.unit),
            ) {
                Some(buffered) => buffered,
                None => continue,
            };

            if dissolve {
                results.extend(buffered.into_iter().map(GeometryRecord::with_geometry));
            } else {
                for ((record, _), polygon) in source.records_with_geometry().zip(buffered) {
                    let mut attributes = carry_attributes(record, &fields);
                    attributes.insert(BUFFER_DISTANCE_FIELD.to_string(), Value::from(*distance));
                    attributes.insert(
                        BUFFER_UNIT_FIELD.to_string(),
                        Value::from(params.unit.abbreviation()),
                    );
                    results.push(GeometryRecord::new(Some(polygon), attributes));
                }
            }
        }

        let (records, warnings) = results.require_any("no buffers created")?;
        if !dissolve {
            return Ok(ToolOutput::new(records).with_warnings(warnings));
        }

        ctx.check_cancelled("buffer union")?;
        let polygons: Vec<_> = records.into_iter().filter_map(|r| r.geometry).collect();
        let merged = ctx.engine().union(&polygons)?;
        tracing::info!("[Buffer] Unioned {} buffer(s) into one polygon", polygons.len());
        Ok(ToolOutput::new(vec![GeometryRecord::with_geometry(merged)]).with_warnings(warnings))
    }

    fn assemble_schema(
        &self,
        ctx: &ToolContext,
        spec: &AnalysisOperationSpec,
        inputs: &[FeatureSet],
    ) -> CoreResult<Vec<SchemaField>> {
        let params = Self::params(spec)?;
        if Self::dissolve(ctx, params) {
            return Ok(Vec::new());
        }
        let mut fields = SchemaMerger::single(input(inputs, 0)?);
        fields.push(
            SchemaField::new(BUFFER_DISTANCE_FIELD, FieldType::Double).with_alias("Buffer Distance"),
        );
        fields.push(SchemaField::new(BUFFER_UNIT_FIELD, FieldType::String).with_alias("Buffer Unit"));
        Ok(fields)
    }
}
