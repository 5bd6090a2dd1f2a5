//! Dissolve
//!
//! Unions all input geometries into one, or one per distinct value of a
//! dissolve field. Any engine failure aborts the run.

use async_trait::async_trait;
use serde_json::Value;

use map_analysis_core::{
    AnalysisOperationSpec, CoreResult, DissolveParams, FeatureSet, Geometry, GeometryRecord,
    InputArity, SchemaField, ToolContext, ToolDefinition, ToolExecutable, ToolId, ToolOutput,
    ToolParameters,
};

use super::{input, owned_geometries, require_field, wrong_parameters};

pub struct DissolveTool;

impl DissolveTool {
    fn params(spec: &AnalysisOperationSpec) -> CoreResult<&DissolveParams> {
        match &spec.parameters {
            ToolParameters::Dissolve(params) => Ok(params),
            other => Err(wrong_parameters(ToolId::Dissolve, other)),
        }
    }

    fn dissolve_field(params: &DissolveParams) -> Option<&str> {
        params
            .dissolve_field
            .as_deref()
            .filter(|f| !f.trim().is_empty())
    }

    /// Geometries grouped by field value, groups in order of first appearance.
    fn groups(source: &FeatureSet, field: &str) -> Vec<(Value, Vec<Geometry>)> {
        let mut groups: Vec<(Value, Vec<Geometry>)> = Vec::new();
        for (record, geometry) in source.records_with_geometry() {
            let value = record.get(field).cloned().unwrap_or(Value::Null);
            match groups.iter_mut().find(|(v, _)| *v == value) {
                Some((_, members)) => members.push(geometry.clone()),
                None => groups.push((value, vec![geometry.clone()])),
            }
        }
        groups
    }
}

impl ToolDefinition for DissolveTool {
    fn id(&self) -> ToolId {
        ToolId::Dissolve
    }

    fn display_name(&self) -> &str {
        "Dissolve"
    }

    fn description(&self) -> &str {
        "Merge features into one geometry, optionally per attribute value"
    }

    fn input_arity(&self) -> InputArity {
        InputArity::Single
    }
}

#[async_trait]
impl ToolExecutable for DissolveTool {
    fn validate(&self, spec: &AnalysisOperationSpec) -> CoreResult<()> {
        let params = Self::params(spec)?;
        match Self::dissolve_field(params) {
            Some(field) => require_field(spec, 0, field, "dissolve"),
            None => Ok(()),
        }
    }

    fn compute(
        &self,
        ctx: &ToolContext,
        spec: &AnalysisOperationSpec,
        inputs: &[FeatureSet],
    ) -> CoreResult<ToolOutput> {
        let params = Self::params(spec)?;
        let source = input(inputs, 0)?;

        let field = match Self::dissolve_field(params) {
            Some(field) => field,
            None => {
                let geometries = owned_geometries(source);
                ctx.check_cancelled("dissolve")?;
                let merged = ctx.engine().union(&geometries)?;
                tracing::info!("[Dissolve] Unioned {} geometries", geometries.len());
                return Ok(ToolOutput::new(vec![GeometryRecord::with_geometry(merged)]));
            }
        };

        let mut records = Vec::new();
        for (value, geometries) in Self::groups(source, field) {
            ctx.check_cancelled("dissolve")?;
            let merged = ctx.engine().union(&geometries)?;
            records.push(GeometryRecord::with_geometry(merged).attr(field, value));
        }
        tracing::info!(
            "[Dissolve] Unioned {} features into {} group(s) by '{}'",
            source.len(),
            records.len(),
            field
        );
        Ok(ToolOutput::new(records))
    }

    fn assemble_schema(
        &self,
        _ctx: &ToolContext,
        spec: &AnalysisOperationSpec,
        inputs: &[FeatureSet],
    ) -> CoreResult<Vec<SchemaField>> {
        let params = Self::params(spec)?;
        let source = input(inputs, 0)?;
        Ok(Self::dissolve_field(params)
            .and_then(|name| source.field(name).cloned())
            .map(|f| vec![f.with_source_tag(source.source_title.clone())])
            .unwrap_or_default())
    }
}
