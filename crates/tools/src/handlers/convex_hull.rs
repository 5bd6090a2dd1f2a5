//! Convex Hull
//!
//! One engine call over all geometries. Merged: a single polygon with no
//! attributes. Otherwise: one hull per input feature, carrying that
//! feature's non-system attributes.

use async_trait::async_trait;

use map_analysis_core::{
    AnalysisOperationSpec, CoreError, CoreResult, FeatureSet, GeometryRecord, InputArity,
    SchemaField, SymbologySource, ToolContext, ToolDefinition, ToolExecutable, ToolId, ToolOutput,
    ToolParameters,
};

use super::{input, owned_geometries, wrong_parameters};
use crate::schema::{carry_attributes, SchemaMerger};

pub struct ConvexHullTool;

impl ConvexHullTool {
    fn merge(spec: &AnalysisOperationSpec) -> CoreResult<bool> {
        match &spec.parameters {
            ToolParameters::ConvexHull { merge } => Ok(*merge),
            other => Err(wrong_parameters(ToolId::ConvexHull, other)),
        }
    }
}

impl ToolDefinition for ConvexHullTool {
    fn id(&self) -> ToolId {
        ToolId::ConvexHull
    }

    fn display_name(&self) -> &str {
        "Convex Hull"
    }

    fn description(&self) -> &str {
        "Smallest convex polygon enclosing the input features"
    }

    fn input_arity(&self) -> InputArity {
        InputArity::Single
    }

    fn symbology_source(&self) -> SymbologySource {
        SymbologySource::ToolDefault
    }
}

#[async_trait]
impl ToolExecutable for ConvexHullTool {
    fn validate(&self, spec: &AnalysisOperationSpec) -> CoreResult<()> {
        Self::merge(spec).map(|_| ())
    }

    fn compute(
        &self,
        ctx: &ToolContext,
        spec: &AnalysisOperationSpec,
        inputs: &[FeatureSet],
    ) -> CoreResult<ToolOutput> {
        let merge = Self::merge(spec)?;
        let source = input(inputs, 0)?;
        let geometries = owned_geometries(source);

        ctx.check_cancelled("convex hull")?;
        let hulls = ctx.engine().convex_hull(&geometries, merge)?;

        if merge {
            let hull = hulls
                .into_iter()
                .next()
                .ok_or_else(|| CoreError::operation("no convex hull produced"))?;
            return Ok(ToolOutput::new(vec![GeometryRecord::with_geometry(hull)]));
        }

        if hulls.len() != geometries.len() {
            return Err(CoreError::geometry(format!(
                "expected {} hulls, engine returned {}",
                geometries.len(),
                hulls.len()
            )));
        }
        let fields = SchemaMerger::single(source);
        let records = source
            .records_with_geometry()
            .zip(hulls)
            .map(|((record, _), hull)| {
                GeometryRecord::new(Some(hull), carry_attributes(record, &fields))
            })
            .collect();
        Ok(ToolOutput::new(records))
    }

    fn assemble_schema(
        &self,
        _ctx: &ToolContext,
        spec: &AnalysisOperationSpec,
        inputs: &[FeatureSet],
    ) -> CoreResult<Vec<SchemaField>> {
        if Self::merge(spec)? {
            Ok(Vec::new())
        } else {
            Ok(SchemaMerger::single(input(inputs, 0)?))
        }
    }
}
