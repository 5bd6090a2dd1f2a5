//! Spatial Join
//!
//! Every target feature is tested against every join feature with the
//! chosen relationship. One row per target feature: the first match's
//! attributes are copied under `JOIN_` names and `Join_Count` reports the
//! number of matches. A predicate error abandons that row's join (count 0,
//! joined fields null) and is reported as a warning.

use async_trait::async_trait;
use serde_json::Value;

use map_analysis_core::{
    AnalysisOperationSpec, CoreResult, FeatureSet, Geometry, GeometryRecord, InputArity,
    SchemaField, SpatialRelationship, ToolContext, ToolDefinition, ToolExecutable, ToolId,
    ToolOutput, ToolParameters, Warning,
};

use super::{input, wrong_parameters};
use crate::schema::{SchemaMerger, JOIN_COUNT_FIELD};

pub struct SpatialJoinTool;

/// Matches of one target feature.
struct RowMatch<'a> {
    count: usize,
    first: Option<&'a GeometryRecord>,
}

impl SpatialJoinTool {
    fn relationship(spec: &AnalysisOperationSpec) -> CoreResult<SpatialRelationship> {
        match &spec.parameters {
            ToolParameters::SpatialJoin { relationship } => Ok(*relationship),
            other => Err(wrong_parameters(ToolId::SpatialJoin, other)),
        }
    }

    fn match_row<'a>(
        ctx: &ToolContext,
        target: &Geometry,
        candidates: &[(&'a GeometryRecord, &'a Geometry)],
        relationship: SpatialRelationship,
    ) -> CoreResult<RowMatch<'a>> {
        let mut row = RowMatch {
            count: 0,
            first: None,
        };
        for (record, geometry) in candidates {
            if ctx.engine().relate(target, geometry, relationship)? {
                row.count += 1;
                row.first.get_or_insert(*record);
            }
        }
        Ok(row)
    }
}

impl ToolDefinition for SpatialJoinTool {
    fn id(&self) -> ToolId {
        ToolId::SpatialJoin
    }

    fn display_name(&self) -> &str {
        "Spatial Join"
    }

    fn description(&self) -> &str {
        "Attach attributes of spatially related features"
    }

    fn input_arity(&self) -> InputArity {
        InputArity::Pair
    }
}

#[async_trait]
impl ToolExecutable for SpatialJoinTool {
    fn validate(&self, spec: &AnalysisOperationSpec) -> CoreResult<()> {
        Self::relationship(spec).map(|_| ())
    }

    fn compute(
        &self,
        ctx: &ToolContext,
        spec: &AnalysisOperationSpec,
        inputs: &[FeatureSet],
    ) -> CoreResult<ToolOutput> {
        let relationship = Self::relationship(spec)?;
        let target = input(inputs, 0)?;
        let join = input(inputs, 1)?;
        let columns = SchemaMerger::join_columns(target, join);
        let candidates: Vec<_> = join.records_with_geometry().collect();

        let mut warnings = Vec::new();
        let mut records = Vec::with_capacity(target.len());
        for (i, record) in target.records.iter().enumerate() {
            ctx.check_cancelled("spatial join")?;
            let row = match &record.geometry {
                Some(geometry) => {
                    match Self::match_row(ctx, geometry, &candidates, relationship) {
                        Ok(row) => row,
                        Err(err) => {
                            tracing::warn!(
                                "[SpatialJoin] {} failed for target {}: {}",
                                relationship,
                                i,
                                err
                            );
                            warnings.push(
                                Warning::new("spatial join", err.to_string()).with_item(i),
                            );
                            RowMatch {
                                count: 0,
                                first: None,
                            }
                        }
                    }
                }
                None => RowMatch {
                    count: 0,
                    first: None,
                },
            };

            let mut attributes = SchemaMerger::join_attributes(record, row.first, &columns);
            attributes.insert(JOIN_COUNT_FIELD.to_string(), Value::from(row.count as u64));
            records.push(GeometryRecord::new(record.geometry.clone(), attributes));
        }

        tracing::info!(
            "[SpatialJoin] Joined '{}' to {} '{}' feature(s) by {}",
            join.source_title,
            records.len(),
            target.source_title,
            relationship
        );
        Ok(ToolOutput::new(records).with_warnings(warnings))
    }

    fn assemble_schema(
        &self,
        _ctx: &ToolContext,
        _spec: &AnalysisOperationSpec,
        inputs: &[FeatureSet],
    ) -> CoreResult<Vec<SchemaField>> {
        Ok(SchemaMerger::join(input(inputs, 0)?, input(inputs, 1)?, true))
    }
}
