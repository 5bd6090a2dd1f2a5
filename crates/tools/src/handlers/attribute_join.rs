//! Attribute Join
//!
//! Joins a layer or table to target features by key equality. The join
//! side is indexed once; each target row copies the first join record with
//! an equal key. Unmatched rows keep null joined fields.

use std::collections::HashMap;

use async_trait::async_trait;
use futures_util::future::try_join;
use serde_json::Value;

use map_analysis_core::{
    fetch_non_empty, AnalysisOperationSpec, AttributeJoinParams, CoreError, CoreResult,
    FeatureSet, GeometryRecord, InputArity, SchemaField, ToolContext, ToolDefinition,
    ToolExecutable, ToolId, ToolOutput, ToolParameters,
};

use super::{input, require_field, wrong_parameters};
use crate::schema::SchemaMerger;

pub struct AttributeJoinTool;

impl AttributeJoinTool {
    fn params(spec: &AnalysisOperationSpec) -> CoreResult<&AttributeJoinParams> {
        match &spec.parameters {
            ToolParameters::AttributeJoin(params) => Ok(params),
            other => Err(wrong_parameters(ToolId::AttributeJoin, other)),
        }
    }

    /// Index join records by key; the first record wins for duplicate keys.
    fn index<'a>(join: &'a FeatureSet, field: &str) -> HashMap<String, &'a GeometryRecord> {
        let mut index = HashMap::new();
        for record in &join.records {
            if let Some(key) = record.get(field).and_then(join_key) {
                index.entry(key).or_insert(record);
            }
        }
        index
    }
}

/// Comparable key for a join value. Null never matches; integers and
/// floats with the same numeric value match each other.
fn join_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(format!("s:{}", s)),
        Value::Number(n) => n.as_f64().map(|f| format!("n:{}", f)),
        Value::Bool(b) => Some(format!("b:{}", b)),
        other => Some(format!("j:{}", other)),
    }
}

impl ToolDefinition for AttributeJoinTool {
    fn id(&self) -> ToolId {
        ToolId::AttributeJoin
    }

    fn display_name(&self) -> &str {
        "Attribute Join"
    }

    fn description(&self) -> &str {
        "Attach attributes from another layer or table by matching key fields"
    }

    fn input_arity(&self) -> InputArity {
        InputArity::Pair
    }
}

#[async_trait]
impl ToolExecutable for AttributeJoinTool {
    fn validate(&self, spec: &AnalysisOperationSpec) -> CoreResult<()> {
        let params = Self::params(spec)?;
        require_field(spec, 0, &params.target_field, "target")?;
        require_field(spec, 1, &params.join_field, "join")
    }

    /// The join side may be a table without geometry, so only the target
    /// must contain features with geometry.
    async fn fetch(
        &self,
        _ctx: &ToolContext,
        spec: &AnalysisOperationSpec,
    ) -> CoreResult<Vec<FeatureSet>> {
        let (target, join) = match spec.inputs.as_slice() {
            [target, join] => (target, join),
            _ => return Err(CoreError::validation("attribute join requires two layers")),
        };
        let (target, join) = try_join(fetch_non_empty(target.as_ref()), join.query_all()).await?;
        Ok(vec![target, join])
    }

    fn compute(
        &self,
        ctx: &ToolContext,
        spec: &AnalysisOperationSpec,
        inputs: &[FeatureSet],
    ) -> CoreResult<ToolOutput> {
        let params = Self::params(spec)?;
        let target = input(inputs, 0)?;
        let join = input(inputs, 1)?;
        let columns = SchemaMerger::join_columns(target, join);
        let index = Self::index(join, &params.join_field);

        let mut matched = 0usize;
        let mut records = Vec::with_capacity(target.len());
        for record in &target.records {
            ctx.check_cancelled("attribute join")?;
            let hit = record
                .get(&params.target_field)
                .and_then(join_key)
                .and_then(|key| index.get(&key).copied());
            if hit.is_some() {
                matched += 1;
            }
            let attributes = SchemaMerger::join_attributes(record, hit, &columns);
            records.push(GeometryRecord::new(record.geometry.clone(), attributes));
        }

        tracing::info!(
            "[AttributeJoin] {}/{} target rows matched '{}' on {} = {}",
            matched,
            records.len(),
            join.source_title,
            params.target_field,
            params.join_field
        );
        Ok(ToolOutput::new(records))
    }

    fn assemble_schema(
        &self,
        _ctx: &ToolContext,
        _spec: &AnalysisOperationSpec,
        inputs: &[FeatureSet],
    ) -> CoreResult<Vec<SchemaField>> {
        Ok(SchemaMerger::join(input(inputs, 0)?, input(inputs, 1)?, false))
    }
}
