//! Analysis Orchestrator Service
//!
//! Drives one analysis run through validate, fetch, compute, assemble,
//! symbolize, name and register. Tools only decide what their own stages
//! do; everything around them lives here.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use map_analysis_core::{
    check_selection, AnalysisOperationSpec, AnalysisTool, Clock, CoreResult, FeatureSet,
    GeometryEngine, GeometryRecord, GeometryType, IdGenerator, SystemClock, ToolContext,
    ToolDefaults, ToolDescriptor, ToolRegistry, UuidIdGenerator, Warning,
};
use map_analysis_tools::{default_registry, SchemaMerger};

use crate::models::output_layer::{LayerState, OutputKind, OutputLayer};
use crate::models::run::RunResult;
use crate::services::naming::Namer;
use crate::services::output_layers::OutputLayerRegistry;
use crate::services::symbology::SymbologyAssigner;

/// Output of a run that has not been registered yet
#[derive(Debug, Clone)]
pub struct PreparedOutput {
    pub layer: OutputLayer,
    pub warnings: Vec<Warning>,
}

/// Geometry type shared by every record that has a geometry, or `None` when
/// the types are mixed or no record has one.
fn uniform_geometry_type(records: &[GeometryRecord]) -> Option<GeometryType> {
    let mut types = records
        .iter()
        .filter_map(|r| r.geometry.as_ref())
        .map(|g| g.geometry_type());
    let first = types.next()?;
    types.all(|t| t == first).then_some(first)
}

/// Layer kind and geometry type of an output.
///
/// Outputs without any geometry keep the type of their first input so a
/// table-like join result still lands as a typed layer.
fn classify(
    records: &[GeometryRecord],
    inputs: &[FeatureSet],
) -> (OutputKind, Option<GeometryType>) {
    let has_geometry = records.iter().any(|r| r.geometry.is_some());
    match uniform_geometry_type(records) {
        Some(gt) => (OutputKind::FeatureLayer, Some(gt)),
        None if has_geometry => (OutputKind::GraphicsContainer, None),
        None => match inputs.first().and_then(|set| set.geometry_type) {
            Some(gt) => (OutputKind::FeatureLayer, Some(gt)),
            None => (OutputKind::GraphicsContainer, None),
        },
    }
}

/// Runs analysis tools and turns their records into output layers
pub struct AnalysisOrchestrator {
    tools: ToolRegistry,
    engine: Arc<dyn GeometryEngine>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    namer: Namer,
    symbology: SymbologyAssigner,
    defaults: ToolDefaults,
}

impl AnalysisOrchestrator {
    /// Orchestrator with every catalog tool, the system clock and uuid ids.
    pub fn new(engine: Arc<dyn GeometryEngine>) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self {
            tools: default_registry(),
            engine,
            namer: Namer::new(clock.clone()),
            clock,
            ids: Arc::new(UuidIdGenerator),
            symbology: SymbologyAssigner::new(),
            defaults: ToolDefaults::default(),
        }
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_engine(mut self, engine: Arc<dyn GeometryEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.namer = Namer::new(clock.clone());
        self.clock = clock;
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_defaults(mut self, defaults: ToolDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn defaults(&self) -> &ToolDefaults {
        &self.defaults
    }

    /// Descriptors of every registered tool, in catalog order.
    pub fn catalog(&self) -> Vec<ToolDescriptor> {
        self.tools.catalog()
    }

    /// Resolve the tool for `spec` and check every precondition that does
    /// not need features. Nothing is fetched.
    pub fn validate(&self, spec: &AnalysisOperationSpec) -> CoreResult<Arc<dyn AnalysisTool>> {
        let tool = self.tools.require(spec.tool_id)?;
        check_selection(tool.as_ref(), spec)?;
        tool.validate(spec)?;
        Ok(tool)
    }

    /// Run every stage up to, but not including, registration.
    pub async fn execute(
        &self,
        spec: &AnalysisOperationSpec,
        cancel: CancellationToken,
    ) -> CoreResult<PreparedOutput> {
        let tool = self.validate(spec)?;
        let ctx = ToolContext::new(self.ids.next_id(), self.engine.clone())
            .with_clock(self.clock.clone())
            .with_defaults(self.defaults)
            .with_cancellation(cancel);

        tracing::info!(
            "[Orchestrator] Run {} started: {} on {} input(s)",
            ctx.run_id(),
            spec.tool_id,
            spec.inputs.len()
        );

        ctx.check_cancelled("fetch")?;
        let inputs = tool.fetch(&ctx, spec).await?;
        ctx.check_cancelled("fetch")?;
        tracing::debug!(
            "[Orchestrator] Run {} fetched {} feature(s)",
            ctx.run_id(),
            inputs.iter().map(FeatureSet::len).sum::<usize>()
        );

        let output = tool.compute(&ctx, spec, &inputs)?;
        ctx.check_cancelled("compute")?;

        let schema = SchemaMerger::finalize(tool.assemble_schema(&ctx, spec, &inputs)?);
        let records = SchemaMerger::coerce(output.features, &schema);
        let (kind, geometry_type) = classify(&records, &inputs);
        let renderer = self.symbology.assign(
            spec.tool_id,
            tool.symbology_source(),
            &spec.inputs,
            geometry_type,
        );

        let layer = OutputLayer {
            id: self.ids.next_id(),
            tool_id: spec.tool_id,
            title: self.namer.name(spec),
            kind,
            geometry_type,
            schema,
            records,
            renderer,
            state: LayerState::Created,
            created_at: self.clock.now(),
            source_titles: inputs.iter().map(|set| set.source_title.clone()).collect(),
        };

        for warning in &output.warnings {
            tracing::warn!("[Orchestrator] Run {} skipped: {}", ctx.run_id(), warning);
        }
        ctx.check_cancelled("assemble")?;

        Ok(PreparedOutput {
            layer,
            warnings: output.warnings,
        })
    }

    /// Execute `spec` and register its output.
    pub async fn run(
        &self,
        spec: &AnalysisOperationSpec,
        registry: &OutputLayerRegistry,
        cancel: CancellationToken,
    ) -> CoreResult<RunResult> {
        let prepared = self.execute(spec, cancel).await?;
        tracing::info!(
            "[Orchestrator] {} produced '{}' with {} feature(s), {} warning(s)",
            spec.tool_id,
            prepared.layer.title,
            prepared.layer.feature_count(),
            prepared.warnings.len()
        );
        let output = registry.add(spec.tool_id, prepared.layer)?;
        Ok(RunResult {
            output,
            warnings: prepared.warnings,
        })
    }
}
