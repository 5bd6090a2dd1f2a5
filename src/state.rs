//! Analysis Session
//!
//! Owns the orchestrator, the output registry and the map sink for one
//! host. Nothing here is global; a host creates a session and passes it to
//! whatever needs it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use geo::BoundingRect;
use geo_types::{coord, Rect};
use tokio_util::sync::CancellationToken;

use map_analysis_core::{
    AnalysisOperationSpec, BufferParams, Clock, CoreError, Geometry, GeometryEngine,
    IdGenerator, Shape, ToolDescriptor, ToolId,
};

use crate::models::output_layer::LayerState;
use crate::models::run::RunResult;
use crate::models::settings::AnalysisConfig;
use crate::services::geometry::{GeoEngine, GeoEngineConfig};
use crate::services::map_sink::MapSink;
use crate::services::orchestrator::AnalysisOrchestrator;
use crate::services::output_layers::{read_layer, OutputLayerHandle, OutputLayerRegistry};
use crate::storage::ConfigService;
use crate::utils::error::{AppError, AppResult};

/// `(tool, sorted input ids)` of a run that is executing
type RunKey = (ToolId, Vec<String>);

fn run_key(spec: &AnalysisOperationSpec) -> RunKey {
    let mut ids = spec.input_ids();
    ids.sort();
    (spec.tool_id, ids)
}

/// Releases a single-flight slot when the run finishes, however it ends.
struct InFlightGuard {
    running: Arc<Mutex<HashSet<RunKey>>>,
    key: RunKey,
}

impl InFlightGuard {
    fn acquire(running: &Arc<Mutex<HashSet<RunKey>>>, key: RunKey) -> AppResult<Self> {
        let mut set = running
            .lock()
            .map_err(|e| CoreError::internal(format!("run table lock poisoned: {}", e)))?;
        if !set.insert(key.clone()) {
            return Err(CoreError::run_in_progress(format!(
                "{} is already running on the same input layers",
                key.0
            ))
            .into());
        }
        Ok(Self {
            running: running.clone(),
            key,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut set) = self.running.lock() {
            set.remove(&self.key);
        }
    }
}

/// Bounding extent of every geometry on a layer.
fn layer_extent(handle: &OutputLayerHandle) -> AppResult<Geometry> {
    let layer = read_layer(handle)?;
    if layer.state.is_deleted() {
        return Err(CoreError::invalid_state(format!(
            "cannot zoom to deleted layer '{}'",
            layer.title
        ))
        .into());
    }

    let mut extent: Option<(Rect<f64>, _)> = None;
    for geometry in layer.records.iter().filter_map(|r| r.geometry.as_ref()) {
        let Some(rect) = geometry.to_geo().bounding_rect() else {
            continue;
        };
        extent = Some(match extent {
            None => (rect, geometry.spatial_reference),
            Some((acc, sr)) => {
                let (lo, hi) = (acc.min(), acc.max());
                let min = coord! { x: lo.x.min(rect.min().x), y: lo.y.min(rect.min().y) };
                let max = coord! { x: hi.x.max(rect.max().x), y: hi.y.max(rect.max().y) };
                (Rect::new(min, max), sr)
            }
        });
    }

    extent
        .map(|(rect, sr)| Geometry::new(Shape::Extent(rect), sr))
        .ok_or_else(|| {
            CoreError::operation(format!("layer '{}' has no geometry to zoom to", layer.title))
                .into()
        })
}

/// One host's analysis session
pub struct AnalysisSession {
    orchestrator: AnalysisOrchestrator,
    registry: OutputLayerRegistry,
    sink: Arc<dyn MapSink>,
    config: AnalysisConfig,
    running: Arc<Mutex<HashSet<RunKey>>>,
}

impl AnalysisSession {
    /// Session with the default configuration
    pub fn new(sink: Arc<dyn MapSink>) -> Self {
        Self::build(AnalysisConfig::default(), sink)
    }

    /// Session configured from `config`; invalid settings are rejected
    pub fn from_config(config: AnalysisConfig, sink: Arc<dyn MapSink>) -> AppResult<Self> {
        config.validate().map_err(AppError::config)?;
        Ok(Self::build(config, sink))
    }

    /// Session configured from the persisted settings
    pub fn from_config_service(
        service: &ConfigService,
        sink: Arc<dyn MapSink>,
    ) -> AppResult<Self> {
        Self::from_config(service.get_config_clone(), sink)
    }

    fn build(config: AnalysisConfig, sink: Arc<dyn MapSink>) -> Self {
        let engine = GeoEngine::new(GeoEngineConfig {
            circle_segments: config.circle_segments,
            cut_tolerance: config.cut_tolerance,
        });
        let orchestrator =
            AnalysisOrchestrator::new(Arc::new(engine)).with_defaults(config.tool_defaults());
        tracing::info!(
            "[Session] Created with {} tool(s), {} circle segments",
            orchestrator.catalog().len(),
            config.circle_segments
        );
        Self {
            orchestrator,
            registry: OutputLayerRegistry::new(),
            sink,
            config,
            running: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Replace the geometry engine, e.g. with a host-native one
    pub fn with_engine(mut self, engine: Arc<dyn GeometryEngine>) -> Self {
        self.orchestrator = self.orchestrator.with_engine(engine);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.orchestrator = self.orchestrator.with_clock(clock);
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.orchestrator = self.orchestrator.with_id_generator(ids);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn registry(&self) -> &OutputLayerRegistry {
        &self.registry
    }

    /// Buffer parameters in the configured default unit
    pub fn buffer_params(&self, distances: Vec<f64>) -> BufferParams {
        BufferParams {
            distances,
            unit: self.config.default_buffer_unit,
            dissolve: None,
        }
    }

    /// Every tool the session can run, in catalog order
    pub fn catalog(&self) -> Vec<ToolDescriptor> {
        self.orchestrator.catalog()
    }

    // ========================================================================
    // Runs
    // ========================================================================

    /// Run an analysis and register its output.
    pub async fn run(&self, spec: AnalysisOperationSpec) -> AppResult<RunResult> {
        self.run_with_cancellation(spec, CancellationToken::new()).await
    }

    /// Run an analysis that stops with `Cancelled` once `token` fires.
    /// A second run of the same tool on the same inputs is rejected with
    /// `RunInProgress` until the first one finishes.
    pub async fn run_with_cancellation(
        &self,
        spec: AnalysisOperationSpec,
        token: CancellationToken,
    ) -> AppResult<RunResult> {
        let _guard = InFlightGuard::acquire(&self.running, run_key(&spec))?;
        let result = self.orchestrator.run(&spec, &self.registry, token).await;
        if let Err(ref err) = result {
            tracing::warn!("[Session] {} run failed ({}): {}", spec.tool_id, err.kind(), err);
        }
        Ok(result?)
    }

    // ========================================================================
    // Output Layers
    // ========================================================================

    /// Outputs of one tool, oldest first
    pub fn list(&self, tool: ToolId) -> Vec<OutputLayerHandle> {
        self.registry.list(tool)
    }

    pub fn get(&self, layer_id: &str) -> Option<OutputLayerHandle> {
        self.registry.get(layer_id)
    }

    pub fn rename(&self, handle: &OutputLayerHandle, title: &str) -> AppResult<()> {
        Ok(self.registry.rename(handle, title)?)
    }

    pub fn toggle_visibility(&self, handle: &OutputLayerHandle) -> AppResult<LayerState> {
        Ok(self.registry.toggle_visibility(handle)?)
    }

    /// Drop an output from the registry without touching the map.
    pub fn remove(&self, tool: ToolId, layer_id: &str) -> AppResult<OutputLayerHandle> {
        Ok(self.registry.remove(tool, layer_id)?)
    }

    /// Draw an output on the map.
    pub async fn mount(&self, handle: &OutputLayerHandle) -> AppResult<()> {
        let layer = read_layer(handle)?.clone();
        if layer.state.is_deleted() {
            return Err(CoreError::invalid_state(format!(
                "cannot mount deleted layer '{}'",
                layer.title
            ))
            .into());
        }
        self.sink.add(&layer).await?;
        Ok(())
    }

    /// Remove an output from the registry and the map.
    ///
    /// The registry entry goes first. A map view that is already gone has
    /// nothing left to unmount, so that case still succeeds.
    pub async fn delete_output(&self, handle: &OutputLayerHandle) -> AppResult<()> {
        let (tool, layer_id) = {
            let layer = read_layer(handle)?;
            (layer.tool_id, layer.id.clone())
        };
        self.registry.remove(tool, &layer_id)?;
        match self.sink.remove(&layer_id).await {
            Ok(()) => Ok(()),
            Err(CoreError::SourceUnavailable(reason)) => {
                tracing::warn!("[Session] Deleted {} without unmounting: {}", layer_id, reason);
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Navigate the map to the extent of an output's features.
    pub async fn zoom_to(&self, handle: &OutputLayerHandle) -> AppResult<Geometry> {
        let extent = layer_extent(handle)?;
        self.sink.go_to(&extent).await?;
        Ok(extent)
    }
}
