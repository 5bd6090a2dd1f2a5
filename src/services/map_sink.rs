//! Map Sink
//!
//! Where output layers are drawn. The engine only adds, removes and zooms;
//! rendering belongs to the host.

use std::sync::RwLock;

use async_trait::async_trait;

use map_analysis_core::{CoreError, CoreResult, Geometry};

use crate::models::output_layer::OutputLayer;

#[async_trait]
pub trait MapSink: Send + Sync {
    /// Mount a layer on the active view.
    async fn add(&self, layer: &OutputLayer) -> CoreResult<()>;

    /// Unmount a layer. Removing a layer that is not mounted is a no-op.
    async fn remove(&self, layer_id: &str) -> CoreResult<()>;

    /// Navigate the view to an extent.
    async fn go_to(&self, extent: &Geometry) -> CoreResult<()>;
}

#[derive(Debug, Default)]
struct ViewState {
    closed: bool,
    layers: Vec<String>,
    extent: Option<Geometry>,
}

/// Map view that records what it was asked to show
#[derive(Debug, Default)]
pub struct InMemoryMapView {
    state: RwLock<ViewState>,
}

impl InMemoryMapView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tear the view down; later calls fail with `SourceUnavailable`.
    pub fn close(&self) {
        if let Ok(mut state) = self.state.write() {
            state.closed = true;
        }
    }

    /// Ids of mounted layers, in mount order
    pub fn layer_ids(&self) -> Vec<String> {
        self.state
            .read()
            .map(|s| s.layers.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, layer_id: &str) -> bool {
        self.layer_ids().iter().any(|id| id == layer_id)
    }

    /// Extent of the last `go_to`
    pub fn extent(&self) -> Option<Geometry> {
        self.state.read().ok().and_then(|s| s.extent.clone())
    }

    fn with_open_view<T>(&self, f: impl FnOnce(&mut ViewState) -> T) -> CoreResult<T> {
        let mut state = self
            .state
            .write()
            .map_err(|e| CoreError::internal(format!("map view lock poisoned: {}", e)))?;
        if state.closed {
            return Err(CoreError::source_unavailable("no active map view"));
        }
        Ok(f(&mut state))
    }
}

#[async_trait]
impl MapSink for InMemoryMapView {
    async fn add(&self, layer: &OutputLayer) -> CoreResult<()> {
        self.with_open_view(|state| {
            if !state.layers.contains(&layer.id) {
                state.layers.push(layer.id.clone());
            }
        })
    }

    async fn remove(&self, layer_id: &str) -> CoreResult<()> {
        self.with_open_view(|state| state.layers.retain(|id| id != layer_id))
    }

    async fn go_to(&self, extent: &Geometry) -> CoreResult<()> {
        self.with_open_view(|state| state.extent = Some(extent.clone()))
    }
}
