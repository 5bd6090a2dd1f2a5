//! Output Layer Registry
//!
//! Tracks the outputs of every tool, newest last. Handles are shared: a
//! rename or toggle through one handle is seen by every holder, including
//! the registry. The registry never talks to the map sink; callers pair a
//! removal with unmounting the layer.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use map_analysis_core::{CoreError, CoreResult, ToolId};

use crate::models::output_layer::{LayerState, OutputLayer};

/// Shared reference to a registered output layer
pub type OutputLayerHandle = Arc<RwLock<OutputLayer>>;

fn lock_err(err: impl std::fmt::Display) -> CoreError {
    CoreError::internal(format!("output layer lock poisoned: {}", err))
}

/// Read access to a layer behind its handle.
pub fn read_layer(handle: &OutputLayerHandle) -> CoreResult<RwLockReadGuard<'_, OutputLayer>> {
    handle.read().map_err(lock_err)
}

fn write_layer(handle: &OutputLayerHandle) -> CoreResult<RwLockWriteGuard<'_, OutputLayer>> {
    handle.write().map_err(lock_err)
}

/// Copy of the layer's current state.
pub fn snapshot(handle: &OutputLayerHandle) -> CoreResult<OutputLayer> {
    Ok(read_layer(handle)?.clone())
}

fn ensure_live(layer: &OutputLayer, action: &str) -> CoreResult<()> {
    if layer.state.is_deleted() {
        return Err(CoreError::invalid_state(format!(
            "cannot {} deleted layer '{}'",
            action, layer.title
        )));
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct OutputLayerRegistry {
    layers: RwLock<HashMap<ToolId, Vec<OutputLayerHandle>>>,
}

impl OutputLayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer to the tool's list and return its handle.
    pub fn add(&self, tool: ToolId, layer: OutputLayer) -> CoreResult<OutputLayerHandle> {
        tracing::info!(
            "[OutputLayers] Added '{}' ({}) to {} with {} feature(s)",
            layer.title,
            layer.id,
            tool,
            layer.feature_count()
        );
        let handle = Arc::new(RwLock::new(layer));
        self.layers
            .write()
            .map_err(lock_err)?
            .entry(tool)
            .or_default()
            .push(handle.clone());
        Ok(handle)
    }

    /// Drop a layer from the tool's list and mark it deleted.
    pub fn remove(&self, tool: ToolId, layer_id: &str) -> CoreResult<OutputLayerHandle> {
        let handle = {
            let mut layers = self.layers.write().map_err(lock_err)?;
            let list = layers.get_mut(&tool).ok_or_else(|| {
                CoreError::not_found(format!("no {} output with id {}", tool, layer_id))
            })?;
            let mut position = None;
            for (index, handle) in list.iter().enumerate() {
                if read_layer(handle)?.id == layer_id {
                    position = Some(index);
                    break;
                }
            }
            let index = position.ok_or_else(|| {
                CoreError::not_found(format!("no {} output with id {}", tool, layer_id))
            })?;
            list.remove(index)
        };

        let mut layer = write_layer(&handle)?;
        layer.state = LayerState::Deleted;
        tracing::info!("[OutputLayers] Removed '{}' from {}", layer.title, tool);
        drop(layer);
        Ok(handle)
    }

    /// Outputs of one tool, oldest first.
    pub fn list(&self, tool: ToolId) -> Vec<OutputLayerHandle> {
        self.layers
            .read()
            .ok()
            .and_then(|layers| layers.get(&tool).cloned())
            .unwrap_or_default()
    }

    /// Every registered output, grouped by tool in catalog order.
    pub fn all(&self) -> Vec<OutputLayerHandle> {
        ToolId::ALL.iter().flat_map(|tool| self.list(*tool)).collect()
    }

    /// Find a registered output by id.
    pub fn get(&self, layer_id: &str) -> Option<OutputLayerHandle> {
        self.all().into_iter().find(|handle| {
            read_layer(handle)
                .map(|layer| layer.id == layer_id)
                .unwrap_or(false)
        })
    }

    pub fn len(&self) -> usize {
        self.layers
            .read()
            .map(|layers| layers.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Change a layer's title. Allowed in any state but `Deleted`.
    pub fn rename(&self, handle: &OutputLayerHandle, title: &str) -> CoreResult<()> {
        let title = title.trim();
        if title.is_empty() {
            return Err(CoreError::validation("layer title must not be blank"));
        }
        let mut layer = write_layer(handle)?;
        ensure_live(&layer, "rename")?;
        tracing::debug!("[OutputLayers] Renamed '{}' to '{}'", layer.title, title);
        layer.title = title.to_string();
        Ok(())
    }

    /// Flip visibility and return the new state.
    pub fn toggle_visibility(&self, handle: &OutputLayerHandle) -> CoreResult<LayerState> {
        let mut layer = write_layer(handle)?;
        ensure_live(&layer, "toggle")?;
        let next = layer
            .state
            .toggled()
            .ok_or_else(|| CoreError::invalid_state("layer is deleted"))?;
        layer.state = next;
        Ok(next)
    }
}
