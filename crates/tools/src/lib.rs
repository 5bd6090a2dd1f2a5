//! Map Analysis Tools
//!
//! Schema merging, per-item failure policy and the nine analysis tool
//! handlers:
//! - `SchemaMerger` - output schemas and record coercion
//! - `ItemResults` - skip-and-continue collection of per-item engine calls
//! - `handlers` - buffer, dissolve, convex hull, overlay, clip/cut, merge,
//!   spatial join, attribute join, geometry modify
//!
//! `default_registry()` registers every handler in catalog order.

use std::sync::Arc;

use map_analysis_core::ToolRegistry;

pub mod executor;
pub mod handlers;
pub mod schema;

#[cfg(test)]
pub(crate) mod testing;

// Re-export handlers and schema merging
pub use executor::ItemResults;
pub use handlers::{
    AttributeJoinTool, BufferTool, ClipTool, ConvexHullTool, DissolveTool, MergeTool,
    ModifyGeometryTool, OverlayTool, SpatialJoinTool,
};
pub use schema::{JoinColumn, SchemaMerger, JOIN_ALIAS_PREFIX, JOIN_COUNT_FIELD, JOIN_PREFIX};

/// Registry with every catalog tool.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(BufferTool));
    registry.register(Arc::new(DissolveTool));
    registry.register(Arc::new(ConvexHullTool));
    registry.register(Arc::new(OverlayTool));
    registry.register(Arc::new(ClipTool));
    registry.register(Arc::new(MergeTool));
    registry.register(Arc::new(SpatialJoinTool));
    registry.register(Arc::new(AttributeJoinTool));
    registry.register(Arc::new(ModifyGeometryTool));
    registry
}
