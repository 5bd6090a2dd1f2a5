//! Services
//!
//! Business logic for analysis runs and their output layers. The session in
//! `crate::state` wires these together for a host.

pub mod geometry;
pub mod layer_source;
pub mod map_sink;
pub mod naming;
pub mod orchestrator;
pub mod output_layers;
pub mod symbology;

pub use geometry::{GeoEngine, GeoEngineConfig};
pub use layer_source::{FeatureLayer, GraphicsLayer};
pub use map_sink::{InMemoryMapView, MapSink};
pub use naming::Namer;
pub use orchestrator::{AnalysisOrchestrator, PreparedOutput};
pub use output_layers::{OutputLayerHandle, OutputLayerRegistry};
pub use symbology::SymbologyAssigner;
