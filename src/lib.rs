//! Map Analysis - Rust Backend Library
//!
//! Spatial analysis orchestration and output-layer lifecycle for map hosts.
//! It includes:
//! - The analysis session (single-flight runs, output lifecycle, map sink)
//! - Business logic services (orchestrator, naming, symbology, registry,
//!   the geo-backed geometry engine, in-memory layer sources)
//! - Storage layer (JSON configuration)
//! - Data models and utilities
//!
//! Tool handlers live in `map-analysis-tools`; shared types and traits in
//! `map-analysis-core`.

pub mod models;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

pub use models::output_layer::{LayerState, OutputKind, OutputLayer};
pub use models::run::RunResult;
pub use models::settings::{AnalysisConfig, SettingsUpdate};
pub use services::{
    AnalysisOrchestrator, FeatureLayer, GeoEngine, GeoEngineConfig, GraphicsLayer,
    InMemoryMapView, MapSink, OutputLayerHandle, OutputLayerRegistry,
};
pub use state::AnalysisSession;
pub use storage::ConfigService;
pub use utils::error::{AppError, AppResult};
