//! Analysis Orchestrator Module
//!
//! Runs one analysis tool end to end and hands the output to the registry.

mod service;

pub use service::{AnalysisOrchestrator, PreparedOutput};
