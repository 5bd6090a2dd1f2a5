//! Storage Layer
//!
//! Handles persistence of the JSON analysis configuration. Analysis
//! outputs are session-scoped and never written to disk.

pub mod config;

pub use config::*;
