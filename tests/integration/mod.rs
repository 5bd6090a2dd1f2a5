//! Integration Tests Module
//!
//! End-to-end tests for the map analysis engine: analysis scenarios, output
//! invariants and the output-layer lifecycle, all driven through
//! `AnalysisSession`.

// Shared fixtures, FlakyEngine and GatedLayer
mod common;

// Per-tool scenarios and partial-failure policies
mod scenarios_test;

// Determinism, monotonicity, cardinality and type gates
mod properties_test;

// WGS84 inputs measured geodesically
mod geographic_test;
