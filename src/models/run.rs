//! Run Models

use map_analysis_core::Warning;

use crate::services::output_layers::OutputLayerHandle;

/// Outcome of a successful analysis run.
///
/// Items skipped under a tool's partial-failure policy are reported in
/// `warnings`; the output was still registered.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub output: OutputLayerHandle,
    pub warnings: Vec<Warning>,
}

impl RunResult {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
