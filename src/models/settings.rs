//! Settings Models
//!
//! Analysis configuration and partial settings updates.

use map_analysis_core::{LinearUnit, ToolDefaults};
use serde::{Deserialize, Serialize};

/// Analysis configuration stored in config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Unit offered for new buffer requests
    pub default_buffer_unit: LinearUnit,
    /// Union buffers into one polygon when a request leaves it unset
    pub buffer_dissolve: bool,
    /// Vertices per full circle when building buffers
    pub circle_segments: u32,
    /// Width of the gap a cutter leaves between pieces, in map units
    pub cut_tolerance: f64,
    /// Simplify tolerance used when a request leaves it unset, in map units
    pub simplify_tolerance: f64,
    /// Densify segment length used when a request leaves it unset
    #[serde(default = "default_densify_segment_length")]
    pub densify_segment_length: f64,
}

fn default_densify_segment_length() -> f64 {
    100.0
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_buffer_unit: LinearUnit::Meters,
            buffer_dissolve: true,
            circle_segments: 64,
            cut_tolerance: 1e-6,
            simplify_tolerance: 1.0,
            densify_segment_length: default_densify_segment_length(),
        }
    }
}

/// Settings update request (partial update)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SettingsUpdate {
    pub default_buffer_unit: Option<LinearUnit>,
    pub buffer_dissolve: Option<bool>,
    pub circle_segments: Option<u32>,
    pub cut_tolerance: Option<f64>,
    pub simplify_tolerance: Option<f64>,
    pub densify_segment_length: Option<f64>,
}

impl AnalysisConfig {
    /// Apply a partial update to the configuration
    pub fn apply_update(&mut self, update: SettingsUpdate) {
        if let Some(unit) = update.default_buffer_unit {
            self.default_buffer_unit = unit;
        }
        if let Some(dissolve) = update.buffer_dissolve {
            self.buffer_dissolve = dissolve;
        }
        if let Some(segments) = update.circle_segments {
            self.circle_segments = segments;
        }
        if let Some(tolerance) = update.cut_tolerance {
            self.cut_tolerance = tolerance;
        }
        if let Some(tolerance) = update.simplify_tolerance {
            self.simplify_tolerance = tolerance;
        }
        if let Some(length) = update.densify_segment_length {
            self.densify_segment_length = length;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.circle_segments < 8 || self.circle_segments > 1024 {
            return Err(format!(
                "Invalid circle_segments: {}. Must be between 8 and 1024",
                self.circle_segments
            ));
        }

        if !self.cut_tolerance.is_finite() || self.cut_tolerance <= 0.0 {
            return Err("cut_tolerance must be greater than 0".to_string());
        }

        if !self.simplify_tolerance.is_finite() || self.simplify_tolerance < 0.0 {
            return Err("simplify_tolerance cannot be negative".to_string());
        }

        if !self.densify_segment_length.is_finite() || self.densify_segment_length <= 0.0 {
            return Err("densify_segment_length must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Fallbacks handed to tools for unset optional parameters
    pub fn tool_defaults(&self) -> ToolDefaults {
        ToolDefaults {
            buffer_dissolve: self.buffer_dissolve,
            simplify_tolerance: self.simplify_tolerance,
            densify_segment_length: self.densify_segment_length,
        }
    }
}
