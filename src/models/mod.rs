//! Data Models
//!
//! Contains the data structures owned by the application layer.

pub mod output_layer;
pub mod run;
pub mod settings;

pub use output_layer::*;
pub use run::*;
pub use settings::*;
