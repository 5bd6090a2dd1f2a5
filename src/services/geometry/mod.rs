//! Reference Geometry Engine
//!
//! `geo`-backed implementation of the `GeometryEngine` capability, with the
//! buffer, offset and densify constructions it needs.

mod buffer;
mod densify;
mod engine;
pub mod projection;

pub use engine::{GeoEngine, GeoEngineConfig};
