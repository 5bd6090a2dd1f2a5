//! Symbols and Renderers
//!
//! Minimal symbology model: enough for layers to carry a renderer, for
//! analysis outputs to clone one from a source layer, and for a map sink to
//! draw the result.

use serde::{Deserialize, Serialize};

use crate::geometry::GeometryType;

/// RGBA color, alpha in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Fully saturated color from a hue in degrees.
    pub fn from_hue(hue: f64) -> Self {
        let h = hue.rem_euclid(360.0) / 60.0;
        let x = 1.0 - (h % 2.0 - 1.0).abs();
        let (r, g, b) = match h as u32 {
            0 => (1.0, x, 0.0),
            1 => (x, 1.0, 0.0),
            2 => (0.0, 1.0, x),
            3 => (0.0, x, 1.0),
            4 => (x, 0.0, 1.0),
            _ => (1.0, 0.0, x),
        };
        let to_byte = |v: f64| (v * 255.0).round() as u8;
        Self::rgb(to_byte(r), to_byte(g), to_byte(b))
    }
}

/// A drawing symbol. The variant decides which geometry types it can draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Symbol {
    Marker {
        color: Color,
        size: f32,
        outline: Color,
    },
    Line {
        color: Color,
        width: f32,
    },
    Fill {
        color: Color,
        outline: Color,
        outline_width: f32,
    },
}

impl Symbol {
    /// Whether this symbol can draw geometries of the given type.
    pub fn supports(&self, geometry_type: GeometryType) -> bool {
        match self {
            Symbol::Marker { .. } => geometry_type.is_point(),
            Symbol::Line { .. } => geometry_type.is_line(),
            Symbol::Fill { .. } => geometry_type.is_area(),
        }
    }
}

/// One class of a unique-value renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniqueValueClass {
    pub value: serde_json::Value,
    pub label: String,
    pub symbol: Symbol,
}

/// Rule mapping features to symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Renderer {
    /// Same symbol for every feature
    Simple { symbol: Symbol },
    /// Symbol chosen by the value of one field
    UniqueValue {
        field: String,
        classes: Vec<UniqueValueClass>,
        default_symbol: Symbol,
    },
    /// Symbol chosen by each graphic's own geometry type (mixed containers)
    ByGeometryType {
        marker: Symbol,
        line: Symbol,
        fill: Symbol,
    },
}

impl Renderer {
    pub fn simple(symbol: Symbol) -> Self {
        Renderer::Simple { symbol }
    }

    /// Clone this renderer for an output of the given geometry type.
    ///
    /// Fails when any symbol of the renderer cannot draw that type, e.g. a
    /// point layer's marker renderer applied to buffer polygons.
    pub fn clone_for(&self, geometry_type: GeometryType) -> Result<Renderer, String> {
        let compatible = match self {
            Renderer::Simple { symbol } => symbol.supports(geometry_type),
            Renderer::UniqueValue {
                classes,
                default_symbol,
                ..
            } => {
                default_symbol.supports(geometry_type)
                    && classes.iter().all(|c| c.symbol.supports(geometry_type))
            }
            Renderer::ByGeometryType { .. } => true,
        };
        if compatible {
            Ok(self.clone())
        } else {
            Err(format!(
                "renderer symbols cannot draw {} geometries",
                geometry_type
            ))
        }
    }

    /// Symbol used for a feature of the given geometry type, when there is one.
    pub fn symbol_for(&self, geometry_type: GeometryType) -> Option<&Symbol> {
        match self {
            Renderer::Simple { symbol } => Some(symbol),
            Renderer::UniqueValue { default_symbol, .. } => Some(default_symbol),
            Renderer::ByGeometryType { marker, line, fill } => Some(match geometry_type.dimension() {
                0 => marker,
                1 => line,
                _ => fill,
            }),
        }
    }
}
