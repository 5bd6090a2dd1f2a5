//! Symbology Assignment
//!
//! Tools with a natural single source reuse that source's renderer when its
//! symbols can draw the output geometry type. Everything else gets a
//! default symbol in the tool's hue.

use map_analysis_core::{Color, GeometryType, LayerRef, Renderer, Symbol, SymbologySource, ToolId};

/// Fixed hue (degrees) per tool so outputs of one tool look alike.
pub fn tool_hue(tool: ToolId) -> f64 {
    match tool {
        ToolId::Buffer => 210.0,
        ToolId::Dissolve => 30.0,
        ToolId::ConvexHull => 280.0,
        ToolId::Overlay => 330.0,
        ToolId::Clip => 120.0,
        ToolId::Merge => 50.0,
        ToolId::SpatialJoin => 180.0,
        ToolId::AttributeJoin => 250.0,
        ToolId::ModifyGeometry => 0.0,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SymbologyAssigner;

impl SymbologyAssigner {
    pub fn new() -> Self {
        Self
    }

    pub fn marker(color: Color) -> Symbol {
        Symbol::Marker {
            color,
            size: 8.0,
            outline: Color::rgb(255, 255, 255),
        }
    }

    pub fn line(color: Color) -> Symbol {
        Symbol::Line { color, width: 2.0 }
    }

    pub fn fill(color: Color) -> Symbol {
        Symbol::Fill {
            color: color.with_alpha(96),
            outline: color,
            outline_width: 1.5,
        }
    }

    /// Default symbol for a geometry type in the tool's hue.
    pub fn default_symbol(&self, tool: ToolId, geometry_type: GeometryType) -> Symbol {
        let color = Color::from_hue(tool_hue(tool));
        match geometry_type.dimension() {
            0 => Self::marker(color),
            1 => Self::line(color),
            _ => Self::fill(color),
        }
    }

    /// Renderer for a graphics container holding mixed geometry types.
    pub fn container_renderer(&self, tool: ToolId) -> Renderer {
        let color = Color::from_hue(tool_hue(tool));
        Renderer::ByGeometryType {
            marker: Self::marker(color),
            line: Self::line(color),
            fill: Self::fill(color),
        }
    }

    /// Pick the renderer of an output.
    ///
    /// `geometry_type` is `None` for graphics containers.
    pub fn assign(
        &self,
        tool: ToolId,
        source: SymbologySource,
        inputs: &[LayerRef],
        geometry_type: Option<GeometryType>,
    ) -> Renderer {
        let geometry_type = match geometry_type {
            Some(gt) => gt,
            None => return self.container_renderer(tool),
        };

        if let SymbologySource::Inherit(index) = source {
            if let Some(layer) = inputs.get(index) {
                match layer.renderer().map(|r| r.clone_for(geometry_type)) {
                    Some(Ok(renderer)) => return renderer,
                    Some(Err(reason)) => tracing::debug!(
                        "[Symbology] Not reusing renderer of '{}': {}",
                        layer.title(),
                        reason
                    ),
                    None => {}
                }
            }
        }
        Renderer::simple(self.default_symbol(tool, geometry_type))
    }
}
