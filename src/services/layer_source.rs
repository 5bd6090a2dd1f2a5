//! In-Memory Layer Sources
//!
//! `LayerSource` implementations for hosts that hold their features in
//! memory: a queryable `FeatureLayer` with a fixed schema, and a
//! `GraphicsLayer` whose schema and geometry type are inferred from its
//! graphics. Both can be detached to model a map view that was torn down.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use map_analysis_core::{
    CoreError, CoreResult, FeatureSet, FieldType, GeometryRecord, GeometryType, LayerSource,
    Renderer, SchemaField, SourceKind, SpatialReference,
};

/// Tracks whether the backing view is still alive
#[derive(Debug)]
struct Attachment(AtomicBool);

impl Attachment {
    fn new() -> Self {
        Self(AtomicBool::new(true))
    }

    fn set(&self, attached: bool) {
        self.0.store(attached, Ordering::SeqCst);
    }

    fn is_attached(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self, title: &str) -> CoreResult<()> {
        if self.is_attached() {
            Ok(())
        } else {
            Err(CoreError::source_unavailable(format!(
                "layer '{}' is no longer attached to a map view",
                title
            )))
        }
    }
}

// ============================================================================
// FeatureLayer
// ============================================================================

/// Queryable layer with a declared geometry type and schema
#[derive(Debug)]
pub struct FeatureLayer {
    id: String,
    title: String,
    geometry_type: GeometryType,
    spatial_reference: SpatialReference,
    fields: Vec<SchemaField>,
    records: Vec<GeometryRecord>,
    renderer: Option<Renderer>,
    attachment: Attachment,
}

impl FeatureLayer {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        geometry_type: GeometryType,
        spatial_reference: SpatialReference,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            geometry_type,
            spatial_reference,
            fields: Vec::new(),
            records: Vec::new(),
            renderer: None,
            attachment: Attachment::new(),
        }
    }

    pub fn with_fields(mut self, fields: Vec<SchemaField>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_records(mut self, records: Vec<GeometryRecord>) -> Self {
        self.records = records;
        self
    }

    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Simulate the owning view going away; queries fail afterwards.
    pub fn detach(&self) {
        self.attachment.set(false);
    }

    pub fn attach(&self) {
        self.attachment.set(true);
    }

    pub fn is_attached(&self) -> bool {
        self.attachment.is_attached()
    }
}

#[async_trait]
impl LayerSource for FeatureLayer {
    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Queryable
    }

    fn geometry_type(&self) -> Option<GeometryType> {
        Some(self.geometry_type)
    }

    fn spatial_reference(&self) -> SpatialReference {
        self.spatial_reference
    }

    fn fields(&self) -> Vec<SchemaField> {
        self.fields.clone()
    }

    fn renderer(&self) -> Option<Renderer> {
        self.renderer.clone()
    }

    async fn feature_count(&self) -> CoreResult<usize> {
        self.attachment.check(&self.title)?;
        Ok(self.records.len())
    }

    async fn query_all(&self) -> CoreResult<FeatureSet> {
        self.attachment.check(&self.title)?;
        tracing::debug!(
            "[FeatureLayer] Query '{}' returned {} feature(s)",
            self.title,
            self.records.len()
        );
        Ok(FeatureSet::new(
            self.title.clone(),
            Some(self.geometry_type),
            self.spatial_reference,
            self.fields.clone(),
            self.records.clone(),
        ))
    }
}

// ============================================================================
// GraphicsLayer
// ============================================================================

/// Plain collection of graphics without a declared schema
#[derive(Debug)]
pub struct GraphicsLayer {
    id: String,
    title: String,
    spatial_reference: SpatialReference,
    graphics: Vec<GeometryRecord>,
    attachment: Attachment,
}

impl GraphicsLayer {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        spatial_reference: SpatialReference,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            spatial_reference,
            graphics: Vec::new(),
            attachment: Attachment::new(),
        }
    }

    pub fn with_graphics(mut self, graphics: Vec<GeometryRecord>) -> Self {
        self.graphics = graphics;
        self
    }

    pub fn add(&mut self, graphic: GeometryRecord) {
        self.graphics.push(graphic);
    }

    pub fn detach(&self) {
        self.attachment.set(false);
    }

    pub fn attach(&self) {
        self.attachment.set(true);
    }
}

/// Geometry type shared by every graphic, if there is exactly one.
fn uniform_geometry_type(graphics: &[GeometryRecord]) -> Option<GeometryType> {
    let mut types = graphics
        .iter()
        .filter_map(|g| g.geometry.as_ref())
        .map(|g| g.geometry_type());
    let first = types.next()?;
    types.all(|t| t == first).then_some(first)
}

/// Schema from attribute keys in first-seen order; each type comes from
/// the first non-null value.
fn infer_fields(graphics: &[GeometryRecord]) -> Vec<SchemaField> {
    // (field, typed from a non-null value yet)
    let mut fields: Vec<(SchemaField, bool)> = Vec::new();
    for graphic in graphics {
        for (name, value) in &graphic.attributes {
            match fields.iter_mut().find(|(f, _)| &f.name == name) {
                Some((field, typed)) => {
                    if !*typed && !value.is_null() {
                        field.field_type = FieldType::infer(value);
                        *typed = true;
                    }
                }
                None => fields.push((
                    SchemaField::new(name.clone(), FieldType::infer(value)),
                    !value.is_null(),
                )),
            }
        }
    }
    fields.into_iter().map(|(field, _)| field).collect()
}

#[async_trait]
impl LayerSource for GraphicsLayer {
    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Graphics
    }

    fn geometry_type(&self) -> Option<GeometryType> {
        uniform_geometry_type(&self.graphics)
    }

    fn spatial_reference(&self) -> SpatialReference {
        self.spatial_reference
    }

    fn fields(&self) -> Vec<SchemaField> {
        infer_fields(&self.graphics)
    }

    async fn feature_count(&self) -> CoreResult<usize> {
        self.attachment.check(&self.title)?;
        Ok(self.graphics.len())
    }

    async fn query_all(&self) -> CoreResult<FeatureSet> {
        self.attachment.check(&self.title)?;
        Ok(FeatureSet::new(
            self.title.clone(),
            self.geometry_type(),
            self.spatial_reference,
            self.fields(),
            self.graphics.clone(),
        ))
    }
}
