//! Layer Source Adapter
//!
//! Uniform read access over queryable feature collections and plain graphic
//! collections. Sources are read-only; a source whose backing view or
//! session is gone fails with `CoreError::SourceUnavailable`.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::try_join_all;

use crate::error::{CoreError, CoreResult};
use crate::feature::{FeatureSet, SchemaField};
use crate::geometry::{GeometryType, SpatialReference};
use crate::symbol::Renderer;

/// How a source answers queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Supports count and attribute/geometry queries
    Queryable,
    /// In-memory collection of graphics
    Graphics,
}

/// A map layer that analysis tools can read from.
#[async_trait]
pub trait LayerSource: Send + Sync {
    /// Stable identifier of the layer within the map.
    fn id(&self) -> &str;

    /// Display title.
    fn title(&self) -> &str;

    fn kind(&self) -> SourceKind;

    /// Declared geometry type, absent for heterogeneous graphic collections.
    fn geometry_type(&self) -> Option<GeometryType>;

    fn spatial_reference(&self) -> SpatialReference;

    /// Attribute schema, available without querying features.
    fn fields(&self) -> Vec<SchemaField>;

    /// Renderer currently applied on the map, if any.
    fn renderer(&self) -> Option<Renderer> {
        None
    }

    /// Number of features: a count query for queryable sources, the
    /// collection length for graphics.
    async fn feature_count(&self) -> CoreResult<usize>;

    /// All fields, all geometry, no filter.
    async fn query_all(&self) -> CoreResult<FeatureSet>;
}

/// Shared handle to a layer source, as selected in the UI.
pub type LayerRef = Arc<dyn LayerSource>;

/// True iff the source currently holds at least one feature.
pub async fn has_features(source: &dyn LayerSource) -> CoreResult<bool> {
    Ok(source.feature_count().await? > 0)
}

/// Query one source and require at least one non-null geometry.
pub async fn fetch_non_empty(source: &dyn LayerSource) -> CoreResult<FeatureSet> {
    let set = source.query_all().await?;
    if set.geometries().is_empty() {
        return Err(CoreError::empty_input(format!(
            "layer '{}' has no features with geometry",
            source.title()
        )));
    }
    Ok(set)
}

/// Query every source concurrently and fan in; any failure fails the fetch.
///
/// Results keep the order of `sources`.
pub async fn fetch_all(sources: &[LayerRef]) -> CoreResult<Vec<FeatureSet>> {
    try_join_all(sources.iter().map(|source| fetch_non_empty(source.as_ref()))).await
}
