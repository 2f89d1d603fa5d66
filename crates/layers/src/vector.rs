use std::sync::Arc;

use formats::{Feature, FeatureCollection};
use serde::Serialize;
use streaming::{ResourceCache, ResourceError, ResourceResult};
use tokio::sync::watch;
use tracing::debug;

use crate::layer::{Layer, LayerId};
use crate::query::filter_indices;
use crate::spec::{LayerKind, LayerSpec};
use crate::stack::AssemblyToken;
use crate::symbology::LayerStyle;

/// Features of a layer: a filtered view into a shared collection.
#[derive(Debug, Clone)]
pub struct LayerFeatures {
    source: Arc<FeatureCollection>,
    indices: Vec<usize>,
}

impl LayerFeatures {
    pub fn new(source: Arc<FeatureCollection>, indices: Vec<usize>) -> Self {
        Self { source, indices }
    }

    pub fn source(&self) -> &Arc<FeatureCollection> {
        &self.source
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> + '_ {
        self.indices
            .iter()
            .filter_map(|&i| self.source.features.get(i))
    }
}

#[derive(Debug, Clone, Default)]
pub enum LayerContent {
    #[default]
    Populating,
    Ready(LayerFeatures),
    Failed(ResourceError),
    /// A newer assembly replaced the one this layer was built for.
    Superseded,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerStatus {
    Populating,
    Ready,
    Failed,
    Superseded,
}

impl LayerContent {
    pub fn status(&self) -> LayerStatus {
        match self {
            LayerContent::Populating => LayerStatus::Populating,
            LayerContent::Ready(_) => LayerStatus::Ready,
            LayerContent::Failed(_) => LayerStatus::Failed,
            LayerContent::Superseded => LayerStatus::Superseded,
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, LayerContent::Populating)
    }

    pub fn features(&self) -> Option<&LayerFeatures> {
        match self {
            LayerContent::Ready(features) => Some(features),
            _ => None,
        }
    }
}

/// A styled vector layer whose features arrive after construction.
///
/// Anything but `Ready` renders as zero features.
pub struct VectorLayer {
    id: LayerId,
    spec: LayerSpec,
    style: LayerStyle,
    generation: u64,
    content: watch::Sender<LayerContent>,
}

impl VectorLayer {
    fn new(spec: LayerSpec, generation: u64) -> Self {
        let (content, _) = watch::channel(LayerContent::Populating);
        Self {
            id: spec.id.clone(),
            style: spec.resolved_style(),
            spec,
            generation,
            content,
        }
    }

    pub fn spec(&self) -> &LayerSpec {
        &self.spec
    }

    pub fn kind(&self) -> LayerKind {
        self.spec.kind
    }

    pub fn style(&self) -> &LayerStyle {
        &self.style
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn status(&self) -> LayerStatus {
        self.content.borrow().status()
    }

    pub fn content(&self) -> LayerContent {
        self.content.borrow().clone()
    }

    /// The layer's features once ready.
    pub fn features(&self) -> Option<LayerFeatures> {
        self.content.borrow().features().cloned()
    }

    pub fn feature_count(&self) -> usize {
        self.content.borrow().features().map_or(0, LayerFeatures::len)
    }

    /// Waits until the layer leaves `Populating`.
    pub async fn settled(&self) -> LayerStatus {
        let mut rx = self.content.subscribe();
        match rx.wait_for(LayerContent::is_settled).await {
            Ok(content) => content.status(),
            Err(_) => self.status(),
        }
    }

    fn populate(&self, result: ResourceResult, token: &AssemblyToken) {
        if !token.is_current() {
            debug!(
                "discarding stale result for {} (generation {})",
                self.id,
                token.generation()
            );
            self.content.send_replace(LayerContent::Superseded);
            return;
        }

        let content = match result {
            Ok(data) => {
                let indices = filter_indices(&data, self.spec.filter.as_ref());
                debug!("layer {} ready: {} features", self.id, indices.len());
                LayerContent::Ready(LayerFeatures::new(data, indices))
            }
            Err(err) => {
                debug!("layer {} has no features: {err}", self.id);
                LayerContent::Failed(err)
            }
        };
        self.content.send_replace(content);
    }
}

impl Layer for VectorLayer {
    fn id(&self) -> &LayerId {
        &self.id
    }
}

impl std::fmt::Debug for VectorLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorLayer")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .field("status", &self.status())
            .finish()
    }
}

/// Binds layer specs to cached resources.
#[derive(Clone)]
pub struct LayerBuilder {
    cache: Arc<ResourceCache>,
}

impl LayerBuilder {
    pub fn new(cache: Arc<ResourceCache>) -> Self {
        Self { cache }
    }

    /// Returns an empty layer at once; a spawned task fills it when the
    /// resource settles. The resource is requested before this returns.
    pub fn build(&self, spec: LayerSpec, token: AssemblyToken) -> Arc<VectorLayer> {
        let fetch = self.cache.get(&spec.resource);
        let layer = Arc::new(VectorLayer::new(spec, token.generation()));

        let target = Arc::clone(&layer);
        tokio::spawn(async move {
            let result = fetch.await;
            target.populate(result, &token);
        });

        layer
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{LayerBuilder, LayerContent, LayerStatus, VectorLayer};
    use crate::catalog::ResourceCatalog;
    use crate::spec::resolve;
    use crate::stack::AssemblyToken;
    use selection::{ChannelId, SelectionState};
    use serde_json::json;
    use streaming::{MemorySource, ResourceCache, ResourceSource};

    fn roads_payload() -> String {
        json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "Road": "NH48" },
                  "geometry": { "type": "LineString", "coordinates": [[73.0, 22.0], [74.0, 23.0]] } },
                { "type": "Feature", "properties": { "Road": "SH12" },
                  "geometry": { "type": "LineString", "coordinates": [[73.5, 22.0], [74.5, 23.0]] } },
                { "type": "Feature", "properties": { "Road": "District Road" },
                  "geometry": { "type": "LineString", "coordinates": [[73.2, 22.0], [74.2, 23.0]] } }
            ]
        })
        .to_string()
    }

    fn road_spec() -> crate::spec::LayerSpec {
        let selection = SelectionState {
            road: true,
            ..Default::default()
        };
        resolve(&selection, &ResourceCatalog::default())
            .into_iter()
            .find(|s| s.id.as_str() == "roads")
            .expect("roads spec")
    }

    #[tokio::test]
    async fn layer_starts_empty_and_fills_with_filtered_features() {
        let source = Arc::new(MemorySource::new());
        source.insert("Roads_layer.geojson", roads_payload());
        let cache = Arc::new(ResourceCache::new(source.clone() as Arc<dyn ResourceSource>));
        let builder = LayerBuilder::new(Arc::clone(&cache));

        let layer = builder.build(road_spec(), AssemblyToken::detached());
        assert_eq!(layer.status(), LayerStatus::Populating);
        assert_eq!(layer.feature_count(), 0);

        assert_eq!(layer.settled().await, LayerStatus::Ready);
        let features = layer.features().expect("ready");
        assert_eq!(features.indices(), &[0, 1]);
        let names: Vec<_> = features
            .iter()
            .filter_map(|f| f.property_text("Road").map(|t| t.into_owned()))
            .collect();
        assert_eq!(names, vec!["NH48", "SH12"]);

        // The shared collection itself is untouched.
        assert_eq!(features.source().len(), 3);
        let cached = cache.peek("Roads_layer.geojson").expect("loaded");
        assert!(Arc::ptr_eq(features.source(), &cached));
    }

    #[tokio::test]
    async fn failed_fetch_leaves_layer_empty() {
        let source = Arc::new(MemorySource::new());
        source.fail_with_status("Railway.geojson", 404);
        let cache = Arc::new(ResourceCache::new(source as Arc<dyn ResourceSource>));
        let builder = LayerBuilder::new(cache);

        let selection = SelectionState {
            railway: true,
            ..Default::default()
        };
        let spec = resolve(&selection, &ResourceCatalog::default())
            .into_iter()
            .find(|s| s.id.as_str() == "railway")
            .expect("railway spec");

        let layer = builder.build(spec, AssemblyToken::detached());
        assert_eq!(layer.settled().await, LayerStatus::Failed);
        assert_eq!(layer.feature_count(), 0);
        assert!(matches!(layer.content(), LayerContent::Failed(_)));
    }

    fn collection(features: serde_json::Value) -> String {
        json!({ "type": "FeatureCollection", "features": features }).to_string()
    }

    async fn settled_names(layer: &VectorLayer, key: &str) -> Vec<String> {
        assert_eq!(layer.settled().await, LayerStatus::Ready);
        let features = layer.features().expect("ready");
        features
            .iter()
            .filter_map(|f| f.property_text(key).map(|t| t.into_owned()))
            .collect()
    }

    fn builder_over(source: MemorySource) -> LayerBuilder {
        let cache = Arc::new(ResourceCache::new(Arc::new(source) as Arc<dyn ResourceSource>));
        LayerBuilder::new(cache)
    }

    #[tokio::test]
    async fn third_order_streams_draw_two_and_a_half_wide() {
        let source = MemorySource::new();
        source.insert(
            "order3.geojson",
            collection(json!([
                { "type": "Feature", "properties": { "layer": "MainChannel4", "SEGMENT_ID": "S-3" },
                  "geometry": { "type": "LineString", "coordinates": [[74.0, 23.0], [74.1, 23.1]] } },
                { "type": "Feature", "properties": { "layer": "MainChannel2", "SEGMENT_ID": "S-8" },
                  "geometry": { "type": "LineString", "coordinates": [[74.2, 23.0], [74.3, 23.1]] } }
            ])),
        );
        let builder = builder_over(source);

        let mut selection = SelectionState::default();
        let ch4 = ChannelId::new(4).expect("id");
        selection.channels.set_channel(ch4, true);
        selection.channels.toggle_sub_range(ch4, "3-4").expect("toggle");
        let spec = resolve(&selection, &ResourceCatalog::default())
            .into_iter()
            .find(|s| s.id.as_str() == "stream-order-3-MainChannel4")
            .expect("stream order spec");

        let layer = builder.build(spec, AssemblyToken::detached());
        assert_eq!(layer.settled().await, LayerStatus::Ready);
        let stroke = layer.style().stroke.as_ref().expect("stroke");
        assert_eq!(stroke.width, 2.5);

        let features = layer.features().expect("ready");
        assert_eq!(features.indices(), &[0]);
        let ids: Vec<_> = features
            .iter()
            .filter_map(|f| f.property_text("SEGMENT_ID").map(|t| t.into_owned()))
            .collect();
        assert_eq!(ids, vec!["S-3"]);
    }

    #[tokio::test]
    async fn boundary_name_filters_drop_other_districts_and_talukas() {
        let source = MemorySource::new();
        source.insert(
            "DistrictBoundary.geojson",
            collection(json!([
                { "type": "Feature", "properties": { "NAME_2": "Panch Mahals" }, "geometry": null },
                { "type": "Feature", "properties": { "NAME_2": "Dohad" }, "geometry": null },
                { "type": "Feature", "properties": { "NAME_2": "Kheda" }, "geometry": null },
                { "type": "Feature", "properties": {}, "geometry": null }
            ])),
        );
        source.insert(
            "TalukaBoundary.geojson",
            collection(json!([
                { "type": "Feature", "properties": { "NAME_3": "Godhra" }, "geometry": null },
                { "type": "Feature", "properties": { "NAME_3": "Lunawada" }, "geometry": null },
                { "type": "Feature", "properties": { "NAME_3": "Jhalod" }, "geometry": null }
            ])),
        );
        let builder = builder_over(source);

        let mut selection = SelectionState {
            district_boundary: true,
            taluka_boundary: true,
            ..Default::default()
        };
        selection.districts.insert("Dohad".to_string());
        selection.districts.insert("Kheda".to_string());
        selection.talukas.insert("Lunawada".to_string());

        let specs = resolve(&selection, &ResourceCatalog::default());
        let spec = |id: &str| specs.iter().find(|s| s.id.as_str() == id).cloned().expect("spec");

        let districts = builder.build(spec("district-boundary"), AssemblyToken::detached());
        let talukas = builder.build(spec("taluka-boundary"), AssemblyToken::detached());
        assert_eq!(
            settled_names(&districts, "NAME_2").await,
            vec!["Dohad", "Kheda"]
        );
        assert_eq!(settled_names(&talukas, "NAME_3").await, vec!["Lunawada"]);
    }
}
