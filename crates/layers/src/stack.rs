use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use formats::features_to_geojson_value;
use futures_util::future::join_all;
use parking_lot::RwLock;
use selection::SelectionState;
use serde_json::{Value, json};
use streaming::ResourceCache;
use tracing::info;

use crate::catalog::ResourceCatalog;
use crate::layer::Layer;
use crate::raster::{TileLayer, basemap_for};
use crate::spec::resolve;
use crate::vector::{LayerBuilder, VectorLayer};

/// Ties a build to the assembly run that asked for it.
#[derive(Debug, Clone)]
pub struct AssemblyToken {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl AssemblyToken {
    /// A token that never goes stale, for building layers outside an assembler.
    pub fn detached() -> Self {
        Self {
            generation: 0,
            current: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::Acquire) == self.generation
    }
}

/// Ordered layers for one selection, bottom first.
#[derive(Debug, Default)]
pub struct LayerStack {
    generation: u64,
    basemap: Vec<TileLayer>,
    layers: Vec<Arc<VectorLayer>>,
}

impl LayerStack {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn basemap(&self) -> &[TileLayer] {
        &self.basemap
    }

    pub fn layers(&self) -> &[Arc<VectorLayer>] {
        &self.layers
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<VectorLayer>> {
        self.layers.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<VectorLayer>> {
        self.layers.iter().find(|l| l.id().as_str() == id)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Waits for every vector layer to leave `Populating`.
    pub async fn settled(&self) {
        join_all(self.layers.iter().map(|l| l.settled())).await;
    }

    /// Snapshot of the stack as JSON for an external renderer.
    pub fn render_document(&self) -> Value {
        let basemap: Vec<Value> = self
            .basemap
            .iter()
            .map(|t| json!({ "id": t.id(), "url": t.url }))
            .collect();
        let layers: Vec<Value> = self
            .layers
            .iter()
            .map(|layer| {
                let features = layer.features();
                let collection = match &features {
                    Some(f) => features_to_geojson_value(f.iter()),
                    None => features_to_geojson_value(std::iter::empty()),
                };
                json!({
                    "id": layer.id(),
                    "kind": layer.kind(),
                    "style": layer.style(),
                    "status": layer.status(),
                    "featureCount": features.as_ref().map_or(0, |f| f.len()),
                    "features": collection,
                })
            })
            .collect();

        json!({
            "generation": self.generation,
            "basemap": basemap,
            "layers": layers,
        })
    }
}

/// Single entry point for turning a selection into a layer stack.
///
/// Each `assemble` call takes a new generation and swaps in a fresh stack;
/// layers still populating from older generations end `Superseded`.
pub struct LayerStackAssembler {
    catalog: ResourceCatalog,
    cache: Arc<ResourceCache>,
    builder: LayerBuilder,
    generation: Arc<AtomicU64>,
    current: RwLock<Arc<LayerStack>>,
}

impl LayerStackAssembler {
    pub fn new(catalog: ResourceCatalog, cache: Arc<ResourceCache>) -> Self {
        Self {
            builder: LayerBuilder::new(Arc::clone(&cache)),
            catalog,
            cache,
            generation: Arc::new(AtomicU64::new(0)),
            current: RwLock::new(Arc::new(LayerStack::default())),
        }
    }

    pub fn catalog(&self) -> &ResourceCatalog {
        &self.catalog
    }

    pub fn cache(&self) -> &Arc<ResourceCache> {
        &self.cache
    }

    /// Builds the stack for `selection` and makes it current.
    ///
    /// Must run inside a tokio runtime. Returns as soon as every layer has
    /// requested its resource; layers fill in as fetches complete.
    pub fn assemble(&self, selection: &SelectionState) -> Arc<LayerStack> {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let token = AssemblyToken {
            generation,
            current: Arc::clone(&self.generation),
        };

        let layers: Vec<_> = resolve(selection, &self.catalog)
            .into_iter()
            .map(|spec| self.builder.build(spec, token.clone()))
            .collect();
        let stack = Arc::new(LayerStack {
            generation,
            basemap: basemap_for(selection.theme, &self.catalog),
            layers,
        });

        *self.current.write() = Arc::clone(&stack);
        info!(
            "assembled layer stack generation {generation}: {} tiles, {} vector layers ({} cached resources from {})",
            stack.basemap.len(),
            stack.len(),
            self.cache.len(),
            self.cache.source_name()
        );
        stack
    }

    pub fn current(&self) -> Arc<LayerStack> {
        Arc::clone(&self.current.read())
    }
}
