use std::fmt;
use std::sync::Arc;

use formats::{Feature, FeatureCollection};
use foundation::LonLat;
use serde::Serialize;
use streaming::ResourceCache;

use crate::catalog::ResourceCatalog;
use crate::layer::{Layer, LayerId};
use crate::spec::LayerKind;
use crate::stack::LayerStack;

pub const BASIN_NAME_KEY: &str = "Basin Name";
pub const SEGMENT_ID_KEY: &str = "SEGMENT_ID";

pub const DEFAULT_CENTER: LonLat = LonLat::new(74.2684, 23.2803);
pub const DEFAULT_ZOOM: f64 = 7.8;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Pixel {
    pub x: f64,
    pub y: f64,
}

impl Pixel {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Screen to map conversion, owned by whoever draws the map.
pub trait ScreenMapping {
    /// `None` when the pixel is off the map surface.
    fn pixel_to_map(&self, px: Pixel) -> Option<LonLat>;

    /// Map units covered by one pixel at the current zoom.
    fn map_units_per_pixel(&self) -> f64;
}

/// Equirectangular viewport: degrees per pixel from a 256 px web tile pyramid.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub center: LonLat,
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            width,
            height,
        }
    }

    pub fn with_view(mut self, center: LonLat, zoom: f64) -> Self {
        self.center = center;
        self.zoom = zoom;
        self
    }

    pub fn resolution(&self) -> f64 {
        360.0 / (256.0 * 2f64.powf(self.zoom))
    }

    pub fn map_to_pixel(&self, p: LonLat) -> Pixel {
        let res = self.resolution();
        Pixel::new(
            self.width / 2.0 + (p.lon - self.center.lon) / res,
            self.height / 2.0 - (p.lat - self.center.lat) / res,
        )
    }
}

impl ScreenMapping for Viewport {
    fn pixel_to_map(&self, px: Pixel) -> Option<LonLat> {
        if !(0.0..=self.width).contains(&px.x) || !(0.0..=self.height).contains(&px.y) {
            return None;
        }
        let res = self.resolution();
        Some(LonLat::new(
            self.center.lon + (px.x - self.width / 2.0) * res,
            self.center.lat - (px.y - self.height / 2.0) * res,
        ))
    }

    fn map_units_per_pixel(&self) -> f64 {
        self.resolution()
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickOptions {
    /// How close (in pixels) a line or point must be to count as hit.
    pub tolerance_px: f64,
}

impl Default for PickOptions {
    fn default() -> Self {
        Self { tolerance_px: 3.0 }
    }
}

/// A feature under the pointer.
#[derive(Debug, Clone)]
pub struct FeatureHit {
    pub layer: LayerId,
    pub kind: LayerKind,
    source: Arc<FeatureCollection>,
    index: usize,
}

impl FeatureHit {
    pub fn feature(&self) -> &Feature {
        &self.source.features[self.index]
    }
}

/// Every ready feature under `at`, topmost first.
///
/// Layers are visited top-down, and within a layer later features (drawn
/// last) come first.
pub fn features_at(stack: &LayerStack, at: LonLat, tolerance: f64) -> Vec<FeatureHit> {
    let mut hits = Vec::new();
    for layer in stack.layers().iter().rev() {
        let Some(features) = layer.features() else {
            continue;
        };
        for &index in features.indices().iter().rev() {
            if let Some(feature) = features.source().features.get(index)
                && feature.hit(at, tolerance)
            {
                hits.push(FeatureHit {
                    layer: layer.id().clone(),
                    kind: layer.kind(),
                    source: Arc::clone(features.source()),
                    index,
                });
            }
        }
    }
    hits
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasinRecord {
    pub name: String,
    pub number: i64,
    pub area: f64,
    pub perimeter: f64,
}

impl BasinRecord {
    pub fn from_feature(feature: &Feature) -> Option<Self> {
        Some(Self {
            name: feature.property_text(BASIN_NAME_KEY)?.into_owned(),
            number: feature.property_f64("number").map_or(0, |n| n as i64),
            area: feature.property_f64("area").unwrap_or(0.0),
            perimeter: feature.property_f64("perimeter").unwrap_or(0.0),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRecord {
    pub segment_id: String,
    pub order: u32,
    pub length: f64,
}

impl StreamRecord {
    pub fn from_feature(feature: &Feature) -> Option<Self> {
        Some(Self {
            segment_id: feature.property_text(SEGMENT_ID_KEY)?.into_owned(),
            order: feature.property_f64("ORDER").map_or(0, |o| o as u32),
            length: feature.property_f64("len").unwrap_or(0.0),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClickSelection {
    pub basin: Option<BasinRecord>,
    pub stream: Option<StreamRecord>,
}

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct HoverState {
    pub coordinate: Option<LonLat>,
    pub is_over_stream: bool,
}

impl fmt::Display for HoverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(c) = self.coordinate else {
            return f.write_str("off map");
        };
        write!(f, "Lat & Lon: {:.2}, {:.2}", c.lon, c.lat)?;
        if self.is_over_stream {
            f.write_str(" (River: Yes)")?;
        }
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PointerEventKind {
    Move,
    Click,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub hover: HoverState,
    /// Only set for clicks.
    pub click: Option<ClickSelection>,
}

/// Latest pointer results, overwritten per event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionState {
    pub hover: HoverState,
    pub click: ClickSelection,
}

impl InteractionState {
    pub fn apply(&mut self, resolution: Resolution) {
        self.hover = resolution.hover;
        if let Some(click) = resolution.click {
            self.click = click;
        }
    }
}

/// Answers pointer events from the current stack and the cached basin and
/// stream collections, without waiting on any fetch.
pub struct FeatureResolver {
    cache: Arc<ResourceCache>,
    basins_url: String,
    streams_url: String,
    options: PickOptions,
}

impl FeatureResolver {
    pub fn new(cache: Arc<ResourceCache>, catalog: &ResourceCatalog) -> Self {
        Self {
            cache,
            basins_url: catalog.basins.clone(),
            streams_url: catalog.streams.clone(),
            options: PickOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PickOptions) -> Self {
        self.options = options;
        self
    }

    fn hits(&self, stack: &LayerStack, mapping: &dyn ScreenMapping, at: LonLat) -> Vec<FeatureHit> {
        let tolerance = self.options.tolerance_px * mapping.map_units_per_pixel();
        features_at(stack, at, tolerance)
    }

    pub fn hover(&self, stack: &LayerStack, mapping: &dyn ScreenMapping, px: Pixel) -> HoverState {
        let Some(at) = mapping.pixel_to_map(px) else {
            return HoverState::default();
        };
        let hits = self.hits(stack, mapping, at);
        HoverState {
            coordinate: Some(at),
            is_over_stream: hits.iter().any(|h| h.kind == LayerKind::StreamOrder),
        }
    }

    pub fn click(&self, stack: &LayerStack, mapping: &dyn ScreenMapping, px: Pixel) -> ClickSelection {
        let Some(at) = mapping.pixel_to_map(px) else {
            return ClickSelection::default();
        };
        self.select(&self.hits(stack, mapping, at))
    }

    pub fn resolve_at(
        &self,
        stack: &LayerStack,
        mapping: &dyn ScreenMapping,
        px: Pixel,
        kind: PointerEventKind,
    ) -> Resolution {
        let Some(at) = mapping.pixel_to_map(px) else {
            return Resolution {
                hover: HoverState::default(),
                click: (kind == PointerEventKind::Click).then(ClickSelection::default),
            };
        };
        let hits = self.hits(stack, mapping, at);
        Resolution {
            hover: HoverState {
                coordinate: Some(at),
                is_over_stream: hits.iter().any(|h| h.kind == LayerKind::StreamOrder),
            },
            click: (kind == PointerEventKind::Click).then(|| self.select(&hits)),
        }
    }

    fn select(&self, hits: &[FeatureHit]) -> ClickSelection {
        let basins = self.cache.peek(&self.basins_url);
        let streams = self.cache.peek(&self.streams_url);
        let mut selection = ClickSelection::default();

        for hit in hits {
            let feature = hit.feature();
            if selection.basin.is_none()
                && let Some(basins) = &basins
                && let Some(name) = feature.property(BASIN_NAME_KEY)
            {
                selection.basin = basins
                    .find_by_property(BASIN_NAME_KEY, name)
                    .and_then(BasinRecord::from_feature);
            }
            if selection.stream.is_none()
                && let Some(streams) = &streams
                && let Some(id) = feature.property(SEGMENT_ID_KEY)
            {
                selection.stream = streams
                    .find_by_property(SEGMENT_ID_KEY, id)
                    .and_then(StreamRecord::from_feature);
            }
            if selection.basin.is_some() && selection.stream.is_some() {
                break;
            }
        }
        selection
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{
        BasinRecord, FeatureResolver, InteractionState, PickOptions, Pixel, PointerEventKind,
        ScreenMapping, StreamRecord, Viewport,
    };
    use crate::catalog::ResourceCatalog;
    use crate::stack::LayerStackAssembler;
    use crate::vector::LayerStatus;
    use foundation::LonLat;
    use pretty_assertions::assert_eq;
    use selection::{ChannelId, SelectionState};
    use serde_json::json;
    use streaming::{MemorySource, ResourceCache, ResourceSource};

    fn collection(features: serde_json::Value) -> String {
        json!({ "type": "FeatureCollection", "features": features }).to_string()
    }

    /// Anas covers the default view center; one stream segment crosses it.
    fn source() -> Arc<MemorySource> {
        let source = Arc::new(MemorySource::new());
        source.insert(
            "Mahi_Basins.geojson",
            collection(json!([
                {
                    "type": "Feature",
                    "properties": { "Basin Name": "Anas", "number": 3, "area": 120.4, "perimeter": 60.1 },
                    "geometry": { "type": "Polygon", "coordinates": [[
                        [74.0, 23.0], [74.5, 23.0], [74.5, 23.5], [74.0, 23.5], [74.0, 23.0]
                    ]] }
                },
                {
                    "type": "Feature",
                    "properties": { "Basin Name": "Panam", "number": 4, "area": 80.0, "perimeter": 41.0 },
                    "geometry": { "type": "Polygon", "coordinates": [[
                        [75.0, 23.0], [75.5, 23.0], [75.5, 23.5], [75.0, 23.5], [75.0, 23.0]
                    ]] }
                }
            ])),
        );
        source.insert(
            "Mahi_Streams.geojson",
            collection(json!([{
                "type": "Feature",
                "properties": { "SEGMENT_ID": "S-17", "len": 12.5, "ORDER": 1 },
                "geometry": { "type": "LineString", "coordinates": [[73.0, 22.0], [73.1, 22.1]] }
            }])),
        );
        source.insert(
            "MA1.geojson",
            collection(json!([])),
        );
        source.insert(
            "order1.geojson",
            collection(json!([{
                "type": "Feature",
                "properties": { "layer": "MainChannel1", "SEGMENT_ID": "S-17" },
                "geometry": { "type": "LineString", "coordinates": [[74.0, 23.2803], [74.5, 23.2803]] }
            }])),
        );
        source
    }

    fn setup() -> (LayerStackAssembler, FeatureResolver) {
        setup_with(source())
    }

    fn setup_with(source: Arc<MemorySource>) -> (LayerStackAssembler, FeatureResolver) {
        let cache = Arc::new(ResourceCache::new(source as Arc<dyn ResourceSource>));
        let catalog = ResourceCatalog::default();
        let resolver = FeatureResolver::new(Arc::clone(&cache), &catalog);
        (LayerStackAssembler::new(catalog, cache), resolver)
    }

    #[test]
    fn viewport_center_maps_to_view_center() {
        let vp = Viewport::new(800.0, 600.0);
        let center = vp.pixel_to_map(Pixel::new(400.0, 300.0)).expect("on map");
        assert!((center.lon - 74.2684).abs() < 1e-12);
        assert!((center.lat - 23.2803).abs() < 1e-12);

        let east = vp.pixel_to_map(Pixel::new(500.0, 300.0)).expect("on map");
        assert!(east.lon > center.lon);
        let px = vp.map_to_pixel(east);
        assert!((px.x - 500.0).abs() < 1e-6 && (px.y - 300.0).abs() < 1e-6);

        assert!(vp.pixel_to_map(Pixel::new(-1.0, 10.0)).is_none());
    }

    #[tokio::test]
    async fn click_on_basin_yields_basin_record_only() {
        let (assembler, resolver) = setup();
        let stack = assembler.assemble(&SelectionState::default());
        stack.settled().await;

        let vp = Viewport::new(800.0, 600.0);
        let click = resolver.click(&stack, &vp, Pixel::new(400.0, 300.0));
        assert_eq!(
            click.basin,
            Some(BasinRecord {
                name: "Anas".to_string(),
                number: 3,
                area: 120.4,
                perimeter: 60.1,
            })
        );
        assert_eq!(click.stream, None);

        let hover = resolver.hover(&stack, &vp, Pixel::new(400.0, 300.0));
        assert!(!hover.is_over_stream);
        assert_eq!(hover.to_string(), "Lat & Lon: 74.27, 23.28");
    }

    #[tokio::test]
    async fn stream_order_layer_drives_hover_and_stream_lookup() {
        let (assembler, resolver) = setup();
        let mut selection = SelectionState::default();
        let ch1 = ChannelId::new(1).expect("id");
        selection.channels.set_channel(ch1, true);
        selection.channels.toggle_sub_range(ch1, "1-2").expect("toggle");
        let stack = assembler.assemble(&selection);
        stack.settled().await;

        let vp = Viewport::new(800.0, 600.0);
        let mut state = InteractionState::default();
        let res = resolver.resolve_at(&stack, &vp, Pixel::new(400.0, 300.0), PointerEventKind::Click);
        assert!(res.hover.is_over_stream);
        state.apply(res);

        assert_eq!(
            state.click.stream,
            Some(StreamRecord {
                segment_id: "S-17".to_string(),
                order: 1,
                length: 12.5,
            })
        );
        assert_eq!(state.click.basin.as_ref().map(|b| b.name.as_str()), Some("Anas"));

        // A move keeps the last click.
        let moved = resolver.resolve_at(&stack, &vp, Pixel::new(5.0, 5.0), PointerEventKind::Move);
        assert!(moved.click.is_none());
        state.apply(moved);
        assert!(!state.hover.is_over_stream);
        assert!(state.click.stream.is_some());
    }

    #[tokio::test]
    async fn click_on_empty_ground_clears_both_records() {
        let (assembler, resolver) = setup();
        let stack = assembler.assemble(&SelectionState::default());
        stack.settled().await;

        let vp = Viewport::new(800.0, 600.0).with_view(LonLat::new(76.0, 21.0), 9.0);
        let mut state = InteractionState::default();
        state.click.basin = Some(BasinRecord {
            name: "stale".to_string(),
            number: 0,
            area: 0.0,
            perimeter: 0.0,
        });
        state.apply(resolver.resolve_at(&stack, &vp, Pixel::new(400.0, 300.0), PointerEventKind::Click));
        assert_eq!(state.click, Default::default());
    }

    #[tokio::test]
    async fn geometry_collection_basin_does_not_hide_its_neighbours() {
        let source = source();
        source.insert(
            "Mahi_Basins.geojson",
            collection(json!([
                {
                    "type": "Feature",
                    "properties": { "Basin Name": "Anas", "number": 3, "area": 120.4, "perimeter": 60.1 },
                    "geometry": { "type": "Polygon", "coordinates": [[
                        [74.0, 23.0], [74.5, 23.0], [74.5, 23.5], [74.0, 23.5], [74.0, 23.0]
                    ]] }
                },
                {
                    "type": "Feature",
                    "properties": { "Basin Name": "Mahi Delta", "number": 9 },
                    "geometry": { "type": "GeometryCollection", "geometries": [
                        { "type": "Point", "coordinates": [72.6, 22.2] },
                        { "type": "Polygon", "coordinates": [[
                            [72.0, 21.8], [72.4, 21.8], [72.4, 22.1], [72.0, 22.1], [72.0, 21.8]
                        ]] }
                    ] }
                }
            ])),
        );
        let (assembler, resolver) = setup_with(source);
        let stack = assembler.assemble(&SelectionState::default());
        stack.settled().await;

        let basins = stack.get("base-basins").expect("basins layer");
        assert_eq!(basins.status(), LayerStatus::Ready);
        assert_eq!(basins.feature_count(), 2);

        let vp = Viewport::new(800.0, 600.0);
        let click = resolver.click(&stack, &vp, Pixel::new(400.0, 300.0));
        assert_eq!(click.basin.map(|b| b.name), Some("Anas".to_string()));

        let delta = Viewport::new(800.0, 600.0).with_view(LonLat::new(72.2, 21.95), 9.0);
        let click = resolver.click(&stack, &delta, Pixel::new(400.0, 300.0));
        assert_eq!(
            click.basin,
            Some(BasinRecord {
                name: "Mahi Delta".to_string(),
                number: 9,
                area: 0.0,
                perimeter: 0.0,
            })
        );
    }

    #[tokio::test]
    async fn pick_tolerance_decides_near_misses_on_streams() {
        let (assembler, resolver) = setup();
        let mut selection = SelectionState::default();
        let ch1 = ChannelId::new(1).expect("id");
        selection.channels.set_channel(ch1, true);
        selection.channels.toggle_sub_range(ch1, "1-2").expect("toggle");
        let stack = assembler.assemble(&selection);
        stack.settled().await;

        // Two pixels above the segment running through the view center.
        let vp = Viewport::new(800.0, 600.0);
        let near = Pixel::new(400.0, 298.0);
        assert!(resolver.hover(&stack, &vp, near).is_over_stream);

        let strict = resolver.with_options(PickOptions { tolerance_px: 1.0 });
        assert!(!strict.hover(&stack, &vp, near).is_over_stream);
        assert!(strict.hover(&stack, &vp, Pixel::new(400.0, 300.0)).is_over_stream);
    }
}
