use selection::ChannelId;
use serde::{Deserialize, Serialize};

pub const OSM_TILES: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const OPENTOPOMAP_TILES: &str = "https://tile.opentopomap.org/{z}/{x}/{y}.png";
pub const LANDUSE_TILES: &str = "https://earthengine.googleapis.com/v1/projects/ee-himani202302/maps/5c23e4dbf9085ff9159f65e3fa93a7ab-3ab683e21377ee9c07fbbf3f8a2fb0c0/tiles/{z}/{x}/{y}";

/// Where every geometry resource and tile source lives.
///
/// Urls are resolved by the cache's resource source, so plain file names work
/// for both the HTTP and filesystem sources. `{n}` in the templates is
/// replaced with the channel number or stream order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceCatalog {
    pub basins: String,
    pub streams: String,
    pub taluka_boundary: String,
    pub district_boundary: String,
    pub roads: String,
    pub railway: String,
    pub canals: String,
    pub sub_basin_template: String,
    pub stream_order_template: String,
    pub osm_tiles: String,
    pub landuse_tiles: String,
    pub terrain_tiles: String,
}

impl Default for ResourceCatalog {
    fn default() -> Self {
        Self {
            basins: "Mahi_Basins.geojson".to_string(),
            streams: "Mahi_Streams.geojson".to_string(),
            taluka_boundary: "TalukaBoundary.geojson".to_string(),
            district_boundary: "DistrictBoundary.geojson".to_string(),
            roads: "Roads_layer.geojson".to_string(),
            railway: "Railway.geojson".to_string(),
            canals: "Canals.geojson".to_string(),
            sub_basin_template: "MA{n}.geojson".to_string(),
            stream_order_template: "order{n}.geojson".to_string(),
            osm_tiles: OSM_TILES.to_string(),
            landuse_tiles: LANDUSE_TILES.to_string(),
            terrain_tiles: OPENTOPOMAP_TILES.to_string(),
        }
    }
}

impl ResourceCatalog {
    pub fn sub_basin(&self, channel: ChannelId) -> String {
        self.sub_basin_template
            .replace("{n}", &channel.number().to_string())
    }

    pub fn stream_order(&self, order: u8) -> String {
        self.stream_order_template.replace("{n}", &order.to_string())
    }
}
