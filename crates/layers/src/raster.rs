use selection::Theme;
use serde::Serialize;

use crate::catalog::ResourceCatalog;
use crate::layer::{Layer, LayerId};

/// An XYZ tile source drawn beneath the vector layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileLayer {
    id: LayerId,
    pub url: String,
}

impl TileLayer {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: LayerId::new(id),
            url: url.into(),
        }
    }
}

impl Layer for TileLayer {
    fn id(&self) -> &LayerId {
        &self.id
    }
}

/// Base map tiles for `theme`, bottom first.
pub fn basemap_for(theme: Theme, catalog: &ResourceCatalog) -> Vec<TileLayer> {
    match theme {
        Theme::Hydrology => vec![TileLayer::new("osm", &catalog.osm_tiles)],
        Theme::Landuse => vec![
            TileLayer::new("osm", &catalog.osm_tiles),
            TileLayer::new("landuse", &catalog.landuse_tiles),
        ],
        Theme::Terrain => vec![TileLayer::new("terrain", &catalog.terrain_tiles)],
    }
}

#[cfg(test)]
mod tests {
    use super::basemap_for;
    use crate::catalog::ResourceCatalog;
    use crate::layer::Layer;
    use selection::Theme;

    #[test]
    fn landuse_overlays_osm() {
        let catalog = ResourceCatalog::default();
        let tiles = basemap_for(Theme::Landuse, &catalog);
        let ids: Vec<_> = tiles.iter().map(|t| t.id().as_str()).collect();
        assert_eq!(ids, vec!["osm", "landuse"]);
        assert!(tiles[1].url.starts_with("https://earthengine.googleapis.com/"));

        assert_eq!(basemap_for(Theme::Hydrology, &catalog).len(), 1);
        assert_eq!(basemap_for(Theme::Terrain, &catalog)[0].url, catalog.terrain_tiles);
    }
}
