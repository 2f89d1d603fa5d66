use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use foundation::LonLat;
use layers::ResourceCatalog;
use selection::SelectionState;
use streaming::{FileSource, HttpSource, ResourceSource};
use tracing::info;

pub const DATA_ENV: &str = "DASHBOARD_DATA";
pub const CATALOG_ENV: &str = "DASHBOARD_CATALOG";
pub const DEFAULT_DATA: &str = "public";

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, reason: String },
    Catalog { path: PathBuf, reason: String },
    Selection { path: PathBuf, reason: String },
    InvalidPair(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, reason } => write!(f, "read {}: {reason}", path.display()),
            ConfigError::Catalog { path, reason } => {
                write!(f, "invalid catalog {}: {reason}", path.display())
            }
            ConfigError::Selection { path, reason } => {
                write!(f, "invalid selection {}: {reason}", path.display())
            }
            ConfigError::InvalidPair(raw) => write!(f, "expected two numbers as `a,b`, got {raw:?}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Where resources come from and what they are called.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Directory or http(s) base URL holding the geometry files.
    pub data: String,
    pub catalog: ResourceCatalog,
}

impl DashboardConfig {
    /// Flags win over environment variables, which win over defaults.
    pub fn load(data: Option<String>, catalog: Option<PathBuf>) -> Result<Self, ConfigError> {
        let data = data
            .or_else(|| env::var(DATA_ENV).ok())
            .unwrap_or_else(|| DEFAULT_DATA.to_string());
        let catalog_path = catalog.or_else(|| env::var(CATALOG_ENV).ok().map(PathBuf::from));
        let catalog = match catalog_path {
            Some(path) => read_catalog(&path)?,
            None => ResourceCatalog::default(),
        };
        Ok(Self { data, catalog })
    }

    pub fn is_remote(&self) -> bool {
        self.data.starts_with("http://") || self.data.starts_with("https://")
    }

    pub fn source(&self) -> Arc<dyn ResourceSource> {
        if self.is_remote() {
            info!("fetching resources from {}", self.data);
            Arc::new(HttpSource::new(self.data.clone()))
        } else {
            info!("reading resources from directory {}", self.data);
            Arc::new(FileSource::new(&self.data))
        }
    }
}

fn read_to_string(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

pub fn read_catalog(path: &Path) -> Result<ResourceCatalog, ConfigError> {
    let payload = read_to_string(path)?;
    serde_json::from_str(&payload).map_err(|e| ConfigError::Catalog {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Reads a selection snapshot; no path means the empty selection.
pub fn read_selection(path: Option<&Path>) -> Result<SelectionState, ConfigError> {
    let Some(path) = path else {
        return Ok(SelectionState::default());
    };
    let payload = read_to_string(path)?;
    SelectionState::from_json_str(&payload).map_err(|e| ConfigError::Selection {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

pub fn parse_pair(raw: &str) -> Result<(f64, f64), ConfigError> {
    let invalid = || ConfigError::InvalidPair(raw.to_string());
    let (a, b) = raw.split_once(',').ok_or_else(invalid)?;
    let a = a.trim().parse().map_err(|_| invalid())?;
    let b = b.trim().parse().map_err(|_| invalid())?;
    Ok((a, b))
}

pub fn parse_lon_lat(raw: &str) -> Result<LonLat, ConfigError> {
    parse_pair(raw).map(|(lon, lat)| LonLat::new(lon, lat))
}
