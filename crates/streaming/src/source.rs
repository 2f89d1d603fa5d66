//! Resource sources for the geometry cache.
//!
//! A source turns a resource url (e.g. `Mahi_Basins.geojson`) into raw bytes:
//! - `HttpSource` resolves urls against a base URL and fetches with reqwest
//! - `FileSource` reads from a local directory (the dashboard's static files)
//! - `MemorySource` serves an in-process map and records every fetch
//!
//! Sources know nothing about GeoJSON; parsing happens in the cache.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    NotFound { url: String },
    Status { url: String, status: u16 },
    Transport { url: String, reason: String },
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::NotFound { url } => write!(f, "resource not found: {url}"),
            SourceError::Status { url, status } => write!(f, "HTTP {status} for {url}"),
            SourceError::Transport { url, reason } => write!(f, "failed to fetch {url}: {reason}"),
        }
    }
}

impl std::error::Error for SourceError {}

/// Trait for geometry resource sources.
///
/// Implementations must be `Send + Sync` for use across async tasks.
/// Methods return boxed futures for dyn-compatibility.
pub trait ResourceSource: Send + Sync {
    fn name(&self) -> &str;

    fn fetch(&self, url: &str) -> BoxFuture<'_, Result<Bytes, SourceError>>;
}

/// Static files served over HTTP(S).
pub struct HttpSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Absolute urls pass through; anything else is joined onto the base URL.
    pub fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }
}

impl ResourceSource for HttpSource {
    fn name(&self) -> &str {
        &self.base_url
    }

    fn fetch(&self, url: &str) -> BoxFuture<'_, Result<Bytes, SourceError>> {
        let url = self.resolve(url);
        Box::pin(async move {
            let resp = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| SourceError::Transport {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;

            if resp.status() == reqwest::StatusCode::NOT_FOUND {
                return Err(SourceError::NotFound { url });
            }
            if !resp.status().is_success() {
                return Err(SourceError::Status {
                    url,
                    status: resp.status().as_u16(),
                });
            }

            resp.bytes().await.map_err(|e| SourceError::Transport {
                url,
                reason: e.to_string(),
            })
        })
    }
}

/// Static files on the local filesystem, rooted at a directory.
pub struct FileSource {
    name: String,
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            name: root.display().to_string(),
            root,
        }
    }

    pub fn path_for(&self, url: &str) -> PathBuf {
        self.root.join(url.trim_start_matches('/'))
    }
}

impl ResourceSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self, url: &str) -> BoxFuture<'_, Result<Bytes, SourceError>> {
        let path = self.path_for(url);
        let url = url.to_string();
        Box::pin(async move {
            match tokio::fs::read(&path).await {
                Ok(data) => Ok(Bytes::from(data)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(SourceError::NotFound { url })
                }
                Err(e) => Err(SourceError::Transport {
                    url,
                    reason: e.to_string(),
                }),
            }
        })
    }
}

/// In-memory resources, for tests and embedders that already hold the data.
///
/// Every fetch is recorded so callers can assert how often the network would
/// have been hit.
#[derive(Default)]
pub struct MemorySource {
    resources: RwLock<HashMap<String, Result<Bytes, u16>>>,
    fetch_log: Mutex<Vec<String>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: impl Into<String>, payload: impl Into<Bytes>) {
        self.resources.write().insert(url.into(), Ok(payload.into()));
    }

    /// Makes `url` answer with an HTTP error status.
    pub fn fail_with_status(&self, url: impl Into<String>, status: u16) {
        self.resources.write().insert(url.into(), Err(status));
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_log.lock().len()
    }

    pub fn fetches_of(&self, url: &str) -> usize {
        self.fetch_log.lock().iter().filter(|u| *u == url).count()
    }
}

impl ResourceSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch(&self, url: &str) -> BoxFuture<'_, Result<Bytes, SourceError>> {
        let url = url.to_string();
        Box::pin(async move {
            self.fetch_log.lock().push(url.clone());
            // Resolve on a later turn, like a real network fetch would.
            tokio::task::yield_now().await;
            match self.resources.read().get(&url).cloned() {
                Some(Ok(bytes)) => Ok(bytes),
                Some(Err(status)) => Err(SourceError::Status { url, status }),
                None => Err(SourceError::NotFound { url }),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{FileSource, HttpSource, MemorySource, ResourceSource, SourceError};

    #[test]
    fn http_source_joins_relative_urls() {
        let src = HttpSource::new("https://example.org/data/");
        assert_eq!(
            src.resolve("/Mahi_Basins.geojson"),
            "https://example.org/data/Mahi_Basins.geojson"
        );
        assert_eq!(src.resolve("MA3.geojson"), "https://example.org/data/MA3.geojson");
        assert_eq!(
            src.resolve("https://cdn.example.org/order2.geojson"),
            "https://cdn.example.org/order2.geojson"
        );
    }

    #[tokio::test]
    async fn file_source_reads_and_reports_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("Railway.geojson"), b"{}").expect("write");

        let src = FileSource::new(dir.path());
        let bytes = src.fetch("/Railway.geojson").await.expect("read");
        assert_eq!(&bytes[..], b"{}");

        let err = src.fetch("Canals.geojson").await.unwrap_err();
        assert_eq!(
            err,
            SourceError::NotFound {
                url: "Canals.geojson".to_string()
            }
        );
    }

    #[tokio::test]
    async fn memory_source_records_fetches() {
        let src = MemorySource::new();
        src.insert("a.geojson", "{}");
        src.fail_with_status("b.geojson", 503);

        assert!(src.fetch("a.geojson").await.is_ok());
        assert_eq!(
            src.fetch("b.geojson").await.unwrap_err(),
            SourceError::Status {
                url: "b.geojson".to_string(),
                status: 503
            }
        );
        assert_eq!(src.fetch_count(), 2);
        assert_eq!(src.fetches_of("a.geojson"), 1);
    }
}
