use std::collections::BTreeMap;
use std::sync::Arc;

use formats::FeatureCollection;
use futures_util::FutureExt;
use futures_util::future::{Shared, ready};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::residency::ResourceState;
use crate::source::{BoxFuture, ResourceSource, SourceError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    Fetch { url: String, source: SourceError },
    Parse { url: String, reason: String },
}

impl ResourceError {
    pub fn url(&self) -> &str {
        match self {
            ResourceError::Fetch { url, .. } | ResourceError::Parse { url, .. } => url,
        }
    }
}

impl std::fmt::Display for ResourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceError::Fetch { source, .. } => write!(f, "{source}"),
            ResourceError::Parse { url, reason } => write!(f, "failed to parse {url}: {reason}"),
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Fetch { source, .. } => Some(source),
            ResourceError::Parse { .. } => None,
        }
    }
}

pub type ResourceResult = Result<Arc<FeatureCollection>, ResourceError>;

/// A cloneable handle on a (possibly still running) resource fetch.
///
/// Every caller asking for the same url while it is pending receives a clone
/// of the same shared future.
pub type ResourceFuture = Shared<BoxFuture<'static, ResourceResult>>;

#[derive(Clone)]
enum CacheEntry {
    Pending(ResourceFuture),
    Loaded(Arc<FeatureCollection>),
    Failed(ResourceError),
}

impl CacheEntry {
    fn state(&self) -> ResourceState {
        match self {
            CacheEntry::Pending(_) => ResourceState::Pending,
            CacheEntry::Loaded(_) => ResourceState::Loaded,
            CacheEntry::Failed(_) => ResourceState::Failed,
        }
    }

    fn future(&self) -> ResourceFuture {
        match self {
            CacheEntry::Pending(fetch) => fetch.clone(),
            CacheEntry::Loaded(data) => ready(Ok(Arc::clone(data))).boxed().shared(),
            CacheEntry::Failed(err) => ready(Err(err.clone())).boxed().shared(),
        }
    }
}

/// Memoizing, single-flight cache of parsed geometry resources.
///
/// Notes:
/// - Entries are keyed by url in a `BTreeMap` for stable traversal order.
/// - Each entry is written twice at most: once as `Pending` when first
///   requested, once more when the fetch settles. Failures are not retried.
/// - Collections are shared read-only behind `Arc`.
pub struct ResourceCache {
    source: Arc<dyn ResourceSource>,
    entries: Arc<Mutex<BTreeMap<String, CacheEntry>>>,
}

impl ResourceCache {
    pub fn new(source: Arc<dyn ResourceSource>) -> Self {
        Self {
            source,
            entries: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Requests `url`, starting a fetch on first reference.
    ///
    /// Must be called from within a tokio runtime: the fetch is spawned
    /// eagerly so it makes progress even before anyone awaits the result.
    pub fn get(&self, url: &str) -> ResourceFuture {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(url) {
            debug!("resource cache hit: {url} ({:?})", entry.state());
            return entry.future();
        }

        let fetch = self.spawn_fetch(url.to_string());
        entries.insert(url.to_string(), CacheEntry::Pending(fetch.clone()));
        fetch
    }

    /// The loaded collection for `url`, without starting or awaiting a fetch.
    pub fn peek(&self, url: &str) -> Option<Arc<FeatureCollection>> {
        match self.entries.lock().get(url)? {
            CacheEntry::Loaded(data) => Some(Arc::clone(data)),
            _ => None,
        }
    }

    pub fn state(&self, url: &str) -> Option<ResourceState> {
        self.entries.lock().get(url).map(CacheEntry::state)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn spawn_fetch(&self, url: String) -> ResourceFuture {
        let source = Arc::clone(&self.source);
        let entries = Arc::clone(&self.entries);
        let task_url = url.clone();

        let task = tokio::spawn(async move {
            let result = load(source.as_ref(), &task_url).await;
            let settled = match &result {
                Ok(data) => CacheEntry::Loaded(Arc::clone(data)),
                Err(err) => {
                    warn!("resource {task_url} failed: {err}");
                    CacheEntry::Failed(err.clone())
                }
            };
            entries.lock().insert(task_url, settled);
            result
        });

        async move {
            task.await.unwrap_or_else(|e| {
                Err(ResourceError::Fetch {
                    url: url.clone(),
                    source: SourceError::Transport {
                        url,
                        reason: format!("fetch task aborted: {e}"),
                    },
                })
            })
        }
        .boxed()
        .shared()
    }
}

async fn load(source: &dyn ResourceSource, url: &str) -> ResourceResult {
    let bytes = source
        .fetch(url)
        .await
        .map_err(|e| ResourceError::Fetch {
            url: url.to_string(),
            source: e,
        })?;
    let data = FeatureCollection::from_geojson_slice(&bytes).map_err(|e| ResourceError::Parse {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    debug!("resource {url} loaded: {} features", data.len());
    Ok(Arc::new(data))
}
