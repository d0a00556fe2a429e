//! External tag side-store
//!
//! Cortex indexes every label, so high-cardinality or free-form attributes
//! cannot ride along as labels without blowing up the index. Tags the
//! backend cannot hold are persisted here instead, keyed by the metric's
//! series key, and merged back into metrics on the read path.
//!
//! The persisted record is a delimited string `k1=v1|k2=v2|...` splitting
//! each pair on the *first* `=` only, so values may contain `=`. Writes
//! merge: a newly observed value wins per key, unseen old keys survive.
//! Same-key concurrent merges are last-write-wins; there is no
//! transactional guarantee, and different keys never block each other.
//!
//! Every failure in this module degrades silently: the primary sample
//! write and the read path never fail because the side-store is down.

pub mod logstore;
pub mod memory;
pub mod redis;

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{Config, TagStoreConfig};
use crate::error::StorageError;
use crate::types::{Metric, Sample, Tag};

pub use self::logstore::LogTagStore;
pub use self::memory::MemoryTagStore;
pub use self::redis::RedisTagStore;

/// Errors internal to the tag store; these never propagate to the storage
/// API, they are logged and swallowed
#[derive(Error, Debug)]
pub enum TagStoreError {
    /// HTTP request to the backend failed
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Redis command failed
    #[error("redis command failed: {0}")]
    Redis(#[from] ::redis::RedisError),

    /// Backend answered with a non-success status
    #[error("call to {url} failed: status {status}: {message}")]
    Transport {
        /// The failing URL
        url: String,
        /// HTTP status code
        status: u16,
        /// Captured response body
        message: String,
    },

    /// Backend response could not be interpreted
    #[error("malformed tag store response: {0}")]
    Malformed(String),
}

/// Capability interface of the external tag store
///
/// Both operations are best-effort: `store_tags` may lose an update on a
/// same-key race and `retrieve_tags` returns the input metric unchanged
/// when the store is unreachable.
#[async_trait]
pub trait TagStore: Send + Sync {
    /// Merge the sample's external tags into the persisted record for its
    /// series
    async fn store_tags(&self, sample: &Sample, tenant: Option<&str>);

    /// Return the metric with its external tags populated from the store
    async fn retrieve_tags(&self, metric: &Metric, tenant: Option<&str>) -> Metric;
}

/// Low-level record access implemented by each backend
///
/// A backend only moves opaque record strings; merge semantics and
/// caching live in [`CachedTagStore`].
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Load the current record for a series, if any
    async fn load(
        &self,
        metric_key: &str,
        tenant: Option<&str>,
    ) -> Result<Option<String>, TagStoreError>;

    /// Persist the record for a series, replacing any previous one
    async fn store(
        &self,
        metric_key: &str,
        tenant: Option<&str>,
        record: &str,
    ) -> Result<(), TagStoreError>;
}

/// Namespace a series key by tenant
///
/// `|` does not occur in tenant ids, so the combined key is unambiguous.
pub(crate) fn record_key(metric_key: &str, tenant: Option<&str>) -> String {
    match tenant.map(str::trim).filter(|t| !t.is_empty()) {
        Some(tenant) => format!("{tenant}|{metric_key}"),
        None => metric_key.to_string(),
    }
}

/// Merge a tag set into a previously persisted record
///
/// New tags win on key collision; old keys without a new value survive.
/// The output is sorted by key, so merging the same set twice yields the
/// same record.
pub(crate) fn merge_tag_record(tags: &BTreeSet<Tag>, previous: Option<&str>) -> String {
    let mut merged: BTreeMap<String, String> = BTreeMap::new();

    if let Some(previous) = previous {
        for pair in previous.split('|').filter(|p| !p.is_empty()) {
            match pair.split_once('=') {
                Some((key, value)) => {
                    merged.insert(key.to_string(), value.to_string());
                }
                None => warn!("skipping malformed tag pair {pair:?}"),
            }
        }
    }

    for tag in tags {
        merged.insert(tag.key.clone(), tag.value.clone());
    }

    let mut out = String::new();
    for (key, value) in &merged {
        if !out.is_empty() {
            out.push('|');
        }
        out.push_str(key);
        out.push('=');
        out.push_str(value);
    }
    out
}

/// Replace a metric's external tags with the ones decoded from a record
pub(crate) fn apply_tag_record(metric: &Metric, record: &str) -> Metric {
    if record.is_empty() {
        return metric.clone();
    }

    let mut out = metric.clone();
    out.external_tags.clear();
    for pair in record.split('|').filter(|p| !p.is_empty()) {
        match pair.split_once('=') {
            Some((key, value)) => {
                out.external_tags.insert(Tag::new(key, value));
            }
            None => warn!("skipping malformed tag pair {pair:?}"),
        }
    }
    out
}

/// Bounded cache-aside front over any [`RecordStore`] backend
///
/// Writes merge against the cached (or freshly loaded) record and update
/// the cache synchronously on success, so a following read needs no
/// backend round trip. A merge that changes nothing skips the backend
/// write entirely.
pub struct CachedTagStore<S> {
    backend: S,
    cache: Mutex<LruCache<String, String>>,
}

impl<S: RecordStore> CachedTagStore<S> {
    /// Wrap a backend with a front cache of `cache_size` records
    pub fn new(backend: S, cache_size: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_size.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            backend,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    async fn current_record(
        &self,
        cache_key: &str,
        metric_key: &str,
        tenant: Option<&str>,
    ) -> Option<String> {
        if let Some(hit) = self.cache.lock().get(cache_key).cloned() {
            return Some(hit);
        }
        match self.backend.load(metric_key, tenant).await {
            Ok(Some(record)) => {
                self.cache
                    .lock()
                    .put(cache_key.to_string(), record.clone());
                Some(record)
            }
            Ok(None) => None,
            Err(err) => {
                debug!("tag store load for {metric_key} failed: {err}");
                None
            }
        }
    }
}

#[async_trait]
impl<S: RecordStore> TagStore for CachedTagStore<S> {
    async fn store_tags(&self, sample: &Sample, tenant: Option<&str>) {
        let external = &sample.metric.external_tags;
        if external.is_empty() {
            return;
        }

        let metric_key = sample.metric.key();
        let cache_key = record_key(&metric_key, tenant);

        let previous = self.current_record(&cache_key, &metric_key, tenant).await;
        let merged = merge_tag_record(external, previous.as_deref());
        if previous.as_deref() == Some(merged.as_str()) {
            return;
        }

        match self.backend.store(&metric_key, tenant, &merged).await {
            Ok(()) => {
                self.cache.lock().put(cache_key, merged);
            }
            Err(err) => warn!("failed to store external tags for {metric_key}: {err}"),
        }
    }

    async fn retrieve_tags(&self, metric: &Metric, tenant: Option<&str>) -> Metric {
        let metric_key = metric.key();
        let cache_key = record_key(&metric_key, tenant);

        match self.current_record(&cache_key, &metric_key, tenant).await {
            Some(record) => apply_tag_record(metric, &record),
            None => metric.clone(),
        }
    }
}

/// Construct the configured tag store backend behind its front cache
///
/// Backend selection happens here, once, at construction time.
pub async fn build_tag_store(
    config: &Config,
    client: reqwest::Client,
) -> Result<Arc<dyn TagStore>, StorageError> {
    let store: Arc<dyn TagStore> = match &config.tag_store {
        TagStoreConfig::Memory => Arc::new(CachedTagStore::new(
            MemoryTagStore::new(),
            config.tag_cache_size,
        )),
        TagStoreConfig::Log { host, port } => Arc::new(CachedTagStore::new(
            LogTagStore::new(host, *port, client),
            config.tag_cache_size,
        )),
        TagStoreConfig::Redis { url } => {
            let backend = RedisTagStore::connect(url).await.map_err(|err| {
                StorageError::Validation(format!("cannot connect to tag store: {err}"))
            })?;
            Arc::new(CachedTagStore::new(backend, config.tag_cache_size))
        }
    };
    Ok(store)
}
