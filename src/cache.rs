//! Bounded metric metadata cache
//!
//! Aggregated and rate queries return only the queried label set, losing
//! the meta tags (e.g. `mtype`) needed to decide whether a series is a
//! counter. This cache keeps the full metric, keyed by the series key, so
//! the read path does not need a series lookup on every fetch.
//!
//! Size-evicted only; entries are never invalidated. Staleness is an
//! accepted tradeoff since series metadata rarely changes.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

use crate::types::Metric;

/// Bounded, size-evicted cache of fully resolved metrics
pub struct MetricCache {
    entries: Mutex<LruCache<String, Metric>>,
}

impl MetricCache {
    /// Create a cache holding at most `max_entries` metrics
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Look up a metric by its series key
    pub fn get(&self, key: &str) -> Option<Metric> {
        self.entries.lock().get(key).cloned()
    }

    /// Insert a resolved metric, keyed by its series key
    ///
    /// Evicts the least recently used entry when at capacity.
    pub fn insert(&self, metric: Metric) {
        self.entries.lock().put(metric.key(), metric);
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tag_names;

    fn metric(name: &str) -> Metric {
        Metric::builder()
            .intrinsic_tag(tag_names::NAME, name)
            .meta_tag(tag_names::MTYPE, "counter")
            .build()
    }

    #[test]
    fn test_insert_and_get() {
        let cache = MetricCache::new(10);
        let m = metric("cpu_usage");
        let key = m.key();

        assert!(cache.get(&key).is_none());
        cache.insert(m.clone());
        assert_eq!(cache.get(&key), Some(m));
    }

    #[test]
    fn test_size_eviction() {
        let cache = MetricCache::new(2);
        cache.insert(metric("a"));
        cache.insert(metric("b"));
        cache.insert(metric("c"));

        assert_eq!(cache.len(), 2);
        // Least recently used entry was evicted
        assert!(cache.get(&metric("a").key()).is_none());
        assert!(cache.get(&metric("c").key()).is_some());
    }

    #[test]
    fn test_cached_metric_keeps_meta_tags() {
        let cache = MetricCache::new(10);
        cache.insert(metric("cpu_usage"));

        let cached = cache.get(&metric("cpu_usage").key()).unwrap();
        assert_eq!(
            cached
                .first_tag_by_key(tag_names::MTYPE)
                .map(|t| t.value.as_str()),
            Some("counter")
        );
    }
}
