//! In-process tag record store
//!
//! Backs onto the host platform's generic key/value persistence contract
//! when embedded; on its own it is a process-local map. Also serves as the
//! default backend and the test double for the other backends.

use async_trait::async_trait;
use dashmap::DashMap;

use super::{record_key, RecordStore, TagStoreError};

/// Tag record store held in process memory
///
/// Sharded internally, so writers to different keys do not block each
/// other.
#[derive(Debug, Default)]
pub struct MemoryTagStore {
    entries: DashMap<String, String>,
}

impl MemoryTagStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryTagStore {
    async fn load(
        &self,
        metric_key: &str,
        tenant: Option<&str>,
    ) -> Result<Option<String>, TagStoreError> {
        Ok(self
            .entries
            .get(&record_key(metric_key, tenant))
            .map(|entry| entry.value().clone()))
    }

    async fn store(
        &self,
        metric_key: &str,
        tenant: Option<&str>,
        record: &str,
    ) -> Result<(), TagStoreError> {
        self.entries
            .insert(record_key(metric_key, tenant), record.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_and_load() {
        let store = MemoryTagStore::new();
        assert!(store.load("name=cpu", None).await.unwrap().is_none());

        store.store("name=cpu", None, "a=1").await.unwrap();
        assert_eq!(
            store.load("name=cpu", None).await.unwrap(),
            Some("a=1".to_string())
        );
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_tenant_namespacing() {
        let store = MemoryTagStore::new();
        store.store("name=cpu", Some("acme"), "a=1").await.unwrap();

        assert!(store.load("name=cpu", None).await.unwrap().is_none());
        assert_eq!(
            store.load("name=cpu", Some("acme")).await.unwrap(),
            Some("a=1".to_string())
        );
    }
}
