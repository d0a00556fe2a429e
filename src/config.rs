//! Configuration for the storage adapter
//!
//! The host platform hands this crate an opaque settings object; this module
//! is its concrete shape. All fields have defaults matching a local Cortex
//! in single-binary mode, so `Config::default()` is usable in tests.

use serde::{Deserialize, Serialize};

fn default_write_url() -> String {
    "http://localhost:9009/api/prom/push".to_string()
}

fn default_read_url() -> String {
    "http://localhost:9009/prometheus/api/v1".to_string()
}

fn default_max_concurrent_http_connections() -> usize {
    100
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_metric_cache_size() -> usize {
    1000
}

fn default_bulkhead_max_wait_ms() -> u64 {
    u64::MAX
}

fn default_tag_cache_size() -> usize {
    20_000
}

fn default_max_concurrent_tag_store_connections() -> usize {
    20
}

/// Selection and connection parameters for the external tag store backend
///
/// Chosen at construction time; the adapter never switches backends at
/// runtime.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum TagStoreConfig {
    /// In-process key/value store; also the test double
    #[default]
    Memory,
    /// Append-log server speaking the Loki push/query API
    Log {
        /// Log server host
        host: String,
        /// Log server port
        port: u16,
    },
    /// Redis-compatible key/value cache server
    Redis {
        /// Connection URL, e.g. `redis://localhost:6379`
        url: String,
    },
}

/// Adapter configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Remote-write endpoint for sample batches
    #[serde(default = "default_write_url")]
    pub write_url: String,

    /// Base URL of the Prometheus query API
    #[serde(default = "default_read_url")]
    pub read_url: String,

    /// Maximum concurrent outbound HTTP connections
    #[serde(default = "default_max_concurrent_http_connections")]
    pub max_concurrent_http_connections: usize,

    /// Per-request timeout on the write path, milliseconds
    #[serde(default = "default_timeout_ms")]
    pub write_timeout_ms: u64,

    /// Per-request timeout on the read path, milliseconds
    #[serde(default = "default_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Maximum entries in the metric metadata cache
    #[serde(default = "default_metric_cache_size")]
    pub metric_cache_size: usize,

    /// Maximum time a write call may wait for a bulkhead slot,
    /// milliseconds; `u64::MAX` waits forever
    #[serde(default = "default_bulkhead_max_wait_ms")]
    pub bulkhead_max_wait_ms: u64,

    /// Tenant/organization id for multi-tenant backends; sent as the
    /// `X-Scope-OrgID` header when non-empty
    #[serde(default)]
    pub organization_id: Option<String>,

    /// External tag store backend selection
    #[serde(default)]
    pub tag_store: TagStoreConfig,

    /// Maximum entries in the external-tag front cache
    #[serde(default = "default_tag_cache_size")]
    pub tag_cache_size: usize,

    /// Maximum concurrent connections to the tag store backend
    #[serde(default = "default_max_concurrent_tag_store_connections")]
    pub max_concurrent_tag_store_connections: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            write_url: default_write_url(),
            read_url: default_read_url(),
            max_concurrent_http_connections: default_max_concurrent_http_connections(),
            write_timeout_ms: default_timeout_ms(),
            read_timeout_ms: default_timeout_ms(),
            metric_cache_size: default_metric_cache_size(),
            bulkhead_max_wait_ms: default_bulkhead_max_wait_ms(),
            organization_id: None,
            tag_store: TagStoreConfig::default(),
            tag_cache_size: default_tag_cache_size(),
            max_concurrent_tag_store_connections:
                default_max_concurrent_tag_store_connections(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.write_url.is_empty() {
            return Err("write_url must not be empty".to_string());
        }
        if self.read_url.is_empty() {
            return Err("read_url must not be empty".to_string());
        }
        if self.max_concurrent_http_connections == 0 {
            return Err("max_concurrent_http_connections must be > 0".to_string());
        }
        if self.metric_cache_size == 0 {
            return Err("metric_cache_size must be > 0".to_string());
        }
        if self.tag_cache_size == 0 {
            return Err("tag_cache_size must be > 0".to_string());
        }
        if self.max_concurrent_tag_store_connections == 0 {
            return Err("max_concurrent_tag_store_connections must be > 0".to_string());
        }
        if let TagStoreConfig::Log { host, .. } = &self.tag_store {
            if host.is_empty() {
                return Err("tag store host must not be empty".to_string());
            }
        }
        if let TagStoreConfig::Redis { url } = &self.tag_store {
            if url.is_empty() {
                return Err("tag store url must not be empty".to_string());
            }
        }
        Ok(())
    }

    /// The tenant id to send, if one is configured and non-blank
    pub fn effective_tenant(&self) -> Option<&str> {
        self.organization_id
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Builder for [`Config`]
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the remote-write endpoint
    pub fn write_url(mut self, url: impl Into<String>) -> Self {
        self.config.write_url = url.into();
        self
    }

    /// Set the query API base URL
    pub fn read_url(mut self, url: impl Into<String>) -> Self {
        self.config.read_url = url.into();
        self
    }

    /// Set the maximum concurrent outbound HTTP connections
    pub fn max_concurrent_http_connections(mut self, max: usize) -> Self {
        self.config.max_concurrent_http_connections = max;
        self
    }

    /// Set the write-path request timeout in milliseconds
    pub fn write_timeout_ms(mut self, timeout: u64) -> Self {
        self.config.write_timeout_ms = timeout;
        self
    }

    /// Set the read-path request timeout in milliseconds
    pub fn read_timeout_ms(mut self, timeout: u64) -> Self {
        self.config.read_timeout_ms = timeout;
        self
    }

    /// Set the metric cache capacity
    pub fn metric_cache_size(mut self, size: usize) -> Self {
        self.config.metric_cache_size = size;
        self
    }

    /// Set the bulkhead queue wait budget in milliseconds
    pub fn bulkhead_max_wait_ms(mut self, wait: u64) -> Self {
        self.config.bulkhead_max_wait_ms = wait;
        self
    }

    /// Set the tenant/organization id
    pub fn organization_id(mut self, id: impl Into<String>) -> Self {
        self.config.organization_id = Some(id.into());
        self
    }

    /// Select the external tag store backend
    pub fn tag_store(mut self, tag_store: TagStoreConfig) -> Self {
        self.config.tag_store = tag_store;
        self
    }

    /// Set the external-tag front cache capacity
    pub fn tag_cache_size(mut self, size: usize) -> Self {
        self.config.tag_cache_size = size;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<Config, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}
