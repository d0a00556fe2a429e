//! Public storage facade
//!
//! [`CortexStorage`] is the single entry point of the adapter: it owns the
//! HTTP clients, the bulkhead, the metric cache, and the tag store, and it
//! orchestrates the write and read pipelines across them. Writes are
//! fire-and-forget past admission; reads block the caller until the
//! backend answers or fails.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, trace, warn};

use crate::bulkhead::Bulkhead;
use crate::cache::MetricCache;
use crate::config::Config;
use crate::error::{StorageError, StorageResult};
use crate::query::builder::{build_range_query, matchers_to_selector, step_seconds};
use crate::query::result::{parse_range, parse_series};
use crate::stats::{StatsSnapshot, StorageStats};
use crate::tagstore::{build_tag_store, TagStore};
use crate::types::{Aggregation, FetchRequest, Metric, Sample, TagMatcher};
use crate::wire;
use crate::write::{WriteClient, USER_AGENT, X_SCOPE_ORG_ID_HEADER};

/// Idle connections are kept pooled for five minutes
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// The generic storage contract this adapter fulfills for the host
#[async_trait]
pub trait TimeSeriesStorage: Send + Sync {
    /// Persist a batch of samples; fire-and-forget past admission
    async fn store(&self, samples: Vec<Sample>) -> StorageResult<()>;

    /// Find metrics whose labels satisfy all matchers
    async fn find_metrics(&self, matchers: &[TagMatcher]) -> StorageResult<Vec<Metric>>;

    /// Read a time-series window for one metric
    async fn get_timeseries(&self, request: &FetchRequest) -> StorageResult<Vec<Sample>>;

    /// Delete a series; not supported by this adapter
    async fn delete(&self, metric: &Metric) -> StorageResult<()>;

    /// Whether the given aggregation can be pushed down to the backend
    fn supports_aggregation(&self, aggregation: Aggregation) -> bool;
}

/// Storage adapter for a Cortex-style remote-write backend
pub struct CortexStorage {
    config: Config,
    read_client: reqwest::Client,
    write_client: Arc<WriteClient>,
    bulkhead: Arc<Bulkhead>,
    metric_cache: MetricCache,
    tag_store: Arc<dyn TagStore>,
    stats: Arc<StorageStats>,
}

impl CortexStorage {
    /// Create an adapter with the tag store backend named in the config
    pub async fn new(config: Config) -> StorageResult<Self> {
        config.validate().map_err(StorageError::Validation)?;
        let client = Self::http_client(&config)?;
        let tag_store = build_tag_store(&config, client.clone()).await?;
        Self::assemble(config, client, tag_store)
    }

    /// Create an adapter around a host-provided tag store
    ///
    /// Used when the host platform exposes its own key/value persistence
    /// service; the `tag_store` selection in the config is ignored.
    pub fn with_tag_store(config: Config, tag_store: Arc<dyn TagStore>) -> StorageResult<Self> {
        config.validate().map_err(StorageError::Validation)?;
        let client = Self::http_client(&config)?;
        Self::assemble(config, client, tag_store)
    }

    fn http_client(config: &Config) -> StorageResult<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .pool_max_idle_per_host(config.max_concurrent_http_connections)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .build()?)
    }

    fn assemble(
        config: Config,
        client: reqwest::Client,
        tag_store: Arc<dyn TagStore>,
    ) -> StorageResult<Self> {
        let max_wait = match config.bulkhead_max_wait_ms {
            u64::MAX => None,
            wait_ms => Some(Duration::from_millis(wait_ms)),
        };
        // Twice the connection count may be admitted: one wave in flight,
        // one queued at the connection pool
        let bulkhead = Arc::new(Bulkhead::new(
            config.max_concurrent_http_connections * 2,
            max_wait,
        ));
        let stats = Arc::new(StorageStats::new());
        let write_client = Arc::new(WriteClient::new(
            client.clone(),
            config.write_url.clone(),
            config.effective_tenant().map(str::to_string),
            Duration::from_millis(config.write_timeout_ms),
            Arc::clone(&bulkhead),
            Arc::clone(&stats),
        ));

        Ok(Self {
            metric_cache: MetricCache::new(config.metric_cache_size),
            read_client: client,
            write_client,
            bulkhead,
            tag_store,
            stats,
            config,
        })
    }

    /// Snapshot of the write-path counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// The admission controller, for operational observability
    pub fn bulkhead(&self) -> &Bulkhead {
        &self.bulkhead
    }

    /// Resolve the full metric (including meta tags) for a partial one
    ///
    /// Served from the metric cache; a miss costs one series lookup whose
    /// result is cached for the next call.
    async fn load_metric(&self, metric: &Metric) -> StorageResult<Option<Metric>> {
        if let Some(cached) = self.metric_cache.get(&metric.key()) {
            return Ok(Some(cached));
        }
        let matchers: Vec<TagMatcher> = metric
            .intrinsic_tags
            .iter()
            .map(|tag| TagMatcher::equals(tag.key.clone(), tag.value.clone()))
            .collect();
        let metrics = self.find_metrics(&matchers).await?;
        Ok(metrics.into_iter().next())
    }

    async fn query_api(&self, url: Url) -> StorageResult<String> {
        let mut request = self
            .read_client
            .get(url.clone())
            .timeout(Duration::from_millis(self.config.read_timeout_ms))
            .header(reqwest::header::USER_AGENT, USER_AGENT);
        if let Some(tenant) = self.config.effective_tenant() {
            request = request.header(X_SCOPE_ORG_ID_HEADER, tenant);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Transport {
                url: url.to_string(),
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.text().await?)
    }

    fn read_endpoint(&self, path: &str, params: &[(&str, &str)]) -> StorageResult<Url> {
        Url::parse_with_params(&format!("{}/{path}", self.config.read_url), params)
            .map_err(|err| StorageError::Validation(format!("invalid read URL: {err}")))
    }
}

#[async_trait]
impl TimeSeriesStorage for CortexStorage {
    async fn store(&self, samples: Vec<Sample>) -> StorageResult<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let batch = wire::encode_batch(&samples)?;
        trace!("writing batch of {} samples", batch.sample_count);
        self.write_client.submit(batch, samples.len());

        // Best-effort side-write of external tags; never blocks or fails
        // the primary write
        let tenant = self.config.effective_tenant().map(str::to_string);
        for sample in samples
            .into_iter()
            .filter(|s| !s.metric.external_tags.is_empty())
        {
            let tag_store = Arc::clone(&self.tag_store);
            let tenant = tenant.clone();
            tokio::spawn(async move {
                tag_store.store_tags(&sample, tenant.as_deref()).await;
            });
        }

        Ok(())
    }

    async fn find_metrics(&self, matchers: &[TagMatcher]) -> StorageResult<Vec<Metric>> {
        if matchers.is_empty() {
            return Err(StorageError::Validation(
                "at least one tag matcher is required".to_string(),
            ));
        }

        let selector = format!("{{{}}}", matchers_to_selector(matchers));
        let url = self.read_endpoint("series", &[("match[]", selector.as_str())])?;
        debug!("retrieving metrics with {url}");

        let json = self.query_api(url).await?;
        let metrics = parse_series(&json)?;

        let tenant = self.config.effective_tenant();
        let mut enriched = Vec::with_capacity(metrics.len());
        for metric in metrics {
            let metric = self.tag_store.retrieve_tags(&metric, tenant).await;
            self.metric_cache.insert(metric.clone());
            enriched.push(metric);
        }
        Ok(enriched)
    }

    async fn get_timeseries(&self, request: &FetchRequest) -> StorageResult<Vec<Sample>> {
        // The original metric is needed first: aggregated reads strip the
        // meta tags that decide rate() wrapping
        let Some(resolved) = self.load_metric(&request.metric).await? else {
            return Ok(Vec::new());
        };

        let query = build_range_query(request, &resolved);
        let start = request.start.to_string();
        let end = request.end.to_string();
        let step = format!("{}s", step_seconds(request));
        let url = self.read_endpoint(
            "query_range",
            &[
                ("query", query.as_str()),
                ("start", start.as_str()),
                ("end", end.as_str()),
                ("step", step.as_str()),
            ],
        )?;
        debug!("retrieving time series with {url}");

        let json = self.query_api(url).await?;
        Ok(parse_range(&json, &Arc::new(resolved))?)
    }

    async fn delete(&self, metric: &Metric) -> StorageResult<()> {
        // Would need the backend's admin API, which this adapter does not
        // wrap
        warn!("deletes are not supported, ignoring delete for {metric}");
        Ok(())
    }

    fn supports_aggregation(&self, aggregation: Aggregation) -> bool {
        matches!(
            aggregation,
            Aggregation::Average | Aggregation::Max | Aggregation::Min
        )
    }
}
