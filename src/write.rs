//! Asynchronous submission of encoded batches to the remote-write endpoint
//!
//! The caller's thread is only borrowed up to admission: the HTTP call
//! runs on a detached task behind the bulkhead, and its outcome is
//! recorded in the stats counters and the log. There is no retry; a
//! failed batch is lost and accounted as such.

use std::sync::Arc;
use std::time::Duration;

use tracing::error;

use crate::bulkhead::Bulkhead;
use crate::error::StorageError;
use crate::stats::StorageStats;
use crate::wire::EncodedBatch;

pub(crate) const X_SCOPE_ORG_ID_HEADER: &str = "X-Scope-OrgID";
pub(crate) const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

const REMOTE_WRITE_VERSION_HEADER: &str = "X-Prometheus-Remote-Write-Version";
const REMOTE_WRITE_VERSION: &str = "0.1.0";
const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";

/// HTTP client for the remote-write endpoint
pub(crate) struct WriteClient {
    client: reqwest::Client,
    write_url: String,
    tenant: Option<String>,
    timeout: Duration,
    bulkhead: Arc<Bulkhead>,
    stats: Arc<StorageStats>,
}

impl WriteClient {
    pub(crate) fn new(
        client: reqwest::Client,
        write_url: String,
        tenant: Option<String>,
        timeout: Duration,
        bulkhead: Arc<Bulkhead>,
        stats: Arc<StorageStats>,
    ) -> Self {
        Self {
            client,
            write_url,
            tenant,
            timeout,
            bulkhead,
            stats,
        }
    }

    /// Submit a batch without waiting for completion
    ///
    /// `batch_size` is the original batch size before NaN filtering; on
    /// any failure the whole original batch counts as lost.
    pub(crate) fn submit(self: &Arc<Self>, batch: EncodedBatch, batch_size: usize) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let encoded = batch.sample_count as u64;
            match this.bulkhead.run(this.send(batch)).await {
                Ok(Ok(())) => this.stats.record_written(encoded),
                Ok(Err(err)) => {
                    this.stats.record_lost(batch_size as u64);
                    error!("error occurred while storing samples, samples will be lost: {err}");
                }
                Err(err) => {
                    this.stats.record_lost(batch_size as u64);
                    error!("write call rejected before execution, samples will be lost: {err}");
                }
            }
        });
    }

    async fn send(&self, batch: EncodedBatch) -> Result<(), StorageError> {
        let mut request = self
            .client
            .post(&self.write_url)
            .timeout(self.timeout)
            .header(reqwest::header::CONTENT_TYPE, PROTOBUF_CONTENT_TYPE)
            .header(reqwest::header::CONTENT_ENCODING, "snappy")
            .header(REMOTE_WRITE_VERSION_HEADER, REMOTE_WRITE_VERSION)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .body(batch.body);
        if let Some(tenant) = &self.tenant {
            request = request.header(X_SCOPE_ORG_ID_HEADER, tenant);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "(error reading body)".to_string());
            return Err(StorageError::Transport {
                url: self.write_url.clone(),
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}
