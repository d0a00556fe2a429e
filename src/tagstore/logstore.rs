//! Append-log tag record store
//!
//! Persists tag records in a log server speaking the Loki push/query API.
//! Each write appends the full merged record as a log line in a stream
//! labeled with the series key; reads take the latest line within a
//! 30-day lookback window. Records and the metrics they describe are not
//! correlated in time; only the latest record matters.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use super::{RecordStore, TagStoreError};

const X_SCOPE_ORG_ID_HEADER: &str = "X-Scope-OrgID";
const THIRTY_DAYS_MS: i64 = 1000 * 60 * 60 * 24 * 30;

/// Tag record store backed by a Loki-compatible log server
pub struct LogTagStore {
    client: reqwest::Client,
    push_url: String,
    query_url: String,
}

#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    data: QueryData,
}

#[derive(Debug, Default, Deserialize)]
struct QueryData {
    #[serde(default)]
    result: Vec<StreamResult>,
}

#[derive(Debug, Deserialize)]
struct StreamResult {
    #[serde(default)]
    values: Vec<(String, String)>,
}

impl LogTagStore {
    /// Create a store talking to the log server at `host:port`
    pub fn new(host: &str, port: u16, client: reqwest::Client) -> Self {
        Self {
            client,
            push_url: format!("http://{host}:{port}/loki/api/v1/push"),
            query_url: format!("http://{host}:{port}/loki/api/v1/query_range"),
        }
    }

    fn tenant_header(
        request: reqwest::RequestBuilder,
        tenant: Option<&str>,
    ) -> reqwest::RequestBuilder {
        match tenant.map(str::trim).filter(|t| !t.is_empty()) {
            Some(tenant) => request.header(X_SCOPE_ORG_ID_HEADER, tenant),
            None => request,
        }
    }
}

/// Escape a series key for use inside a LogQL string literal
fn escape_selector_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn latest_entry(json: &str) -> Result<Option<String>, TagStoreError> {
    let response: QueryResponse =
        serde_json::from_str(json).map_err(|err| TagStoreError::Malformed(err.to_string()))?;
    Ok(response
        .data
        .result
        .into_iter()
        .next()
        .and_then(|stream| stream.values.into_iter().next())
        .map(|(_, line)| line))
}

#[async_trait]
impl RecordStore for LogTagStore {
    async fn load(
        &self,
        metric_key: &str,
        tenant: Option<&str>,
    ) -> Result<Option<String>, TagStoreError> {
        let end_ms = Utc::now().timestamp_millis();
        let start_ms = end_ms - THIRTY_DAYS_MS;
        let selector = format!("{{key=\"{}\"}}", escape_selector_value(metric_key));

        let url = reqwest::Url::parse_with_params(
            &self.query_url,
            &[
                ("query", selector.as_str()),
                // Only the latest record matters
                ("limit", "1"),
                ("start", &format!("{start_ms}000000")),
                ("end", &format!("{end_ms}000000")),
            ],
        )
        .map_err(|err| TagStoreError::Malformed(err.to_string()))?;

        let request = Self::tenant_header(self.client.get(url.clone()), tenant);
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TagStoreError::Transport {
                url: url.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        latest_entry(&response.text().await?)
    }

    async fn store(
        &self,
        metric_key: &str,
        tenant: Option<&str>,
        record: &str,
    ) -> Result<(), TagStoreError> {
        let ts_ns = Utc::now().timestamp_millis() * 1_000_000;
        let body = serde_json::json!({
            "streams": [{
                "stream": { "key": metric_key },
                "values": [[ts_ns.to_string(), record]]
            }]
        });

        let request = Self::tenant_header(self.client.post(&self.push_url).json(&body), tenant);
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TagStoreError::Transport {
                url: self.push_url.clone(),
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}
