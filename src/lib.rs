//! Cortex Bridge - Time-series storage adapter for Prometheus-remote-write backends
//!
//! This library bridges a monitoring platform's generic time-series API to a
//! Cortex-style backend: samples are pushed through the remote-write protocol
//! (to the ingester) and read back through the Prometheus query API (from the
//! querier). Reading from the ingester would only surface the most recent,
//! still-in-memory data, so all reads go through the querier.
//!
//! # Architecture
//!
//! ```text
//! store() ──→ [Wire Encoder] ──→ [Bulkhead] ──→ remote-write endpoint
//!     └─────→ [Tag Store] (detached, best effort)
//!
//! get_timeseries() ──→ [Metric Cache] ──→ [Query Builder] ──→ query_range
//!                           │ miss                                 │
//!                           └──→ series lookup ──→ [Result Parser] ┘
//! ```
//!
//! # Components
//!
//! - **Sanitizer**: maps arbitrary tag names/values to backend-legal labels
//! - **Wire Encoder**: batches samples into snappy-compressed protobuf
//! - **Bulkhead**: bounds concurrent outbound write calls
//! - **Metric Cache**: restores full metric metadata lost by aggregated reads
//! - **Tag Store**: pluggable side-store for tags Cortex cannot hold as labels
//!
//! Docs:
//! - <https://cortexmetrics.io/docs/api/>
//! - <https://prometheus.io/docs/prometheus/latest/querying/api/>

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bulkhead;
pub mod cache;
pub mod config;
pub mod error;
pub mod query;
pub mod sanitize;
pub mod stats;
pub mod storage;
pub mod tagstore;
pub mod types;
pub mod wire;

mod write;

pub use config::{Config, TagStoreConfig};
pub use error::{StorageError, StorageResult};
pub use stats::StatsSnapshot;
pub use storage::{CortexStorage, TimeSeriesStorage};
pub use types::{Aggregation, FetchRequest, Metric, Sample, Tag, TagMatcher};
