//! Error types for the storage adapter

use thiserror::Error;

/// Convenience alias for results carrying a [`StorageError`]
pub type StorageResult<T> = Result<T, StorageError>;

/// Main error type surfaced to callers of the storage API
#[derive(Error, Debug)]
pub enum StorageError {
    /// Request rejected before any I/O was attempted
    #[error("validation failed: {0}")]
    Validation(String),

    /// Wire encoding of a sample batch failed
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// The bulkhead rejected the call before execution
    #[error("admission rejected: {0}")]
    Admission(#[from] BulkheadError),

    /// The backend answered with a non-success status
    #[error("call to {url} failed: status {status}: {message}")]
    Transport {
        /// The URL of the failing call
        url: String,
        /// HTTP status code returned by the backend
        status: u16,
        /// Response body, captured for diagnostics
        message: String,
    },

    /// A backend response could not be parsed
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The HTTP request itself failed (connect, timeout, protocol)
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Wire-encoding errors
#[derive(Error, Debug)]
pub enum EncodeError {
    /// Protobuf serialization failed
    #[error("protobuf encoding failed: {0}")]
    Proto(#[from] prost::EncodeError),

    /// Snappy compression failed
    #[error("snappy compression failed: {0}")]
    Compression(#[from] snap::Error),
}

/// Admission-control errors
#[derive(Error, Debug)]
pub enum BulkheadError {
    /// The call waited longer than the configured maximum
    #[error("queue wait exceeded {waited_ms}ms, call rejected")]
    QueueTimeout {
        /// How long the call waited before rejection, in milliseconds
        waited_ms: u64,
    },

    /// The bulkhead was shut down while the call was queued
    #[error("bulkhead closed")]
    Closed,
}

/// Response-parsing errors
#[derive(Error, Debug)]
pub enum ParseError {
    /// The response was not valid JSON
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    /// The response was valid JSON but not the expected shape
    #[error("unexpected response structure: {0}")]
    Structure(String),
}
