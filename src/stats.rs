//! Write-path statistics
//!
//! Write failures are invisible to the synchronous caller by design, so
//! lost samples are only observable here and in the logs. Counters are
//! owned by the adapter instance; there is no process-wide registry.

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for the write pipeline
#[derive(Debug, Default)]
pub struct StorageStats {
    samples_written: AtomicU64,
    samples_lost: AtomicU64,
}

impl StorageStats {
    /// Create a zeroed counter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record samples acknowledged by the backend
    #[inline]
    pub fn record_written(&self, count: u64) {
        self.samples_written.fetch_add(count, Ordering::Relaxed);
    }

    /// Record samples lost to an encode, admission, or transport failure
    #[inline]
    pub fn record_lost(&self, count: u64) {
        self.samples_lost.fetch_add(count, Ordering::Relaxed);
    }

    /// Total samples successfully written
    pub fn samples_written(&self) -> u64 {
        self.samples_written.load(Ordering::Relaxed)
    }

    /// Total samples lost
    pub fn samples_lost(&self) -> u64 {
        self.samples_lost.load(Ordering::Relaxed)
    }

    /// Point-in-time snapshot of all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            samples_written: self.samples_written(),
            samples_lost: self.samples_lost(),
        }
    }
}

/// Counter snapshot handed to the host for metering
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Total samples successfully written
    pub samples_written: u64,
    /// Total samples lost
    pub samples_lost: u64,
}
