//! Bounded-concurrency admission control for outbound write calls
//!
//! A slow backend must not be able to exhaust the caller's tasks: the
//! bulkhead caps how many write calls may be in flight at once and bounds
//! how long further calls may queue for a slot. Calls that outwait the
//! budget are rejected *before* execution, so a rejected call never reaches
//! the network.
//!
//! Fairness comes from the underlying semaphore, which wakes waiters in
//! FIFO order.

use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::{timeout, Instant};

use crate::error::BulkheadError;

/// Counting-semaphore bulkhead guarding concurrent operations
///
/// The slot counter is the only piece of adapter state requiring strict
/// mutual exclusion; it lives inside the semaphore. The observability
/// counters next to it are advisory and relaxed.
pub struct Bulkhead {
    semaphore: Semaphore,
    capacity: usize,
    max_wait: Option<Duration>,
    queued: AtomicUsize,
    rejections: AtomicU64,
}

impl Bulkhead {
    /// Create a bulkhead with `capacity` concurrent slots
    ///
    /// `max_wait` bounds the time a call may queue for a slot; `None`
    /// waits forever.
    pub fn new(capacity: usize, max_wait: Option<Duration>) -> Self {
        Self {
            semaphore: Semaphore::new(capacity),
            capacity,
            max_wait,
            queued: AtomicUsize::new(0),
            rejections: AtomicU64::new(0),
        }
    }

    /// Run `op` once a slot is available
    ///
    /// If fewer than `capacity` operations are in flight the operation
    /// starts immediately; otherwise the call queues FIFO until a slot
    /// frees or the wait budget elapses. The slot is released when the
    /// operation future completes, success or failure.
    ///
    /// # Errors
    ///
    /// [`BulkheadError::QueueTimeout`] if no slot freed within the wait
    /// budget; the operation is then never polled.
    pub async fn run<F, T>(&self, op: F) -> Result<T, BulkheadError>
    where
        F: Future<Output = T>,
    {
        self.queued.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();

        let acquired = match self.max_wait {
            None => self
                .semaphore
                .acquire()
                .await
                .map_err(|_| BulkheadError::Closed),
            Some(wait) => match timeout(wait, self.semaphore.acquire()).await {
                Ok(result) => result.map_err(|_| BulkheadError::Closed),
                Err(_) => Err(BulkheadError::QueueTimeout {
                    waited_ms: started.elapsed().as_millis() as u64,
                }),
            },
        };
        self.queued.fetch_sub(1, Ordering::Relaxed);

        let _permit = match acquired {
            Ok(permit) => permit,
            Err(err) => {
                self.rejections.fetch_add(1, Ordering::Relaxed);
                return Err(err);
            }
        };

        Ok(op.await)
    }

    /// Maximum number of concurrent slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Calls currently waiting for a slot
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::Relaxed)
    }

    /// Calls rejected without execution since construction
    pub fn rejections(&self) -> u64 {
        self.rejections.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_runs_up_to_capacity_concurrently() {
        let bulkhead = Arc::new(Bulkhead::new(2, None));
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let bulkhead = Arc::clone(&bulkhead);
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                bulkhead
                    .run(async {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        running.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_excess_call_queues_until_slot_frees() {
        let bulkhead = Arc::new(Bulkhead::new(1, None));

        let holder = {
            let bulkhead = Arc::clone(&bulkhead);
            tokio::spawn(async move {
                bulkhead
                    .run(tokio::time::sleep(Duration::from_millis(100)))
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(bulkhead.available(), 0);

        // This call must wait for the holder, then succeed
        let result = bulkhead.run(async { 42 }).await;
        assert_eq!(result.unwrap(), 42);
        holder.await.unwrap().unwrap();
        assert_eq!(bulkhead.available(), 1);
    }

    #[tokio::test]
    async fn test_queue_timeout_rejects_without_executing() {
        let bulkhead = Arc::new(Bulkhead::new(1, Some(Duration::from_millis(50))));
        let executed = Arc::new(AtomicBool::new(false));

        let holder = {
            let bulkhead = Arc::clone(&bulkhead);
            tokio::spawn(async move {
                bulkhead
                    .run(tokio::time::sleep(Duration::from_millis(300)))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let flag = Arc::clone(&executed);
        let result = bulkhead
            .run(async move {
                flag.store(true, Ordering::SeqCst);
            })
            .await;

        assert!(matches!(result, Err(BulkheadError::QueueTimeout { .. })));
        assert!(!executed.load(Ordering::SeqCst), "rejected op must not run");
        assert_eq!(bulkhead.rejections(), 1);
        holder.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_slot_released_when_operation_fails() {
        let bulkhead = Bulkhead::new(1, Some(Duration::from_millis(50)));

        let result: Result<Result<(), &str>, _> = bulkhead.run(async { Err("downstream") }).await;
        assert!(result.unwrap().is_err());

        // Slot must be free again for the next call
        assert_eq!(bulkhead.available(), 1);
        let result = bulkhead.run(async { "ok" }).await;
        assert_eq!(result.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_counters() {
        let bulkhead = Bulkhead::new(4, None);
        assert_eq!(bulkhead.capacity(), 4);
        assert_eq!(bulkhead.available(), 4);
        assert_eq!(bulkhead.queued(), 0);
        assert_eq!(bulkhead.rejections(), 0);

        bulkhead.run(async {}).await.unwrap();
        assert_eq!(bulkhead.available(), 4);
    }
}
