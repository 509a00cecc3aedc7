//! Bounded-concurrency gate for source queries
//!
//! Backed by `tokio::sync::Semaphore`, which queues waiters in FIFO order.
//! A slot is an RAII permit: it goes back to the pool (or to the earliest
//! waiter) when dropped, whether the task succeeded, failed or was cancelled.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Semaphore, SemaphorePermit};

use crate::metrics;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimiterError {
    #[error("concurrency limiter is closed")]
    Closed,
}

/// Permit for one in-flight source query
pub struct ConcurrencySlot<'a> {
    _permit: SemaphorePermit<'a>,
}

impl Drop for ConcurrencySlot<'_> {
    fn drop(&mut self) {
        metrics::record_source_slot_released();
    }
}

/// Counting semaphore with a fixed number of slots
#[derive(Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl ConcurrencyLimiter {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Free slots right now
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Slots currently held
    pub fn in_flight(&self) -> usize {
        self.capacity.saturating_sub(self.available())
    }

    /// Wait for a slot; waiters are served in arrival order
    pub async fn acquire(&self) -> Result<ConcurrencySlot<'_>, LimiterError> {
        let permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| LimiterError::Closed)?;
        metrics::record_source_slot_acquired();
        Ok(ConcurrencySlot { _permit: permit })
    }

    /// Acquire, run the task, release. The task's output is passed through.
    pub async fn run<F, T>(&self, task: F) -> Result<T, LimiterError>
    where
        F: Future<Output = T>,
    {
        let _slot = self.acquire().await?;
        Ok(task.await)
    }

    /// Refuse new acquisitions; waiters are woken with `Closed`
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_acquire_is_immediate_when_free() {
        let limiter = ConcurrencyLimiter::new(2);
        let a = limiter.acquire().await.unwrap();
        let _b = limiter.acquire().await.unwrap();
        assert_eq!(limiter.available(), 0);
        assert_eq!(limiter.in_flight(), 2);
        drop(a);
        assert_eq!(limiter.available(), 1);
    }

    #[tokio::test]
    async fn test_zero_capacity_is_clamped() {
        let limiter = ConcurrencyLimiter::new(0);
        assert_eq!(limiter.capacity(), 1);
    }

    #[tokio::test]
    async fn test_oversized_capacity_is_clamped() {
        let limiter = ConcurrencyLimiter::new(usize::MAX);
        assert_eq!(limiter.capacity(), Semaphore::MAX_PERMITS);
        assert_eq!(limiter.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_run_bounds_concurrency() {
        let limiter = ConcurrencyLimiter::new(2);
        let current = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        let tasks = (0..6).map(|i| {
            let limiter = &limiter;
            let current = &current;
            let peak = &peak;
            async move {
                limiter
                    .run(async {
                        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        current.fetch_sub(1, Ordering::SeqCst);
                        i
                    })
                    .await
                    .unwrap()
            }
        });
        let results = futures::future::join_all(tasks).await;

        assert_eq!(results, vec![0, 1, 2, 3, 4, 5]);
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(limiter.available(), 2);
    }

    #[tokio::test]
    async fn test_waiters_served_in_fifo_order() {
        let limiter = ConcurrencyLimiter::new(1);
        let order = parking_lot::Mutex::new(Vec::new());

        let held = limiter.acquire().await.unwrap();
        let waiters = (0..4).map(|i| {
            let limiter = &limiter;
            let order = &order;
            async move {
                limiter
                    .run(async {
                        order.lock().push(i);
                        tokio::task::yield_now().await;
                    })
                    .await
                    .unwrap()
            }
        });
        let release = async move {
            tokio::task::yield_now().await;
            drop(held);
        };
        let (_, _) = tokio::join!(futures::future::join_all(waiters), release);

        assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_slot_released_when_task_fails() {
        let limiter = ConcurrencyLimiter::new(1);
        let outcome: Result<Result<(), &str>, _> = limiter.run(async { Err("boom") }).await;
        assert_eq!(outcome.unwrap(), Err("boom"));
        assert_eq!(limiter.available(), 1);
    }

    #[tokio::test]
    async fn test_closed_limiter_rejects() {
        let limiter = ConcurrencyLimiter::new(1);
        limiter.close();
        assert!(limiter.is_closed());
        assert_eq!(limiter.run(async { 1 }).await, Err(LimiterError::Closed));
    }
}
