//! FIFO mutual exclusion for asynchronous critical sections.
//!
//! Serializes read-modify-write sequences against the persistence backend
//! within one process. It offers no protection across processes sharing a
//! backend. Not reentrant: acquiring again while holding the lock on the
//! same task never completes.

use std::future::Future;

use tokio::sync::{Mutex, MutexGuard};

/// Async lock granting access strictly in arrival order.
#[derive(Debug, Default)]
pub struct AsyncMutex {
    inner: Mutex<()>,
}

/// Proof of exclusive access; the lock is released when this is dropped.
#[derive(Debug)]
#[must_use = "the lock is released as soon as the handle is dropped"]
pub struct Release<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl AsyncMutex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access.
    pub async fn acquire(&self) -> Release<'_> {
        let guard = self.inner.lock().await;
        tracing::trace!("lock acquired");
        Release { _guard: guard }
    }

    /// Run `critical` with the lock held.
    ///
    /// The lock is released when `critical` completes, whether it returns
    /// an error or not, and also if the returned future is dropped early.
    pub async fn exclusive<F, Fut, T>(&self, critical: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _release = self.acquire().await;
        critical().await
    }

    /// Whether some caller currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}
