//! Workspace lock - serializes every operation that touches the workspace
//!
//! All three role loops act on one workspace concurrently. File reads, writes and
//! command execution go through `run_exclusive` so they never interleave.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;

/// FIFO mutual exclusion over the shared workspace.
///
/// Waiters on a tokio `Mutex` are woken in the order they queued, so operations
/// run strictly in submission order. The guard is dropped when the operation's
/// future completes, whether it returned `Ok` or `Err`.
#[derive(Clone, Default)]
pub struct WorkspaceLock {
    inner: Arc<Mutex<()>>,
}

impl WorkspaceLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `operation` once every previously submitted operation has finished.
    pub async fn run_exclusive<F, Fut, T>(&self, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.inner.lock().await;
        operation().await
    }

    /// Whether some operation currently holds the lock
    pub fn is_held(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}

impl std::fmt::Debug for WorkspaceLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceLock").field("held", &self.is_held()).finish()
    }
}
