//! Bounded, timeout-guarded access to the row store.
//!
//! Every backend call acquires one of a fixed number of semaphore
//! permits (so concurrent operations cannot exhaust backend handles),
//! runs the blocking store call on the blocking pool, and is awaited
//! with a time bound. On timeout the caller gets a failure result
//! instead of hanging; the abandoned call may still complete, so its
//! effect on the backend must be treated as possibly applied.

use crate::error::{CoreError, CoreResult};
use kvault_store::{RowStore, StoreError, StoreResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::error;

/// Serializes and bounds concurrent access to a [`RowStore`].
pub struct StoreGate {
    store: Arc<dyn RowStore>,
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl StoreGate {
    /// Creates a gate over `store` with `permits` concurrent slots and
    /// a per-operation `timeout`.
    #[must_use]
    pub fn new(store: Arc<dyn RowStore>, permits: usize, timeout: Duration) -> Self {
        Self {
            store,
            permits: Arc::new(Semaphore::new(permits.max(1))),
            timeout,
        }
    }

    /// Runs a store operation under a permit and the time bound.
    async fn with_store<T, F>(&self, operation: &'static str, op: F) -> CoreResult<T>
    where
        F: FnOnce(&dyn RowStore) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| CoreError::Store(StoreError::Closed))?;

        let store = Arc::clone(&self.store);
        let task = tokio::task::spawn_blocking(move || op(store.as_ref()));

        match tokio::time::timeout(self.timeout, task).await {
            Err(_) => {
                error!(operation, timeout = ?self.timeout, "backend operation timed out");
                Err(CoreError::timeout(operation, self.timeout))
            }
            Ok(Err(join_error)) => Err(CoreError::Store(StoreError::Io(std::io::Error::other(
                format!("backend task failed: {join_error}"),
            )))),
            Ok(Ok(result)) => result.map_err(CoreError::from),
        }
    }

    /// Writes a row (upsert).
    pub async fn put(&self, key: String, value: String) -> CoreResult<()> {
        self.with_store("put", move |s| s.put(&key, &value)).await
    }

    /// Reads a row.
    pub async fn get(&self, key: String) -> CoreResult<Option<String>> {
        self.with_store("get", move |s| s.get(&key)).await
    }

    /// Deletes a row; `Ok(false)` when no row matched.
    pub async fn delete(&self, key: String) -> CoreResult<bool> {
        self.with_store("delete", move |s| s.delete(&key)).await
    }

    /// Deletes every row whose key starts with `prefix`.
    pub async fn delete_prefix(&self, prefix: String) -> CoreResult<u64> {
        self.with_store("delete_prefix", move |s| s.delete_prefix(&prefix))
            .await
    }

    /// Deletes every row.
    pub async fn delete_all(&self) -> CoreResult<bool> {
        self.with_store("delete_all", |s| s.delete_all()).await
    }

    /// Counts stored rows.
    pub async fn count(&self) -> CoreResult<u64> {
        self.with_store("count", |s| s.count()).await
    }

    /// Returns true when `key` holds a non-empty value.
    pub async fn contains(&self, key: String) -> CoreResult<bool> {
        let value = self.get(key).await?;
        Ok(value.is_some_and(|v| !v.is_empty()))
    }

    /// Closes the underlying store.
    pub async fn shutdown(&self) -> CoreResult<()> {
        self.with_store("shutdown", |s| s.close()).await
    }

    /// Closes the underlying store and removes its artifact.
    pub async fn terminate(&self) -> CoreResult<()> {
        self.with_store("terminate", |s| {
            s.close()?;
            s.destroy()
        })
        .await
    }
}

impl std::fmt::Debug for StoreGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreGate")
            .field("timeout", &self.timeout)
            .finish()
    }
}
