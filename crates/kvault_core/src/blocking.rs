//! Synchronous adapter over the async vault API.
//!
//! The async API is the primary surface; this adapter is a thin,
//! clearly-marked bridge for callers without a runtime. Every call
//! blocks the current thread with a bounded wait and **refuses to run
//! on a runtime worker thread** - blocking a latency-sensitive async
//! thread is a usage error this type fails loudly on.
//!
//! With an owned (current-thread) runtime, background flush tasks only
//! make progress while a call is blocking on the runtime; call
//! [`BlockingVault::flush`] when durability must be confirmed.

use crate::error::{CoreError, CoreResult};
use crate::stats::StatsSnapshot;
use crate::vault::Vault;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Handle, Runtime};

/// Handle to the runtime used for bridging.
enum RuntimeHandle {
    /// Adapter-owned single-threaded runtime.
    Owned(Runtime),
    /// Handle to a runtime owned by the application.
    Shared(Handle),
}

/// Blocking wrapper around a [`Vault`].
pub struct BlockingVault {
    vault: Arc<Vault>,
    runtime: RuntimeHandle,
    wait: Duration,
}

impl BlockingVault {
    /// Wraps `vault` with an adapter-owned runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be built.
    pub fn new(vault: Arc<Vault>) -> CoreResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CoreError::validation(format!("failed to build runtime: {e}")))?;
        let wait = vault.config().operation_timeout;
        Ok(Self {
            vault,
            runtime: RuntimeHandle::Owned(runtime),
            wait,
        })
    }

    /// Wraps `vault` using the application's runtime handle.
    ///
    /// Calls must still come from threads outside that runtime.
    #[must_use]
    pub fn with_handle(vault: Arc<Vault>, handle: Handle) -> Self {
        let wait = vault.config().operation_timeout;
        Self {
            vault,
            runtime: RuntimeHandle::Shared(handle),
            wait,
        }
    }

    /// Sets the bounded wait applied to every call.
    #[must_use]
    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    /// Returns the wrapped vault.
    #[must_use]
    pub fn inner(&self) -> &Arc<Vault> {
        &self.vault
    }

    fn block_on<T, F>(&self, operation: &'static str, future: F) -> CoreResult<T>
    where
        F: Future<Output = CoreResult<T>>,
    {
        if Handle::try_current().is_ok() {
            return Err(CoreError::InvalidState {
                operation,
                state: "inside an async runtime; use the async API",
            });
        }

        let wait = self.wait;
        let bounded = async move {
            tokio::time::timeout(wait, future)
                .await
                .map_err(|_| CoreError::timeout(operation, wait))?
        };

        match &self.runtime {
            RuntimeHandle::Owned(runtime) => runtime.block_on(bounded),
            RuntimeHandle::Shared(handle) => handle.block_on(bounded),
        }
    }

    /// Blocking [`Vault::put`].
    ///
    /// # Errors
    ///
    /// Returns any error from the async operation, or a timeout.
    pub fn put(&self, key: &str, value: &str) -> CoreResult<()> {
        self.block_on("put", self.vault.put(key, value))
    }

    /// Blocking [`Vault::get`].
    ///
    /// # Errors
    ///
    /// Returns any error from the async operation, or a timeout.
    pub fn get(&self, key: &str) -> CoreResult<Option<String>> {
        self.block_on("get", self.vault.get(key))
    }

    /// Blocking [`Vault::delete`].
    ///
    /// # Errors
    ///
    /// Returns any error from the async operation, or a timeout.
    pub fn delete(&self, key: &str) -> CoreResult<bool> {
        self.block_on("delete", self.vault.delete(key))
    }

    /// Blocking [`Vault::delete_all`].
    ///
    /// # Errors
    ///
    /// Returns any error from the async operation, or a timeout.
    pub fn delete_all(&self) -> CoreResult<bool> {
        self.block_on("delete_all", self.vault.delete_all())
    }

    /// Blocking [`Vault::contains`].
    ///
    /// # Errors
    ///
    /// Returns any error from the async operation, or a timeout.
    pub fn contains(&self, key: &str) -> CoreResult<bool> {
        self.block_on("contains", self.vault.contains(key))
    }

    /// Blocking [`Vault::count`].
    ///
    /// # Errors
    ///
    /// Returns any error from the async operation, or a timeout.
    pub fn count(&self) -> CoreResult<u64> {
        self.block_on("count", self.vault.count())
    }

    /// Blocking [`Vault::flush`].
    ///
    /// # Errors
    ///
    /// Returns a timeout when pending writes could not be confirmed.
    pub fn flush(&self) -> CoreResult<()> {
        let wait = self.wait;
        self.block_on("flush", self.vault.flush(wait))
    }

    /// Blocking [`Vault::shutdown`].
    ///
    /// # Errors
    ///
    /// Returns any error from the async operation, or a timeout.
    pub fn shutdown(&self) -> CoreResult<()> {
        self.block_on("shutdown", self.vault.shutdown())
    }

    /// Blocking [`Vault::terminate`].
    ///
    /// # Errors
    ///
    /// Returns any error from the async operation, or a timeout.
    pub fn terminate(&self) -> CoreResult<()> {
        self.block_on("terminate", self.vault.terminate())
    }

    /// Returns a snapshot of the operation counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.vault.stats()
    }
}

impl std::fmt::Debug for BlockingVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingVault")
            .field("vault", &self.vault)
            .field("wait", &self.wait)
            .finish()
    }
}
