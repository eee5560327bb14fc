//! Row-store trait definition.

use crate::error::StoreResult;

/// A flat row store keyed by unique text keys.
///
/// Row stores are **opaque string tables**. They persist `(key, value)`
/// rows and guarantee at most one live row per key. kvault owns all
/// value interpretation - stores do not understand chunk layouts,
/// ciphertext framing, or control entries.
///
/// # Invariants
///
/// - `put` is an upsert: after it returns, exactly one row holds `key`
/// - `get` returns exactly the value previously written for that key
/// - `delete` removes at most the one matching row
/// - Stores must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::MemoryRowStore`] - For testing
/// - [`super::SqliteRowStore`] - For persistent storage
pub trait RowStore: Send + Sync {
    /// Writes `value` under `key`, replacing any existing row.
    ///
    /// Implementations first attempt an update by key and fall back to
    /// an insert when no row was updated, so concurrent writers cannot
    /// produce duplicate rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or the write fails.
    fn put(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Reads the value stored under `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or the read fails.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Deletes the row stored under `key`.
    ///
    /// Returns `true` when a row was removed, `false` when no row
    /// matched. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or the delete fails.
    fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Deletes every row whose key starts with `prefix`.
    ///
    /// Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or the delete fails.
    fn delete_prefix(&self, prefix: &str) -> StoreResult<u64>;

    /// Deletes every row in the store.
    ///
    /// Returns `true` when at least one row was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or the delete fails.
    fn delete_all(&self) -> StoreResult<bool>;

    /// Returns the number of rows currently stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or the count fails.
    fn count(&self) -> StoreResult<u64>;

    /// Releases the underlying handle.
    ///
    /// After `close` returns, every data operation fails with
    /// [`super::StoreError::Closed`]. Closing an already-closed store
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if releasing the handle fails.
    fn close(&self) -> StoreResult<()>;

    /// Irreversibly removes the underlying storage artifact.
    ///
    /// The store must be closed first.
    ///
    /// # Errors
    ///
    /// Returns [`super::StoreError::StillOpen`] if called on an open
    /// store, or an error if the removal fails.
    fn destroy(&self) -> StoreResult<()>;
}
