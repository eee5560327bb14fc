//! In-memory row store for testing.

use crate::error::{StoreError, StoreResult};
use crate::row::RowStore;
use parking_lot::RwLock;
use std::collections::HashMap;

/// An in-memory row store.
///
/// This store keeps all rows in a hash map and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral vaults that don't need persistence
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use kvault_store::{MemoryRowStore, RowStore};
///
/// let store = MemoryRowStore::new();
/// store.put("k", "v").unwrap();
/// assert_eq!(store.count().unwrap(), 1);
/// ```
#[derive(Debug)]
pub struct MemoryRowStore {
    /// `None` once the store has been closed.
    rows: RwLock<Option<HashMap<String, String>>>,
}

impl Default for MemoryRowStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRowStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Some(HashMap::new())),
        }
    }

    /// Creates a store pre-populated with rows.
    ///
    /// Useful for testing recovery and legacy-layout scenarios.
    #[must_use]
    pub fn with_rows(rows: HashMap<String, String>) -> Self {
        Self {
            rows: RwLock::new(Some(rows)),
        }
    }

    /// Returns a copy of every key currently stored.
    ///
    /// Useful for assertions in tests.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.rows
            .read()
            .as_ref()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl RowStore for MemoryRowStore {
    fn put(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut guard = self.rows.write();
        let rows = guard.as_mut().ok_or(StoreError::Closed)?;
        rows.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let guard = self.rows.read();
        let rows = guard.as_ref().ok_or(StoreError::Closed)?;
        Ok(rows.get(key).cloned())
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut guard = self.rows.write();
        let rows = guard.as_mut().ok_or(StoreError::Closed)?;
        Ok(rows.remove(key).is_some())
    }

    fn delete_prefix(&self, prefix: &str) -> StoreResult<u64> {
        let mut guard = self.rows.write();
        let rows = guard.as_mut().ok_or(StoreError::Closed)?;
        let before = rows.len();
        rows.retain(|k, _| !k.starts_with(prefix));
        Ok((before - rows.len()) as u64)
    }

    fn delete_all(&self) -> StoreResult<bool> {
        let mut guard = self.rows.write();
        let rows = guard.as_mut().ok_or(StoreError::Closed)?;
        let had_rows = !rows.is_empty();
        rows.clear();
        Ok(had_rows)
    }

    fn count(&self) -> StoreResult<u64> {
        let guard = self.rows.read();
        let rows = guard.as_ref().ok_or(StoreError::Closed)?;
        Ok(rows.len() as u64)
    }

    fn close(&self) -> StoreResult<()> {
        *self.rows.write() = None;
        Ok(())
    }

    fn destroy(&self) -> StoreResult<()> {
        let guard = self.rows.read();
        if guard.is_some() {
            return Err(StoreError::StillOpen("destroy requires a closed store"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_new_is_empty() {
        let store = MemoryRowStore::new();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn memory_put_get_roundtrip() {
        let store = MemoryRowStore::new();
        store.put("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(store.get("b").unwrap(), None);
    }

    #[test]
    fn memory_put_overwrites() {
        let store = MemoryRowStore::new();
        store.put("a", "1").unwrap();
        store.put("a", "2").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("2"));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn memory_delete_absent_returns_false() {
        let store = MemoryRowStore::new();
        assert!(!store.delete("missing").unwrap());
    }

    #[test]
    fn memory_delete_removes_only_match() {
        let store = MemoryRowStore::new();
        store.put("a", "1").unwrap();
        store.put("b", "2").unwrap();
        assert!(store.delete("a").unwrap());
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn memory_delete_prefix() {
        let store = MemoryRowStore::new();
        store.put("user_chunk_0", "x").unwrap();
        store.put("user_chunk_1", "y").unwrap();
        store.put("user_chunks", "2").unwrap();
        store.put("other", "z").unwrap();

        assert_eq!(store.delete_prefix("user_chunk_").unwrap(), 2);
        assert_eq!(store.count().unwrap(), 2);
        assert!(store.get("user_chunks").unwrap().is_some());
    }

    #[test]
    fn memory_delete_all() {
        let store = MemoryRowStore::new();
        assert!(!store.delete_all().unwrap());
        store.put("a", "1").unwrap();
        assert!(store.delete_all().unwrap());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn memory_closed_store_rejects_operations() {
        let store = MemoryRowStore::new();
        store.put("a", "1").unwrap();
        store.close().unwrap();

        assert!(matches!(store.get("a"), Err(StoreError::Closed)));
        assert!(matches!(store.put("a", "2"), Err(StoreError::Closed)));
        assert!(matches!(store.count(), Err(StoreError::Closed)));
    }

    #[test]
    fn memory_destroy_requires_close() {
        let store = MemoryRowStore::new();
        assert!(matches!(store.destroy(), Err(StoreError::StillOpen(_))));
        store.close().unwrap();
        store.destroy().unwrap();
    }

    #[test]
    fn memory_with_rows() {
        let mut rows = HashMap::new();
        rows.insert("k".to_owned(), "v".to_owned());
        let store = MemoryRowStore::with_rows(rows);
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }
}
