//! SQLite-backed row store.
//!
//! Rows live in a single table:
//!
//! ```text
//! CREATE TABLE dt (
//!     id INTEGER PRIMARY KEY,
//!     ky TEXT NOT NULL UNIQUE,
//!     ct TEXT NOT NULL
//! )
//! ```
//!
//! Every mutating operation runs inside an explicit transaction:
//! begin, perform, commit on success, roll back otherwise. `put` is an
//! update-then-insert upsert so a key never holds more than one row.

use crate::error::{StoreError, StoreResult};
use crate::row::RowStore;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;

const TABLE: &str = "dt";
const COLUMN_KEY: &str = "ky";
const COLUMN_VALUE: &str = "ct";
const BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

/// A durable row store backed by a SQLite database file.
///
/// # Thread Safety
///
/// The connection is guarded by a mutex; the store can be shared
/// across threads behind an `Arc`. Callers that need bounded
/// concurrency or timeouts layer them above this type.
///
/// # Example
///
/// ```rust,no_run
/// use kvault_store::{RowStore, SqliteRowStore};
///
/// let store = SqliteRowStore::open("vault.3.12.db")?;
/// store.put("k", "v")?;
/// # Ok::<(), kvault_store::StoreError>(())
/// ```
pub struct SqliteRowStore {
    /// `None` once the store has been closed.
    conn: Mutex<Option<Connection>>,
    path: PathBuf,
}

impl SqliteRowStore {
    /// Opens (or creates) the database file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the schema
    /// cannot be created.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {TABLE} (
                id INTEGER PRIMARY KEY,
                {COLUMN_KEY} TEXT NOT NULL UNIQUE,
                {COLUMN_VALUE} TEXT NOT NULL
            );"
        ))?;

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path,
        })
    }

    /// Returns the path of the underlying database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `op` inside a transaction, committing on `Ok`.
    fn transact<T>(
        &self,
        op: impl FnOnce(&rusqlite::Transaction<'_>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut guard = self.conn.lock();
        let conn = guard.as_mut().ok_or(StoreError::Closed)?;
        let tx = conn.transaction()?;
        let result = op(&tx)?;
        tx.commit()?;
        Ok(result)
    }
}

/// Escapes `%`, `_`, and `\` so a prefix can be used in a LIKE pattern.
fn escape_like(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl RowStore for SqliteRowStore {
    fn put(&self, key: &str, value: &str) -> StoreResult<()> {
        self.transact(|tx| {
            let updated = tx.execute(
                &format!("UPDATE {TABLE} SET {COLUMN_VALUE} = ?1 WHERE {COLUMN_KEY} = ?2"),
                params![value, key],
            )?;
            if updated == 0 {
                tx.execute(
                    &format!("INSERT INTO {TABLE} ({COLUMN_KEY}, {COLUMN_VALUE}) VALUES (?1, ?2)"),
                    params![key, value],
                )?;
            }
            Ok(())
        })
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let guard = self.conn.lock();
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;
        let value = conn
            .query_row(
                &format!("SELECT {COLUMN_VALUE} FROM {TABLE} WHERE {COLUMN_KEY} = ?1"),
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        self.transact(|tx| {
            let removed = tx.execute(
                &format!("DELETE FROM {TABLE} WHERE {COLUMN_KEY} = ?1"),
                params![key],
            )?;
            Ok(removed > 0)
        })
    }

    fn delete_prefix(&self, prefix: &str) -> StoreResult<u64> {
        let pattern = format!("{}%", escape_like(prefix));
        self.transact(|tx| {
            let removed = tx.execute(
                &format!("DELETE FROM {TABLE} WHERE {COLUMN_KEY} LIKE ?1 ESCAPE '\\'"),
                params![pattern],
            )?;
            Ok(removed as u64)
        })
    }

    fn delete_all(&self) -> StoreResult<bool> {
        self.transact(|tx| {
            let removed = tx.execute(&format!("DELETE FROM {TABLE}"), params![])?;
            Ok(removed > 0)
        })
    }

    fn count(&self) -> StoreResult<u64> {
        let guard = self.conn.lock();
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {TABLE}"),
            params![],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn close(&self) -> StoreResult<()> {
        // Dropping the connection releases the handle.
        let _ = self.conn.lock().take();
        Ok(())
    }

    fn destroy(&self) -> StoreResult<()> {
        if self.conn.lock().is_some() {
            return Err(StoreError::StillOpen("destroy requires a closed store"));
        }

        std::fs::remove_file(&self.path)?;

        // SQLite sidecar files may or may not exist.
        for suffix in ["-wal", "-shm", "-journal"] {
            let mut sidecar = self.path.as_os_str().to_owned();
            sidecar.push(suffix);
            let _ = std::fs::remove_file(PathBuf::from(sidecar));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> SqliteRowStore {
        SqliteRowStore::open(dir.path().join("test.db")).unwrap()
    }

    #[test]
    fn sqlite_put_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.put("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn sqlite_put_is_upsert() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.put("a", "1").unwrap();
        store.put("a", "2").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("2"));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn sqlite_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");

        {
            let store = SqliteRowStore::open(&path).unwrap();
            store.put("persisted", "yes").unwrap();
            store.close().unwrap();
        }

        let store = SqliteRowStore::open(&path).unwrap();
        assert_eq!(store.get("persisted").unwrap().as_deref(), Some("yes"));
    }

    #[test]
    fn sqlite_delete_absent_returns_false() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        assert!(!store.delete("missing").unwrap());
    }

    #[test]
    fn sqlite_delete_prefix_respects_literals() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.put("k_chunk_0", "a").unwrap();
        store.put("k_chunk_1", "b").unwrap();
        store.put("kXchunkX9", "c").unwrap();

        // `_` must match literally, not as a LIKE wildcard.
        assert_eq!(store.delete_prefix("k_chunk_").unwrap(), 2);
        assert_eq!(store.get("kXchunkX9").unwrap().as_deref(), Some("c"));
    }

    #[test]
    fn sqlite_delete_all_and_count() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        assert!(!store.delete_all().unwrap());
        store.put("a", "1").unwrap();
        store.put("b", "2").unwrap();
        assert_eq!(store.count().unwrap(), 2);
        assert!(store.delete_all().unwrap());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn sqlite_closed_store_rejects_operations() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.close().unwrap();

        assert!(matches!(store.get("a"), Err(StoreError::Closed)));
        assert!(matches!(store.put("a", "1"), Err(StoreError::Closed)));
    }

    #[test]
    fn sqlite_destroy_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let store = SqliteRowStore::open(&path).unwrap();
        store.put("a", "1").unwrap();

        assert!(matches!(store.destroy(), Err(StoreError::StillOpen(_))));
        store.close().unwrap();
        store.destroy().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn escape_like_escapes_wildcards() {
        assert_eq!(escape_like("a_b%c\\d"), "a\\_b\\%c\\\\d");
        assert_eq!(escape_like("plain"), "plain");
    }
}
