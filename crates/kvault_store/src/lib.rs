//! # kvault Store
//!
//! Row-store trait and backends for kvault.
//!
//! This crate provides the lowest-level persistence abstraction for
//! kvault. A row store is a **flat table of string rows** keyed by a
//! unique text key - it does not interpret the values it stores.
//! Chunking, encryption, and scheduling all live above this seam.
//!
//! ## Design Principles
//!
//! - Stores are plain row tables (put, get, delete, count)
//! - `put` is an upsert: at most one live row per key
//! - No knowledge of chunk layout or ciphertext formats
//! - Must be `Send + Sync` for concurrent access
//!
//! ## Available Backends
//!
//! - [`MemoryRowStore`] - For testing and ephemeral storage
//! - [`SqliteRowStore`] - For persistent storage in a SQLite file
//!
//! ## Example
//!
//! ```rust
//! use kvault_store::{MemoryRowStore, RowStore};
//!
//! let store = MemoryRowStore::new();
//! store.put("greeting", "hello").unwrap();
//! assert_eq!(store.get("greeting").unwrap().as_deref(), Some("hello"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod row;
mod sqlite;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryRowStore;
pub use row::RowStore;
pub use sqlite::SqliteRowStore;
