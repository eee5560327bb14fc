//! Error types for row-store operations.

use std::io;
use thiserror::Error;

/// Result type for row-store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during row-store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An underlying SQLite error occurred.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The store is closed.
    #[error("store is closed")]
    Closed,

    /// The store is still open; the requested operation needs it closed.
    #[error("store is still open: {0}")]
    StillOpen(&'static str),

    /// The stored data is malformed.
    #[error("store corrupted: {0}")]
    Corrupted(String),
}
