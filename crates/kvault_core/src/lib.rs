//! # kvault Core
//!
//! A local encrypted, chunked, write-behind key-value storage engine.
//!
//! This crate provides:
//! - A crypto pipeline (deflate + AES-256-GCM + PBKDF2-derived keys)
//!   with strict size validation and derived-key caching
//! - A chunk codec splitting oversized values into bounded rows
//! - A write-behind scheduler with a single-flight background flush
//! - A semaphore-bounded, timeout-guarded backend access gate
//! - The [`Vault`] facade composing the above, with an explicit
//!   lifecycle (initialize, shutdown, terminate-with-erase)
//!
//! ## Example
//!
//! ```rust
//! use kvault_core::{EncryptionMode, Vault, VaultConfig};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> kvault_core::CoreResult<()> {
//! let config = VaultConfig::new()
//!     .name("demo")
//!     .encryption(EncryptionMode::Plain);
//! let vault = Vault::open_in_memory(config).await?;
//!
//! vault.put("greeting", "hello").await?;
//! vault.flush(Duration::from_secs(5)).await?;
//! assert_eq!(vault.get("greeting").await?.as_deref(), Some("hello"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Durability Model
//!
//! `put` acknowledges once the write is scheduled; a background flush
//! persists it. [`Vault::flush`] confirms durability explicitly.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod blocking;
mod chunk;
mod config;
mod crypto;
mod error;
mod gate;
mod registry;
mod scheduler;
mod stats;
mod typed;
mod vault;

pub use blocking::BlockingVault;
pub use chunk::{chunk_key, chunk_prefix, count_key, ChunkCodec};
pub use config::{EncryptionMode, VaultConfig, DEFAULT_KDF_SALT};
pub use crypto::{AeadPipeline, Encryption, PlainText, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use error::{CoreError, CoreResult};
pub use gate::StoreGate;
pub use registry::VaultRegistry;
pub use scheduler::WriteScheduler;
pub use stats::{StatsSnapshot, VaultStats};
pub use typed::{JsonCodec, TypedKey, ValueCodec};
pub use vault::{Vault, VaultState};

// The row-store seam, re-exported for backend injection.
pub use kvault_store::{MemoryRowStore, RowStore, SqliteRowStore, StoreError};
