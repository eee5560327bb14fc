//! The vault facade.
//!
//! `Vault` composes the crypto pipeline, chunk codec, write-behind
//! scheduler, and access gate behind a narrow asynchronous key-value
//! API. Writes are acknowledged once scheduled (eventual durability);
//! callers that need a durability confirmation await [`Vault::flush`].

use crate::chunk::{chunk_key, chunk_prefix, count_key, ChunkCodec};
use crate::config::{EncryptionMode, VaultConfig};
use crate::crypto::{AeadPipeline, Encryption, PlainText};
use crate::error::{CoreError, CoreResult};
use crate::gate::StoreGate;
use crate::scheduler::WriteScheduler;
use crate::stats::{StatsSnapshot, VaultStats};
use kvault_store::{MemoryRowStore, RowStore, SqliteRowStore};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Lifecycle states of a vault.
///
/// `Terminated` is absorbing: no further operations are permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultState {
    /// Constructed but not yet initialized.
    Uninitialized,
    /// Initialization in progress.
    Initializing,
    /// Open and serving operations.
    Ready,
    /// Backend handle released; data remains on disk.
    ShuttingDown,
    /// Backend erased; the instance is permanently unusable.
    Terminated,
}

impl VaultState {
    const fn name(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::ShuttingDown => "shutting down",
            Self::Terminated => "terminated",
        }
    }
}

/// A local encrypted, chunked, write-behind key-value store.
///
/// # Opening a Vault
///
/// ```rust,ignore
/// use kvault_core::{Vault, VaultConfig};
///
/// let vault = Vault::open_at(Path::new("data"), VaultConfig::default()).await?;
/// vault.put("user.profile", "{\"name\":\"alice\"}").await?;
/// let profile = vault.get("user.profile").await?;
/// vault.shutdown().await?;
/// ```
///
/// # Durability Model
///
/// `put` returns once the value is scheduled; the write-behind flush
/// persists it asynchronously. A successful [`Vault::flush`] confirms
/// every scheduled write reached the backend.
///
/// # Failure Model
///
/// `get` distinguishes "key not found" (`Ok(None)`) from "key existed
/// but could not be read" (`Err`): conflating the two risks silently
/// losing data.
pub struct Vault {
    config: VaultConfig,
    state: RwLock<VaultState>,
    gate: Arc<StoreGate>,
    scheduler: WriteScheduler,
    cipher: Arc<dyn Encryption>,
    codec: ChunkCodec,
    stats: Arc<VaultStats>,
}

impl Vault {
    /// Creates an uninitialized vault over `store`.
    ///
    /// The store is injected so callers control the backend; use
    /// [`Vault::open_at`] or [`Vault::open_in_memory`] for the common
    /// cases. Call [`Vault::initialize`] before any data operation.
    #[must_use]
    pub fn new(config: VaultConfig, store: Arc<dyn RowStore>) -> Self {
        let stats = Arc::new(VaultStats::new());
        let gate = Arc::new(StoreGate::new(
            store,
            config.db_permits,
            config.db_operation_timeout,
        ));
        let scheduler = WriteScheduler::new(
            Arc::clone(&gate),
            config.max_schedule_size,
            Arc::clone(&stats),
        );
        let cipher: Arc<dyn Encryption> = match config.encryption {
            EncryptionMode::Aead => Arc::new(AeadPipeline::new(&config, Arc::clone(&stats))),
            EncryptionMode::Plain => Arc::new(PlainText::new()),
        };
        let codec = ChunkCodec::new(config.max_chunk_size, config.max_chunks_per_key);

        Self {
            config,
            state: RwLock::new(VaultState::Uninitialized),
            gate,
            scheduler,
            cipher,
            codec,
            stats,
        }
    }

    /// Opens an initialized vault stored in a SQLite file under `dir`.
    ///
    /// The file name is derived from the configuration identity, so
    /// differently named or versioned vaults coexist in one directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be opened or probed.
    pub async fn open_at(dir: &Path, config: VaultConfig) -> CoreResult<Self> {
        let store = SqliteRowStore::open(dir.join(config.artifact_name()))?;
        let vault = Self::new(config, Arc::new(store));
        vault.initialize().await?;
        Ok(vault)
    }

    /// Opens an initialized in-memory vault.
    ///
    /// # Errors
    ///
    /// Returns an error if initialization fails.
    pub async fn open_in_memory(config: VaultConfig) -> CoreResult<Self> {
        let vault = Self::new(config, Arc::new(MemoryRowStore::new()));
        vault.initialize().await?;
        Ok(vault)
    }

    /// Returns the configuration this vault was opened with.
    #[must_use]
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> VaultState {
        *self.state.read()
    }

    /// Returns a snapshot of the operation counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Transitions the vault to `Ready`, probing the backend.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] unless the vault is
    /// `Uninitialized`, or the backend error if the probe fails.
    pub async fn initialize(&self) -> CoreResult<()> {
        {
            let mut state = self.state.write();
            if *state != VaultState::Uninitialized {
                return Err(CoreError::InvalidState {
                    operation: "initialize",
                    state: state.name(),
                });
            }
            *state = VaultState::Initializing;
        }

        match self.gate.count().await {
            Ok(rows) => {
                debug!(
                    instance = %self.config.instance_key(),
                    rows,
                    "vault initialized"
                );
                *self.state.write() = VaultState::Ready;
                Ok(())
            }
            Err(error) => {
                *self.state.write() = VaultState::Uninitialized;
                Err(error)
            }
        }
    }

    fn require_ready(&self, operation: &'static str) -> CoreResult<()> {
        let state = *self.state.read();
        if state == VaultState::Ready {
            Ok(())
        } else {
            Err(CoreError::InvalidState {
                operation,
                state: state.name(),
            })
        }
    }

    /// Stores `value` under `key`.
    ///
    /// The value is encrypted (when enabled), split into chunks, and
    /// scheduled for write-behind persistence: data chunks first, the
    /// chunk-count control entry last. Success means every entry was
    /// accepted by the scheduler, not that the backend write already
    /// happened.
    ///
    /// # Errors
    ///
    /// Returns a validation, crypto, or capacity error; on failure the
    /// value is not guaranteed durable and the caller should retry.
    pub async fn put(&self, key: &str, value: &str) -> CoreResult<()> {
        match self.put_impl(key, value).await {
            Ok(()) => Ok(()),
            Err(error) => {
                self.stats.record_failure();
                Err(error)
            }
        }
    }

    async fn put_impl(&self, key: &str, value: &str) -> CoreResult<()> {
        self.require_ready("put")?;
        if key.is_empty() {
            return Err(CoreError::validation("key is empty"));
        }

        // Empty values skip the cipher: they are stored as a single
        // empty chunk so a later get returns "" rather than not-found.
        let encoded = if value.is_empty() {
            String::new()
        } else {
            self.cipher
                .encrypt(key, value)
                .await
                .ok_or_else(|| CoreError::crypto("encryption failed"))?
        };

        let chunks = self.codec.split(&encoded)?;
        for (index, chunk) in chunks.iter().enumerate() {
            if !self
                .scheduler
                .schedule(chunk_key(key, index as u32), chunk.as_str())
            {
                // Withdraw this key's queued chunks so a rejected put
                // does not leave a partial overwrite pending.
                self.scheduler.discard_prefix(&chunk_prefix(key));
                return Err(CoreError::capacity("schedule queue full"));
            }
        }

        // Control entry last, so a reader never sees a count pointing
        // at chunks that were not even scheduled yet.
        if !self
            .scheduler
            .schedule(count_key(key), chunks.len().to_string())
        {
            self.scheduler.discard_prefix(&chunk_prefix(key));
            return Err(CoreError::capacity("schedule queue full"));
        }

        self.stats.record_put(encoded.len() as u64);
        Ok(())
    }

    /// Reads the value stored under `key`.
    ///
    /// Returns `Ok(None)` when the key was never stored. A key whose
    /// control entry exists but whose chunks cannot all be read yields
    /// an [`CoreError::IncompleteValue`] error instead of partial data.
    ///
    /// # Errors
    ///
    /// Returns an error when the key exists but cannot be read back
    /// (missing chunk, failed decryption, backend failure).
    pub async fn get(&self, key: &str) -> CoreResult<Option<String>> {
        match self.get_impl(key).await {
            Ok(value) => Ok(value),
            Err(error) => {
                self.stats.record_failure();
                Err(error)
            }
        }
    }

    async fn get_impl(&self, key: &str) -> CoreResult<Option<String>> {
        self.require_ready("get")?;
        if key.is_empty() {
            return Err(CoreError::validation("key is empty"));
        }

        let control = self.gate.get(count_key(key)).await?;
        let chunk_count = match control {
            // Legacy layout: no control entry means a single chunk.
            None => {
                let Some(chunk) = self.gate.get(chunk_key(key, 0)).await? else {
                    return Ok(None);
                };
                return self.decode_value(key, chunk).await.map(Some);
            }
            // Non-numeric control data is tolerated as legacy
            // single-chunk, matching what older layouts stored.
            Some(raw) => raw.trim().parse::<i64>().unwrap_or(1),
        };

        if chunk_count < 1 {
            return Ok(Some(String::new()));
        }
        if chunk_count > i64::from(self.config.max_chunks_per_key) {
            return Err(CoreError::capacity(format!(
                "control entry for '{key}' claims {chunk_count} chunks, limit is {}",
                self.config.max_chunks_per_key
            )));
        }
        let expected = chunk_count as u32;

        let mut chunks = Vec::with_capacity(expected as usize);
        for index in 0..expected {
            match self.gate.get(chunk_key(key, index)).await? {
                Some(chunk) => chunks.push(chunk),
                None => {
                    return Err(CoreError::IncompleteValue {
                        key: key.to_owned(),
                        missing: index,
                        expected,
                    });
                }
            }
        }

        let joined = self.codec.join(&chunks);
        self.decode_value(key, joined).await.map(Some)
    }

    /// Decrypts an assembled value; empty values bypass the cipher.
    async fn decode_value(&self, key: &str, encoded: String) -> CoreResult<String> {
        if encoded.is_empty() {
            self.stats.record_get(0);
            return Ok(String::new());
        }
        let value = self
            .cipher
            .decrypt(key, &encoded)
            .await
            .ok_or_else(|| CoreError::crypto("decryption failed"))?;
        self.stats.record_get(value.len() as u64);
        Ok(value)
    }

    /// Deletes the value stored under `key`.
    ///
    /// Pending scheduled writes for the key are withdrawn, then the
    /// control entry and every chunk row are removed. Idempotent:
    /// deleting an absent key returns `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend delete fails.
    pub async fn delete(&self, key: &str) -> CoreResult<bool> {
        self.require_ready("delete")?;
        if key.is_empty() {
            return Err(CoreError::validation("key is empty"));
        }

        self.scheduler.discard(&count_key(key));
        self.scheduler.discard_prefix(&chunk_prefix(key));

        let control_removed = self.gate.delete(count_key(key)).await?;
        let chunks_removed = self.gate.delete_prefix(chunk_prefix(key)).await?;

        self.stats.record_delete();
        Ok(control_removed || chunks_removed > 0)
    }

    /// Deletes every value in the vault.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend delete fails.
    pub async fn delete_all(&self) -> CoreResult<bool> {
        self.require_ready("delete_all")?;
        self.scheduler.discard_all();
        let removed = self.gate.delete_all().await?;
        self.stats.record_delete();
        Ok(removed)
    }

    /// Returns true when `key` holds a non-empty value.
    ///
    /// # Errors
    ///
    /// Returns an error when the stored value cannot be read.
    pub async fn contains(&self, key: &str) -> CoreResult<bool> {
        let value = self.get(key).await?;
        Ok(value.is_some_and(|v| !v.is_empty()))
    }

    /// Returns the number of physical rows in the backend.
    ///
    /// A chunked value contributes its chunk rows plus one control
    /// row, so this is not the number of logical keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend count fails.
    pub async fn count(&self) -> CoreResult<u64> {
        self.require_ready("count")?;
        self.gate.count().await
    }

    /// Flushes until every scheduled write is durable.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Timeout`] when pending writes could not be
    /// confirmed within `timeout`.
    pub async fn flush(&self, timeout: Duration) -> CoreResult<()> {
        self.require_ready("flush")?;
        self.scheduler.drain(timeout).await
    }

    /// Number of writes currently awaiting their flush.
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.scheduler.pending_len()
    }

    /// Flushes pending writes and releases the backend handle.
    ///
    /// Data remains on disk; a new vault over the same artifact sees
    /// it. After shutdown every data operation fails fast.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] unless the vault is
    /// `Ready`.
    pub async fn shutdown(&self) -> CoreResult<()> {
        {
            let mut state = self.state.write();
            if *state != VaultState::Ready {
                return Err(CoreError::InvalidState {
                    operation: "shutdown",
                    state: state.name(),
                });
            }
            *state = VaultState::ShuttingDown;
        }

        if let Err(error) = self.scheduler.drain(self.config.db_operation_timeout).await {
            warn!(%error, pending = self.scheduler.pending_len(), "shutdown with unflushed writes");
        }
        self.gate.shutdown().await
    }

    /// Shuts down and irreversibly erases the storage artifact.
    ///
    /// The vault transitions to `Terminated`, which is absorbing.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] if the vault is already
    /// terminated or never initialized, or the backend error if the
    /// erase fails.
    pub async fn terminate(&self) -> CoreResult<()> {
        let was_ready = {
            let mut state = self.state.write();
            match *state {
                VaultState::Ready => {
                    *state = VaultState::ShuttingDown;
                    true
                }
                VaultState::ShuttingDown => false,
                other => {
                    return Err(CoreError::InvalidState {
                        operation: "terminate",
                        state: other.name(),
                    });
                }
            }
        };

        if was_ready {
            // Pending writes are dropped: the artifact is about to be
            // erased anyway.
            self.scheduler.discard_all();
        }

        self.gate.terminate().await?;
        *self.state.write() = VaultState::Terminated;
        Ok(())
    }
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("instance", &self.config.instance_key())
            .field("state", &self.state())
            .field("pending_writes", &self.pending_writes())
            .finish()
    }
}
