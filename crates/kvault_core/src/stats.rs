//! Vault statistics and telemetry.
//!
//! Counters for monitoring engine behavior. All counters are atomic and
//! monotonically increasing; they are observability-only and never gate
//! correctness.

use std::sync::atomic::{AtomicU64, Ordering};

/// Operation counters for a vault instance.
///
/// Shared via `Arc` between the facade, the scheduler, and the crypto
/// pipeline. Values can be read while operations are in progress.
#[derive(Debug, Default)]
pub struct VaultStats {
    /// Total number of logical put operations.
    puts: AtomicU64,
    /// Total number of logical get operations.
    gets: AtomicU64,
    /// Total number of logical delete operations.
    deletes: AtomicU64,
    /// Total number of failed operations.
    failures: AtomicU64,
    /// Total number of flush passes completed.
    flushes: AtomicU64,
    /// Total number of flush entry writes that failed.
    flush_failures: AtomicU64,
    /// Total encryption attempts.
    encryptions: AtomicU64,
    /// Total decryption attempts.
    decryptions: AtomicU64,
    /// Total crypto operations that failed or timed out.
    crypto_failures: AtomicU64,
    /// Total bytes scheduled for write.
    bytes_written: AtomicU64,
    /// Total bytes read back from the backend.
    bytes_read: AtomicU64,
}

impl VaultStats {
    /// Creates a new stats instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // === Increment methods (internal use) ===

    /// Records a logical put.
    pub(crate) fn record_put(&self, bytes: u64) {
        self.puts.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Records a logical get.
    pub(crate) fn record_get(&self, bytes: u64) {
        self.gets.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Records a logical delete.
    pub(crate) fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed operation.
    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a completed flush pass.
    pub(crate) fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed flush entry write.
    pub(crate) fn record_flush_failure(&self) {
        self.flush_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an encryption attempt.
    pub(crate) fn record_encryption(&self) {
        self.encryptions.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a decryption attempt.
    pub(crate) fn record_decryption(&self) {
        self.decryptions.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed crypto operation.
    pub(crate) fn record_crypto_failure(&self) {
        self.crypto_failures.fetch_add(1, Ordering::Relaxed);
    }

    // === Getter methods (public API) ===

    /// Returns the total number of logical puts.
    pub fn puts(&self) -> u64 {
        self.puts.load(Ordering::Relaxed)
    }

    /// Returns the total number of logical gets.
    pub fn gets(&self) -> u64 {
        self.gets.load(Ordering::Relaxed)
    }

    /// Returns the total number of logical deletes.
    pub fn deletes(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }

    /// Returns the total number of failed operations.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Returns the total number of completed flush passes.
    pub fn flushes(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    /// Returns the total number of failed flush entry writes.
    pub fn flush_failures(&self) -> u64 {
        self.flush_failures.load(Ordering::Relaxed)
    }

    /// Returns the total number of encryption attempts.
    pub fn encryptions(&self) -> u64 {
        self.encryptions.load(Ordering::Relaxed)
    }

    /// Returns the total number of decryption attempts.
    pub fn decryptions(&self) -> u64 {
        self.decryptions.load(Ordering::Relaxed)
    }

    /// Returns the total number of failed crypto operations.
    pub fn crypto_failures(&self) -> u64 {
        self.crypto_failures.load(Ordering::Relaxed)
    }

    /// Returns the total bytes scheduled for write.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Returns the total bytes read back from the backend.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            puts: self.puts(),
            gets: self.gets(),
            deletes: self.deletes(),
            failures: self.failures(),
            flushes: self.flushes(),
            flush_failures: self.flush_failures(),
            encryptions: self.encryptions(),
            decryptions: self.decryptions(),
            crypto_failures: self.crypto_failures(),
            bytes_written: self.bytes_written(),
            bytes_read: self.bytes_read(),
        }
    }
}

/// A point-in-time snapshot of vault statistics.
///
/// Unlike [`VaultStats`], this is a plain struct that can be compared
/// or passed across threads without atomics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Total number of logical put operations.
    pub puts: u64,
    /// Total number of logical get operations.
    pub gets: u64,
    /// Total number of logical delete operations.
    pub deletes: u64,
    /// Total number of failed operations.
    pub failures: u64,
    /// Total number of flush passes completed.
    pub flushes: u64,
    /// Total number of flush entry writes that failed.
    pub flush_failures: u64,
    /// Total encryption attempts.
    pub encryptions: u64,
    /// Total decryption attempts.
    pub decryptions: u64,
    /// Total failed crypto operations.
    pub crypto_failures: u64,
    /// Total bytes scheduled for write.
    pub bytes_written: u64,
    /// Total bytes read back from the backend.
    pub bytes_read: u64,
}
