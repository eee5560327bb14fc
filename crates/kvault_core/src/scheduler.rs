//! Write-behind scheduler.
//!
//! Writes are acknowledged immediately into an in-memory pending map
//! and persisted asynchronously by a background flush. The pending map
//! is keyed by physical key with last-write-wins semantics: scheduling
//! a key twice before the flush overwrites the first value. Exactly one
//! flush runs at a time, guarded by an atomic flag; a flush pass writes
//! a snapshot of the pending entries through the access gate and
//! removes only the entries whose write succeeded and whose value was
//! not overwritten mid-flight. Failed entries stay queued and are
//! retried on the next trigger.
//!
//! This gives eventual durability with at least one flush attempt per
//! schedule, not immediate durability. Callers that need a durability
//! guarantee await [`WriteScheduler::drain`].

use crate::error::{CoreError, CoreResult};
use crate::gate::StoreGate;
use crate::stats::VaultStats;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{debug, warn};

/// A pending write awaiting its flush.
#[derive(Debug, Clone)]
struct ScheduleEntry {
    value: String,
    /// Monotonic sequence; an overwrite gets a fresh sequence so the
    /// flush never removes a value it did not write.
    seq: u64,
    enqueued_at: Instant,
}

struct SchedulerInner {
    pending: RwLock<HashMap<String, ScheduleEntry>>,
    max_entries: usize,
    flushing: AtomicBool,
    sequence: AtomicU64,
    gate: Arc<StoreGate>,
    stats: Arc<VaultStats>,
    /// Notified after every flush pass; `drain` waits on this.
    idle: Notify,
}

/// Deduplicating write-behind queue in front of the access gate.
///
/// Cloning is cheap; clones share the same queue.
#[derive(Clone)]
pub struct WriteScheduler {
    inner: Arc<SchedulerInner>,
}

impl WriteScheduler {
    /// Creates a scheduler flushing through `gate`, holding at most
    /// `max_entries` pending writes.
    #[must_use]
    pub fn new(gate: Arc<StoreGate>, max_entries: usize, stats: Arc<VaultStats>) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                pending: RwLock::new(HashMap::new()),
                max_entries,
                flushing: AtomicBool::new(false),
                sequence: AtomicU64::new(0),
                gate,
                stats,
                idle: Notify::new(),
            }),
        }
    }

    /// Enqueues a physical write and triggers a flush.
    ///
    /// Returns `false` when the queue is full and `key` is not already
    /// queued; existing entries are never evicted to make room. Must be
    /// called from within a tokio runtime.
    pub fn schedule(&self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        {
            let mut pending = self.inner.pending.write();
            if pending.len() >= self.inner.max_entries && !pending.contains_key(&key) {
                warn!(
                    key = %key,
                    limit = self.inner.max_entries,
                    "schedule queue full, rejecting write"
                );
                self.inner.stats.record_failure();
                return false;
            }
            let seq = self.inner.sequence.fetch_add(1, Ordering::Relaxed);
            pending.insert(
                key,
                ScheduleEntry {
                    value: value.into(),
                    seq,
                    enqueued_at: Instant::now(),
                },
            );
        }
        Self::trigger(&self.inner);
        true
    }

    /// Number of writes currently pending.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.inner.pending.read().len()
    }

    /// Drops the pending entry for `key`, if any.
    ///
    /// Used when the logical value is deleted before its flush.
    pub fn discard(&self, key: &str) {
        self.inner.pending.write().remove(key);
    }

    /// Drops every pending entry whose key starts with `prefix`.
    pub fn discard_prefix(&self, prefix: &str) {
        self.inner
            .pending
            .write()
            .retain(|k, _| !k.starts_with(prefix));
    }

    /// Drops every pending entry.
    pub fn discard_all(&self) {
        self.inner.pending.write().clear();
    }

    /// Triggers a flush and waits until the queue is empty.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Timeout`] when the queue did not empty
    /// within `timeout` - entries whose writes keep failing stay
    /// queued.
    pub async fn drain(&self, timeout: Duration) -> CoreResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.inner.pending.read().is_empty() {
                return Ok(());
            }
            Self::trigger(&self.inner);

            let notified = self.inner.idle.notified();
            let Some(remaining) = deadline.checked_duration_since(Instant::now()).filter(|d| !d.is_zero())
            else {
                return Err(CoreError::timeout("drain", timeout));
            };
            // Wake on flush completion, or re-check periodically.
            let _ = tokio::time::timeout(remaining.min(Duration::from_millis(50)), notified).await;
        }
    }

    /// Starts the flush task unless one is already in flight.
    fn trigger(inner: &Arc<SchedulerInner>) {
        if inner
            .flushing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let inner = Arc::clone(inner);
            tokio::spawn(Self::run_flush(inner));
        }
    }

    /// The single-flight flush loop.
    async fn run_flush(inner: Arc<SchedulerInner>) {
        // Exclusive high-water mark of attempted sequences. Entries
        // below it already failed this flight; they wait for the next
        // trigger rather than being retried in a hot loop.
        let mut attempted = 0u64;

        loop {
            let snapshot: Vec<(String, ScheduleEntry)> = inner
                .pending
                .read()
                .iter()
                .filter(|(_, entry)| entry.seq >= attempted)
                .map(|(key, entry)| (key.clone(), entry.clone()))
                .collect();

            if snapshot.is_empty() {
                break;
            }
            attempted = snapshot
                .iter()
                .map(|(_, entry)| entry.seq)
                .max()
                .unwrap_or(attempted)
                + 1;

            debug!(entries = snapshot.len(), "flushing pending writes");

            for (key, entry) in snapshot {
                match inner.gate.put(key.clone(), entry.value).await {
                    Ok(()) => {
                        let mut pending = inner.pending.write();
                        if pending.get(&key).map(|e| e.seq) == Some(entry.seq) {
                            pending.remove(&key);
                        }
                    }
                    Err(error) => {
                        warn!(
                            key = %key,
                            %error,
                            age_ms = entry.enqueued_at.elapsed().as_millis() as u64,
                            "flush write failed, entry stays queued"
                        );
                        inner.stats.record_flush_failure();
                    }
                }
            }

            inner.stats.record_flush();
            inner.idle.notify_waiters();
        }

        inner.flushing.store(false, Ordering::Release);
        inner.idle.notify_waiters();

        // An entry scheduled while the flag was still set would have
        // skipped its trigger; pick it up now.
        let missed = inner
            .pending
            .read()
            .values()
            .any(|entry| entry.seq >= attempted);
        if missed {
            Self::trigger(&inner);
        }
    }
}

impl std::fmt::Debug for WriteScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteScheduler")
            .field("pending", &self.pending_len())
            .field("max_entries", &self.inner.max_entries)
            .finish()
    }
}
