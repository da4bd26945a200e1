//! Database metrics
//!
//! # Memory Ordering
//!
//! The counters use `Relaxed` ordering intentionally:
//! 1. They are purely observational, for monitoring and tests
//! 2. They do not synchronize any other memory operations
//! 3. The atomic operations still guarantee no torn reads/writes

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic event counters shared between the commit path and the
/// garbage collector.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    committed: AtomicU64,
    aborted: AtomicU64,
    pruned: AtomicU64,
}

impl Counters {
    pub(crate) fn record_commit(&self) {
        self.committed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a validation failure. Handles dropped without committing are
    /// not counted here.
    pub(crate) fn record_abort(&self) {
        self.aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_pruned(&self, count: u64) {
        self.pruned.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn committed(&self) -> u64 {
        self.committed.load(Ordering::Relaxed)
    }

    pub(crate) fn aborted(&self) -> u64 {
        self.aborted.load(Ordering::Relaxed)
    }

    pub(crate) fn pruned(&self) -> u64 {
        self.pruned.load(Ordering::Relaxed)
    }
}

/// Point-in-time snapshot of database metrics.
///
/// Returned by [`crate::Db::stats`]. Gauges are read under short lock
/// acquisitions and may be mutually inconsistent by a few operations when
/// transactions are in flight; each individual field is accurate at the
/// moment it was sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbStats {
    /// Number of keys in the committed store.
    pub num_keys: usize,
    /// Committed transactions currently retained for validation.
    pub history_len: usize,
    /// Transactions that have performed at least one read or write and not
    /// yet finished.
    pub live_txns: usize,
    /// Total successful commits.
    pub committed: u64,
    /// Total validation failures.
    pub aborted: u64,
    /// Total history records reclaimed by the garbage collector.
    pub pruned: u64,
}
