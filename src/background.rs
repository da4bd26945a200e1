//! Background history maintenance
//!
//! The `optikv-gc` thread runs alongside the database and prunes the
//! committed history. It parks on a timed condvar wait and wakes early
//! when shutdown is signalled; [`crate::Db`]'s drop joins it.

use crate::db::DbInner;
use crate::transaction::Timestamp;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::debug;

/// One-shot shutdown flag with a condvar for timed waits.
pub(crate) struct ShutdownSignal {
    state: Mutex<bool>,
    cv: Condvar,
}

impl ShutdownSignal {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(false),
            cv: Condvar::new(),
        }
    }

    /// Park for up to `timeout`, returning early if shutdown is signalled.
    /// Returns true once shutdown has been requested.
    ///
    /// A spurious wakeup surfaces as an early `false`, which only makes the
    /// caller run one maintenance pass ahead of schedule.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut shut = self.state.lock();
        if !*shut {
            self.cv.wait_for(&mut shut, timeout);
        }
        *shut
    }

    /// Request shutdown and wake every waiter.
    ///
    /// The flag is flipped while holding the lock so a worker between its
    /// flag check and its condvar wait cannot miss the notification.
    pub(crate) fn signal(&self) {
        let mut shut = self.state.lock();
        *shut = true;
        self.cv.notify_all();
    }
}

/// Launch the history garbage collector.
pub(crate) fn spawn_gc_worker<K, V>(inner: Arc<DbInner<K, V>>) -> JoinHandle<()>
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    std::thread::Builder::new()
        .name("optikv-gc".to_string())
        .spawn(move || gc_loop(&inner))
        .expect("failed to spawn gc worker thread")
}

/// Prune committed records no live transaction can still validate against.
///
/// The bound is the minimum `start_ts` across live transactions: any record
/// with `commit_ts` at or above it may still fall inside some live
/// transaction's validation window and must survive. With no live
/// transactions the whole history is reclaimable.
fn gc_loop<K, V>(inner: &DbInner<K, V>) {
    debug!("gc worker started");
    loop {
        if inner.shutdown.wait_timeout(inner.config.gc_interval) {
            debug!("gc worker exiting");
            return;
        }

        let bound = inner
            .manager
            .min_live_start_ts()
            .unwrap_or(Timestamp::MAX);
        let pruned = inner.manager.prune_below(bound);
        if pruned > 0 {
            inner.counters.record_pruned(pruned as u64);
        }
    }
}
