//! Transaction manager: timestamps, live-transaction registry, validation,
//! and the committed history
//!
//! Commits follow backward validation OCC: a committing transaction checks
//! its read set against the write set of every transaction that committed
//! after its snapshot. The history mutex doubles as the validation lock:
//! validation, the install phase, commit-timestamp allocation, and history
//! pruning all serialize on it, so two commits can never interleave their
//! write phases.
//!
//! ## Commit sequence
//!
//! ```text
//! 1. Lock history (the validation lock)
//! 2. snap_high = read_counter()
//! 3. Scan history over [start_ts, snap_high); any record whose write set
//!    intersects the read set aborts with Conflict
//! 4. Install the write set into the committed store (per-key exclusion)
//! 5. commit_ts = allocate_commit_ts()
//! 6. Move the write set into history at commit_ts
//! 7. Deregister from the live set
//! ```
//!
//! Blind writes are deliberately permitted: two transactions that write the
//! same key without reading it both commit, and the later commit_ts wins.
//! Callers that need write-skew protection must read before writing.

use crate::error::{Error, Result};
use crate::store::CommittedStore;
use crate::transaction::{CommittedRecord, Timestamp, TransactionState, TxnId};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Owns every piece of transactional bookkeeping: the timestamp counter,
/// the live-transaction set, and the committed history.
pub(crate) struct TransactionManager<K, V> {
    /// Next timestamp to dispense. Read without any lock; incremented only
    /// while the history mutex is held.
    next_ts: AtomicU64,
    /// Live-set registration ids.
    next_txn_id: AtomicU64,
    /// Committed transactions retained for validation, keyed by commit_ts.
    /// The mutex is the validation lock.
    history: Mutex<BTreeMap<Timestamp, CommittedRecord<K, V>>>,
    /// `start_ts` of every live transaction. May be locked while the
    /// history mutex is held, never the other way around.
    live: Mutex<HashMap<TxnId, Timestamp>>,
}

impl<K, V> TransactionManager<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            next_ts: AtomicU64::new(0),
            next_txn_id: AtomicU64::new(0),
            history: Mutex::new(BTreeMap::new()),
            live: Mutex::new(HashMap::new()),
        }
    }

    /// Current value of the timestamp counter.
    pub(crate) fn read_counter(&self) -> Timestamp {
        self.next_ts.load(Ordering::Acquire)
    }

    /// Remove a transaction from the live set.
    ///
    /// Idempotent; called on commit, on validation failure, and from the
    /// handle's drop path for transactions abandoned before commit.
    pub(crate) fn deregister(&self, id: TxnId) {
        self.live.lock().remove(&id);
    }

    /// Minimum `start_ts` across live transactions, or `None` when no
    /// transaction is live. Transactions that have not performed a read or
    /// write are not registered and therefore cannot pin history.
    pub(crate) fn min_live_start_ts(&self) -> Option<Timestamp> {
        self.live.lock().values().min().copied()
    }

    /// Erase every committed record with `commit_ts < bound`. Returns the
    /// number of records reclaimed.
    pub(crate) fn prune_below(&self, bound: Timestamp) -> usize {
        let mut history = self.history.lock();
        let retained = history.split_off(&bound);
        let pruned = history.len();
        *history = retained;
        pruned
    }

    pub(crate) fn live_count(&self) -> usize {
        self.live.lock().len()
    }

    pub(crate) fn history_len(&self) -> usize {
        self.history.lock().len()
    }

    /// Allocate the next commit timestamp. Only called while the history
    /// mutex is held, which serializes all increments.
    ///
    /// # Panics
    ///
    /// Panics if the counter reaches `u64::MAX` (overflow).
    fn allocate_commit_ts(&self) -> Timestamp {
        self.next_ts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_add(1))
            .expect("timestamp counter overflow: u64::MAX reached")
    }
}

impl<K, V> TransactionManager<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Register a new live transaction: snapshot the timestamp counter and
    /// enter it into the live set.
    ///
    /// Called lazily at a transaction's first read or write. Any read the
    /// transaction performs happens after registration completes, so the
    /// garbage collector can never reclaim a record the transaction might
    /// still validate against.
    pub(crate) fn register(&self) -> TransactionState<K, V> {
        let id = TxnId(self.next_txn_id.fetch_add(1, Ordering::Relaxed));
        let start_ts = self.read_counter();
        self.live.lock().insert(id, start_ts);
        TransactionState::new(id, start_ts)
    }

    /// Validate a transaction and, on success, install its writes.
    ///
    /// On conflict the transaction is deregistered and discarded; committed
    /// state is untouched. On success the write set is installed
    /// atomically with respect to other commits and the state moves into
    /// history under the freshly allocated commit timestamp.
    pub(crate) fn commit(
        &self,
        store: &CommittedStore<K, V>,
        txn: TransactionState<K, V>,
    ) -> Result<Timestamp> {
        let mut history = self.history.lock();

        // Every commit_ts is allocated under the history mutex, so all
        // existing records sit strictly below this snapshot; the scan window
        // is half-open.
        let snap_high = self.read_counter();
        for (&committed_ts, record) in history.range(txn.start_ts..snap_high) {
            if record.writes_any_of(&txn.read_set) {
                trace!(
                    start_ts = txn.start_ts,
                    committed_ts,
                    "validation failed, aborting"
                );
                self.live.lock().remove(&txn.id);
                return Err(Error::conflict(format!(
                    "read set overlaps a transaction committed at ts {committed_ts}"
                )));
            }
        }

        // Install phase. The history mutex is still held, so racing commits
        // cannot interleave their installs; per-key exclusion inside the
        // store keeps readers consistent.
        for (key, value) in &txn.write_set {
            store.insert(key.clone(), value.clone());
        }

        let commit_ts = self.allocate_commit_ts();
        history.insert(commit_ts, CommittedRecord::new(txn.write_set));
        self.live.lock().remove(&txn.id);
        Ok(commit_ts)
    }
}
