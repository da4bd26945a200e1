//! Per-transaction working state
//!
//! A transaction buffers every write privately and records every key it
//! observes. Nothing touches the committed store until validation passes,
//! so an abort never leaves partial writes behind.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Logical timestamps dispensed by the transaction manager.
///
/// `start_ts` is the counter value snapshotted at a transaction's first
/// read or write; `commit_ts` is allocated under the validation lock and is
/// strictly increasing across successful commits. Aborts never consume a
/// timestamp.
pub(crate) type Timestamp = u64;

/// Live-set registration id. Drawn from its own counter, unrelated to
/// timestamps: an aborted transaction consumes an id but no timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct TxnId(pub(crate) u64);

/// Working state of one in-flight transaction.
///
/// Single-owner at every instant: owned by the handle until commit, at
/// which point the write set moves into history. The write set shadows the
/// committed store for the transaction's own reads; any key observed via a
/// read enters the read set, including keys this transaction wrote itself.
pub(crate) struct TransactionState<K, V> {
    pub(crate) id: TxnId,
    pub(crate) start_ts: Timestamp,
    pub(crate) read_set: HashSet<K>,
    pub(crate) write_set: HashMap<K, V>,
}

impl<K, V> TransactionState<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub(crate) fn new(id: TxnId, start_ts: Timestamp) -> Self {
        Self {
            id,
            start_ts,
            read_set: HashSet::new(),
            write_set: HashMap::new(),
        }
    }

    /// Record that `key` was observed and return the staged value if this
    /// transaction already wrote it.
    pub(crate) fn observe(&mut self, key: &K) -> Option<V> {
        self.read_set.insert(key.clone());
        self.write_set.get(key).cloned()
    }

    /// Stage a write. Last write wins within the transaction; the read set
    /// is untouched.
    pub(crate) fn stage(&mut self, key: K, value: V) {
        self.write_set.insert(key, value);
    }
}

/// Immutable write-set snapshot of a committed transaction, retained in
/// history so still-live transactions can validate against it.
pub(crate) struct CommittedRecord<K, V> {
    write_set: HashMap<K, V>,
}

impl<K, V> CommittedRecord<K, V>
where
    K: Eq + Hash,
{
    pub(crate) fn new(write_set: HashMap<K, V>) -> Self {
        Self { write_set }
    }

    /// True if this record wrote any key the given read set observed.
    pub(crate) fn writes_any_of(&self, read_set: &HashSet<K>) -> bool {
        self.write_set.keys().any(|key| read_set.contains(key))
    }
}
