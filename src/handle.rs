//! Client-facing transaction handle

use crate::db::DbInner;
use crate::error::Result;
use crate::transaction::TransactionState;
use std::hash::Hash;

/// A transaction handle obtained from [`crate::Db::begin`].
///
/// The handle is lazy: creating one takes no locks and allocates nothing.
/// The first [`get`](Txn::get) or [`put`](Txn::put) snapshots the
/// database's timestamp counter and registers the transaction as live;
/// from then on reads consult the transaction's own staged writes before
/// the committed store, and every observed key is remembered for
/// validation.
///
/// A handle is externally synchronized: use one handle per worker. Safety
/// across handles is the transaction manager's job.
///
/// Dropping a handle that was never committed deregisters it, so an
/// abandoned transaction cannot hold back history garbage collection.
pub struct Txn<'db, K, V> {
    inner: &'db DbInner<K, V>,
    state: Option<TransactionState<K, V>>,
    finished: bool,
}

impl<'db, K, V> Txn<'db, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub(crate) fn new(inner: &'db DbInner<K, V>) -> Self {
        Self {
            inner,
            state: None,
            finished: false,
        }
    }

    fn state_mut(&mut self) -> &mut TransactionState<K, V> {
        assert!(
            !self.finished,
            "transaction handle used after commit; begin a new transaction"
        );
        if self.state.is_none() {
            self.state = Some(self.inner.manager.register());
        }
        self.state.as_mut().expect("state initialized above")
    }

    /// Read a key.
    ///
    /// Returns the transaction's own staged value if it wrote the key,
    /// otherwise the committed value, or `None` if the key does not exist.
    /// The key enters the read set either way and will be validated at
    /// commit. Reading never raises a conflict by itself.
    ///
    /// # Panics
    ///
    /// Panics if the transaction already finished.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let state = self.state_mut();
        if let Some(staged) = state.observe(key) {
            return Some(staged);
        }
        self.inner.store.get(key)
    }

    /// Stage a write.
    ///
    /// The value is buffered privately until commit; the committed store is
    /// untouched and no lock is taken on it. Within the transaction the
    /// last write to a key wins.
    ///
    /// # Panics
    ///
    /// Panics if the transaction already finished.
    pub fn put(&mut self, key: K, value: V) {
        self.state_mut().stage(key, value);
    }

    /// Validate the transaction and install its writes.
    ///
    /// A transaction that never read nor wrote commits trivially. On
    /// conflict the transaction is discarded without touching committed
    /// state and [`Error::Conflict`](crate::Error::Conflict) is returned;
    /// the handle must not be used for further reads or writes.
    ///
    /// Idempotent: calling `commit` again on a finished handle (committed
    /// or conflicted) is a no-op returning `Ok(())`.
    pub fn commit(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let Some(state) = self.state.take() else {
            // Never initialized: nothing to validate, nothing to install.
            return Ok(());
        };

        match self.inner.manager.commit(&self.inner.store, state) {
            Ok(_commit_ts) => {
                self.inner.counters.record_commit();
                Ok(())
            }
            Err(e) => {
                self.inner.counters.record_abort();
                Err(e)
            }
        }
    }
}

impl<K, V> Drop for Txn<'_, K, V> {
    fn drop(&mut self) {
        // Registered but never committed: leave the live set so history
        // pruning is not pinned by an abandoned handle.
        if let Some(state) = self.state.take() {
            self.inner.manager.deregister(state.id);
        }
    }
}
