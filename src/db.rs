//! Database facade
//!
//! [`Db`] wires the committed store, the transaction manager, and the
//! background garbage collector together behind a small surface: `begin`,
//! `stats`, and drop-time shutdown. Each `Db` is fully self-contained;
//! there is no process-wide state.

use crate::background::{self, ShutdownSignal};
use crate::config::DbConfig;
use crate::handle::Txn;
use crate::manager::TransactionManager;
use crate::stats::{Counters, DbStats};
use crate::store::CommittedStore;
use std::hash::Hash;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::debug;

/// State shared between client handles and the garbage collector.
pub(crate) struct DbInner<K, V> {
    pub(crate) store: CommittedStore<K, V>,
    pub(crate) manager: TransactionManager<K, V>,
    pub(crate) counters: Counters,
    pub(crate) config: DbConfig,
    pub(crate) shutdown: ShutdownSignal,
}

impl<K, V> DbInner<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Snapshot the database metrics. Gauges are read under short lock
    /// acquisitions; the commit path is not blocked for the duration of
    /// the snapshot.
    pub(crate) fn stats(&self) -> DbStats {
        DbStats {
            num_keys: self.store.len(),
            history_len: self.manager.history_len(),
            live_txns: self.manager.live_count(),
            committed: self.counters.committed(),
            aborted: self.counters.aborted(),
            pruned: self.counters.pruned(),
        }
    }
}

/// An embedded in-memory key-value store with optimistic transactions.
///
/// Writes go through transactions obtained from [`begin`](Db::begin);
/// commits validate against recently committed transactions and either
/// install atomically or fail with
/// [`Error::Conflict`](crate::Error::Conflict). A background worker prunes
/// the committed history once no live transaction can still need it.
///
/// `Db` is `Send + Sync`; share it across threads with `Arc` and give each
/// worker its own transaction handle.
///
/// Dropping the database signals the garbage collector and joins it.
pub struct Db<K, V> {
    inner: Arc<DbInner<K, V>>,
    gc_worker: Option<JoinHandle<()>>,
}

impl<K, V> Db<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty store with [`DbConfig::default`] and launch the
    /// garbage collector.
    pub fn new() -> Self {
        Self::with_config(DbConfig::default())
    }

    /// Create an empty store with an explicit configuration.
    pub fn with_config(config: DbConfig) -> Self {
        let inner = Arc::new(DbInner {
            store: CommittedStore::new(),
            manager: TransactionManager::new(),
            counters: Counters::default(),
            config,
            shutdown: ShutdownSignal::new(),
        });

        let gc_worker = background::spawn_gc_worker(Arc::clone(&inner));
        debug!("database started");

        Self {
            inner,
            gc_worker: Some(gc_worker),
        }
    }

    /// Begin a transaction.
    ///
    /// Non-blocking and free until the first read or write; see [`Txn`].
    pub fn begin(&self) -> Txn<'_, K, V> {
        Txn::new(&self.inner)
    }

    /// Snapshot the database metrics.
    pub fn stats(&self) -> DbStats {
        self.inner.stats()
    }
}

impl<K, V> Default for Db<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Drop for Db<K, V> {
    fn drop(&mut self) {
        self.inner.shutdown.signal();
        if let Some(handle) = self.gc_worker.take() {
            let _ = handle.join();
        }
    }
}
