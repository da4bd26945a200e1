//! Committed key-value state
//!
//! A thin wrapper over `DashMap`: reads take shared per-shard access and
//! never serialize against each other, writers on different keys proceed in
//! parallel, and a reader racing an upsert sees either the old or the new
//! value, never a torn one. There is no global read lock.

use dashmap::DashMap;
use std::hash::Hash;

/// The authoritative committed state, `Key -> Value`.
pub(crate) struct CommittedStore<K, V> {
    map: DashMap<K, V>,
}

impl<K, V> CommittedStore<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            map: DashMap::new(),
        }
    }

    /// Look up the committed value for a key.
    pub(crate) fn get(&self, key: &K) -> Option<V> {
        self.map.get(key).map(|entry| entry.value().clone())
    }

    /// Upsert a key under its shard's exclusive lock.
    pub(crate) fn insert(&self, key: K, value: V) {
        self.map.insert(key, value);
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }
}
