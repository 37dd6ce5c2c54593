//! A simpler keyed store for the non-`Link` record kinds.
//!
//! §3: "Addresses, routes and neighbors are looked up by composite key,
//! never shared by handle — callers that want one get a copy." There is
//! no trie (nothing to name-index) and no refcounted sharing, so a plain
//! `HashMap` behind one mutex is the whole table; the custom chained
//! hash table in [`super::link_store`] is reserved for the one kind the
//! design calls out for it.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

/// A byte-size estimator for a stored record, used to keep the engine's
/// running `total_bytes` counter in sync without re-walking every record.
pub trait ByteSized {
    fn byte_size(&self) -> usize;
}

pub struct KindStore<K, V> {
    inner: Mutex<HashMap<K, V>>,
    nonce: std::sync::atomic::AtomicU64,
}

impl<K, V> KindStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + ByteSized,
{
    pub fn new() -> Self {
        KindStore {
            inner: Mutex::new(HashMap::new()),
            nonce: std::sync::atomic::AtomicU64::new(0),
        }
    }

    pub fn nonce(&self) -> u64 {
        self.nonce.load(std::sync::atomic::Ordering::Acquire)
    }

    fn bump_nonce(&self) {
        self.nonce.fetch_add(1, std::sync::atomic::Ordering::AcqRel);
    }

    /// Inserts or replaces the record at `key`. Returns the byte-size
    /// delta versus whatever was there before (0 if this was a fresh
    /// insert minus nothing, i.e. just the new size) and whether this was
    /// a fresh insert, so the caller can update kind/engine-wide stats.
    pub fn upsert(&self, key: K, value: V) -> (i64, bool) {
        let mut inner = self.inner.lock().unwrap();
        let new_size = value.byte_size() as i64;
        let (delta, is_new) = match inner.insert(key, value) {
            Some(old) => (new_size - old.byte_size() as i64, false),
            None => (new_size, true),
        };
        self.bump_nonce();
        (delta, is_new)
    }

    /// Removes the record at `key`, returning it plus its byte size for
    /// stats bookkeeping.
    pub fn remove(&self, key: &K) -> Option<(V, usize)> {
        let mut inner = self.inner.lock().unwrap();
        let removed = inner.remove(key)?;
        let size = removed.byte_size();
        self.bump_nonce();
        Some((removed, size))
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let inner = self.inner.lock().unwrap();
        inner.get(key).cloned()
    }

    pub fn count(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn snapshot(&self) -> Vec<V> {
        self.inner.lock().unwrap().values().cloned().collect()
    }

    /// Snapshot starting at the `start`th entry in iteration order, for
    /// cursor-resumed enumeration (§3[FULL]'s kind-scoped enumerators).
    /// Iteration order over an unmutated `HashMap` is stable across calls,
    /// which is all a resumable cursor needs; a mutation in between is
    /// caught by the nonce check in [`Self::nonce`] regardless.
    pub fn snapshot_from(&self, start: usize) -> Vec<V> {
        self.inner.lock().unwrap().values().skip(start).cloned().collect()
    }
}

impl<K, V> Default for KindStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + ByteSized,
{
    fn default() -> Self {
        Self::new()
    }
}

impl ByteSized for crate::record::Addr {
    fn byte_size(&self) -> usize {
        self.raw_attrs().len()
    }
}

impl ByteSized for crate::record::Route {
    fn byte_size(&self) -> usize {
        self.raw_attrs().len()
    }
}

impl ByteSized for crate::record::Neigh {
    fn byte_size(&self) -> usize {
        self.raw_attrs().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Blob(Vec<u8>);
    impl ByteSized for Blob {
        fn byte_size(&self) -> usize {
            self.0.len()
        }
    }

    #[test]
    fn upsert_reports_delta_and_freshness() {
        let store: KindStore<u32, Blob> = KindStore::new();
        let (delta, is_new) = store.upsert(1, Blob(vec![0; 4]));
        assert_eq!(delta, 4);
        assert!(is_new);

        let (delta, is_new) = store.upsert(1, Blob(vec![0; 10]));
        assert_eq!(delta, 6);
        assert!(!is_new);

        assert_eq!(store.count(), 1);
    }

    #[test]
    fn remove_returns_value_and_size() {
        let store: KindStore<u32, Blob> = KindStore::new();
        store.upsert(1, Blob(vec![0; 3]));
        let (value, size) = store.remove(&1).unwrap();
        assert_eq!(value.0.len(), 3);
        assert_eq!(size, 3);
        assert!(store.remove(&1).is_none());
    }
}
