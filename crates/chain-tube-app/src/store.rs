//! Ordered key-value state.
//!
//! [`MemStore`] is the application's backing state. [`CacheStore`] layers
//! buffered writes over any parent store; the buffered writes are either
//! discarded (simulation, failed messages) or flushed into the parent with
//! [`CacheStore::into_writes`] + [`StoreWrites::apply`].

use std::collections::BTreeMap;

use prost::Message;
use sha2::{Digest, Sha256};

use crate::errors::AppResult;

pub trait KvStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    fn set(&mut self, key: &[u8], value: Vec<u8>);

    fn delete(&mut self, key: &[u8]);

    /// All live entries whose key starts with `prefix`, in key order.
    fn prefix_scan(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)>;

    fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }
}

/// Decode a protobuf value stored under `key`.
pub fn get_msg<M: Message + Default>(store: &dyn KvStore, key: &[u8]) -> AppResult<Option<M>> {
    match store.get(key) {
        Some(bytes) => Ok(Some(M::decode(bytes.as_slice())?)),
        None => Ok(None),
    }
}

pub fn set_msg<M: Message>(store: &mut dyn KvStore, key: &[u8], msg: &M) {
    store.set(key, msg.encode_to_vec());
}

/// Build a store key from a one-byte prefix and its parts.
pub fn key(prefix: u8, parts: &[&[u8]]) -> Vec<u8> {
    let len = 1 + parts.iter().map(|p| p.len()).sum::<usize>();
    let mut out = Vec::with_capacity(len);
    out.push(prefix);
    for part in parts {
        out.extend_from_slice(part);
    }
    out
}

#[derive(Debug, Clone, Default)]
pub struct MemStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// SHA-256 over every length-prefixed key/value pair in key order.
    pub fn root_hash(&self) -> Vec<u8> {
        let mut hasher = Sha256::new();
        for (k, v) in &self.data {
            hasher.update((k.len() as u64).to_be_bytes());
            hasher.update(k);
            hasher.update((v.len() as u64).to_be_bytes());
            hasher.update(v);
        }
        hasher.finalize().to_vec()
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.get(key).cloned()
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.data.insert(key.to_vec(), value);
    }

    fn delete(&mut self, key: &[u8]) {
        self.data.remove(key);
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Buffered writes detached from a [`CacheStore`]. `None` marks a deletion.
#[derive(Debug, Default)]
pub struct StoreWrites(BTreeMap<Vec<u8>, Option<Vec<u8>>>);

impl StoreWrites {
    pub fn apply(self, target: &mut dyn KvStore) {
        for (k, v) in self.0 {
            match v {
                Some(v) => target.set(&k, v),
                None => target.delete(&k),
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Copy-on-write branch over a parent store.
pub struct CacheStore<'a> {
    parent: &'a dyn KvStore,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> CacheStore<'a> {
    pub fn new(parent: &'a dyn KvStore) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    pub fn into_writes(self) -> StoreWrites {
        StoreWrites(self.writes)
    }
}

impl KvStore for CacheStore<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.writes.get(key) {
            Some(v) => v.clone(),
            None => self.parent.get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.writes.insert(key.to_vec(), Some(value));
    }

    fn delete(&mut self, key: &[u8]) {
        self.writes.insert(key.to_vec(), None);
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.parent.prefix_scan(prefix).into_iter().collect();
        for (k, v) in self
            .writes
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
        {
            match v {
                Some(v) => {
                    merged.insert(k.clone(), v.clone());
                }
                None => {
                    merged.remove(k);
                }
            }
        }
        merged.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_scan_is_bounded() {
        let mut store = MemStore::new();
        store.set(&[1, 1], vec![1]);
        store.set(&[1, 2], vec![2]);
        store.set(&[2, 1], vec![3]);
        let hits = store.prefix_scan(&[1]);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1], (vec![1, 2], vec![2]));
    }

    #[test]
    fn test_cache_overlays_and_flushes() {
        let mut base = MemStore::new();
        base.set(b"a", b"1".to_vec());
        base.set(b"b", b"2".to_vec());

        let writes = {
            let mut cache = CacheStore::new(&base);
            cache.set(b"c", b"3".to_vec());
            cache.delete(b"a");
            assert_eq!(cache.get(b"a"), None);
            assert_eq!(cache.get(b"b"), Some(b"2".to_vec()));
            let keys: Vec<_> = cache.prefix_scan(b"").into_iter().map(|(k, _)| k).collect();
            assert_eq!(keys, vec![b"b".to_vec(), b"c".to_vec()]);
            cache.into_writes()
        };
        // Parent untouched until the writes are applied.
        assert!(base.has(b"a"));

        writes.apply(&mut base);
        assert!(!base.has(b"a"));
        assert_eq!(base.get(b"c"), Some(b"3".to_vec()));
    }

    #[test]
    fn test_root_hash_tracks_content() {
        let mut a = MemStore::new();
        let mut b = MemStore::new();
        assert_eq!(a.root_hash(), b.root_hash());
        a.set(b"k", b"v".to_vec());
        assert_ne!(a.root_hash(), b.root_hash());
        b.set(b"k", b"v".to_vec());
        assert_eq!(a.root_hash(), b.root_hash());
    }
}
