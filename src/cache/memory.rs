use std::collections::HashMap;

use parking_lot::RwLock;

use super::{CacheRecord, CacheStore};
use crate::error::Result;
use crate::value::OpaqueValue;

#[derive(Default)]
struct Entries {
    next_seq: u64,
    by_key: HashMap<String, (u64, CacheRecord)>,
}

/// In-memory cache backend (the default).
///
/// Entries and blobs live in two hash maps behind read-write locks and are
/// lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<Entries>,
    blobs: RwLock<HashMap<String, OpaqueValue>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the blob stored under `hash`. Entries referencing it are
    /// evicted on their next lookup.
    pub fn remove_blob(&self, hash: &str) {
        self.blobs.write().remove(hash);
    }

    /// Returns the number of stored blobs.
    #[must_use]
    pub fn blob_count(&self) -> usize {
        self.blobs.read().len()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<CacheRecord>> {
        Ok(self.entries.read().by_key.get(key).map(|(_, r)| r.clone()))
    }

    fn put(&self, record: CacheRecord) -> Result<f64> {
        let mut entries = self.entries.write();
        if let Some((_, existing)) = entries.by_key.get(&record.key) {
            return Ok(existing.score);
        }
        let seq = entries.next_seq;
        entries.next_seq += 1;
        let score = record.score;
        entries.by_key.insert(record.key.clone(), (seq, record));
        Ok(score)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().by_key.remove(key);
        Ok(())
    }

    fn put_blob(&self, hash: &str, value: &OpaqueValue) -> Result<()> {
        self.blobs
            .write()
            .entry(hash.to_owned())
            .or_insert_with(|| value.clone());
        Ok(())
    }

    fn get_blob(&self, hash: &str) -> Result<Option<OpaqueValue>> {
        Ok(self.blobs.read().get(hash).cloned())
    }

    fn records(&self, model: &str) -> Result<Vec<CacheRecord>> {
        let entries = self.entries.read();
        let mut matching: Vec<&(u64, CacheRecord)> = entries
            .by_key
            .values()
            .filter(|(_, r)| r.model == model)
            .collect();
        matching.sort_by_key(|(seq, _)| *seq);
        Ok(matching.into_iter().map(|(_, r)| r.clone()).collect())
    }

    fn len(&self) -> usize {
        self.entries.read().by_key.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &str, model: &str, score: f64) -> CacheRecord {
        CacheRecord {
            key: key.into(),
            model: model.into(),
            params: Vec::new(),
            score,
        }
    }

    #[test]
    fn test_records_keep_insertion_order() {
        let store = MemoryStore::new();
        for (i, key) in ["z", "a", "m"].iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            store.put(record(key, "tree", i as f64)).unwrap();
        }
        store.put(record("other", "forest", 9.0)).unwrap();
        let keys: Vec<String> = store
            .records("tree")
            .unwrap()
            .into_iter()
            .map(|r| r.key)
            .collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_remove_then_reinsert() {
        let store = MemoryStore::new();
        store.put(record("k", "m", 1.0)).unwrap();
        store.remove("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
        assert_eq!(store.put(record("k", "m", 2.0)).unwrap(), 2.0);
    }

    #[test]
    fn test_identical_blobs_are_stored_once() {
        let store = MemoryStore::new();
        let obj = OpaqueValue::new("pca", vec![1, 2]);
        store.put_blob("h", &obj).unwrap();
        store.put_blob("h", &obj).unwrap();
        assert_eq!(store.blob_count(), 1);
        assert_eq!(store.get_blob("h").unwrap(), Some(obj));
        store.remove_blob("h");
        assert_eq!(store.blob_count(), 0);
    }
}
