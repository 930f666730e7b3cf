//! Content-addressed evaluation cache.
//!
//! The [`EvaluationCache`] memoizes scores by `(model id, assignment)` so
//! that no assignment is evaluated twice, within a run or, with a durable
//! backend, across runs. Object-valued parameters are stored out-of-line as
//! content-hashed blobs; a cache entry only holds a
//! [`StoredValue::CachedRef`] to them.
//!
//! # Available backends
//!
//! | Backend | Description | Feature flag |
//! |---------|-------------|-------------|
//! | [`MemoryStore`] | Hash maps behind read-write locks (the default) | none |
//! | `JournalStore` | `entries.jsonl` plus `blobs/` directory with `fs2` locking | `journal` |
//!
//! A broken entry (missing blob, undecodable blob, mismatched assignment)
//! is evicted and treated as a miss by non-durable backends. Durable
//! backends report it as [`Error::CacheCorruption`].
//!
//! ```
//! use hypersearch::cache::EvaluationCache;
//! use hypersearch::space::ParameterAssignment;
//!
//! let cache = EvaluationCache::in_memory();
//! let params = ParameterAssignment::new().with("max_depth", 3);
//! assert_eq!(cache.lookup("tree", &params).unwrap(), None);
//! cache.store("tree", &params, 0.91).unwrap();
//! assert_eq!(cache.lookup("tree", &params).unwrap(), Some(0.91));
//! ```

#[cfg(feature = "journal")]
mod journal;
mod key;
mod memory;

use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[cfg(feature = "journal")]
pub use journal::JournalStore;
pub use key::StoredValue;
pub use memory::MemoryStore;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::space::ParameterAssignment;
use crate::value::{OpaqueValue, ParamValue};

/// One persisted cache entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// SHA-256 hex of `(model, params)`.
    pub key: String,
    /// The model the score belongs to.
    pub model: String,
    /// The assignment, with object values replaced by references.
    pub params: Vec<(String, StoredValue)>,
    /// The cached score.
    pub score: f64,
}

/// Trait for cache backends.
///
/// Implementations must be `Send + Sync`: one cache is shared across all
/// models of a search and, with the `async` feature, across threads.
pub trait CacheStore: Send + Sync {
    /// Returns the entry stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] on backend failure.
    fn get(&self, key: &str) -> Result<Option<CacheRecord>>;

    /// Inserts `record` unless its key is present; returns the score that
    /// ends up stored (first writer wins).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] on backend failure.
    fn put(&self, record: CacheRecord) -> Result<f64>;

    /// Drops the entry stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] on backend failure.
    fn remove(&self, key: &str) -> Result<()>;

    /// Stores an object under its content hash. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] on backend failure.
    fn put_blob(&self, hash: &str, value: &OpaqueValue) -> Result<()>;

    /// Loads the object stored under `hash`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CacheCorruption`] if the blob exists but cannot be
    /// decoded, or [`Error::Storage`] on backend failure.
    fn get_blob(&self, hash: &str) -> Result<Option<OpaqueValue>>;

    /// Returns every entry of `model`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] on backend failure.
    fn records(&self, model: &str) -> Result<Vec<CacheRecord>>;

    /// Returns the total number of entries.
    fn len(&self) -> usize;

    /// Returns `true` if the store holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether entries outlive the process.
    fn is_durable(&self) -> bool {
        false
    }
}

/// Hit and miss counters of an [`EvaluationCache`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that fell through to the objective.
    pub misses: u64,
}

/// Memoized scores keyed by `(model id, assignment)`.
pub struct EvaluationCache {
    store: Arc<dyn CacheStore>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl EvaluationCache {
    /// Wraps a backend.
    #[must_use]
    pub fn new(store: impl CacheStore + 'static) -> Self {
        Self::from_arc(Arc::new(store))
    }

    /// Wraps a shared backend.
    #[must_use]
    pub fn from_arc(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Creates a cache backed by a fresh [`MemoryStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Opens a durable cache in `dir`, loading existing entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the directory cannot be created or the
    /// journal cannot be read.
    #[cfg(feature = "journal")]
    pub fn open(dir: impl AsRef<std::path::Path>) -> Result<Self> {
        Ok(Self::new(JournalStore::open(dir)?))
    }

    /// Returns the backend.
    #[must_use]
    pub fn store_backend(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Returns the cached score for `assignment` under `model_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CacheCorruption`] if a durable entry cannot be
    /// reconstructed, or [`Error::Storage`] on backend failure.
    pub fn lookup(&self, model_id: &str, assignment: &ParameterAssignment) -> Result<Option<f64>> {
        let params = key::to_stored(assignment)?;
        let key = key::cache_key(model_id, &params)?;
        let Some(record) = self.store.get(&key)? else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };
        let verified = self
            .resolve(&record)
            .and_then(|restored| {
                if restored == *assignment {
                    Ok(())
                } else {
                    Err(Error::CacheCorruption {
                        key: key.clone(),
                        reason: format!("entry holds {restored}, expected {assignment}"),
                    })
                }
            });
        match verified {
            Ok(()) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(record.score))
            }
            Err(err) => {
                self.recover(&key, err)?;
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    /// Records `score` for `assignment`; returns the score actually cached.
    ///
    /// Blobs are written before the entry is published. If another writer
    /// stored the same key first, its score is kept and returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] on backend failure.
    pub fn store(
        &self,
        model_id: &str,
        assignment: &ParameterAssignment,
        score: f64,
    ) -> Result<f64> {
        let params = key::to_stored(assignment)?;
        for ((_, stored), (_, value)) in params.iter().zip(assignment.iter()) {
            if let (StoredValue::CachedRef(hash), ParamValue::Object(obj)) = (stored, value) {
                self.store.put_blob(hash, obj)?;
            }
        }
        let key = key::cache_key(model_id, &params)?;
        self.store.put(CacheRecord {
            key,
            model: model_id.to_owned(),
            params,
            score,
        })
    }

    /// Returns every cached `(assignment, score)` of `model_id` with object
    /// references dereferenced, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CacheCorruption`] if a durable entry cannot be
    /// reconstructed, or [`Error::Storage`] on backend failure.
    pub fn entries(&self, model_id: &str) -> Result<Vec<(ParameterAssignment, f64)>> {
        let records = self.store.records(model_id)?;
        let mut out = Vec::with_capacity(records.len());
        for record in records {
            match self.resolve(&record) {
                Ok(assignment) => out.push((assignment, record.score)),
                Err(err) => self.recover(&record.key, err)?,
            }
        }
        Ok(out)
    }

    /// Returns the hit and miss counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Returns the number of cached entries across all models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    fn resolve(&self, record: &CacheRecord) -> Result<ParameterAssignment> {
        let mut assignment = ParameterAssignment::new();
        for (name, stored) in &record.params {
            let value = match stored {
                StoredValue::Literal(v) => v.clone(),
                StoredValue::CachedRef(hash) => {
                    let obj = self.store.get_blob(hash)?.ok_or_else(|| Error::CacheCorruption {
                        key: record.key.clone(),
                        reason: format!("blob {hash} for '{name}' is missing"),
                    })?;
                    ParamValue::Object(obj)
                }
            };
            assignment.insert(name.clone(), value);
        }
        Ok(assignment)
    }

    /// Non-durable stores evict the broken entry; durable ones fail.
    fn recover(&self, key: &str, err: Error) -> Result<()> {
        match err {
            Error::CacheCorruption { .. } if !self.store.is_durable() => {
                trace_warn!(key, error = %err, "evicting corrupt cache entry");
                self.store.remove(key)
            }
            other => Err(other),
        }
    }
}

impl Default for EvaluationCache {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl core::fmt::Debug for EvaluationCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EvaluationCache")
            .field("entries", &self.store.len())
            .field("durable", &self.store.is_durable())
            .field("stats", &self.stats())
            .finish()
    }
}
