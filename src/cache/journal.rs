//! Durable JSONL cache backend.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use parking_lot::Mutex;

use super::{CacheRecord, CacheStore, MemoryStore};
use crate::error::{Error, Result};
use crate::value::OpaqueValue;

const ENTRIES_FILE: &str = "entries.jsonl";
const BLOB_DIR: &str = "blobs";

/// A cache backend that survives process restarts.
///
/// Layout of the cache directory:
///
/// ```text
/// <dir>/entries.jsonl        one CacheRecord per line, append-only
/// <dir>/blobs/<sha256>.json  one OpaqueValue per file
/// ```
///
/// Entries are indexed in memory on open. Several processes can share the
/// directory: appends hold an exclusive file lock and first merge whatever
/// other writers appended, so the first writer of a key wins everywhere.
///
/// # Examples
///
/// ```no_run
/// use hypersearch::cache::{EvaluationCache, JournalStore};
///
/// let cache = EvaluationCache::new(JournalStore::open("search-cache").unwrap());
/// ```
pub struct JournalStore {
    index: MemoryStore,
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JournalStore {
    /// Opens (or creates) the cache directory and loads its entries.
    ///
    /// # Errors
    ///
    /// Returns a [`Storage`](Error::Storage) error if the directory cannot
    /// be created or the journal cannot be read or parsed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(dir.join(BLOB_DIR)).map_err(storage)?;
        let store = Self {
            index: MemoryStore::new(),
            dir,
            write_lock: Mutex::new(()),
        };
        for record in load_records(&store.entries_path())? {
            store.index.put(record)?;
        }
        trace_debug!(entries = store.index.len(), "opened journal cache");
        Ok(store)
    }

    /// Returns the cache directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entries_path(&self) -> PathBuf {
        self.dir.join(ENTRIES_FILE)
    }

    fn blob_path(&self, hash: &str) -> PathBuf {
        self.dir.join(BLOB_DIR).join(format!("{hash}.json"))
    }
}

impl CacheStore for JournalStore {
    fn get(&self, key: &str) -> Result<Option<CacheRecord>> {
        self.index.get(key)
    }

    fn put(&self, record: CacheRecord) -> Result<f64> {
        let _guard = self.write_lock.lock();

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(self.entries_path())
            .map_err(storage)?;
        file.lock_exclusive().map_err(storage)?;

        let result = (|| {
            for existing in read_records(&file)? {
                self.index.put(existing)?;
            }
            if let Some(existing) = self.index.get(&record.key)? {
                return Ok(existing.score);
            }
            let line = serde_json::to_string(&record).map_err(storage)?;
            writeln!(file, "{line}").map_err(storage)?;
            file.flush().map_err(storage)?;
            self.index.put(record)
        })();

        file.unlock().map_err(storage)?;
        result
    }

    /// Only the in-memory index forgets the entry; the journal line stays.
    fn remove(&self, key: &str) -> Result<()> {
        self.index.remove(key)
    }

    fn put_blob(&self, hash: &str, value: &OpaqueValue) -> Result<()> {
        let path = self.blob_path(hash);
        if path.exists() {
            return Ok(());
        }
        let json = serde_json::to_vec(value).map_err(storage)?;
        let tmp = path.with_extension(format!("json.tmp-{}", std::process::id()));
        fs::write(&tmp, json).map_err(storage)?;
        fs::rename(&tmp, &path).map_err(storage)
    }

    fn get_blob(&self, hash: &str) -> Result<Option<OpaqueValue>> {
        let bytes = match fs::read(self.blob_path(hash)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage(e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| Error::CacheCorruption {
                key: hash.to_owned(),
                reason: format!("undecodable blob: {e}"),
            })
    }

    fn records(&self, model: &str) -> Result<Vec<CacheRecord>> {
        self.index.records(model)
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn is_durable(&self) -> bool {
        true
    }
}

#[allow(clippy::needless_pass_by_value)]
fn storage(e: impl ToString) -> Error {
    Error::Storage(e.to_string())
}

fn load_records(path: &Path) -> Result<Vec<CacheRecord>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(storage(e)),
    };
    file.lock_shared().map_err(storage)?;
    let records = read_records(&file);
    file.unlock().map_err(storage)?;
    records
}

fn read_records(file: &File) -> Result<Vec<CacheRecord>> {
    let reader = BufReader::new(file);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(storage)?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        records.push(serde_json::from_str(line).map_err(storage)?);
    }
    Ok(records)
}
