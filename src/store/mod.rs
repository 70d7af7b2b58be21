//! Index store
//!
//! Persists target index entries so fingerprints survive between runs. The
//! store is a cache of derivable information: anything it holds can be rebuilt
//! from a full scan of the target tree.

pub mod memory;
pub mod persistence;

pub use memory::MemoryIndexStore;
pub use persistence::SledIndexStore;

use crate::error::StorageError;
use crate::fs::FileStat;
use crate::types::Fingerprint;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Version of the on-disk entry encoding
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// IndexEntry: one known target file and its content fingerprint
///
/// Paths are unique keys; several entries may share a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub fingerprint: Fingerprint,
    /// Target-relative path, `/`-separated
    pub path: String,
    pub size: u64,
    pub modified: SystemTime,
}

impl IndexEntry {
    pub fn new(path: impl Into<String>, fingerprint: Fingerprint, stat: FileStat) -> Self {
        Self {
            fingerprint,
            path: path.into(),
            size: stat.size,
            modified: stat.modified,
        }
    }

    pub fn stat(&self) -> FileStat {
        FileStat {
            size: self.size,
            modified: self.modified,
        }
    }

    /// Whether cheap metadata still matches what was recorded
    pub fn matches_stat(&self, size: u64, modified: SystemTime) -> bool {
        self.size == size && self.modified == modified
    }
}

/// Key-value persistence for index entries
pub trait IndexStore: Send {
    /// Load every persisted entry. Undecodable data is `IndexCorrupt`.
    fn load(&self) -> Result<Vec<IndexEntry>, StorageError>;

    /// Insert or replace the entry for `entry.path`
    fn put(&self, entry: &IndexEntry) -> Result<(), StorageError>;

    fn remove(&self, path: &str) -> Result<(), StorageError>;

    /// Drop everything, leaving an empty store of the current format
    fn clear(&self) -> Result<(), StorageError>;

    /// Make completed writes durable
    fn flush(&self) -> Result<(), StorageError>;
}

pub(crate) fn encode_entry(entry: &IndexEntry) -> Result<Vec<u8>, StorageError> {
    bincode::serialize(entry)
        .map_err(|e| StorageError::Backend(format!("Failed to serialize index entry: {}", e)))
}

pub(crate) fn decode_entry(key: &str, bytes: &[u8]) -> Result<IndexEntry, StorageError> {
    let entry: IndexEntry = bincode::deserialize(bytes).map_err(|e| {
        StorageError::IndexCorrupt(format!("Failed to deserialize entry {}: {}", key, e))
    })?;
    if entry.path != key {
        return Err(StorageError::IndexCorrupt(format!(
            "Entry stored under {} claims path {}",
            key, entry.path
        )));
    }
    Ok(entry)
}
