//! In-memory index store
//!
//! Clones share the same backing map, so a test can keep a handle and inspect
//! what a session persisted after the session is gone.

use crate::error::StorageError;
use crate::store::{decode_entry, encode_entry, IndexEntry, IndexStore};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct MemoryIndexStore {
    entries: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
    flushes: Arc<Mutex<usize>>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with `entries`
    pub fn with_entries(entries: &[IndexEntry]) -> Result<Self, StorageError> {
        let store = Self::new();
        for entry in entries {
            store.put(entry)?;
        }
        Ok(store)
    }

    /// Store raw bytes under `path`, bypassing encoding (for corruption tests)
    pub fn insert_raw(&self, path: impl Into<String>, bytes: Vec<u8>) {
        self.entries.lock().insert(path.into(), bytes);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Number of times `flush` has been called
    pub fn flush_count(&self) -> usize {
        *self.flushes.lock()
    }
}

impl IndexStore for MemoryIndexStore {
    fn load(&self) -> Result<Vec<IndexEntry>, StorageError> {
        self.entries
            .lock()
            .iter()
            .map(|(key, bytes)| decode_entry(key, bytes))
            .collect()
    }

    fn put(&self, entry: &IndexEntry) -> Result<(), StorageError> {
        let bytes = encode_entry(entry)?;
        self.entries.lock().insert(entry.path.clone(), bytes);
        Ok(())
    }

    fn remove(&self, path: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(path);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.entries.lock().clear();
        Ok(())
    }

    fn flush(&self) -> Result<(), StorageError> {
        *self.flushes.lock() += 1;
        Ok(())
    }
}
