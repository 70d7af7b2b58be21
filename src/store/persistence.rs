//! Persistence layer for the target index

use crate::error::StorageError;
use crate::store::{decode_entry, encode_entry, IndexEntry, IndexStore, INDEX_FORMAT_VERSION};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Key prefix separating entries from metadata
const ENTRY_PREFIX: &str = "entry/";
const FORMAT_KEY: &[u8] = b"meta/format";

fn entry_key(path: &str) -> Vec<u8> {
    format!("{}{}", ENTRY_PREFIX, path).into_bytes()
}

fn copy_dir(from: &Path, to: &Path) -> std::io::Result<()> {
    for entry in walkdir::WalkDir::new(from) {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(from) else {
            continue;
        };
        let destination = to.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&destination)?;
        } else if entry.file_type().is_file() {
            std::fs::copy(entry.path(), &destination)?;
        }
    }
    Ok(())
}

/// Sled-based implementation of IndexStore
pub struct SledIndexStore {
    db: sled::Db,
    path: PathBuf,
}

impl SledIndexStore {
    /// Open (or create) a SledIndexStore at the given directory
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let db = sled::open(&path)?;
        if db.is_empty() {
            db.insert(FORMAT_KEY, &INDEX_FORMAT_VERSION.to_be_bytes()[..])?;
        }
        Ok(Self { db, path })
    }

    /// Open the store, wiping and recreating it if the database itself is corrupt
    ///
    /// Returns the store and whether it had to be recreated.
    pub fn open_or_recreate<P: AsRef<Path>>(path: P) -> Result<(Self, bool), StorageError> {
        let path = path.as_ref();
        match Self::new(path) {
            Ok(store) => Ok((store, false)),
            Err(StorageError::IndexCorrupt(reason)) => {
                warn!(
                    path = %path.display(),
                    reason = %reason,
                    "Index database corrupt, recreating"
                );
                std::fs::remove_dir_all(path)?;
                Ok((Self::new(path)?, true))
            }
            Err(e) => Err(e),
        }
    }

    /// Whether a store has been created at `path`
    pub fn exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    /// Entries of the store at `path`, read from a private copy of its directory
    ///
    /// sled has no read-only mode and writes on open, so the store directory
    /// itself is never opened here and stays byte-for-byte unchanged.
    pub fn read_snapshot<P: AsRef<Path>>(path: P) -> Result<Vec<IndexEntry>, StorageError> {
        let path = path.as_ref();
        let scratch = tempfile::TempDir::new()?;
        copy_dir(path, scratch.path())?;

        let db = sled::open(scratch.path())?;
        if db.is_empty() {
            return Ok(Vec::new());
        }
        let snapshot = Self {
            db,
            path: path.to_path_buf(),
        };
        let entries = snapshot.load()?;
        debug!(entries = entries.len(), path = %path.display(), "Read index snapshot");
        Ok(entries)
    }

    /// Get the underlying sled database (for advanced operations)
    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    fn check_format(&self) -> Result<(), StorageError> {
        match self.db.get(FORMAT_KEY)? {
            Some(value) if value.as_ref() == INDEX_FORMAT_VERSION.to_be_bytes() => Ok(()),
            Some(value) => Err(StorageError::IndexCorrupt(format!(
                "Unsupported index format marker {:?}",
                value.as_ref()
            ))),
            None => Err(StorageError::IndexCorrupt(
                "Index format marker missing".to_string(),
            )),
        }
    }
}

impl IndexStore for SledIndexStore {
    fn load(&self) -> Result<Vec<IndexEntry>, StorageError> {
        self.check_format()?;

        let mut entries = Vec::new();
        for item in self.db.scan_prefix(ENTRY_PREFIX.as_bytes()) {
            let (key, value) = item?;
            let key = std::str::from_utf8(&key[ENTRY_PREFIX.len()..]).map_err(|e| {
                StorageError::IndexCorrupt(format!("Index key is not valid UTF-8: {}", e))
            })?;
            entries.push(decode_entry(key, &value)?);
        }
        debug!(entries = entries.len(), path = %self.path.display(), "Loaded index store");
        Ok(entries)
    }

    fn put(&self, entry: &IndexEntry) -> Result<(), StorageError> {
        let value = encode_entry(entry)?;
        self.db.insert(entry_key(&entry.path), value)?;
        Ok(())
    }

    fn remove(&self, path: &str) -> Result<(), StorageError> {
        self.db.remove(entry_key(path))?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.db.clear()?;
        self.db
            .insert(FORMAT_KEY, &INDEX_FORMAT_VERSION.to_be_bytes()[..])?;
        Ok(())
    }

    fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}
