//! Tree scanner: lazy walk of a source or target tree into file records

use crate::error::ScanError;
use crate::fs::{is_write_temp, EntryIter, FileSystem, WalkOptions};
use crate::tree::path;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::debug;

/// One regular file found under a scanned root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Path relative to the scanned root, `/`-separated
    pub rel_path: String,
    pub size: u64,
    pub modified: SystemTime,
}

/// Scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Whether to follow symbolic links (default: false, avoids cycles)
    #[serde(default)]
    pub follow_symlinks: bool,
    /// Path component names to skip (e.g. ".git")
    #[serde(default)]
    pub ignore: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            ignore: Vec::new(),
        }
    }
}

/// Scanner over one root
///
/// Every call to [`Scanner::scan`] produces an independent iterator; there is
/// no shared cursor, so a scan can be restarted at any time.
pub struct Scanner<'fs> {
    fs: &'fs dyn FileSystem,
    root: PathBuf,
    options: WalkOptions,
    skip_write_temps: bool,
}

impl<'fs> Scanner<'fs> {
    pub fn new(fs: &'fs dyn FileSystem, root: impl Into<PathBuf>, config: &ScanConfig) -> Self {
        Self {
            fs,
            root: root.into(),
            options: WalkOptions {
                follow_symlinks: config.follow_symlinks,
                prune: config.ignore.clone(),
            },
            skip_write_temps: false,
        }
    }

    /// Also skip `name` wherever it appears as a path component
    pub fn excluding(mut self, name: impl Into<String>) -> Self {
        self.options.prune.push(name.into());
        self
    }

    /// Also skip temp files an interrupted atomic write left behind
    pub fn skipping_write_temps(mut self) -> Self {
        self.skip_write_temps = true;
        self
    }

    /// Start a fresh walk
    pub fn scan(&self) -> Scan<'fs> {
        Scan {
            root: self.root.clone(),
            inner: self.fs.walk_files(&self.root, &self.options),
            skip_write_temps: self.skip_write_temps,
        }
    }
}

/// Lazy sequence of [`FileRecord`]s; ends when the walk is exhausted
pub struct Scan<'fs> {
    root: PathBuf,
    inner: EntryIter<'fs>,
    skip_write_temps: bool,
}

impl Iterator for Scan<'_> {
    type Item = Result<FileRecord, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = loop {
            match self.inner.next()? {
                Ok(entry) if self.skip_write_temps && is_write_temp(&entry.path) => {
                    debug!(path = %entry.path.display(), "Skipping leftover write temp file");
                }
                Ok(entry) => break entry,
                Err(e) => return Some(Err(e)),
            }
        };
        match path::relative_key(&self.root, &entry.path) {
            Some(rel_path) => Some(Ok(FileRecord {
                rel_path,
                size: entry.stat.size,
                modified: entry.stat.modified,
            })),
            None => Some(Err(ScanError::NonUtf8(entry.path))),
        }
    }
}
