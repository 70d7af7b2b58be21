//! In-memory filesystem for tests and simulations
//!
//! Paths are kept exactly as given (no canonicalization). Modification times
//! come from a logical clock so runs are reproducible.

use super::{already_exists, EntryIter, FileStat, FileSystem, RawEntry, WalkOptions, WriteOptions};
use crate::error::ScanError;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone)]
struct MemFile {
    data: Vec<u8>,
    modified: SystemTime,
}

#[derive(Debug, Default)]
struct MemState {
    files: BTreeMap<PathBuf, MemFile>,
    dirs: BTreeSet<PathBuf>,
    clock: u64,
    unreadable: HashSet<PathBuf>,
    unwritable: HashSet<PathBuf>,
}

impl MemState {
    fn tick(&mut self) -> SystemTime {
        self.clock += 1;
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + self.clock)
    }

    fn add_ancestors(&mut self, path: &Path) {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() {
                break;
            }
            self.dirs.insert(dir.to_path_buf());
            current = dir.parent();
        }
    }

    fn require_parent(&self, path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(parent) if parent.as_os_str().is_empty() || self.dirs.contains(parent) => Ok(()),
            _ => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("parent directory missing for {}", path.display()),
            )),
        }
    }

    fn check_writable(&self, path: &Path) -> io::Result<()> {
        let denied = self
            .unwritable
            .iter()
            .any(|blocked| path == blocked || path.starts_with(blocked));
        if denied {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {}", path.display()),
            ));
        }
        Ok(())
    }
}

/// [`FileSystem`] held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryFs {
    state: RwLock<MemState>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory and all of its ancestors.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut state = self.state.write();
        state.add_ancestors(path);
        state.dirs.insert(path.to_path_buf());
    }

    /// Create or replace a file, creating ancestors, with a fresh mtime.
    pub fn add_file(&self, path: impl AsRef<Path>, data: impl AsRef<[u8]>) {
        let path = path.as_ref();
        let mut state = self.state.write();
        state.add_ancestors(path);
        let modified = state.tick();
        state.files.insert(
            path.to_path_buf(),
            MemFile {
                data: data.as_ref().to_vec(),
                modified,
            },
        );
    }

    /// Replace file content without touching size or mtime, the way a
    /// careless tool can defeat metadata-based change detection.
    pub fn overwrite_in_place(&self, path: impl AsRef<Path>, data: impl AsRef<[u8]>) {
        let mut state = self.state.write();
        if let Some(file) = state.files.get_mut(path.as_ref()) {
            file.data = data.as_ref().to_vec();
        }
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) -> bool {
        self.state.write().files.remove(path.as_ref()).is_some()
    }

    /// Make reads of `path` fail with `PermissionDenied`.
    pub fn deny_read(&self, path: impl AsRef<Path>) {
        self.state
            .write()
            .unreadable
            .insert(path.as_ref().to_path_buf());
    }

    /// Make writes at or below `path` fail with `PermissionDenied`.
    pub fn deny_write(&self, path: impl AsRef<Path>) {
        self.state
            .write()
            .unwritable
            .insert(path.as_ref().to_path_buf());
    }

    pub fn read(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.state
            .read()
            .files
            .get(path.as_ref())
            .map(|file| file.data.clone())
    }

    pub fn contains_dir(&self, path: impl AsRef<Path>) -> bool {
        self.state.read().dirs.contains(path.as_ref())
    }

    /// Every file below `root`, keyed by path relative to `root`.
    pub fn snapshot(&self, root: impl AsRef<Path>) -> BTreeMap<PathBuf, Vec<u8>> {
        let root = root.as_ref();
        self.state
            .read()
            .files
            .iter()
            .filter_map(|(path, file)| {
                path.strip_prefix(root)
                    .ok()
                    .map(|relative| (relative.to_path_buf(), file.data.clone()))
            })
            .collect()
    }
}

impl FileSystem for MemoryFs {
    fn walk_files<'a>(&'a self, root: &Path, options: &WalkOptions) -> EntryIter<'a> {
        // Snapshot up front: the iterator owns its data and never observes
        // later mutations, like a directory listing taken at walk time.
        let state = self.state.read();
        let entries: Vec<RawEntry> = state
            .files
            .iter()
            .filter(|(path, _)| {
                path.strip_prefix(root)
                    .map(|relative| !relative.as_os_str().is_empty() && !options.is_pruned(relative))
                    .unwrap_or(false)
            })
            .map(|(path, file)| RawEntry {
                path: path.clone(),
                stat: FileStat {
                    size: file.data.len() as u64,
                    modified: file.modified,
                },
            })
            .collect();
        Box::new(entries.into_iter().map(Ok::<RawEntry, ScanError>))
    }

    fn stat(&self, path: &Path) -> io::Result<Option<FileStat>> {
        Ok(self.state.read().files.get(path).map(|file| FileStat {
            size: file.data.len() as u64,
            modified: file.modified,
        }))
    }

    fn exists(&self, path: &Path) -> io::Result<bool> {
        let state = self.state.read();
        Ok(state.files.contains_key(path) || state.dirs.contains(path))
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.state.read().dirs.contains(path)
    }

    fn open_read<'a>(&'a self, path: &Path) -> io::Result<Box<dyn Read + Send + 'a>> {
        let state = self.state.read();
        if state.unreadable.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {}", path.display()),
            ));
        }
        let file = state.files.get(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )
        })?;
        Ok(Box::new(io::Cursor::new(file.data.clone())))
    }

    fn write_atomic(
        &self,
        path: &Path,
        reader: &mut dyn Read,
        options: &WriteOptions,
    ) -> io::Result<u64> {
        // Read fully before taking the lock: the reader may be backed by this filesystem.
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        let mut state = self.state.write();
        state.check_writable(path)?;
        state.require_parent(path)?;
        if !options.overwrite && (state.files.contains_key(path) || state.dirs.contains(path)) {
            return Err(already_exists(path));
        }
        let modified = match options.modified {
            Some(modified) => modified,
            None => state.tick(),
        };
        let written = data.len() as u64;
        state
            .files
            .insert(path.to_path_buf(), MemFile { data, modified });
        Ok(written)
    }

    fn rename(&self, from: &Path, to: &Path, overwrite: bool) -> io::Result<()> {
        let mut state = self.state.write();
        state.check_writable(from)?;
        state.check_writable(to)?;
        state.require_parent(to)?;
        if !state.files.contains_key(from) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", from.display()),
            ));
        }
        if !overwrite && (state.files.contains_key(to) || state.dirs.contains(to)) {
            return Err(already_exists(to));
        }
        if let Some(file) = state.files.remove(from) {
            state.files.insert(to.to_path_buf(), file);
        }
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self.state.write();
        state.check_writable(path)?;
        if state.files.contains_key(path) {
            return Err(already_exists(path));
        }
        state.add_ancestors(path);
        state.dirs.insert(path.to_path_buf());
        Ok(())
    }

    fn remove_dir_if_empty(&self, path: &Path) -> io::Result<bool> {
        let mut state = self.state.write();
        if !state.dirs.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such directory: {}", path.display()),
            ));
        }
        let occupied = state.files.keys().any(|p| p.parent() == Some(path))
            || state.dirs.iter().any(|d| d.parent() == Some(path));
        if occupied {
            return Ok(false);
        }
        state.dirs.remove(path);
        Ok(true)
    }
}
