//! Filesystem abstraction
//!
//! Everything the engine does to either tree goes through [`FileSystem`], so the
//! same planner and executor run against the real disk ([`OsFs`]) or an
//! in-memory fake ([`MemoryFs`]).

mod memory;
mod os;

pub use memory::MemoryFs;
pub use os::OsFs;

use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Name prefix of the temp file [`FileSystem::write_atomic`] creates beside its destination
pub const WRITE_TEMP_PREFIX: &str = ".relocase-";
/// Name suffix of the same temp file
pub const WRITE_TEMP_SUFFIX: &str = ".tmp";

/// True for a file name [`FileSystem::write_atomic`] uses for its temp file.
///
/// A killed copy can leave one behind; it is never real tree content.
pub fn is_write_temp(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| {
            name.len() > WRITE_TEMP_PREFIX.len() + WRITE_TEMP_SUFFIX.len()
                && name.starts_with(WRITE_TEMP_PREFIX)
                && name.ends_with(WRITE_TEMP_SUFFIX)
        })
}

/// Cheap metadata for a regular file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    pub size: u64,
    pub modified: SystemTime,
}

/// A regular file found while walking a tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub path: PathBuf,
    pub stat: FileStat,
}

/// Walk behaviour shared by every backend
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Follow symbolic links (default: false, avoids cycles)
    pub follow_symlinks: bool,
    /// Path component names never descended into or yielded
    pub prune: Vec<String>,
}

impl WalkOptions {
    /// True when any component of `relative` is in the prune list.
    pub fn is_pruned(&self, relative: &Path) -> bool {
        relative.components().any(|component| match component {
            std::path::Component::Normal(name) => {
                self.prune.iter().any(|p| name == std::ffi::OsStr::new(p))
            }
            _ => false,
        })
    }
}

/// Options for [`FileSystem::write_atomic`]
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Replace an existing file at the destination
    pub overwrite: bool,
    /// Modification time to stamp on the written file
    pub modified: Option<SystemTime>,
}

/// Lazy sequence of regular files under a root, depth-first, names sorted.
pub type EntryIter<'a> = Box<dyn Iterator<Item = Result<RawEntry, ScanError>> + 'a>;

/// Filesystem operations the sync engine needs
pub trait FileSystem: Send + Sync {
    /// Walk regular files below `root`. Each call returns a fresh iterator.
    fn walk_files<'a>(&'a self, root: &Path, options: &WalkOptions) -> EntryIter<'a>;

    /// Metadata of the regular file at `path`, `None` when nothing is there.
    fn stat(&self, path: &Path) -> io::Result<Option<FileStat>>;

    /// Whether anything (file, directory, link) exists at `path`.
    fn exists(&self, path: &Path) -> io::Result<bool>;

    fn is_dir(&self, path: &Path) -> bool;

    fn open_read<'a>(&'a self, path: &Path) -> io::Result<Box<dyn Read + Send + 'a>>;

    /// Stream `reader` into a temporary file next to `path`, then rename it
    /// into place. Returns the number of bytes written.
    ///
    /// With `overwrite = false` an existing destination fails with
    /// [`io::ErrorKind::AlreadyExists`] and is left untouched.
    fn write_atomic(
        &self,
        path: &Path,
        reader: &mut dyn Read,
        options: &WriteOptions,
    ) -> io::Result<u64>;

    /// Rename `from` to `to`. With `overwrite = false` an existing destination
    /// fails with [`io::ErrorKind::AlreadyExists`].
    fn rename(&self, from: &Path, to: &Path, overwrite: bool) -> io::Result<()>;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Remove `path` if it is an empty directory. Returns whether it was removed.
    fn remove_dir_if_empty(&self, path: &Path) -> io::Result<bool>;
}

pub(crate) fn already_exists(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("destination already exists: {}", path.display()),
    )
}
