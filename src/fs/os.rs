//! Real filesystem backend

use super::{
    already_exists, EntryIter, FileStat, FileSystem, RawEntry, WalkOptions, WriteOptions,
    WRITE_TEMP_PREFIX, WRITE_TEMP_SUFFIX,
};
use crate::error::ScanError;
use filetime::FileTime;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use walkdir::WalkDir;

/// [`FileSystem`] backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl OsFs {
    pub fn new() -> Self {
        Self
    }
}

fn stat_from_metadata(metadata: &fs::Metadata) -> io::Result<FileStat> {
    Ok(FileStat {
        size: metadata.len(),
        modified: metadata.modified()?,
    })
}

impl FileSystem for OsFs {
    fn walk_files<'a>(&'a self, root: &Path, options: &WalkOptions) -> EntryIter<'a> {
        let prune_root = root.to_path_buf();
        let prune = options.clone();

        let walker = WalkDir::new(root)
            .follow_links(options.follow_symlinks)
            .sort_by_file_name()
            .min_depth(1)
            .into_iter()
            .filter_entry(move |entry| {
                let relative = entry
                    .path()
                    .strip_prefix(&prune_root)
                    .unwrap_or_else(|_| entry.path());
                !prune.is_pruned(relative)
            })
            .filter_map(|result| match result {
                Ok(entry) => {
                    // Directories are descended into; symlinks are skipped unless followed.
                    if !entry.file_type().is_file() {
                        return None;
                    }
                    let metadata = match entry.metadata() {
                        Ok(metadata) => metadata,
                        Err(e) => return Some(Err(ScanError::from(e))),
                    };
                    Some(
                        stat_from_metadata(&metadata)
                            .map(|stat| RawEntry {
                                path: entry.path().to_path_buf(),
                                stat,
                            })
                            .map_err(|source| ScanError::Walk {
                                path: Some(entry.path().to_path_buf()),
                                source,
                            }),
                    )
                }
                Err(e) => Some(Err(ScanError::from(e))),
            });

        Box::new(walker)
    }

    fn stat(&self, path: &Path) -> io::Result<Option<FileStat>> {
        match fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => stat_from_metadata(&metadata).map(Some),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn exists(&self, path: &Path) -> io::Result<bool> {
        match fs::symlink_metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn open_read<'a>(&'a self, path: &Path) -> io::Result<Box<dyn Read + Send + 'a>> {
        let file = fs::File::open(path)?;
        Ok(Box::new(file))
    }

    fn write_atomic(
        &self,
        path: &Path,
        reader: &mut dyn Read,
        options: &WriteOptions,
    ) -> io::Result<u64> {
        let parent = path.parent().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("no parent directory for {}", path.display()),
            )
        })?;

        let mut temp = tempfile::Builder::new()
            .prefix(WRITE_TEMP_PREFIX)
            .suffix(WRITE_TEMP_SUFFIX)
            .tempfile_in(parent)?;
        let written = io::copy(reader, temp.as_file_mut())?;
        temp.as_file().sync_all()?;

        if let Some(modified) = options.modified {
            filetime::set_file_mtime(temp.path(), FileTime::from_system_time(modified))?;
        }

        // Dropping the temp file on error removes it, so a failed write leaves nothing behind.
        let persisted = if options.overwrite {
            temp.persist(path)
        } else {
            temp.persist_noclobber(path)
        };
        persisted.map_err(|e| {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                already_exists(path)
            } else {
                e.error
            }
        })?;

        Ok(written)
    }

    fn rename(&self, from: &Path, to: &Path, overwrite: bool) -> io::Result<()> {
        if !overwrite && self.exists(to)? {
            return Err(already_exists(to));
        }
        fs::rename(from, to)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn remove_dir_if_empty(&self, path: &Path) -> io::Result<bool> {
        if fs::read_dir(path)?.next().is_some() {
            return Ok(false);
        }
        fs::remove_dir(path)?;
        Ok(true)
    }
}
