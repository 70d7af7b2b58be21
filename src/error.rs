//! Error types for the relocase sync engine.

use std::path::PathBuf;
use thiserror::Error;

/// Index store errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Persisted index is unreadable or malformed. Recovered by rebuilding.
    #[error("Index corrupt: {0}")]
    IndexCorrupt(String),

    #[error("Index store error: {0}")]
    Backend(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        let message = err.to_string();
        match err {
            sled::Error::Io(e) => StorageError::IoError(e),
            sled::Error::Corruption { .. } | sled::Error::Unsupported(_) => {
                StorageError::IndexCorrupt(message)
            }
            _ => StorageError::Backend(message),
        }
    }
}

/// Directory walk errors
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to walk {}: {source}", path.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "<unknown>".to_string()))]
    Walk {
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    #[error("Path is not valid UTF-8: {0:?}")]
    NonUtf8(PathBuf),
}

impl ScanError {
    /// Path the error refers to, when known.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            ScanError::Walk { path, .. } => path.as_deref(),
            ScanError::NonUtf8(path) => Some(path.as_path()),
        }
    }
}

impl From<walkdir::Error> for ScanError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(|p| p.to_path_buf());
        let message = err.to_string();
        let source = err
            .into_io_error()
            .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, message));
        ScanError::Walk { path, source }
    }
}

/// Which side of the sync a root belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootRole {
    Source,
    Target,
}

impl std::fmt::Display for RootRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RootRole::Source => write!(f, "source"),
            RootRole::Target => write!(f, "target"),
        }
    }
}

/// Sync engine errors
#[derive(Debug, Error)]
pub enum SyncError {
    /// Source or target root unusable. Raised before anything is mutated.
    #[error("Invalid {role} root {}: {reason}", path.display())]
    Path {
        role: RootRole,
        path: PathBuf,
        reason: String,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl SyncError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn path(role: RootRole, path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        SyncError::Path {
            role,
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<config::ConfigError> for SyncError {
    fn from(err: config::ConfigError) -> Self {
        SyncError::ConfigError(err.to_string())
    }
}
