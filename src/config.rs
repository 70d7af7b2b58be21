//! Configuration System
//!
//! Layered configuration: built-in defaults, the global config file, an
//! explicit `--config` file, then `RELOCASE__SECTION__KEY` environment
//! variables. CLI flags are applied on top by the caller.

use crate::logging::LoggingConfig;
use crate::sync::executor::OccupiedPolicy;
use crate::tree::walker::ScanConfig;
use serde::{Deserialize, Serialize};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Prefix for environment overrides, e.g. `RELOCASE__SYNC__ON_OCCUPIED=overwrite`
pub const ENV_PREFIX: &str = "RELOCASE";

/// Default name of the index directory kept under the target root
pub const DEFAULT_INDEX_DIR: &str = ".relocase";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelocaseConfig {
    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the target index lives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory under the target root holding the index; never synced
    #[serde(default = "default_index_dir")]
    pub dir_name: String,
}

fn default_index_dir() -> String {
    DEFAULT_INDEX_DIR.to_string()
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir_name: default_index_dir(),
        }
    }
}

impl IndexConfig {
    pub fn validate(&self) -> Result<(), String> {
        let name = self.dir_name.as_str();
        if name.is_empty() {
            return Err("Index directory name cannot be empty".to_string());
        }
        if name == "." || name == ".." || name.contains('/') || name.contains('\\') {
            return Err(format!(
                "Index directory name must be a single path component, got {:?}",
                name
            ));
        }
        Ok(())
    }
}

/// Sync behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Destination holds different content: `conflict` or `overwrite`
    #[serde(default)]
    pub on_occupied: OccupiedPolicy,

    /// Copies keep the source file's modification time
    #[serde(default = "default_true")]
    pub preserve_mtime: bool,

    /// Flush the index store after every completed move or copy
    #[serde(default = "default_true")]
    pub flush_each_mutation: bool,

    /// Remove directories a move leaves empty
    #[serde(default = "default_true")]
    pub prune_empty_dirs: bool,

    /// Fingerprint changed target files on a thread pool during refresh
    #[serde(default = "default_true")]
    pub parallel_refresh: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            on_occupied: OccupiedPolicy::default(),
            preserve_mtime: true,
            flush_each_mutation: true,
            prune_empty_dirs: true,
            parallel_refresh: true,
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Index(String),
    Scan(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Index(msg) => write!(f, "Index: {}", msg),
            ValidationError::Scan(msg) => write!(f, "Scan: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl RelocaseConfig {
    /// Validate the entire configuration, collecting every problem
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.index.validate() {
            errors.push(ValidationError::Index(e));
        }

        for pattern in &self.scan.ignore {
            if pattern.is_empty() || pattern.contains('/') {
                errors.push(ValidationError::Scan(format!(
                    "Ignore entries are single path component names, got {:?}",
                    pattern
                )));
            }
        }

        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Render as TOML, as accepted by `--config`
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
