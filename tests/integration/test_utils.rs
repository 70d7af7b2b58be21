//! Shared test utilities for integration tests
//!
//! Real-disk tree builders plus XDG isolation for tests that read the global
//! configuration file.

use relocase::config::DEFAULT_INDEX_DIR;
use relocase::{RelocaseConfig, SyncReport, SyncSession};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;
use walkdir::WalkDir;

/// Global mutex to serialize environment variable access across all tests
static XDG_ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Environment variable state to restore after test
struct EnvState {
    home: Option<String>,
    xdg_config_home: Option<String>,
}

impl EnvState {
    fn capture() -> Self {
        Self {
            home: std::env::var("HOME").ok(),
            xdg_config_home: std::env::var("XDG_CONFIG_HOME").ok(),
        }
    }

    fn restore(self) {
        match self.home {
            Some(orig) => std::env::set_var("HOME", orig),
            None => std::env::remove_var("HOME"),
        }
        match self.xdg_config_home {
            Some(orig) => std::env::set_var("XDG_CONFIG_HOME", orig),
            None => std::env::remove_var("XDG_CONFIG_HOME"),
        }
    }
}

/// Run `f` with HOME and XDG_CONFIG_HOME pointing into `test_dir`
///
/// The global config file then lives at `<test_dir>/relocase/config.toml`.
pub fn with_xdg_env<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = XDG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let env_state = EnvState::capture();

    let test_home = test_dir.path().join("home");
    std::fs::create_dir_all(&test_home).unwrap();
    std::env::set_var("HOME", test_home.to_str().unwrap());
    std::env::set_var("XDG_CONFIG_HOME", test_dir.path().to_str().unwrap());

    let result = f();

    env_state.restore();
    result
}

/// Create files (and their parent directories) under `root`
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    std::fs::create_dir_all(root).unwrap();
    for (rel, content) in files {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
}

/// Every regular file under `root` as `rel/path -> content`, index directory excluded
pub fn read_tree(root: &Path) -> BTreeMap<String, String> {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.file_name() != DEFAULT_INDEX_DIR)
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e
                .path()
                .strip_prefix(root)
                .unwrap()
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            (rel, std::fs::read_to_string(e.path()).unwrap())
        })
        .collect()
}

/// Source and target directories inside one temp dir
pub struct Roots {
    pub temp: TempDir,
}

impl Roots {
    pub fn new(source: &[(&str, &str)], target: &[(&str, &str)]) -> Self {
        let temp = TempDir::new().unwrap();
        write_tree(&temp.path().join("source"), source);
        write_tree(&temp.path().join("target"), target);
        Self { temp }
    }

    pub fn source(&self) -> std::path::PathBuf {
        self.temp.path().join("source")
    }

    pub fn target(&self) -> std::path::PathBuf {
        self.temp.path().join("target")
    }

    /// One full session over the real filesystem with default configuration
    pub fn sync(&self, dry_run: bool) -> SyncReport {
        self.sync_with(dry_run, RelocaseConfig::default())
    }

    pub fn sync_with(&self, dry_run: bool, config: RelocaseConfig) -> SyncReport {
        let mut session = SyncSession::open(self.source(), self.target(), dry_run, config).unwrap();
        session.run().unwrap()
    }
}

/// Plan actions as `(source_path, label)` pairs
pub fn actions(report: &SyncReport) -> Vec<(String, &'static str)> {
    report
        .plan
        .iter()
        .map(|p| (p.source_path.clone(), p.action.label()))
        .collect()
}
