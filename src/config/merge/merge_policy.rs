//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Later sources override these key by key; a file that sets only
/// `sync.on_occupied` keeps every other default.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("index.dir_name", crate::config::DEFAULT_INDEX_DIR)?
        .set_default("sync.on_occupied", "conflict")?
        .set_default("sync.preserve_mtime", true)?
        .set_default("sync.flush_each_mutation", true)?
        .set_default("sync.prune_empty_dirs", true)?
        .set_default("sync.parallel_refresh", true)?
        .set_default("scan.follow_symlinks", false)?
        .set_default("logging.level", "warn")?
        .set_default("logging.format", "text")?
        .set_default("logging.output", "stderr")
}
