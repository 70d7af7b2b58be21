//! Config loader: assembles the layered sources into a `RelocaseConfig`.

use super::merge::merge_policy;
use super::sources::{explicit_file, global_file};
use super::{RelocaseConfig, ENV_PREFIX};
use config::{ConfigError, Environment};
use std::path::Path;
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load defaults, the global file, `explicit` (if given) and the environment
    pub fn load(explicit: Option<&Path>) -> Result<RelocaseConfig, ConfigError> {
        let global = global_file::global_config_path();
        Self::load_layers(global.as_deref(), explicit)
    }

    /// Load with the global file location supplied by the caller
    pub fn load_layers(
        global: Option<&Path>,
        explicit: Option<&Path>,
    ) -> Result<RelocaseConfig, ConfigError> {
        let mut builder = merge_policy::builder_with_defaults()?;
        if let Some(global) = global {
            builder = global_file::add_to_builder(builder, global)?;
        }
        if let Some(explicit) = explicit {
            builder = explicit_file::add_to_builder(builder, explicit)?;
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: RelocaseConfig = builder.build()?.try_deserialize()?;
        debug!(
            global = ?global,
            explicit = ?explicit,
            index_dir = %config.index.dir_name,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Load defaults plus a single file, ignoring the global file and environment
    pub fn load_from_file(path: &Path) -> Result<RelocaseConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = explicit_file::add_to_builder(builder, path)?;
        builder.build()?.try_deserialize()
    }

    /// Built-in defaults only
    pub fn default() -> RelocaseConfig {
        RelocaseConfig::default()
    }
}
