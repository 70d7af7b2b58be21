//! CLI route: run context. Loads configuration, folds in CLI flags, runs one
//! sync session and writes the report.

use crate::cli::output::exit_code;
use crate::cli::parse::{Cli, OutputFormat};
use crate::cli::presentation::{format_entry_line, format_report_json, format_summary};
use crate::config::{ConfigLoader, RelocaseConfig};
use crate::error::SyncError;
use crate::sync::report::ReportEntry;
use crate::sync::SyncSession;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use tracing::info;

/// Runtime context for CLI execution: merged configuration plus output choices.
pub struct RunContext {
    config: RelocaseConfig,
    color: bool,
}

impl RunContext {
    /// Load configuration (defaults, global file, `--config`, environment) and
    /// apply CLI flags on top. Invalid configuration is rejected here.
    pub fn new(cli: &Cli) -> Result<Self, SyncError> {
        let mut config = ConfigLoader::load(cli.config.as_deref())?;
        apply_cli_overrides(&mut config, cli);

        config.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            SyncError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;

        let color = !cli.no_color
            && std::env::var_os("NO_COLOR").is_none()
            && std::io::stdout().is_terminal();
        Ok(Self { config, color })
    }

    /// Context over an already merged configuration
    pub fn with_config(config: RelocaseConfig, color: bool) -> Self {
        Self { config, color }
    }

    pub fn config(&self) -> &RelocaseConfig {
        &self.config
    }

    /// Run the command, writing the report to `out`. Returns the process exit code.
    pub fn execute(&self, cli: &Cli, out: &mut dyn Write) -> Result<i32, SyncError> {
        if cli.print_config {
            let rendered = self.config.to_toml().map_err(|e| {
                SyncError::ConfigError(format!("Failed to render configuration: {}", e))
            })?;
            write!(out, "{}", rendered).map_err(|e| SyncError::io("<stdout>", e))?;
            return Ok(0);
        }

        let (source, target) = match (&cli.source, &cli.target) {
            (Some(source), Some(target)) => (source.clone(), target.clone()),
            _ => {
                return Err(SyncError::ConfigError(
                    "SOURCE and TARGET are required".to_string(),
                ))
            }
        };
        self.sync(source, target, cli.dry_run, cli.format, cli.quiet, out)
    }

    fn sync(
        &self,
        source: PathBuf,
        target: PathBuf,
        dry_run: bool,
        format: OutputFormat,
        quiet: bool,
        out: &mut dyn Write,
    ) -> Result<i32, SyncError> {
        let mut session = SyncSession::open(source, target, dry_run, self.config.clone())?;
        info!(
            source = %session.source_root().display(),
            target = %session.target_root().display(),
            dry_run,
            "Session opened"
        );

        let color = self.color;
        let mut write_error: Option<std::io::Error> = None;
        let stream_lines = format == OutputFormat::Text;
        let report = session.run_with(|entry: &ReportEntry| {
            if !stream_lines || write_error.is_some() {
                return;
            }
            if quiet && !entry.outcome.is_problem() {
                return;
            }
            if let Err(e) = writeln!(out, "{}", format_entry_line(entry, dry_run, color)) {
                write_error = Some(e);
            }
        })?;
        if let Some(e) = write_error {
            return Err(SyncError::io("<stdout>", e));
        }

        let rendered = match format {
            OutputFormat::Text => format_summary(&report, color),
            OutputFormat::Json => format_report_json(&report)? + "\n",
        };
        write!(out, "{}", rendered).map_err(|e| SyncError::io("<stdout>", e))?;
        Ok(exit_code(&report))
    }
}

/// Fold CLI flags into the merged configuration. CLI flags win over every file
/// and environment layer.
pub fn apply_cli_overrides(config: &mut RelocaseConfig, cli: &Cli) {
    if let Some(ref name) = cli.index_name {
        config.index.dir_name = name.clone();
    }
    if let Some(policy) = cli.on_occupied {
        config.sync.on_occupied = policy;
    }

    let logging = &mut config.logging;
    if cli.quiet {
        logging.enabled = false;
    }
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        logging.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        logging.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        logging.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        logging.file = file.clone();
    }
    if cli.no_color {
        logging.color = false;
    }
}
