//! CLI parse: clap types for relocase. No behavior; definitions only.

use crate::sync::executor::OccupiedPolicy;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// relocase - content-addressed directory sync
#[derive(Parser, Debug)]
#[command(name = "relocase", version)]
#[command(
    about = "Sync SOURCE into TARGET, relocating files TARGET already holds instead of copying them again"
)]
pub struct Cli {
    /// Source directory
    #[arg(required_unless_present = "print_config")]
    pub source: Option<PathBuf>,

    /// Target directory (the index lives under it)
    #[arg(required_unless_present = "print_config")]
    pub target: Option<PathBuf>,

    /// Plan and report without touching the target or its index
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Name of the index directory under TARGET (default: .relocase)
    #[arg(long, value_name = "NAME")]
    pub index_name: Option<String>,

    /// What to do when the destination holds different content
    #[arg(long, value_enum)]
    pub on_occupied: Option<OccupiedPolicy>,

    /// Report format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Configuration file path (layered over the global config)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short)]
    pub verbose: bool,

    /// Disable logging and print only problems and the summary
    #[arg(long, short, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Never color the report
    #[arg(long)]
    pub no_color: bool,

    /// Print the merged configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
