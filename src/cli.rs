//! CLI domain: parse, route, output, and presentation only.
//! No sync logic; the route hands a configured session to the engine.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::{exit_code, map_error, EXIT_FATAL, EXIT_OK, EXIT_PROBLEMS};
pub use parse::{Cli, OutputFormat};
pub use presentation::{format_entry_line, format_report_json, format_summary};
pub use route::RunContext;
