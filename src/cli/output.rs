//! CLI output: error mapping and exit codes.

use crate::error::SyncError;
use crate::sync::report::SyncReport;

/// Every entry OK or SKIPPED
pub const EXIT_OK: i32 = 0;
/// At least one FAILED or CONFLICT entry
pub const EXIT_PROBLEMS: i32 = 1;
/// Nothing ran: bad roots, bad configuration, unusable index store
pub const EXIT_FATAL: i32 = 2;

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &SyncError) -> String {
    match e {
        SyncError::Path { .. } => format!("error: {}", e),
        SyncError::ConfigError(msg) => format!("error: configuration: {}", msg),
        _ => format!("error: {}", e),
    }
}

pub fn exit_code(report: &SyncReport) -> i32 {
    if report.has_problems() {
        EXIT_PROBLEMS
    } else {
        EXIT_OK
    }
}
