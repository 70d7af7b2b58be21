//! Sync engine: plan, execute and report one run of source → target.

pub mod executor;
pub mod plan;
pub mod report;
pub mod session;

pub use executor::{Executor, ExecutorOptions, OccupiedPolicy};
pub use plan::{PlanEntry, Planner, SyncAction};
pub use report::{Outcome, ReportCounts, ReportEntry, SyncReport};
pub use session::{index_path, SyncSession};
