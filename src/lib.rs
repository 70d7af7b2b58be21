//! relocase: Content-Addressed Directory Sync
//!
//! Synchronizes a source tree into a target tree. Before copying a file, the
//! target is searched for identical content under any path; when found, that
//! file is moved into place instead of transferring the bytes again. A
//! persistent index of target fingerprints keeps the search cheap across runs.

pub mod cli;
pub mod config;
pub mod error;
pub mod fs;
pub mod index;
pub mod logging;
pub mod store;
pub mod sync;
pub mod tree;
pub mod types;

pub use config::RelocaseConfig;
pub use error::{ScanError, StorageError, SyncError};
pub use index::{RefreshSummary, TargetIndex};
pub use sync::{Outcome, SyncAction, SyncReport, SyncSession};
