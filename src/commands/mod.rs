//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod models;
pub mod report;
pub mod utils;
pub mod watch;

// Re-export main command functions
pub use models::{ReportArgs, WatchArgs};
pub use report::{execute_report, validate_args};
pub use utils::{display_schema, display_version, validate_report_file};
pub use watch::{execute_watch, validate_watch_args};
