//! Output writers for circulation reports.
//!
//! This module handles writing data to disk and to the terminal:
//! - JSON reports (pretty)
//! - Text summaries

pub mod json;
pub mod summary;

// Re-export main functions
pub use json::{read_report, report_to_string, write_report};
pub use summary::render_summary;
