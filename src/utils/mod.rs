//! Utility modules for configuration, error handling, and time.

pub mod clock;
pub mod config;
pub mod error;

// Re-export commonly used error types for convenience
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ConfigError, OutputError, SourceError, StoreError};
