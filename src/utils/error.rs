//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.
//!
//! Source errors never abort a polling cycle: the cycle catches them at the
//! smallest scope and records a [`crate::model::DataIssue`] instead.

use thiserror::Error;

/// Errors that can occur while talking to an upstream data source
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    TransportFailure(#[from] reqwest::Error),

    #[error("Upstream returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl SourceError {
    /// Shorthand for a malformed-response error
    pub fn malformed(message: impl Into<String>) -> Self {
        SourceError::MalformedResponse(message.into())
    }

    /// True for unreachable / non-success upstreams, false for bad payloads
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SourceError::TransportFailure(_) | SourceError::HttpStatus { .. }
        )
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::MalformedResponse(err.to_string())
    }
}

/// Errors that can occur in the persistent fallback store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Snapshot store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot (de)serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Snapshot store lock poisoned")]
    Poisoned,
}

/// Errors that can occur while loading the roster configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read roster file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Roster TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid roster: {0}")]
    Invalid(String),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
