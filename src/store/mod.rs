//! Persistent fallback store for the Cached snapshot.
//!
//! The store holds one versioned envelope `{data, timestamp, schemaVersion}`.
//! It is read once at the start of a cycle and written at most once at the
//! end, by the single polling loop, so no locking is needed.

mod file;
mod memory;

pub use file::FileSnapshotStore;
pub use memory::MemorySnapshotStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Snapshot;
use crate::utils::config::CACHE_SCHEMA_VERSION;
use crate::utils::error::StoreError;

/// Persisted form of the Cached snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEnvelope {
    pub data: Snapshot,
    pub timestamp: DateTime<Utc>,
    pub schema_version: u32,
}

impl SnapshotEnvelope {
    /// Wrap a snapshot with the current schema version
    pub fn new(data: Snapshot, timestamp: DateTime<Utc>) -> Self {
        Self {
            data,
            timestamp,
            schema_version: CACHE_SCHEMA_VERSION,
        }
    }

    pub fn is_current(&self) -> bool {
        self.schema_version == CACHE_SCHEMA_VERSION
    }
}

/// Read/write contract of the fallback store
pub trait SnapshotStore {
    /// Load the stored snapshot.
    ///
    /// Returns `Ok(None)` when nothing is stored or the stored schema version
    /// is not the current one.
    fn load(&self) -> Result<Option<SnapshotEnvelope>, StoreError>;

    /// Replace the stored snapshot
    fn save(&self, envelope: &SnapshotEnvelope) -> Result<(), StoreError>;
}

/// Decode an envelope, treating other schema versions as absent
pub fn decode_envelope(bytes: &[u8]) -> Result<Option<SnapshotEnvelope>, StoreError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    let version = value.get("schemaVersion").and_then(|v| v.as_u64());
    if version != Some(u64::from(CACHE_SCHEMA_VERSION)) {
        log::warn!(
            "Ignoring stored snapshot with schema version {:?} (expected {})",
            version,
            CACHE_SCHEMA_VERSION
        );
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(value)?))
}
