//! JSON file implementation of the fallback store.

use log::{debug, info};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{decode_envelope, SnapshotEnvelope, SnapshotStore};
use crate::utils::error::StoreError;

/// Stores the envelope as pretty JSON at one path
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Option<SnapshotEnvelope>, StoreError> {
        if !self.path.exists() {
            debug!("No cached snapshot at {}", self.path.display());
            return Ok(None);
        }
        let bytes = fs::read(&self.path)?;
        let envelope = decode_envelope(&bytes)?;
        if let Some(envelope) = &envelope {
            debug!(
                "Loaded cached snapshot from {} (saved {})",
                self.path.display(),
                envelope.timestamp
            );
        }
        Ok(envelope)
    }

    /// Write to a sibling temp file, then rename over the old snapshot
    fn save(&self, envelope: &SnapshotEnvelope) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(fs::File::create(&tmp)?);
            serde_json::to_writer_pretty(&mut writer, envelope)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;

        info!("Cached snapshot saved to {}", self.path.display());
        Ok(())
    }
}
