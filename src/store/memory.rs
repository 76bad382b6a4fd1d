use std::sync::Mutex;

use super::{SnapshotEnvelope, SnapshotStore};
use crate::utils::error::StoreError;

/// In-process store, for tests and one-shot runs that should not persist
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    slot: Mutex<Option<SnapshotEnvelope>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an envelope already stored
    pub fn with_envelope(envelope: SnapshotEnvelope) -> Self {
        Self {
            slot: Mutex::new(Some(envelope)),
        }
    }

    /// Raw contents, including an outdated envelope; `None` when empty or poisoned
    pub fn stored(&self) -> Option<SnapshotEnvelope> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Option<SnapshotEnvelope>, StoreError> {
        let slot = self.slot.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(slot.clone().filter(SnapshotEnvelope::is_current))
    }

    fn save(&self, envelope: &SnapshotEnvelope) -> Result<(), StoreError> {
        let mut slot = self.slot.lock().map_err(|_| StoreError::Poisoned)?;
        *slot = Some(envelope.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Snapshot;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn envelope() -> SnapshotEnvelope {
        let at = Utc.with_ymd_and_hms(2024, 4, 4, 0, 0, 0).unwrap();
        SnapshotEnvelope::new(Snapshot::empty_at(at), at)
    }

    #[test]
    fn test_save_then_load() {
        let store = MemorySnapshotStore::new();
        assert!(store.load().unwrap().is_none());

        store.save(&envelope()).unwrap();
        assert_eq!(store.load().unwrap(), Some(envelope()));
    }

    #[test]
    fn test_poisoned_lock_is_an_error() {
        let store = Arc::new(MemorySnapshotStore::new());
        let holder = Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = holder.slot.lock().unwrap();
            panic!("writer died while holding the slot");
        })
        .join();

        assert!(matches!(store.save(&envelope()), Err(StoreError::Poisoned)));
        assert!(matches!(store.load(), Err(StoreError::Poisoned)));
    }
}
