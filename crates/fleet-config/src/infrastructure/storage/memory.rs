//! In-memory registry store.
//!
//! Records every list it is asked to persist.  Clones share the same
//! history, so a test can keep one copy while the registry owns the other.
//! The CLI uses it for `--dry-run` scans.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fleet_core::DeviceEntry;

use crate::application::manage_devices::RegistryStore;

#[derive(Debug, Default)]
struct MemoryState {
    writes: Vec<Vec<DeviceEntry>>,
    failure: Option<String>,
}

/// A [`RegistryStore`] that never touches the disk.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every following `persist` fail with `reason`.
    pub fn fail_with(&self, reason: &str) {
        self.lock().failure = Some(reason.to_string());
    }

    /// Lets `persist` succeed again.
    pub fn recover(&self) {
        self.lock().failure = None;
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.lock().writes.len()
    }

    /// The most recently persisted list.
    pub fn last_written(&self) -> Option<Vec<DeviceEntry>> {
        self.lock().writes.last().cloned()
    }
}

impl RegistryStore for InMemoryStore {
    fn persist(&self, entries: &[DeviceEntry]) -> Result<(), String> {
        let mut state = self.lock();
        if let Some(reason) = &state.failure {
            return Err(reason.clone());
        }
        state.writes.push(entries.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::validate;

    #[test]
    fn test_store_records_writes_across_clones() {
        // Arrange
        let store = InMemoryStore::new();
        let observer = store.clone();
        let entry = DeviceEntry::new(validate("11:11:11:11:11:11").unwrap(), "R1");

        // Act
        store.persist(&[entry.clone()]).unwrap();

        // Assert
        assert_eq!(observer.write_count(), 1);
        assert_eq!(observer.last_written(), Some(vec![entry]));
    }

    #[test]
    fn test_failing_store_rejects_until_recovered() {
        let store = InMemoryStore::new();
        store.fail_with("disk full");

        assert_eq!(store.persist(&[]), Err("disk full".to_string()));
        assert_eq!(store.write_count(), 0);

        store.recover();
        assert!(store.persist(&[]).is_ok());
    }
}
