//! DeviceRegistry: the durable, committed list of known robots.
//!
//! The registry is the single place the rest of the application reads the
//! device list from (for example when it decides which robots to connect
//! to).  It changes in exactly one way: a configuration session commits and
//! calls [`DeviceRegistry::replace`].
//!
//! # All-or-nothing replacement
//!
//! ```text
//! replace(entries)
//!   ├─ uniqueness check   ── fails → registry unchanged
//!   ├─ store.persist()    ── fails → registry unchanged
//!   └─ swap in memory, revision += 1
//! ```
//!
//! The in-memory list is only swapped once the store has accepted the new
//! list, so memory and disk never disagree after a failed write.

use fleet_core::domain::device::find_duplicate;
use fleet_core::{BtAddress, DeviceEntry};
use thiserror::Error;
use tracing::{info, warn};

/// Error type for registry operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The list contains the same address more than once.
    #[error("device {0} appears more than once")]
    DuplicateAddress(BtAddress),
    /// The backing store rejected the write.
    #[error("failed to persist device list: {0}")]
    Persist(String),
}

/// Durable storage for the device list.
///
/// The production implementation writes the TOML config file; tests use an
/// in-memory store or a mock.
#[cfg_attr(test, mockall::automock)]
pub trait RegistryStore: Send {
    /// Durably stores `entries`, replacing whatever was stored before.
    fn persist(&self, entries: &[DeviceEntry]) -> Result<(), String>;
}

/// The committed set of known devices, in display order.
pub struct DeviceRegistry {
    entries: Vec<DeviceEntry>,
    revision: u64,
    store: Box<dyn RegistryStore>,
}

impl DeviceRegistry {
    /// Creates an empty registry backed by `store`.
    pub fn new(store: Box<dyn RegistryStore>) -> Self {
        Self {
            entries: Vec::new(),
            revision: 0,
            store,
        }
    }

    /// Creates a registry holding `entries` as loaded from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateAddress`] if an address repeats.
    pub fn from_entries(
        entries: Vec<DeviceEntry>,
        store: Box<dyn RegistryStore>,
    ) -> Result<Self, RegistryError> {
        if let Some(address) = find_duplicate(&entries) {
            return Err(RegistryError::DuplicateAddress(address));
        }
        Ok(Self {
            entries,
            revision: 0,
            store,
        })
    }

    /// Returns a copy of the committed list.
    pub fn load(&self) -> Vec<DeviceEntry> {
        self.entries.clone()
    }

    /// Borrows the committed list.
    pub fn entries(&self) -> &[DeviceEntry] {
        &self.entries
    }

    /// Number of successful replacements since the registry was created.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overwrites the committed list with `entries`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateAddress`] if `entries` violates
    /// uniqueness, or [`RegistryError::Persist`] if the store fails.  In both
    /// cases the registry is left exactly as it was.
    pub fn replace(&mut self, entries: Vec<DeviceEntry>) -> Result<(), RegistryError> {
        if let Some(address) = find_duplicate(&entries) {
            return Err(RegistryError::DuplicateAddress(address));
        }

        if let Err(reason) = self.store.persist(&entries) {
            warn!("device list not replaced, store rejected write: {reason}");
            return Err(RegistryError::Persist(reason));
        }

        self.entries = entries;
        self.revision += 1;
        info!(
            devices = self.entries.len(),
            revision = self.revision,
            "device registry replaced"
        );
        Ok(())
    }
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("entries", &self.entries)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}
