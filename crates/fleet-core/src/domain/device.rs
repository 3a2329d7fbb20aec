//! Device records: known robots and scan candidates.

use super::address::{canonical_key, BtAddress};
use super::label::{encode_label, LABEL_SEPARATOR};

/// A robot the fleet tracker knows about.
///
/// `active` marks whether the application should open a connection to the
/// robot when Bluetooth communication starts.  New entries start inactive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    /// Unique key within any device list.
    pub address: BtAddress,
    /// Human-readable name shown in the UI.
    pub name: String,
    /// Whether the robot takes part in the next connection round.
    pub active: bool,
}

impl DeviceEntry {
    /// Creates an inactive entry.
    pub fn new(address: BtAddress, name: impl Into<String>) -> Self {
        Self {
            address,
            name: name.into(),
            active: false,
        }
    }

    /// Returns the `"name : address"` display label.
    pub fn label(&self) -> String {
        encode_label(&self.name, &self.address)
    }
}

/// A device reported by a scan that has not been promoted yet.
///
/// The address is kept exactly as the transport reported it; it is only
/// validated when the candidate is promoted into the working list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub address: String,
    pub name: String,
}

impl Candidate {
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
        }
    }

    /// Key used to decide whether two reports describe the same device.
    pub fn key(&self) -> String {
        canonical_key(&self.address)
    }

    /// Returns the display label, using the canonical address when it parses.
    pub fn label(&self) -> String {
        match self.address.parse::<BtAddress>() {
            Ok(address) => encode_label(&self.name, &address),
            Err(_) => format!("{}{LABEL_SEPARATOR}{}", self.name, self.address.trim()),
        }
    }
}

/// Returns the index of the entry with `address`, if any.
pub fn position_of(entries: &[DeviceEntry], address: &BtAddress) -> Option<usize> {
    entries.iter().position(|e| e.address == *address)
}

/// Returns the first address that occurs more than once in `entries`.
pub fn find_duplicate(entries: &[DeviceEntry]) -> Option<BtAddress> {
    let mut seen = std::collections::HashSet::with_capacity(entries.len());
    entries
        .iter()
        .find(|e| !seen.insert(e.address))
        .map(|e| e.address)
}
