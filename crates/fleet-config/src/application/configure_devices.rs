//! ConfigurationSession: the edit-then-commit controller behind the device
//! configuration dialog.
//!
//! A session is opened from the [`DeviceRegistry`], works on a private copy
//! of its entries and ends in exactly one of two ways:
//!
//! ```text
//!            add_manual / promote / toggle / remove
//!                 ┌──────────────┐
//!                 ▼              │
//!  open() ──►  Open ─────────────┘
//!                 │
//!        commit() ├──────────────► Committed   (working copy → registry)
//!        cancel() └──────────────► Cancelled   (registry untouched)
//! ```
//!
//! Both end states are terminal: every mutator afterwards fails with
//! [`SessionError::SessionClosed`].
//!
//! # Two lists
//!
//! - **working** – the draft of the registry the user is editing.
//! - **candidates** – devices heard by the current scan that are not yet in
//!   the draft.  Cleared whenever a new scan begins.
//!
//! Feed events are tagged with the scan that produced them.  Only events of
//! the scan started by [`begin_scan`] are applied; a stopped scan's
//! stragglers never leak into a later cycle or a later session.
//!
//! A device moves from `candidates` to `working` only through [`promote`],
//! which applies the same checks as a manual add.
//!
//! # Failures are queued, not overwritten
//!
//! Every failed operation (and every failed item of a batch) pushes one
//! [`Notification`] onto an ordered queue.  The presentation layer drains
//! the queue with [`drain_notifications`] and shows each one; a later
//! failure never hides an earlier one.
//!
//! [`begin_scan`]: ConfigurationSession::begin_scan
//! [`promote`]: ConfigurationSession::promote
//! [`drain_notifications`]: ConfigurationSession::drain_notifications

use std::collections::{BTreeSet, VecDeque};

use fleet_core::domain::address::canonical_key;
use fleet_core::domain::device::position_of;
use fleet_core::{validate, AddressError, BtAddress, Candidate, DeviceEntry};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::manage_devices::{DeviceRegistry, RegistryError};
use crate::infrastructure::discovery::{FeedEvent, ScanId};

/// Error type for configuration session operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid address: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("device {0} is already in the list")]
    DuplicateAddress(BtAddress),

    #[error("index {index} is out of range (list has {len} entries)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("the configuration session is closed")]
    SessionClosed,

    /// The registry was replaced by someone else after this session opened.
    #[error("device list changed since this session was opened")]
    StaleRegistry,

    #[error("scanning unavailable: {0}")]
    FeedUnavailable(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl SessionError {
    /// Short title used for the user-facing notification.
    pub fn title(&self) -> &'static str {
        match self {
            Self::InvalidAddress(_) => "Invalid Entry",
            Self::DuplicateAddress(_) => "Device doubled",
            Self::IndexOutOfRange { .. } => "Invalid Selection",
            Self::SessionClosed => "Session closed",
            Self::FeedUnavailable(_) => "Scan unavailable",
            Self::StaleRegistry | Self::Registry(_) => "Apply failed",
        }
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Committed,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Open)
    }
}

/// What the session knows about the discovery feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// No scan running.
    Idle,
    /// A scan is running; candidates are accumulating.
    Scanning,
    /// The feed could not start.  Manual add still works.
    Unavailable,
}

/// One pending user-facing failure message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

/// A single failed item of a batch operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    /// The index as supplied by the caller.
    pub index: usize,
    pub error: SessionError,
}

/// Per-item outcome of `promote`, `toggle` or `remove`.
///
/// `applied` lists the indices that took effect, in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub applied: Vec<usize>,
    pub failures: Vec<ItemFailure>,
}

impl BatchReport {
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Read-only copy of a session for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub state: SessionState,
    pub scan_state: ScanState,
    pub working: Vec<DeviceEntry>,
    pub candidates: Vec<Candidate>,
    pub pending_notifications: usize,
}

/// The configuration dialog's working state.
#[derive(Debug)]
pub struct ConfigurationSession {
    id: Uuid,
    state: SessionState,
    base_revision: u64,
    working: Vec<DeviceEntry>,
    candidates: Vec<Candidate>,
    scan_state: ScanState,
    /// The scan whose feed events are accepted.
    scan: Option<ScanId>,
    notifications: VecDeque<Notification>,
}

impl ConfigurationSession {
    /// Opens a session on a copy of the registry's current entries.
    pub fn open(registry: &DeviceRegistry) -> Self {
        let session = Self {
            id: Uuid::new_v4(),
            state: SessionState::Open,
            base_revision: registry.revision(),
            working: registry.load(),
            candidates: Vec::new(),
            scan_state: ScanState::Idle,
            scan: None,
            notifications: VecDeque::new(),
        };
        info!(
            session = %session.id,
            devices = session.working.len(),
            "configuration session opened"
        );
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn scan_state(&self) -> ScanState {
        self.scan_state
    }

    /// The draft device list, in display order.
    pub fn working(&self) -> &[DeviceEntry] {
        &self.working
    }

    /// Devices reported by the current scan, in arrival order.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Copies everything a view needs to render the dialog.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            state: self.state,
            scan_state: self.scan_state,
            working: self.working.clone(),
            candidates: self.candidates.clone(),
            pending_notifications: self.notifications.len(),
        }
    }

    /// Number of notifications waiting to be shown.
    pub fn pending_notifications(&self) -> usize {
        self.notifications.len()
    }

    /// Removes and returns every pending notification, oldest first.
    ///
    /// Works in any state so that failures raised just before a terminal
    /// transition can still be shown.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }

    // ── Edits ────────────────────────────────────────────────────────────────

    /// Appends a manually typed device to the working copy as inactive.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidAddress`] if `address` does not parse.
    /// - [`SessionError::DuplicateAddress`] if the working copy already
    ///   holds the address (in any spelling).
    /// - [`SessionError::SessionClosed`] after commit or cancel.
    pub fn add_manual(&mut self, address: &str, name: &str) -> Result<DeviceEntry, SessionError> {
        self.ensure_open()?;
        match self.check_new_entry(address) {
            Ok(address) => {
                let entry = DeviceEntry::new(address, name);
                info!(session = %self.id, "added {}", entry.label());
                self.working.push(entry.clone());
                Ok(entry)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Records a device reported by the scan.
    ///
    /// Returns `Ok(false)` when the address is already a candidate; the
    /// working copy is not consulted.
    pub fn on_device_seen(&mut self, address: &str, name: &str) -> Result<bool, SessionError> {
        self.ensure_open()?;
        let key = canonical_key(address);
        if self.candidates.iter().any(|c| c.key() == key) {
            debug!(session = %self.id, "ignoring repeated report of {address}");
            return Ok(false);
        }
        debug!(session = %self.id, "candidate {name} ({address})");
        self.candidates.push(Candidate::new(address, name));
        Ok(true)
    }

    /// Moves the selected candidates into the working copy.
    ///
    /// Candidates are processed in ascending index order and each one is
    /// checked on its own, so a duplicate or malformed candidate never blocks
    /// the rest.  Promoted candidates leave the candidate list.
    pub fn promote(&mut self, indices: &[usize]) -> Result<BatchReport, SessionError> {
        self.ensure_open()?;
        let selected: BTreeSet<usize> = indices.iter().copied().collect();
        let len = self.candidates.len();
        let mut report = BatchReport::default();

        for &index in &selected {
            let Some(candidate) = self.candidates.get(index) else {
                report.failures.push(ItemFailure {
                    index,
                    error: SessionError::IndexOutOfRange { index, len },
                });
                continue;
            };
            let name = candidate.name.clone();
            match self.check_new_entry(&candidate.address) {
                Ok(address) => {
                    self.working.push(DeviceEntry::new(address, name));
                    report.applied.push(index);
                }
                Err(error) => report.failures.push(ItemFailure { index, error }),
            }
        }

        // Highest first, so earlier positions stay valid.
        for &index in report.applied.iter().rev() {
            self.candidates.remove(index);
        }

        info!(
            session = %self.id,
            promoted = report.applied.len(),
            failed = report.failures.len(),
            "promoted candidates"
        );
        self.notify_failures(&report);
        Ok(report)
    }

    /// Flips `active` on each selected working entry.
    pub fn toggle(&mut self, indices: &[usize]) -> Result<BatchReport, SessionError> {
        self.ensure_open()?;
        let selected: BTreeSet<usize> = indices.iter().copied().collect();
        let len = self.working.len();
        let mut report = BatchReport::default();

        for index in selected {
            match self.working.get_mut(index) {
                Some(entry) => {
                    entry.active = !entry.active;
                    report.applied.push(index);
                }
                None => report.failures.push(ItemFailure {
                    index,
                    error: SessionError::IndexOutOfRange { index, len },
                }),
            }
        }

        self.notify_failures(&report);
        Ok(report)
    }

    /// Deletes the selected working entries.
    ///
    /// Indices refer to positions before the call.  They are deduplicated,
    /// checked against the original length and deleted highest-to-lowest,
    /// so the caller's ordering never matters.
    pub fn remove(&mut self, indices: &[usize]) -> Result<BatchReport, SessionError> {
        self.ensure_open()?;
        let selected: BTreeSet<usize> = indices.iter().copied().collect();
        let len = self.working.len();
        let mut report = BatchReport::default();

        for &index in &selected {
            if index < len {
                report.applied.push(index);
            } else {
                report.failures.push(ItemFailure {
                    index,
                    error: SessionError::IndexOutOfRange { index, len },
                });
            }
        }

        for &index in report.applied.iter().rev() {
            let entry = self.working.remove(index);
            info!(session = %self.id, "removed {}", entry.label());
        }

        self.notify_failures(&report);
        Ok(report)
    }

    // ── Scan events ──────────────────────────────────────────────────────────

    /// Starts scan cycle `scan`: candidates from earlier scans are dropped.
    pub fn begin_scan(&mut self, scan: ScanId) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.candidates.clear();
        self.scan_state = ScanState::Scanning;
        self.scan = Some(scan);
        info!(session = %self.id, scan, "scan cycle started");
        Ok(())
    }

    pub fn on_scan_finished(&mut self) -> Result<(), SessionError> {
        self.ensure_open()?;
        if self.scan_state == ScanState::Scanning {
            self.scan_state = ScanState::Idle;
        }
        self.scan = None;
        info!(
            session = %self.id,
            candidates = self.candidates.len(),
            "scan cycle finished"
        );
        Ok(())
    }

    /// Records that the feed could not start.  Not fatal to the session.
    pub fn on_feed_unavailable(&mut self, reason: &str) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.scan_state = ScanState::Unavailable;
        self.scan = None;
        let error = SessionError::FeedUnavailable(reason.to_string());
        self.notify(&error);
        Ok(())
    }

    /// Applies one feed event.  Returns `true` if the candidate list changed.
    ///
    /// Events from any scan other than the one in progress are ignored.
    pub fn handle_feed_event(&mut self, event: FeedEvent) -> Result<bool, SessionError> {
        self.ensure_open()?;
        if self.scan != Some(event.scan()) {
            debug!(session = %self.id, scan = event.scan(), "ignoring event from another scan");
            return Ok(false);
        }
        match event {
            FeedEvent::DeviceSeen { address, name, .. } => self.on_device_seen(&address, &name),
            FeedEvent::ScanFinished { .. } => self.on_scan_finished().map(|()| false),
        }
    }

    // ── Termination ──────────────────────────────────────────────────────────

    /// Writes the working copy to `registry` and closes the session.
    ///
    /// # Errors
    ///
    /// - [`SessionError::StaleRegistry`] if the registry was replaced since
    ///   this session opened.
    /// - [`SessionError::Registry`] if the registry refused the list.
    ///
    /// On either error the session stays open, so the user can retry or
    /// cancel.
    pub fn commit(&mut self, registry: &mut DeviceRegistry) -> Result<(), SessionError> {
        self.ensure_open()?;
        if registry.revision() != self.base_revision {
            return Err(self.fail(SessionError::StaleRegistry));
        }
        if let Err(e) = registry.replace(self.working.clone()) {
            return Err(self.fail(e.into()));
        }
        self.state = SessionState::Committed;
        self.scan_state = ScanState::Idle;
        self.scan = None;
        info!(
            session = %self.id,
            devices = self.working.len(),
            "configuration committed"
        );
        Ok(())
    }

    /// Discards every edit and closes the session.
    pub fn cancel(&mut self) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.working.clear();
        self.candidates.clear();
        self.state = SessionState::Cancelled;
        self.scan_state = ScanState::Idle;
        self.scan = None;
        info!(session = %self.id, "configuration cancelled");
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.state.is_terminal() {
            return Err(SessionError::SessionClosed);
        }
        Ok(())
    }

    /// Validates `address` and checks it against the working copy.
    fn check_new_entry(&self, address: &str) -> Result<BtAddress, SessionError> {
        let address = validate(address)?;
        if position_of(&self.working, &address).is_some() {
            return Err(SessionError::DuplicateAddress(address));
        }
        Ok(address)
    }

    fn fail(&mut self, error: SessionError) -> SessionError {
        self.notify(&error);
        error
    }

    fn notify(&mut self, error: &SessionError) {
        let title = error.title();
        warn!(session = %self.id, "{title}: {error}");
        self.notifications.push_back(Notification {
            title: title.to_string(),
            message: error.to_string(),
        });
    }

    fn notify_failures(&mut self, report: &BatchReport) {
        for failure in &report.failures {
            self.notify(&failure.error);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
