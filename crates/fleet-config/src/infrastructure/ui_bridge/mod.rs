//! UI command bridge: exposes the configuration session to a front end.
//!
//! A front end (the desktop dialog, or the `fleet-config` CLI) never holds the
//! session itself.  It holds a [`SessionHandle`] and calls the async command
//! functions below, each of which sends one message to the
//! [`SessionActor`] and waits for the reply.
//!
//! # Data Transfer Objects (DTOs)
//!
//! The session works with internal types (`BtAddress`, `Uuid`, enums) that
//! a view should not depend on.  DTOs are flat structs that:
//!
//! - Contain only JSON-serialisable fields (`String`, `bool`, `usize`).
//! - Derive `Serialize`/`Deserialize` so they can cross any process or
//!   language boundary as JSON.
//! - Carry the `"name : address"` label a list view shows, so the view never
//!   formats addresses itself.
//!
//! Views render DTO snapshots and send commands back; they never edit a list
//! directly.
//!
//! # `CommandResult<T>` wrapper
//!
//! All commands return `CommandResult<T>` rather than `Result<T, E>`, so every
//! response has the same shape:
//! `{ success: bool, data: T | null, error: string | null }`.

pub mod actor;

use fleet_core::{Candidate, DeviceEntry};
use serde::{Deserialize, Serialize};

use crate::application::configure_devices::{
    BatchReport, Notification, ScanState, SessionSnapshot, SessionState,
};
use crate::infrastructure::discovery::StartOutcome;

pub use actor::{BridgeError, SessionActor, SessionCommand, SessionHandle};

// ── Data Transfer Objects (Presentation layer) ────────────────────────────────

/// One device in the working copy or the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDto {
    pub address: String,
    pub name: String,
    pub active: bool,
    pub label: String,
}

impl From<&DeviceEntry> for DeviceDto {
    fn from(entry: &DeviceEntry) -> Self {
        Self {
            address: entry.address.to_string(),
            name: entry.name.clone(),
            active: entry.active,
            label: entry.label(),
        }
    }
}

/// One device heard by the current scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDto {
    pub address: String,
    pub name: String,
    pub label: String,
}

impl From<&Candidate> for CandidateDto {
    fn from(candidate: &Candidate) -> Self {
        Self {
            address: candidate.address.clone(),
            name: candidate.name.clone(),
            label: candidate.label(),
        }
    }
}

/// Everything the configuration dialog renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshotDto {
    pub session_id: String,
    /// `"open"`, `"committed"` or `"cancelled"`.
    pub state: String,
    /// `"idle"`, `"scanning"` or `"unavailable"`.
    pub scan_state: String,
    pub working: Vec<DeviceDto>,
    pub candidates: Vec<CandidateDto>,
    pub pending_notifications: usize,
}

impl From<&SessionSnapshot> for SessionSnapshotDto {
    fn from(s: &SessionSnapshot) -> Self {
        Self {
            session_id: s.id.to_string(),
            state: session_state_name(s.state).to_string(),
            scan_state: scan_state_name(s.scan_state).to_string(),
            working: s.working.iter().map(DeviceDto::from).collect(),
            candidates: s.candidates.iter().map(CandidateDto::from).collect(),
            pending_notifications: s.pending_notifications,
        }
    }
}

/// One failed item of a batch command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailureDto {
    pub index: usize,
    pub error: String,
}

/// Per-item result of promote, toggle and remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReportDto {
    pub applied: Vec<usize>,
    pub failures: Vec<ItemFailureDto>,
}

impl From<&BatchReport> for BatchReportDto {
    fn from(report: &BatchReport) -> Self {
        Self {
            applied: report.applied.clone(),
            failures: report
                .failures
                .iter()
                .map(|f| ItemFailureDto {
                    index: f.index,
                    error: f.error.to_string(),
                })
                .collect(),
        }
    }
}

/// A warning the view should show, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationDto {
    pub title: String,
    pub message: String,
}

impl From<&Notification> for NotificationDto {
    fn from(n: &Notification) -> Self {
        Self {
            title: n.title.clone(),
            message: n.message.clone(),
        }
    }
}

fn session_state_name(state: SessionState) -> &'static str {
    match state {
        SessionState::Open => "open",
        SessionState::Committed => "committed",
        SessionState::Cancelled => "cancelled",
    }
}

fn scan_state_name(state: ScanState) -> &'static str {
    match state {
        ScanState::Idle => "idle",
        ScanState::Scanning => "scanning",
        ScanState::Unavailable => "unavailable",
    }
}

/// Unified response wrapper used by all commands.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResult<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

impl<T: Serialize> From<Result<T, BridgeError>> for CommandResult<T> {
    fn from(result: Result<T, BridgeError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(e.to_string()),
        }
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// Returns the committed device list.
pub async fn get_devices(handle: &SessionHandle) -> CommandResult<Vec<DeviceDto>> {
    handle
        .list_devices()
        .await
        .map(|devices| devices.iter().map(DeviceDto::from).collect())
        .into()
}

/// Opens the configuration dialog's session (or returns the open one).
pub async fn open_session(handle: &SessionHandle) -> CommandResult<SessionSnapshotDto> {
    handle
        .open_session()
        .await
        .map(|s| SessionSnapshotDto::from(&s))
        .into()
}

/// Returns the current session state for rendering.
pub async fn get_session(handle: &SessionHandle) -> CommandResult<SessionSnapshotDto> {
    handle
        .snapshot()
        .await
        .map(|s| SessionSnapshotDto::from(&s))
        .into()
}

/// Adds a device typed in by the user.
pub async fn add_device(
    handle: &SessionHandle,
    address: &str,
    name: &str,
) -> CommandResult<DeviceDto> {
    handle
        .add_manual(address, name)
        .await
        .map(|e| DeviceDto::from(&e))
        .into()
}

/// Moves the selected scan candidates into the working list.
pub async fn promote_candidates(
    handle: &SessionHandle,
    indices: Vec<usize>,
) -> CommandResult<BatchReportDto> {
    batch_result(handle.promote(indices).await)
}

/// Flips the active flag of the selected working entries.
pub async fn toggle_devices(
    handle: &SessionHandle,
    indices: Vec<usize>,
) -> CommandResult<BatchReportDto> {
    batch_result(handle.toggle(indices).await)
}

/// Deletes the selected working entries.
pub async fn remove_devices(
    handle: &SessionHandle,
    indices: Vec<usize>,
) -> CommandResult<BatchReportDto> {
    batch_result(handle.remove(indices).await)
}

fn batch_result(result: Result<BatchReport, BridgeError>) -> CommandResult<BatchReportDto> {
    result.map(|r| BatchReportDto::from(&r)).into()
}

/// Starts a scan.  `data` is `true` if a new scan began, `false` if one was
/// already running.
pub async fn start_scan(handle: &SessionHandle) -> CommandResult<bool> {
    handle
        .start_scan()
        .await
        .map(|outcome| outcome == StartOutcome::Started)
        .into()
}

pub async fn stop_scan(handle: &SessionHandle) -> CommandResult<()> {
    handle.stop_scan().await.into()
}

/// Applies the working list ("OK" in the dialog).
pub async fn commit_session(handle: &SessionHandle) -> CommandResult<()> {
    handle.commit().await.into()
}

/// Discards the working list ("Cancel" in the dialog).
pub async fn cancel_session(handle: &SessionHandle) -> CommandResult<()> {
    handle.cancel().await.into()
}

/// Takes every pending warning, oldest first.
pub async fn take_notifications(handle: &SessionHandle) -> CommandResult<Vec<NotificationDto>> {
    handle
        .drain_notifications()
        .await
        .map(|notes| notes.iter().map(NotificationDto::from).collect())
        .into()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::manage_devices::DeviceRegistry;
    use crate::infrastructure::discovery::{feed_channel, mock::MockDiscoveryFeed};
    use crate::infrastructure::storage::memory::InMemoryStore;
    use fleet_core::validate;

    fn spawn_empty() -> (SessionHandle, MockDiscoveryFeed) {
        let registry = DeviceRegistry::new(Box::new(InMemoryStore::new()));
        let (tx, rx) = feed_channel(16);
        let feed = MockDiscoveryFeed::new(tx);
        let handle = SessionActor::spawn(registry, Box::new(feed.clone()), rx);
        (handle, feed)
    }

    #[test]
    fn test_command_result_ok_has_no_error() {
        let result = CommandResult::ok(42u32);
        assert!(result.success);
        assert_eq!(result.data, Some(42));
        assert!(result.error.is_none());
    }

    #[test]
    fn test_command_result_err_has_no_data() {
        let result: CommandResult<u32> = CommandResult::err("something went wrong");
        assert!(!result.success);
        assert!(result.data.is_none());
        assert_eq!(result.error.as_deref(), Some("something went wrong"));
    }

    #[test]
    fn test_device_dto_carries_label() {
        let entry = DeviceEntry::new(validate("aa:bb:cc:dd:ee:ff").unwrap(), "RobotX");

        let dto = DeviceDto::from(&entry);

        assert_eq!(dto.address, "AA:BB:CC:DD:EE:FF");
        assert_eq!(dto.label, "RobotX : AA:BB:CC:DD:EE:FF");
        assert!(!dto.active);
    }

    #[test]
    fn test_session_snapshot_dto_serializes_as_flat_json() {
        // Arrange
        let dto = SessionSnapshotDto {
            session_id: "id".to_string(),
            state: "open".to_string(),
            scan_state: "idle".to_string(),
            working: Vec::new(),
            candidates: Vec::new(),
            pending_notifications: 0,
        };

        // Act
        let json = serde_json::to_value(&dto).unwrap();

        // Assert
        assert_eq!(json["state"], "open");
        assert_eq!(json["scan_state"], "idle");
        assert!(json["working"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_device_failure_is_reported_in_error_field() {
        let (handle, _feed) = spawn_empty();
        open_session(&handle).await;

        let result = add_device(&handle, "not-an-address", "x").await;

        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("invalid address"));
    }

    #[tokio::test]
    async fn test_full_dialog_round_trip_through_commands() {
        // Arrange
        let (handle, feed) = spawn_empty();
        let opened = open_session(&handle).await;
        assert_eq!(opened.data.unwrap().state, "open");

        // Act
        assert_eq!(start_scan(&handle).await.data, Some(true));
        feed.report("22:22:22:22:22:22", "R2");
        feed.report("22:22:22:22:22:22", "R2");
        let session = get_session(&handle).await.data.unwrap();
        let promoted = promote_candidates(&handle, vec![0]).await.data.unwrap();
        let committed = commit_session(&handle).await;

        // Assert
        assert_eq!(session.candidates.len(), 1);
        assert_eq!(session.candidates[0].label, "R2 : 22:22:22:22:22:22");
        assert_eq!(promoted.applied, vec![0]);
        assert!(committed.success);
        let devices = get_devices(&handle).await.data.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].name, "R2");
    }

    #[tokio::test]
    async fn test_take_notifications_returns_each_failure() {
        let (handle, _feed) = spawn_empty();
        open_session(&handle).await;
        add_device(&handle, "", "a").await;
        remove_devices(&handle, vec![5]).await;

        let notes = take_notifications(&handle).await.data.unwrap();

        let titles: Vec<&str> = notes.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Invalid Entry", "Invalid Selection"]);
    }
}
