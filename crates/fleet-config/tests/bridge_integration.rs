//! Integration tests for the session actor with a real replay feed and a
//! real config file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use fleet_config::application::configure_devices::ScanState;
use fleet_config::infrastructure::discovery::{feed_channel, replay::ReplayFeed, StartOutcome};
use fleet_config::infrastructure::storage::config::{load_registry, save_config_to, AppConfig};
use fleet_config::infrastructure::ui_bridge::{
    self, BridgeError, SessionActor, SessionHandle,
};
use fleet_core::{validate, DeviceEntry};
use uuid::Uuid;

struct TempDir(PathBuf);

impl TempDir {
    fn new() -> Self {
        let dir = std::env::temp_dir().join(format!("fleet_it_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        Self(dir)
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.0).ok();
    }
}

/// Writes a config with one active robot and a scan file, then spawns the
/// actor on them.
fn spawn_on_files(dir: &TempDir, scan: &str) -> (SessionHandle, PathBuf) {
    spawn_with_interval(dir, scan, Duration::ZERO)
}

fn spawn_with_interval(
    dir: &TempDir,
    scan: &str,
    interval: Duration,
) -> (SessionHandle, PathBuf) {
    let config_path = dir.path().join("config.toml");
    let scan_path = dir.path().join("scan.txt");
    std::fs::write(&scan_path, scan).expect("write scan file");

    let mut config = AppConfig::default();
    config.set_devices(&[DeviceEntry {
        address: validate("11:11:11:11:11:11").unwrap(),
        name: "R1".to_string(),
        active: true,
    }]);
    save_config_to(&config_path, &config).expect("write config");

    let (_, registry) = load_registry(&config_path).expect("load registry");
    let (tx, rx) = feed_channel(8);
    let feed = ReplayFeed::new(Some(scan_path), interval, tx);
    (SessionActor::spawn(registry, Box::new(feed), rx), config_path)
}

async fn wait_for_scan(handle: &SessionHandle) {
    for _ in 0..200 {
        if handle.snapshot().await.unwrap().scan_state != ScanState::Scanning {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("scan did not finish");
}

#[tokio::test]
async fn test_replayed_scan_promoted_and_committed_to_file() {
    // Arrange
    let dir = TempDir::new();
    let scan = "# bench\nR2 : 22:22:22:22:22:22\nR2 : 22:22:22:22:22:22\ngarbage\n";
    let (handle, config_path) = spawn_on_files(&dir, scan);

    // Act
    handle.open_session().await.unwrap();
    handle.start_scan().await.unwrap();
    wait_for_scan(&handle).await;
    let snapshot = handle.snapshot().await.unwrap();
    let report = handle.promote(vec![0]).await.unwrap();
    handle.commit().await.unwrap();

    // Assert
    assert_eq!(snapshot.candidates.len(), 1);
    assert!(report.is_complete_success());
    let (_, reloaded) = load_registry(&config_path).unwrap();
    let devices = reloaded.load();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[1].name, "R2");
    assert!(!devices[1].active);
}

#[tokio::test]
async fn test_scan_in_new_session_runs_while_cancelled_scan_winds_down() {
    // Arrange: slow replay, so the first scan is mid-file when cancelled.
    let dir = TempDir::new();
    let scan = "R2 : 22:22:22:22:22:22\nR3 : 33:33:33:33:33:33\n";
    let (handle, _) = spawn_with_interval(&dir, scan, Duration::from_millis(300));
    handle.open_session().await.unwrap();
    handle.start_scan().await.unwrap();
    handle.cancel().await.unwrap();

    // Act
    let reopened = handle.open_session().await.unwrap();
    let outcome = handle.start_scan().await.unwrap();
    wait_for_scan(&handle).await;
    let snapshot = handle.snapshot().await.unwrap();

    // Assert: the whole file reaches the new session, once.
    assert_eq!(outcome, StartOutcome::Started);
    assert_eq!(snapshot.id, reopened.id);
    let names: Vec<&str> = snapshot.candidates.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["R2", "R3"]);
    assert_eq!(snapshot.scan_state, ScanState::Idle);
}

#[tokio::test]
async fn test_cancel_leaves_config_file_unchanged() {
    let dir = TempDir::new();
    let (handle, config_path) = spawn_on_files(&dir, "R2 : 22:22:22:22:22:22\n");
    let before = std::fs::read_to_string(&config_path).unwrap();

    handle.open_session().await.unwrap();
    handle.add_manual("33:33:33:33:33:33", "R3").await.unwrap();
    handle.remove(vec![0]).await.unwrap();
    handle.cancel().await.unwrap();

    assert_eq!(std::fs::read_to_string(&config_path).unwrap(), before);
    assert_eq!(handle.list_devices().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_commands_return_uniform_results() {
    let dir = TempDir::new();
    let (handle, _) = spawn_on_files(&dir, "");

    let opened = ui_bridge::open_session(&handle).await;
    let bad = ui_bridge::add_device(&handle, "11:11:11:11:11:11", "again").await;
    let notes = ui_bridge::take_notifications(&handle).await;

    assert!(opened.success);
    assert!(!bad.success);
    assert_eq!(notes.data.unwrap()[0].title, "Device doubled");
}

#[tokio::test]
async fn test_handle_reports_stopped_actor() {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    drop(rx);
    let handle = SessionHandle::new(tx);

    assert_eq!(
        handle.open_session().await.unwrap_err(),
        BridgeError::ActorStopped
    );
}
