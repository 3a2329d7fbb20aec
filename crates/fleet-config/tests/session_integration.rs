//! Integration tests for the configuration session.
//!
//! These tests exercise the application layer of fleet-config end-to-end:
//! `ConfigurationSession` + `DeviceRegistry` + the in-memory store.

use fleet_config::application::configure_devices::{
    ConfigurationSession, ScanState, SessionError,
};
use fleet_config::application::manage_devices::DeviceRegistry;
use fleet_config::infrastructure::discovery::FeedEvent;
use fleet_config::infrastructure::storage::memory::InMemoryStore;
use fleet_core::{validate, DeviceEntry};

fn entry(address: &str, name: &str, active: bool) -> DeviceEntry {
    DeviceEntry {
        address: validate(address).expect("test address"),
        name: name.to_string(),
        active,
    }
}

fn registry_with(entries: Vec<DeviceEntry>) -> (DeviceRegistry, InMemoryStore) {
    let store = InMemoryStore::new();
    let registry =
        DeviceRegistry::from_entries(entries, Box::new(store.clone())).expect("unique entries");
    (registry, store)
}

/// A report from scan 1.
fn seen(address: &str, name: &str) -> FeedEvent {
    FeedEvent::DeviceSeen {
        scan: 1,
        address: address.to_string(),
        name: name.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn test_address_in_working_copy_blocks_every_later_add_or_promote() {
    let (registry, _) = registry_with(Vec::new());
    let mut session = ConfigurationSession::open(&registry);
    session.add_manual("AA:BB:CC:DD:EE:FF", "first").unwrap();

    for spelling in ["AA:BB:CC:DD:EE:FF", "aa:bb:cc:dd:ee:ff", " Aa-Bb-Cc-Dd-Ee-Ff "] {
        assert!(
            matches!(
                session.add_manual(spelling, "other"),
                Err(SessionError::DuplicateAddress(_))
            ),
            "{spelling} must be rejected"
        );
    }

    session.begin_scan(1).unwrap();
    session.handle_feed_event(seen("aa-bb-cc-dd-ee-ff", "scan")).unwrap();
    let report = session.promote(&[0]).unwrap();
    assert!(report.applied.is_empty());
    assert!(matches!(
        report.failures[0].error,
        SessionError::DuplicateAddress(_)
    ));
    assert_eq!(session.working().len(), 1);
}

#[test]
fn test_toggle_twice_restores_every_flag() {
    let (registry, _) = registry_with(vec![
        entry("11:11:11:11:11:11", "R1", true),
        entry("22:22:22:22:22:22", "R2", false),
    ]);
    let mut session = ConfigurationSession::open(&registry);
    let before = session.working().to_vec();

    session.toggle(&[0, 1]).unwrap();
    session.toggle(&[1, 0]).unwrap();

    assert_eq!(session.working(), before.as_slice());
}

#[test]
fn test_remove_zero_and_two_leaves_only_middle_entry() {
    for indices in [[0, 2], [2, 0]] {
        let (registry, _) = registry_with(vec![
            entry("AA:AA:AA:AA:AA:AA", "A", false),
            entry("BB:BB:BB:BB:BB:BB", "B", false),
            entry("CC:CC:CC:CC:CC:CC", "C", false),
        ]);
        let mut session = ConfigurationSession::open(&registry);

        session.remove(&indices).unwrap();

        assert_eq!(
            session.working(),
            &[entry("BB:BB:BB:BB:BB:BB", "B", false)],
            "indices {indices:?}"
        );
    }
}

#[test]
fn test_cancel_after_any_edits_leaves_registry_and_store_untouched() {
    // Arrange
    let (registry, store) = registry_with(vec![
        entry("11:11:11:11:11:11", "R1", true),
        entry("22:22:22:22:22:22", "R2", false),
    ]);
    let before = registry.load();
    let mut session = ConfigurationSession::open(&registry);

    // Act
    session.add_manual("33:33:33:33:33:33", "R3").unwrap();
    session.toggle(&[0, 2]).unwrap();
    session.remove(&[1]).unwrap();
    session.begin_scan(1).unwrap();
    session.handle_feed_event(seen("44:44:44:44:44:44", "R4")).unwrap();
    session.promote(&[0]).unwrap();
    session.cancel().unwrap();

    // Assert
    assert_eq!(registry.load(), before);
    assert_eq!(registry.revision(), 0);
    assert_eq!(store.write_count(), 0);
}

#[test]
fn test_commit_appends_manual_entry_and_keeps_prior_order() {
    // Arrange
    let prior = vec![
        entry("11:11:11:11:11:11", "R1", true),
        entry("22:22:22:22:22:22", "R2", false),
    ];
    let (mut registry, store) = registry_with(prior.clone());
    let mut session = ConfigurationSession::open(&registry);

    // Act
    session.add_manual("AA:BB:CC:DD:EE:FF", "RobotX").unwrap();
    session.commit(&mut registry).unwrap();

    // Assert
    let mut expected = prior;
    expected.push(entry("AA:BB:CC:DD:EE:FF", "RobotX", false));
    assert_eq!(registry.load(), expected);
    assert_eq!(store.last_written(), Some(expected));
}

#[test]
fn test_repeated_reports_produce_one_candidate() {
    let (registry, _) = registry_with(Vec::new());
    let mut session = ConfigurationSession::open(&registry);
    session.begin_scan(1).unwrap();

    session.handle_feed_event(seen("11:22:33:44:55:66", "X")).unwrap();
    session.handle_feed_event(seen("11:22:33:44:55:66", "X")).unwrap();

    assert_eq!(session.candidates().len(), 1);
}

#[test]
fn test_scan_promote_commit_end_to_end() {
    // Arrange
    let (mut registry, _) = registry_with(vec![entry("11:11:11:11:11:11", "R1", true)]);
    let mut session = ConfigurationSession::open(&registry);

    // Act
    session.begin_scan(1).unwrap();
    session.handle_feed_event(seen("22:22:22:22:22:22", "R2")).unwrap();
    session
        .handle_feed_event(FeedEvent::ScanFinished { scan: 1 })
        .unwrap();
    let report = session.promote(&[0]).unwrap();
    session.commit(&mut registry).unwrap();

    // Assert
    assert_eq!(report.applied, vec![0]);
    let devices = registry.load();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[1], entry("22:22:22:22:22:22", "R2", false));
}

#[test]
fn test_failed_commit_can_be_retried() {
    let (mut registry, store) = registry_with(Vec::new());
    let mut session = ConfigurationSession::open(&registry);
    session.add_manual("AA:BB:CC:DD:EE:FF", "RobotX").unwrap();

    store.fail_with("disk full");
    assert!(matches!(
        session.commit(&mut registry),
        Err(SessionError::Registry(_))
    ));
    assert!(registry.is_empty());

    store.recover();
    session.commit(&mut registry).unwrap();
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_second_scan_ignores_reports_from_the_first() {
    // Arrange
    let (registry, _) = registry_with(Vec::new());
    let mut session = ConfigurationSession::open(&registry);
    session.begin_scan(1).unwrap();
    session.handle_feed_event(seen("11:11:11:11:11:11", "R1")).unwrap();

    // Act: scan 1 is still draining when scan 2 begins.
    session.begin_scan(2).unwrap();
    session.handle_feed_event(seen("22:22:22:22:22:22", "R2")).unwrap();
    session
        .handle_feed_event(FeedEvent::ScanFinished { scan: 1 })
        .unwrap();

    // Assert
    assert!(session.candidates().is_empty());
    assert_eq!(session.scan_state(), ScanState::Scanning);
}
