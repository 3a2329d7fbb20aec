//! Mock discovery feed for tests.
//!
//! Lets tests report synthetic devices without a radio or a scan file.  The
//! mock is `Clone`: hand one copy to the session actor as its feed and keep
//! the other to drive it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use super::{DiscoveryFeed, FeedError, FeedEvent, ScanId, StartOutcome};

#[derive(Debug, Default)]
struct MockState {
    running: bool,
    /// Id of the current scan, or of the last one once it has finished.
    scan: ScanId,
    start_count: u32,
    unavailable: Option<String>,
}

/// A [`DiscoveryFeed`] whose events are injected by the test.
#[derive(Debug, Clone)]
pub struct MockDiscoveryFeed {
    sender: mpsc::Sender<FeedEvent>,
    state: Arc<Mutex<MockState>>,
}

impl MockDiscoveryFeed {
    /// Creates a mock reporting into `sender`.
    pub fn new(sender: mpsc::Sender<FeedEvent>) -> Self {
        Self {
            sender,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Creates a mock whose `start()` always fails with `reason`.
    pub fn unavailable(sender: mpsc::Sender<FeedEvent>, reason: &str) -> Self {
        let mock = Self::new(sender);
        mock.lock().unavailable = Some(reason.to_string());
        mock
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reports a device as if the scan had heard it.
    ///
    /// Returns `false` if the channel is full or closed.  Reports are sent
    /// whether or not a scan is running, tagged with the most recent scan
    /// id, so tests can simulate late events.
    pub fn report(&self, address: &str, name: &str) -> bool {
        let scan = self.lock().scan;
        self.sender
            .try_send(FeedEvent::DeviceSeen {
                scan,
                address: address.to_string(),
                name: name.to_string(),
            })
            .is_ok()
    }

    /// Ends the running scan and emits `ScanFinished`.  No-op when idle.
    pub fn finish(&self) {
        let (was_running, scan) = {
            let mut state = self.lock();
            (std::mem::replace(&mut state.running, false), state.scan)
        };
        if was_running {
            let _ = self.sender.try_send(FeedEvent::ScanFinished { scan });
        }
    }

    /// Number of times a scan actually started.
    pub fn start_count(&self) -> u32 {
        self.lock().start_count
    }
}

impl DiscoveryFeed for MockDiscoveryFeed {
    fn start(&mut self, scan: ScanId) -> Result<StartOutcome, FeedError> {
        let mut state = self.lock();
        if let Some(reason) = &state.unavailable {
            return Err(FeedError::Unavailable {
                reason: reason.clone(),
            });
        }
        if state.running {
            return Ok(StartOutcome::AlreadyRunning);
        }
        state.running = true;
        state.scan = scan;
        state.start_count += 1;
        Ok(StartOutcome::Started)
    }

    fn stop(&mut self) {
        self.finish();
    }

    fn is_running(&self) -> bool {
        self.lock().running
    }
}
