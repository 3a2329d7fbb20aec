//! Replay discovery feed: scan results read from a recorded file.
//!
//! The file holds one display label per line, in the same
//! `"name : address"` format the device lists use:
//!
//! ```text
//! # lab bench, recorded 2018-02-14
//! epuck-1 : 10:00:E8:6C:F1:01
//! epuck-2 : 10:00:E8:6C:F1:02
//! ```
//!
//! Blank lines and `#` comments are skipped; a line that does not decode is
//! logged and skipped.  Records are emitted from a dedicated thread with a
//! configurable delay between them, so the session sees the same trickle of
//! events a radio scan would produce.
//!
//! `stop()` only raises the worker's stop flag.  A new `start()` does not
//! wait for a stopped worker: it is retired and joined later, and whatever
//! it still sends carries the old scan id.

use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::JoinHandle;
use std::time::Duration;

use fleet_core::decode_label;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{DiscoveryFeed, FeedError, FeedEvent, ScanId, StartOutcome};

/// One recorded scan result: `(address, name)`.
pub type ScanRecord = (String, String);

/// Running scan thread plus its stop flag.
struct ScanWorker {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Discovery feed that replays a scan file on a background thread.
pub struct ReplayFeed {
    source: Option<PathBuf>,
    interval: Duration,
    events: mpsc::Sender<FeedEvent>,
    scan: Option<ScanWorker>,
    /// Stopped workers that may not have exited yet.
    retired: Vec<ScanWorker>,
}

impl ReplayFeed {
    /// Creates a feed reading from `source`.
    ///
    /// With `source == None` every `start()` fails with
    /// [`FeedError::Unavailable`], which is how a machine without a scan
    /// source behaves.
    pub fn new(
        source: Option<PathBuf>,
        interval: Duration,
        events: mpsc::Sender<FeedEvent>,
    ) -> Self {
        Self {
            source,
            interval,
            events,
            scan: None,
            retired: Vec::new(),
        }
    }

    /// Returns the configured scan file, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Retires the current worker and joins every retired one that exited.
    fn reap_workers(&mut self) {
        if let Some(worker) = self.scan.take() {
            self.retired.push(worker);
        }
        let (finished, pending): (Vec<_>, Vec<_>) = self
            .retired
            .drain(..)
            .partition(|worker| worker.handle.is_finished());
        self.retired = pending;
        for worker in finished {
            if worker.handle.join().is_err() {
                warn!("scan thread panicked");
            }
        }
        if !self.retired.is_empty() {
            debug!(pending = self.retired.len(), "stopped scan threads still winding down");
        }
    }
}

impl DiscoveryFeed for ReplayFeed {
    fn start(&mut self, scan: ScanId) -> Result<StartOutcome, FeedError> {
        if self.is_running() {
            debug!("scan already running; start ignored");
            return Ok(StartOutcome::AlreadyRunning);
        }
        self.reap_workers();

        let path = self.source.as_ref().ok_or_else(|| FeedError::Unavailable {
            reason: "no scan source configured".to_string(),
        })?;
        let content = std::fs::read_to_string(path).map_err(|e| FeedError::Unavailable {
            reason: format!("cannot read scan source {}: {e}", path.display()),
        })?;
        let records = parse_scan_records(&content);

        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let tx = self.events.clone();
        let interval = self.interval;
        let handle = std::thread::Builder::new()
            .name("fleet-discovery".to_string())
            .spawn(move || replay_loop(scan, records, interval, tx, flag))
            .map_err(|e| FeedError::Unavailable {
                reason: format!("cannot spawn scan thread: {e}"),
            })?;

        info!(scan, "replaying scan from {}", path.display());
        self.scan = Some(ScanWorker { running, handle });
        Ok(StartOutcome::Started)
    }

    fn stop(&mut self) {
        if let Some(worker) = &self.scan {
            if worker.running.swap(false, Ordering::Relaxed) {
                info!("stopping scan");
            }
        }
    }

    fn is_running(&self) -> bool {
        self.scan.as_ref().is_some_and(|worker| {
            worker.running.load(Ordering::Relaxed) && !worker.handle.is_finished()
        })
    }
}

impl Drop for ReplayFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Parses a scan file into `(address, name)` records.
pub fn parse_scan_records(content: &str) -> Vec<ScanRecord> {
    let mut records = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match decode_label(line) {
            Ok((name, address)) => records.push((address.to_string(), name)),
            Err(e) => warn!("skipping scan record on line {}: {e}", line_no + 1),
        }
    }
    records
}

/// The body of the scan thread.
fn replay_loop(
    scan: ScanId,
    records: Vec<ScanRecord>,
    interval: Duration,
    tx: mpsc::Sender<FeedEvent>,
    running: Arc<AtomicBool>,
) {
    for (address, name) in records {
        if !running.load(Ordering::Relaxed) {
            break;
        }
        debug!("replayed device {name} ({address})");
        let event = FeedEvent::DeviceSeen {
            scan,
            address,
            name,
        };
        if tx.blocking_send(event).is_err() {
            // Receiver dropped – the session actor is gone.
            running.store(false, Ordering::Relaxed);
            return;
        }
        if !interval.is_zero() {
            std::thread::sleep(interval);
        }
    }

    running.store(false, Ordering::Relaxed);
    let _ = tx.blocking_send(FeedEvent::ScanFinished { scan });
    debug!(scan, "replay scan finished");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
