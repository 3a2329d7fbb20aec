//! Discovery feed infrastructure: where scan results come from.
//!
//! A discovery feed runs a device scan on its own thread and reports every
//! device it hears as a [`FeedEvent::DeviceSeen`] on a bounded channel,
//! finishing each scan with exactly one [`FeedEvent::ScanFinished`].  The
//! feed never touches the configuration session; the session actor drains
//! the channel on its own turn.
//!
//! ```text
//!  feed thread ──DeviceSeen──DeviceSeen──ScanFinished──► mpsc (bounded) ──► session actor
//! ```
//!
//! The same device may be reported many times per scan.  Deduplication is
//! the session's job, not the feed's.
//!
//! Every event carries the [`ScanId`] handed to `start()`.  A stopped scan
//! may still have events in flight when the next one begins; the session
//! only accepts events tagged with the scan it started.
//!
//! # Implementations
//!
//! - [`replay::ReplayFeed`] – replays recorded scan results from a file.
//!   Used for headless setups and for robots whose addresses come from a
//!   provisioning sheet rather than a live radio.
//! - [`mock::MockDiscoveryFeed`] – lets tests inject events by hand.

use thiserror::Error;
use tokio::sync::mpsc;

pub mod mock;
pub mod replay;

/// Default capacity of the feed → session channel.
pub const DEFAULT_FEED_CAPACITY: usize = 64;

/// Identifies one scan cycle.  Assigned by the caller of `start()`.
pub type ScanId = u64;

/// An event produced by a discovery feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// A device answered the scan.  `address` is the transport's raw text.
    DeviceSeen {
        scan: ScanId,
        address: String,
        name: String,
    },
    /// The scan ended, either naturally or through `stop()`.
    ScanFinished { scan: ScanId },
}

impl FeedEvent {
    /// The scan cycle that produced this event.
    pub fn scan(&self) -> ScanId {
        match self {
            Self::DeviceSeen { scan, .. } | Self::ScanFinished { scan } => *scan,
        }
    }
}

/// Error type for discovery feed operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeedError {
    /// The transport cannot be used (no adapter, no permission, no source).
    #[error("discovery feed unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Result of a successful [`DiscoveryFeed::start`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new scan cycle began.
    Started,
    /// A scan was already running; nothing changed.
    AlreadyRunning,
}

/// Trait abstracting a device scanner.
pub trait DiscoveryFeed: Send {
    /// Begins an asynchronous scan whose events are tagged with `scan`.
    ///
    /// Calling `start` while a scan is running is a no-op that returns
    /// [`StartOutcome::AlreadyRunning`]; the running scan keeps its id.
    /// A scan that was asked to stop does not count as running, even if
    /// its last events are still on the way.
    fn start(&mut self, scan: ScanId) -> Result<StartOutcome, FeedError>;

    /// Asks the running scan to end.  The feed still emits `ScanFinished`.
    fn stop(&mut self);

    /// Returns `true` while a scan is in progress and not stopped.
    fn is_running(&self) -> bool;
}

/// Creates the bounded channel a feed reports into.
///
/// A capacity of zero is bumped to one, since tokio rejects empty channels.
pub fn feed_channel(capacity: usize) -> (mpsc::Sender<FeedEvent>, mpsc::Receiver<FeedEvent>) {
    mpsc::channel(capacity.max(1))
}
