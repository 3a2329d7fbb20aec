//! SessionActor: owns the registry, the open session and the discovery feed.
//!
//! Every user command and every feed event is handled on the actor's own
//! task, one at a time, so the session never sees two mutators interleave
//! and the feed thread never touches the session's lists.
//!
//! ```text
//!  SessionHandle ──SessionCommand──► command_rx (unbounded) ─┐
//!                                                            ├─► SessionActor
//!  feed thread ────FeedEvent───────► feed_rx (bounded) ──────┘     ├─ DeviceRegistry
//!                                                                  ├─ ConfigurationSession
//!                                                                  └─ Box<dyn DiscoveryFeed>
//! ```
//!
//! Feed events are polled first, so events already queued when a command
//! arrives are applied before the command sees the session.
//!
//! Each `start_scan` hands the feed a fresh scan id.  After commit or cancel
//! the closed session is kept around: feed events that were still in flight
//! hit `SessionClosed` and are dropped.  A session opened later only accepts
//! events carrying the id of a scan it started itself.

use fleet_core::DeviceEntry;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::application::configure_devices::{
    BatchReport, ConfigurationSession, Notification, SessionError, SessionSnapshot,
};
use crate::application::manage_devices::DeviceRegistry;
use crate::infrastructure::discovery::{
    DiscoveryFeed, FeedError, FeedEvent, ScanId, StartOutcome,
};

/// Error returned by [`SessionHandle`] methods.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    /// The actor task has exited, so the command could not be delivered.
    #[error("session actor is not running")]
    ActorStopped,

    #[error(transparent)]
    Session(#[from] SessionError),
}

type Reply<T> = oneshot::Sender<T>;

/// Commands understood by the [`SessionActor`].
#[derive(Debug)]
pub enum SessionCommand {
    /// Opens a session, or returns the one already open.
    OpenSession {
        respond_to: Reply<SessionSnapshot>,
    },
    AddManual {
        address: String,
        name: String,
        respond_to: Reply<Result<DeviceEntry, SessionError>>,
    },
    Promote {
        indices: Vec<usize>,
        respond_to: Reply<Result<BatchReport, SessionError>>,
    },
    Toggle {
        indices: Vec<usize>,
        respond_to: Reply<Result<BatchReport, SessionError>>,
    },
    Remove {
        indices: Vec<usize>,
        respond_to: Reply<Result<BatchReport, SessionError>>,
    },
    StartScan {
        respond_to: Reply<Result<StartOutcome, SessionError>>,
    },
    StopScan {
        respond_to: Reply<Result<(), SessionError>>,
    },
    Snapshot {
        respond_to: Reply<Result<SessionSnapshot, SessionError>>,
    },
    Commit {
        respond_to: Reply<Result<(), SessionError>>,
    },
    Cancel {
        respond_to: Reply<Result<(), SessionError>>,
    },
    DrainNotifications {
        respond_to: Reply<Vec<Notification>>,
    },
    /// The committed registry, independent of any session.
    ListDevices {
        respond_to: Reply<Vec<DeviceEntry>>,
    },
}

/// The task that serialises all session work.
pub struct SessionActor {
    registry: DeviceRegistry,
    session: Option<ConfigurationSession>,
    feed: Box<dyn DiscoveryFeed>,
    /// Id of the most recently requested scan.
    last_scan: ScanId,
    command_rx: mpsc::UnboundedReceiver<SessionCommand>,
    feed_rx: mpsc::Receiver<FeedEvent>,
}

impl SessionActor {
    /// Spawns the actor on the current tokio runtime.
    ///
    /// `feed_rx` must be the receiving end of the channel `feed` reports
    /// into.  The actor stops once every [`SessionHandle`] is dropped.
    pub fn spawn(
        registry: DeviceRegistry,
        feed: Box<dyn DiscoveryFeed>,
        feed_rx: mpsc::Receiver<FeedEvent>,
    ) -> SessionHandle {
        let (cmd_tx, command_rx) = mpsc::unbounded_channel();
        let actor = Self {
            registry,
            session: None,
            feed,
            last_scan: 0,
            command_rx,
            feed_rx,
        };
        tokio::spawn(actor.run());
        SessionHandle::new(cmd_tx)
    }

    async fn run(mut self) {
        info!(devices = self.registry.len(), "session actor started");
        loop {
            tokio::select! {
                biased;

                Some(event) = self.feed_rx.recv() => self.apply_feed_event(event),
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
            }
        }
        self.feed.stop();
        info!("session actor stopped");
    }

    fn handle_command(&mut self, command: SessionCommand) {
        // A dropped reply receiver means the caller gave up; nothing to do.
        match command {
            SessionCommand::OpenSession { respond_to } => {
                let _ = respond_to.send(self.open_session());
            }
            SessionCommand::AddManual {
                address,
                name,
                respond_to,
            } => {
                let result = self
                    .open_mut()
                    .and_then(|s| s.add_manual(&address, &name));
                let _ = respond_to.send(result);
            }
            SessionCommand::Promote {
                indices,
                respond_to,
            } => {
                let _ = respond_to.send(self.open_mut().and_then(|s| s.promote(&indices)));
            }
            SessionCommand::Toggle {
                indices,
                respond_to,
            } => {
                let _ = respond_to.send(self.open_mut().and_then(|s| s.toggle(&indices)));
            }
            SessionCommand::Remove {
                indices,
                respond_to,
            } => {
                let _ = respond_to.send(self.open_mut().and_then(|s| s.remove(&indices)));
            }
            SessionCommand::StartScan { respond_to } => {
                let _ = respond_to.send(self.start_scan());
            }
            SessionCommand::StopScan { respond_to } => {
                let result = match self.session.as_ref() {
                    Some(s) if !s.state().is_terminal() => Ok(()),
                    _ => Err(SessionError::SessionClosed),
                };
                if result.is_ok() {
                    self.feed.stop();
                }
                let _ = respond_to.send(result);
            }
            SessionCommand::Snapshot { respond_to } => {
                let result = self
                    .session
                    .as_ref()
                    .map(ConfigurationSession::snapshot)
                    .ok_or(SessionError::SessionClosed);
                let _ = respond_to.send(result);
            }
            SessionCommand::Commit { respond_to } => {
                let result = match self.session.as_mut() {
                    Some(session) => session.commit(&mut self.registry),
                    None => Err(SessionError::SessionClosed),
                };
                if result.is_ok() {
                    self.feed.stop();
                }
                let _ = respond_to.send(result);
            }
            SessionCommand::Cancel { respond_to } => {
                let result = self.open_mut().and_then(ConfigurationSession::cancel);
                if result.is_ok() {
                    self.feed.stop();
                }
                let _ = respond_to.send(result);
            }
            SessionCommand::DrainNotifications { respond_to } => {
                let notes = self
                    .session
                    .as_mut()
                    .map(ConfigurationSession::drain_notifications)
                    .unwrap_or_default();
                let _ = respond_to.send(notes);
            }
            SessionCommand::ListDevices { respond_to } => {
                let _ = respond_to.send(self.registry.load());
            }
        }
    }

    fn open_session(&mut self) -> SessionSnapshot {
        if let Some(session) = self.session.as_ref().filter(|s| !s.state().is_terminal()) {
            debug!(session = %session.id(), "session already open");
            return session.snapshot();
        }
        let session = ConfigurationSession::open(&self.registry);
        let snapshot = session.snapshot();
        self.session = Some(session);
        snapshot
    }

    /// The current session, which may be closed.  `SessionClosed` if none
    /// was ever opened.
    fn open_mut(&mut self) -> Result<&mut ConfigurationSession, SessionError> {
        self.session.as_mut().ok_or(SessionError::SessionClosed)
    }

    fn start_scan(&mut self) -> Result<StartOutcome, SessionError> {
        let session = self
            .session
            .as_mut()
            .filter(|s| !s.state().is_terminal())
            .ok_or(SessionError::SessionClosed)?;

        let scan = self.last_scan + 1;
        match self.feed.start(scan) {
            Ok(StartOutcome::Started) => {
                self.last_scan = scan;
                session.begin_scan(scan)?;
                Ok(StartOutcome::Started)
            }
            Ok(StartOutcome::AlreadyRunning) => {
                debug!("scan requested while one is running");
                Ok(StartOutcome::AlreadyRunning)
            }
            Err(FeedError::Unavailable { reason }) => {
                session.on_feed_unavailable(&reason)?;
                Err(SessionError::FeedUnavailable(reason))
            }
        }
    }

    fn apply_feed_event(&mut self, event: FeedEvent) {
        let Some(session) = self.session.as_mut() else {
            debug!("no session open; dropping {event:?}");
            return;
        };
        match session.handle_feed_event(event) {
            Ok(_) => {}
            Err(SessionError::SessionClosed) => {
                debug!(session = %session.id(), "session closed; dropping feed event");
            }
            Err(e) => warn!(session = %session.id(), "feed event rejected: {e}"),
        }
    }
}

/// Cloneable async front end of the [`SessionActor`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    cmd_tx: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    pub fn new(cmd_tx: mpsc::UnboundedSender<SessionCommand>) -> Self {
        Self { cmd_tx }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> SessionCommand,
    ) -> Result<T, BridgeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .map_err(|_| BridgeError::ActorStopped)?;
        rx.await.map_err(|_| BridgeError::ActorStopped)
    }

    pub async fn open_session(&self) -> Result<SessionSnapshot, BridgeError> {
        self.request(|respond_to| SessionCommand::OpenSession { respond_to })
            .await
    }

    pub async fn add_manual(&self, address: &str, name: &str) -> Result<DeviceEntry, BridgeError> {
        let (address, name) = (address.to_string(), name.to_string());
        Ok(self
            .request(|respond_to| SessionCommand::AddManual {
                address,
                name,
                respond_to,
            })
            .await??)
    }

    pub async fn promote(&self, indices: Vec<usize>) -> Result<BatchReport, BridgeError> {
        Ok(self
            .request(|respond_to| SessionCommand::Promote {
                indices,
                respond_to,
            })
            .await??)
    }

    pub async fn toggle(&self, indices: Vec<usize>) -> Result<BatchReport, BridgeError> {
        Ok(self
            .request(|respond_to| SessionCommand::Toggle {
                indices,
                respond_to,
            })
            .await??)
    }

    pub async fn remove(&self, indices: Vec<usize>) -> Result<BatchReport, BridgeError> {
        Ok(self
            .request(|respond_to| SessionCommand::Remove {
                indices,
                respond_to,
            })
            .await??)
    }

    pub async fn start_scan(&self) -> Result<StartOutcome, BridgeError> {
        Ok(self
            .request(|respond_to| SessionCommand::StartScan { respond_to })
            .await??)
    }

    pub async fn stop_scan(&self) -> Result<(), BridgeError> {
        Ok(self
            .request(|respond_to| SessionCommand::StopScan { respond_to })
            .await??)
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, BridgeError> {
        Ok(self
            .request(|respond_to| SessionCommand::Snapshot { respond_to })
            .await??)
    }

    pub async fn commit(&self) -> Result<(), BridgeError> {
        Ok(self
            .request(|respond_to| SessionCommand::Commit { respond_to })
            .await??)
    }

    pub async fn cancel(&self) -> Result<(), BridgeError> {
        Ok(self
            .request(|respond_to| SessionCommand::Cancel { respond_to })
            .await??)
    }

    pub async fn drain_notifications(&self) -> Result<Vec<Notification>, BridgeError> {
        self.request(|respond_to| SessionCommand::DrainNotifications { respond_to })
            .await
    }

    pub async fn list_devices(&self) -> Result<Vec<DeviceEntry>, BridgeError> {
        self.request(|respond_to| SessionCommand::ListDevices { respond_to })
            .await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
