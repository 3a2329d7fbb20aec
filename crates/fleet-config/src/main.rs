//! `fleet-config`: command-line front end for the robot device list.
//!
//! Every subcommand runs one configuration session against the device list
//! stored in the config file: it opens the session, applies the edit and
//! commits (or cancels, for read-only runs).  Warnings raised by the session
//! are printed one per line on stderr.
//!
//! ```text
//! main()
//!  ├─ peek_log_level(config.toml)  -- logging first
//!  ├─ load_registry(config.toml)   -- validated device list + settings
//!  ├─ ReplayFeed (scan thread)     -- only used by `scan`
//!  └─ SessionActor (Tokio task)    -- serialises commands and feed events
//! ```
//!
//! # Examples
//!
//! ```bash
//! fleet-config list
//! fleet-config add AA:BB:CC:DD:EE:FF RobotX
//! fleet-config toggle 0 2
//! fleet-config scan --source bench.txt --promote-all
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fleet_config::application::configure_devices::ScanState;
use fleet_config::application::manage_devices::DeviceRegistry;
use fleet_config::infrastructure::discovery::{feed_channel, replay::ReplayFeed};
use fleet_config::infrastructure::storage::config::{
    config_file_path, load_registry, peek_log_level,
};
use fleet_config::infrastructure::storage::memory::InMemoryStore;
use fleet_config::infrastructure::ui_bridge::{
    BatchReportDto, DeviceDto, NotificationDto, SessionActor, SessionHandle, SessionSnapshotDto,
};

/// How often `scan` checks whether the scan has finished.
const SCAN_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Manage the Bluetooth device list of the robot fleet tracker.
#[derive(Debug, Parser)]
#[command(name = "fleet-config", version)]
struct Cli {
    /// Path to the config file.  Defaults to the platform config directory.
    #[arg(long, env = "FLEET_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the stored device list.
    List,
    /// Add a device by hardware address.
    Add {
        /// Six hex octets, e.g. `AA:BB:CC:DD:EE:FF`.
        address: String,
        /// Display name.
        name: String,
    },
    /// Remove devices by list position (as shown by `list`).
    Remove {
        #[arg(required = true)]
        indices: Vec<usize>,
    },
    /// Flip the active flag of devices by list position.
    Toggle {
        #[arg(required = true)]
        indices: Vec<usize>,
    },
    /// Run a scan and show (or add) the devices it found.
    Scan {
        /// Recorded scan file.  Overrides `discovery.scan_source`.
        #[arg(long)]
        source: Option<PathBuf>,
        /// Add every device found to the list.
        #[arg(long)]
        promote_all: bool,
        /// Apply the edit in memory only; the config file is not written.
        #[arg(long)]
        dry_run: bool,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let path = match cli.config.clone() {
        Some(path) => path,
        None => config_file_path().context("cannot locate the config file; pass --config")?,
    };

    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(peek_log_level(&path))),
        )
        .init();
    info!("using config {}", path.display());

    let (config, registry) = load_registry(&path)
        .with_context(|| format!("failed to load device list from {}", path.display()))?;

    let (scan_source, dry_run) = match &cli.command {
        Command::Scan {
            source, dry_run, ..
        } => (
            source.clone().or_else(|| config.discovery.scan_source.clone()),
            *dry_run,
        ),
        _ => (config.discovery.scan_source.clone(), false),
    };

    let registry = if dry_run {
        DeviceRegistry::from_entries(registry.load(), Box::new(InMemoryStore::new()))?
    } else {
        registry
    };

    let (feed_tx, feed_rx) = feed_channel(config.discovery.channel_capacity);
    let feed = ReplayFeed::new(
        scan_source,
        Duration::from_millis(config.discovery.replay_interval_ms),
        feed_tx,
    );
    let handle = SessionActor::spawn(registry, Box::new(feed), feed_rx);
    let out = Output { json: cli.json };

    let result = run(&handle, cli.command, &out).await;
    print_notifications(&handle).await;
    result
}

async fn run(handle: &SessionHandle, command: Command, out: &Output) -> anyhow::Result<()> {
    match command {
        Command::List => {
            let devices = handle.list_devices().await?;
            out.devices(&devices.iter().map(DeviceDto::from).collect::<Vec<_>>());
        }
        Command::Add { address, name } => {
            handle.open_session().await?;
            let added = match handle.add_manual(&address, &name).await {
                Ok(entry) => entry,
                Err(e) => {
                    handle.cancel().await?;
                    return Err(e.into());
                }
            };
            handle.commit().await?;
            out.devices(&[DeviceDto::from(&added)]);
        }
        Command::Remove { indices } => {
            handle.open_session().await?;
            let report = handle.remove(indices).await?;
            handle.commit().await?;
            out.report("removed", &BatchReportDto::from(&report));
        }
        Command::Toggle { indices } => {
            handle.open_session().await?;
            let report = handle.toggle(indices).await?;
            handle.commit().await?;
            out.report("toggled", &BatchReportDto::from(&report));
        }
        Command::Scan {
            promote_all,
            dry_run,
            ..
        } => scan(handle, promote_all, dry_run, out).await?,
    }
    Ok(())
}

async fn scan(
    handle: &SessionHandle,
    promote_all: bool,
    dry_run: bool,
    out: &Output,
) -> anyhow::Result<()> {
    handle.open_session().await?;
    if let Err(e) = handle.start_scan().await {
        handle.cancel().await?;
        bail!(e);
    }

    loop {
        tokio::select! {
            _ = tokio::time::sleep(SCAN_POLL_INTERVAL) => {}
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupted; stopping scan");
                handle.stop_scan().await?;
            }
        }
        if handle.snapshot().await?.scan_state != ScanState::Scanning {
            break;
        }
    }

    let snapshot = handle.snapshot().await?;
    out.session(&SessionSnapshotDto::from(&snapshot));

    if !promote_all || snapshot.candidates.is_empty() {
        handle.cancel().await?;
        return Ok(());
    }

    let all: Vec<usize> = (0..snapshot.candidates.len()).collect();
    let report = handle.promote(all).await?;
    handle.commit().await?;
    let verb = if dry_run { "would add" } else { "added" };
    out.report(verb, &BatchReportDto::from(&report));
    Ok(())
}

async fn print_notifications(handle: &SessionHandle) {
    let Ok(notes) = handle.drain_notifications().await else {
        return;
    };
    for note in notes.iter().map(NotificationDto::from) {
        eprintln!("{}: {}", note.title, note.message);
    }
}

// ── Output ────────────────────────────────────────────────────────────────────

struct Output {
    json: bool,
}

impl Output {
    fn print_json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(text) => println!("{text}"),
            Err(e) => warn!("cannot render JSON output: {e}"),
        }
    }

    fn devices(&self, devices: &[DeviceDto]) {
        if self.json {
            return self.print_json(&devices);
        }
        if devices.is_empty() {
            println!("(no devices)");
        }
        for (index, device) in devices.iter().enumerate() {
            let mark = if device.active { '*' } else { ' ' };
            println!("{index:>3} {mark} {}", device.label);
        }
    }

    fn session(&self, session: &SessionSnapshotDto) {
        if self.json {
            return self.print_json(session);
        }
        println!("found {} device(s):", session.candidates.len());
        for (index, candidate) in session.candidates.iter().enumerate() {
            println!("{index:>3}   {}", candidate.label);
        }
    }

    fn report(&self, verb: &str, report: &BatchReportDto) {
        if self.json {
            return self.print_json(report);
        }
        println!("{verb} {} item(s)", report.applied.len());
        for failure in &report.failures {
            println!("  #{}: {}", failure.index, failure.error);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_add() {
        let cli = Cli::parse_from(["fleet-config", "add", "AA:BB:CC:DD:EE:FF", "RobotX"]);
        assert!(matches!(
            cli.command,
            Command::Add { ref address, ref name } if address == "AA:BB:CC:DD:EE:FF" && name == "RobotX"
        ));
        assert!(!cli.json);
    }

    #[test]
    fn test_cli_parses_remove_indices_in_any_order() {
        let cli = Cli::parse_from(["fleet-config", "remove", "2", "0"]);
        assert!(matches!(cli.command, Command::Remove { ref indices } if indices == &[2, 0]));
    }

    #[test]
    fn test_cli_remove_requires_an_index() {
        assert!(Cli::try_parse_from(["fleet-config", "remove"]).is_err());
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "fleet-config",
            "scan",
            "--promote-all",
            "--json",
            "--config",
            "/tmp/fleet.toml",
        ]);
        assert!(cli.json);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/fleet.toml")));
        assert!(matches!(
            cli.command,
            Command::Scan {
                promote_all: true,
                dry_run: false,
                source: None
            }
        ));
    }
}
