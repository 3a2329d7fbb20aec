//! TOML-based configuration persistence for the fleet tracker.
//!
//! Reads and writes `AppConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\FleetTracker\config.toml`
//! - Linux:    `~/.config/fleettracker/config.toml`
//! - macOS:    `~/Library/Application Support/FleetTracker/config.toml`
//!
//! The device list lives in the same file as the runtime settings:
//!
//! ```toml
//! [app]
//! log_level = "info"
//!
//! [discovery]
//! channel_capacity = 64
//! replay_interval_ms = 250
//! scan_source = "/var/lib/fleet/scan.txt"
//!
//! [[devices]]
//! address = "10:00:E8:6C:F1:01"
//! name = "epuck-1"
//! active = true
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent from the TOML file, and whole
//! sections fall back to their `Default` impl.  An empty file is therefore a
//! valid configuration with no devices.
//!
//! # Writing
//!
//! [`save_config_to`] writes to a sibling `*.toml.tmp` file and renames it
//! over the target, so a crash mid-write never leaves a truncated config.

use std::path::{Path, PathBuf};

use fleet_core::domain::device::find_duplicate;
use fleet_core::{AddressError, BtAddress, DeviceEntry};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::application::manage_devices::{DeviceRegistry, RegistryError, RegistryStore};
use crate::infrastructure::discovery::DEFAULT_FEED_CAPACITY;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A `[[devices]]` record carries an unusable address.
    #[error("device #{index} ({name}) has an invalid address: {source}")]
    InvalidDevice {
        index: usize,
        name: String,
        #[source]
        source: AddressError,
    },

    /// Two `[[devices]]` records share an address.
    #[error("device {0} is listed more than once")]
    DuplicateDevice(BtAddress),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub app: GeneralConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub devices: Vec<DeviceRecord>,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// Schema version string – bump when breaking changes are introduced.
    #[serde(default = "default_version")]
    pub version: String,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Discovery feed settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoveryConfig {
    /// Capacity of the feed → session event channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Delay between replayed scan records, in milliseconds.
    #[serde(default = "default_replay_interval_ms")]
    pub replay_interval_ms: u64,
    /// Recorded scan file.  Without one, scanning is unavailable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_source: Option<PathBuf>,
}

/// One persisted device.
///
/// The address is kept as text here so that a hand-edited file with a bad
/// address produces a precise [`ConfigError::InvalidDevice`] rather than a
/// generic parse error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceRecord {
    pub address: String,
    pub name: String,
    #[serde(default)]
    pub active: bool,
}

impl From<&DeviceEntry> for DeviceRecord {
    fn from(entry: &DeviceEntry) -> Self {
        Self {
            address: entry.address.to_string(),
            name: entry.name.clone(),
            active: entry.active,
        }
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_version() -> String {
    "1.0".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_channel_capacity() -> usize {
    DEFAULT_FEED_CAPACITY
}
fn default_replay_interval_ms() -> u64 {
    250
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            log_level: default_log_level(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            replay_interval_ms: default_replay_interval_ms(),
            scan_source: None,
        }
    }
}

impl AppConfig {
    /// Converts the `[[devices]]` records into validated entries.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidDevice`] for the first record whose address
    /// does not parse, [`ConfigError::DuplicateDevice`] if two records name
    /// the same device.
    pub fn device_entries(&self) -> Result<Vec<DeviceEntry>, ConfigError> {
        let entries = self
            .devices
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let address = record.address.parse().map_err(|source| {
                    ConfigError::InvalidDevice {
                        index,
                        name: record.name.clone(),
                        source,
                    }
                })?;
                Ok(DeviceEntry {
                    address,
                    name: record.name.clone(),
                    active: record.active,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        if let Some(address) = find_duplicate(&entries) {
            return Err(ConfigError::DuplicateDevice(address));
        }
        Ok(entries)
    }

    /// Replaces the `[[devices]]` records with `entries`.
    pub fn set_devices(&mut self, entries: &[DeviceEntry]) {
        self.devices = entries.iter().map(DeviceRecord::from).collect();
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let cfg: AppConfig = toml::from_str(&content)?;
            debug!("loaded config from {}", path.display());
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("no config at {}; using defaults", path.display());
            Ok(AppConfig::default())
        }
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Reads only `app.log_level` from `path`, without logging anything.
///
/// Lets the binary install its subscriber before the full load, so the
/// load's own messages are not lost.  A missing or unparsable file yields the
/// default level; the full load reports the actual problem.
pub fn peek_log_level(path: &Path) -> String {
    #[derive(Deserialize)]
    struct LogLevelOnly {
        #[serde(default)]
        app: GeneralConfig,
    }

    std::fs::read_to_string(path)
        .ok()
        .and_then(|content| toml::from_str::<LogLevelOnly>(&content).ok())
        .map_or_else(default_log_level, |peek| peek.app.log_level)
}

/// Loads `AppConfig` from the platform config file.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Persists `config` to `path`, creating the directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, content).map_err(|source| ConfigError::Io {
        path: tmp.clone(),
        source,
    })?;
    std::fs::rename(&tmp, path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("saved config to {}", path.display());
    Ok(())
}

/// Persists `config` to the platform config file.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(&config_file_path()?, config)
}

/// Loads the config at `path` and builds the registry it describes.
///
/// The returned registry writes back to the same file.
pub fn load_registry(path: &Path) -> Result<(AppConfig, DeviceRegistry), ConfigError> {
    let config = load_config_from(path)?;
    let entries = config.device_entries()?;
    let store = TomlRegistryStore::new(path.to_path_buf());
    let registry = DeviceRegistry::from_entries(entries, Box::new(store))?;
    info!(devices = registry.len(), "device registry loaded");
    Ok((config, registry))
}

/// Registry store backed by the TOML config file.
///
/// Each write re-reads the file and only swaps the `[[devices]]` records, so
/// settings edited by hand while the tool runs are kept.
#[derive(Debug, Clone)]
pub struct TomlRegistryStore {
    path: PathBuf,
}

impl TomlRegistryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegistryStore for TomlRegistryStore {
    fn persist(&self, entries: &[DeviceEntry]) -> Result<(), String> {
        let mut config = load_config_from(&self.path).map_err(|e| e.to_string())?;
        config.set_devices(entries);
        save_config_to(&self.path, &config).map_err(|e| e.to_string())
    }
}

/// Resolves the platform config directory including the `FleetTracker`
/// subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("FleetTracker"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("fleettracker"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("FleetTracker")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
