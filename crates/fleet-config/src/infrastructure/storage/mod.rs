//! Storage infrastructure: where the device list is persisted.
//!
//! - **`config`** – the TOML config file.  Reads the platform-appropriate
//!   file, supplies defaults on first run, validates `[[devices]]` and
//!   implements [`RegistryStore`](crate::application::manage_devices::RegistryStore)
//!   by rewriting the file.
//! - **`memory`** – a store that keeps every persisted list in memory, for
//!   tests and dry runs.

pub mod config;
pub mod memory;
