//! Application layer use cases for the device configuration dialog.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure rules such as "an address is six hex octets") and the
//! infrastructure (config files, scan threads, the UI bridge).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects to fulfil a user goal (e.g., "add the
//!   robots the scan just found, then save the list").
//! - **Depend on abstractions** (the [`manage_devices::RegistryStore`]
//!   trait) rather than on the TOML file, so tests can swap the store.
//! - **Contain no file system access and no threads**.
//!
//! # Sub-modules
//!
//! - **`manage_devices`** – The durable device registry and the store trait
//!   it persists through.
//!
//! - **`configure_devices`** – The configuration session: working copy,
//!   scan candidates, batch edits and commit/cancel.

pub mod configure_devices;
pub mod manage_devices;
