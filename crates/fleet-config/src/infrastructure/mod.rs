//! Infrastructure layer for the fleet configuration tool.
//!
//! Contains the outward-facing adapters: the discovery feeds, TOML storage
//! for the device list, and the session actor that the UI (or the CLI)
//! talks to.
//!
//! This layer depends on `application` and `fleet_core`.  The only type the
//! application layer borrows from here is the [`discovery::FeedEvent`]
//! message it consumes.

pub mod discovery;
pub mod storage;
pub mod ui_bridge;
