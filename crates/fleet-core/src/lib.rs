//! # fleet-core
//!
//! Shared library for the robot fleet tracker containing the Bluetooth
//! hardware address codec, the display label codec and the device records
//! used by the configuration dialog.
//!
//! It has zero dependencies on OS APIs, UI frameworks or Bluetooth stacks.
//!
//! # Architecture overview (for beginners)
//!
//! The fleet tracker follows a group of small robots with a camera and talks
//! to each of them over Bluetooth.  Before it can connect it needs to know
//! *which* robots exist: the user keeps a list of hardware addresses, either
//! typed in by hand or picked from a Bluetooth scan.
//!
//! This crate is the foundation of that list:
//!
//! - **`domain::address`** – [`BtAddress`], a validated six-octet address
//!   that always prints as `AA:BB:CC:DD:EE:FF`.
//! - **`domain::label`** – the `"name : address"` text shown in list views
//!   and used by recorded scan files.
//! - **`domain::device`** – [`DeviceEntry`] (a known robot) and
//!   [`Candidate`] (a robot seen by a scan but not yet added).

pub mod domain;

pub use domain::address::{validate, AddressError, BtAddress, ADDRESS_TEXT_LEN};
pub use domain::device::{Candidate, DeviceEntry};
pub use domain::label::{decode_label, encode_label, LabelError, LABEL_SEPARATOR};
