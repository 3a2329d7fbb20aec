//! Domain entities for the fleet tracker's device configuration.
//!
//! Everything in here is pure: no file system, no sockets, no Bluetooth
//! stack.  The application crate layers persistence and discovery on top.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! The domain layer holds the rules that make the system what it is, in this
//! case "a hardware address is six hex octets" and "a device list never
//! contains the same address twice".  Outer layers (application,
//! infrastructure, UI) depend on the domain; the domain never depends on
//! them, which keeps it trivially unit-testable.

/// Hardware address parsing and canonical form.
pub mod address;

/// Device records shared by the registry, sessions and scans.
pub mod device;

/// `"name : address"` display label codec.
pub mod label;
