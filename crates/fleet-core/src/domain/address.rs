//! Bluetooth hardware address value type.
//!
//! Every robot in the fleet is identified by the 48-bit hardware address of
//! its Bluetooth module.  Users type these addresses by hand and scanners
//! report them as text, so the same device can arrive as
//! `aa:bb:cc:dd:ee:ff`, `AA-BB-CC-DD-EE-FF` or ` AA:BB:CC:DD:EE:FF `.
//! [`BtAddress`] stores the six raw octets, which makes equality
//! case-insensitive for free, and always prints the canonical upper-case
//! colon form.
//!
//! # Canonical form (for beginners)
//!
//! ```text
//! AA:BB:CC:DD:EE:FF
//! └┘ └┘ └┘ └┘ └┘ └┘   six octets, two hex digits each
//!   :  :  :  :  :     five separators  →  17 characters in total
//! ```
//!
//! The all-zero address `00:00:00:00:00:00` is the "null" address used by
//! Bluetooth stacks to mean "no device" and is rejected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of characters in the canonical text form of an address.
pub const ADDRESS_TEXT_LEN: usize = 17;

/// Number of octets in a Bluetooth hardware address.
const OCTET_COUNT: usize = 6;

/// Errors produced when parsing a hardware address.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AddressError {
    /// The input was empty or whitespace only.
    #[error("hardware address is empty")]
    Empty,

    /// The input does not have the six-octet `XX:XX:XX:XX:XX:XX` shape.
    #[error("malformed hardware address {input:?}: expected six hex octets separated by ':'")]
    Malformed { input: String },

    /// The input is the all-zero null address.
    #[error("hardware address {input:?} is the null address")]
    Null { input: String },
}

/// A validated, non-null 48-bit Bluetooth hardware address.
///
/// Serialises as its canonical text form so config files stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BtAddress([u8; OCTET_COUNT]);

impl BtAddress {
    /// Builds an address from raw octets, most significant first.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::Null`] for the all-zero address.
    pub fn from_octets(octets: [u8; OCTET_COUNT]) -> Result<Self, AddressError> {
        if octets.iter().all(|&b| b == 0) {
            return Err(AddressError::Null {
                input: "00:00:00:00:00:00".to_string(),
            });
        }
        Ok(Self(octets))
    }

    /// Returns the raw octets, most significant first.
    pub fn octets(&self) -> [u8; OCTET_COUNT] {
        self.0
    }
}

impl fmt::Display for BtAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl FromStr for BtAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AddressError::Empty);
        }

        let malformed = || AddressError::Malformed {
            input: s.to_string(),
        };

        let mut octets = [0u8; OCTET_COUNT];
        let mut count = 0;
        for part in trimmed.split([':', '-']) {
            if count == OCTET_COUNT
                || part.len() != 2
                || !part.bytes().all(|b| b.is_ascii_hexdigit())
            {
                return Err(malformed());
            }
            octets[count] = u8::from_str_radix(part, 16).map_err(|_| malformed())?;
            count += 1;
        }
        if count != OCTET_COUNT {
            return Err(malformed());
        }

        if octets.iter().all(|&b| b == 0) {
            return Err(AddressError::Null {
                input: s.to_string(),
            });
        }
        Ok(Self(octets))
    }
}

impl TryFrom<String> for BtAddress {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BtAddress> for String {
    fn from(address: BtAddress) -> Self {
        address.to_string()
    }
}

/// Validates `address` and returns it in canonical form.
///
/// # Errors
///
/// Returns an [`AddressError`] describing why the text is not a usable address.
pub fn validate(address: &str) -> Result<BtAddress, AddressError> {
    address.parse()
}

/// Returns the key used to compare raw address text for equality.
///
/// Parseable addresses compare by canonical form; anything else falls back to
/// the trimmed, upper-cased text so that two identical garbage reports still
/// count as the same device.
pub fn canonical_key(raw: &str) -> String {
    match raw.parse::<BtAddress>() {
        Ok(address) => address.to_string(),
        Err(_) => raw.trim().to_ascii_uppercase(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
