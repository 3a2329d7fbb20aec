//! `"name : address"` display labels.
//!
//! Device lists show each robot as a single line of text, for example
//! `Robot 7 : AA:BB:CC:DD:EE:FF`.  Scan records replayed from disk use the
//! same format, so the codec has to be an exact inverse in both directions.
//!
//! The address is always the last [`ADDRESS_TEXT_LEN`] characters of the
//! label.  Reading it from the fixed-width tail rather than splitting on the
//! separator means a name may itself contain `" : "` and still decode.

use thiserror::Error;

use super::address::{AddressError, BtAddress, ADDRESS_TEXT_LEN};

/// Text placed between the name and the address.
pub const LABEL_SEPARATOR: &str = " : ";

/// Errors produced when a label cannot be decoded.
///
/// Every variant means the label is malformed; the variants only say why.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LabelError {
    /// The label is shorter than a separator plus an address.
    #[error("malformed label {label:?}: too short to contain an address")]
    TooShort { label: String },

    /// The address is not preceded by the `" : "` separator.
    #[error("malformed label {label:?}: missing \" : \" before the address")]
    MissingSeparator { label: String },

    /// The trailing slice is not a valid hardware address.
    #[error("malformed label: {0}")]
    InvalidAddress(#[from] AddressError),
}

/// Produces the display label `"<name> : <address>"`.
pub fn encode_label(name: &str, address: &BtAddress) -> String {
    format!("{name}{LABEL_SEPARATOR}{address}")
}

/// Splits a display label back into its name and address.
///
/// # Errors
///
/// Returns a [`LabelError`] when the label is too short, the separator is
/// missing, or the trailing slice is not a valid address.
pub fn decode_label(label: &str) -> Result<(String, BtAddress), LabelError> {
    if label.len() < LABEL_SEPARATOR.len() + ADDRESS_TEXT_LEN {
        return Err(LabelError::TooShort {
            label: label.to_string(),
        });
    }

    let split = label.len() - ADDRESS_TEXT_LEN;
    // A multi-byte character straddling the split cannot be part of an address.
    let (head, tail) = match (label.get(..split), label.get(split..)) {
        (Some(head), Some(tail)) => (head, tail),
        _ => {
            return Err(LabelError::MissingSeparator {
                label: label.to_string(),
            })
        }
    };

    let name = head
        .strip_suffix(LABEL_SEPARATOR)
        .ok_or_else(|| LabelError::MissingSeparator {
            label: label.to_string(),
        })?;
    let address = tail.parse::<BtAddress>()?;

    Ok((name.to_string(), address))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> BtAddress {
        s.parse().expect("valid test address")
    }

    #[test]
    fn test_encode_label_uses_separator() {
        let label = encode_label("RobotX", &addr("aa:bb:cc:dd:ee:ff"));
        assert_eq!(label, "RobotX : AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_decode_label_inverts_encode() {
        // Arrange
        let address = addr("11:22:33:44:55:66");
        let label = encode_label("epuck-3", &address);

        // Act
        let (name, decoded) = decode_label(&label).expect("decode");

        // Assert
        assert_eq!(name, "epuck-3");
        assert_eq!(decoded, address);
    }

    #[test]
    fn test_decode_label_allows_empty_name() {
        let (name, address) = decode_label(" : 01:02:03:04:05:06").unwrap();
        assert_eq!(name, "");
        assert_eq!(address, addr("01:02:03:04:05:06"));
    }

    #[test]
    fn test_decode_label_keeps_separator_inside_name() {
        let label = encode_label("lab : bench 2", &addr("01:02:03:04:05:06"));
        let (name, _) = decode_label(&label).unwrap();
        assert_eq!(name, "lab : bench 2");
    }

    #[test]
    fn test_decode_label_handles_non_ascii_names() {
        let label = encode_label("Roboter Ü", &addr("0A:0B:0C:0D:0E:0F"));
        let (name, _) = decode_label(&label).unwrap();
        assert_eq!(name, "Roboter Ü");
    }

    #[test]
    fn test_decode_label_rejects_short_input() {
        assert!(matches!(
            decode_label("AA:BB:CC:DD:EE:FF"),
            Err(LabelError::TooShort { .. })
        ));
    }

    #[test]
    fn test_decode_label_rejects_missing_separator() {
        assert!(matches!(
            decode_label("robot---AA:BB:CC:DD:EE:FF"),
            Err(LabelError::MissingSeparator { .. })
        ));
    }

    #[test]
    fn test_decode_label_rejects_bad_address_tail() {
        assert!(matches!(
            decode_label("robot : AA:BB:CC:DD:EE:ZZ"),
            Err(LabelError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_decode_label_rejects_multibyte_character_at_split() {
        // 'é' is two bytes, so the 17-byte tail starts inside it.
        let label = "robot : éB:CC:DD:EE:FF:00";
        assert!(decode_label(label).is_err());
    }
}
