// SPDX-License-Identifier: MIT OR Apache-2.0

//! Login credential packets.
//!
//! A Mid (or its surrogate sibling Smid) stores the encrypted rid for a
//! user session under a name derived from username and pin. A Tmid (or
//! Stmid) stores the obfuscated and encrypted master data blob under the
//! name of its own ciphertext. Together they let a user recover session
//! state from any node given only the `(username, pin, password)` triple.
//!
//! The packets are quiet state machines: a failing mutation resets the
//! packet to its empty state instead of raising, and callers observe
//! validity through [`MidPacket::is_valid`] / [`TmidPacket::is_valid`].
//! Credential flows are stateful retry loops; errors across them would
//! complicate every caller.
mod mid;
mod tmid;

pub use mid::MidPacket;
pub use tmid::TmidPacket;

use thiserror::Error;

/// Kind of a credential packet. Wire values continue the fob tag numbering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PacketKind {
    Mid,
    Smid,
    Tmid,
    Stmid,
}

impl PacketKind {
    pub const fn value(self) -> u32 {
        match self {
            PacketKind::Mid => 7,
            PacketKind::Smid => 8,
            PacketKind::Tmid => 9,
            PacketKind::Stmid => 10,
        }
    }
}

/// The user pin failed to parse as an unsigned 32-bit integer.
#[derive(Debug, Error)]
#[error("pin is not an unsigned 32-bit integer")]
pub struct PinError;

/// Pins are numeric strings; their value feeds key derivation round counts.
pub(crate) fn parse_pin(pin: &str) -> Result<u32, PinError> {
    pin.parse::<u32>().map_err(|_| PinError)
}

#[cfg(test)]
mod tests {
    use super::{parse_pin, PacketKind};

    #[test]
    fn pin_parsing() {
        assert_eq!(parse_pin("1234").unwrap(), 1234);
        assert_eq!(parse_pin("0").unwrap(), 0);
        assert!(parse_pin("").is_err());
        assert!(parse_pin("12ab").is_err());
        assert!(parse_pin("-1").is_err());
        // Larger than u32.
        assert!(parse_pin("4294967296").is_err());
    }

    #[test]
    fn wire_values_stay_disjoint_from_tags() {
        assert_eq!(PacketKind::Mid.value(), 7);
        assert_eq!(PacketKind::Smid.value(), 8);
        assert_eq!(PacketKind::Tmid.value(), 9);
        assert_eq!(PacketKind::Stmid.value(), 10);
    }
}
