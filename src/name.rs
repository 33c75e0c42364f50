// SPDX-License-Identifier: MIT OR Apache-2.0

//! 512-bit content addresses.
//!
//! Every fob and credential packet is stored in the network under its
//! `Name`, the SHA-512 digest of the content the name commits to.
//!
//! ## Example
//!
//! ```
//! use keyfob::Name;
//!
//! let name = Name::new(b"A very important identity.");
//! assert_eq!(name.to_hex().len(), 128);
//! ```
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::crypto::sha2::{sha2_512, SHA512_DIGEST_SIZE};

/// The length of a name in bytes.
pub const NAME_LEN: usize = SHA512_DIGEST_SIZE;

/// 64-byte SHA-512 content address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name([u8; NAME_LEN]);

impl Name {
    /// Derive the name committing to the provided bytes.
    pub fn new(buf: impl AsRef<[u8]>) -> Self {
        Self(sha2_512(&[buf.as_ref()]))
    }

    /// Derive the name committing to the concatenation of all parts.
    pub fn from_parts(parts: &[&[u8]]) -> Self {
        Self(sha2_512(parts))
    }

    /// Create a `Name` from its raw bytes representation.
    pub const fn from_bytes(bytes: [u8; NAME_LEN]) -> Self {
        Self(bytes)
    }

    /// Bytes of the name.
    pub fn as_bytes(&self) -> &[u8; NAME_LEN] {
        &self.0
    }

    /// Convert the name to a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl AsRef<[u8]> for Name {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; NAME_LEN]> for Name {
    fn from(value: [u8; NAME_LEN]) -> Self {
        Self(value)
    }
}

impl TryFrom<&[u8]> for Name {
    type Error = NameError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let value_len = value.len();

        let checked_value: [u8; NAME_LEN] = value
            .try_into()
            .map_err(|_| NameError::InvalidLength(value_len, NAME_LEN))?;

        Ok(Self(checked_value))
    }
}

impl FromStr for Name {
    type Err = NameError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::try_from(hex::decode(value)?.as_slice())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Shortened representation for readable assertion output and logs.
        write!(f, "<Name {}>", &self.to_hex()[..12])
    }
}

/// Error types for `Name` struct.
#[derive(Debug, Error)]
pub enum NameError {
    /// Name has an invalid length.
    #[error("invalid name length {0} bytes, expected {1} bytes")]
    InvalidLength(usize, usize),

    /// Name string contains invalid hexadecimal characters.
    #[error("invalid hex encoding in name string")]
    InvalidHexEncoding(#[from] hex::FromHexError),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{Name, NameError};

    #[test]
    fn hashing() {
        // NIST test vector for SHA-512("abc").
        let expected = "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a\
             2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f";
        assert_eq!(Name::new(b"abc").to_hex(), expected);
        assert_eq!(Name::from_parts(&[b"a", b"bc"]).to_hex(), expected);
    }

    #[test]
    fn from_str_round_trip() {
        let name = Name::new([1, 2, 3]);
        let parsed: Name = name.to_hex().parse().unwrap();
        assert_eq!(name, parsed);
    }

    #[test]
    fn invalid_length() {
        let bytes = vec![254, 100, 4, 7];
        let result = Name::try_from(bytes.as_slice());
        assert!(matches!(result, Err(NameError::InvalidLength(4, 64))));
    }

    #[test]
    fn invalid_hex_encoding() {
        let result: Result<Name, NameError> = "notreallyahexstring".parse();
        assert!(matches!(result, Err(NameError::InvalidHexEncoding(_))));
    }

    #[test]
    fn usable_as_map_key() {
        let name = Name::new([1, 2, 3]);
        let mut map = HashMap::new();
        map.insert(name, "value identified by a name");
        assert!(map.contains_key(&name));
    }
}
