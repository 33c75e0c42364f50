// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;

use tracing::{debug, warn};

use crate::crypto::kdf::{secure_password, DerivedKey};
use crate::crypto::sha2::sha2_512;
use crate::crypto::{aead, SecretBytes};
use crate::name::Name;
use crate::packet::{parse_pin, PacketKind};

/// Credential packet storing the encrypted rid of a login session.
///
/// The packet name is `H(username ‖ pin ‖ smid_appendix)`; the appendix is
/// empty for the main session (Mid) and a fixed differentiator for the
/// surrogate session (Smid), so both live at distinct network addresses.
#[derive(Clone, PartialEq, Eq)]
pub struct MidPacket {
    kind: PacketKind,
    username: String,
    pin: String,
    smid_appendix: String,
    rid: SecretBytes,
    encrypted_rid: Vec<u8>,
    salt: Vec<u8>,
    derived: Option<DerivedKey>,
    name: Option<Name>,
}

impl MidPacket {
    /// Derives key material and the packet name from the user credentials.
    ///
    /// An empty username or pin yields an empty packet rather than an
    /// error; callers inspect [`MidPacket::is_valid`].
    pub fn new(username: &str, pin: &str, smid_appendix: &str) -> Self {
        let kind = if smid_appendix.is_empty() {
            PacketKind::Mid
        } else {
            PacketKind::Smid
        };

        let mut packet = Self {
            kind,
            username: username.to_owned(),
            pin: pin.to_owned(),
            smid_appendix: smid_appendix.to_owned(),
            rid: SecretBytes::new(),
            encrypted_rid: Vec::new(),
            salt: Vec::new(),
            derived: None,
            name: None,
        };
        packet.initialise();
        packet
    }

    fn initialise(&mut self) {
        if self.username.is_empty() || self.pin.is_empty() {
            debug!("mid packet left empty: missing username or pin");
            return self.clear();
        }

        self.salt = sha2_512(&[self.pin.as_bytes(), self.username.as_bytes()]).to_vec();

        // The numeric pin itself is the stretch count, uncapped.
        let rounds = match parse_pin(&self.pin) {
            Ok(rounds) => rounds,
            Err(_) => {
                warn!("mid packet left empty: pin does not parse");
                return self.clear();
            }
        };

        match secure_password(self.username.as_bytes(), &self.salt, rounds) {
            Ok(derived) => self.derived = Some(derived),
            Err(err) => {
                warn!(%err, "mid packet left empty: key derivation failed");
                return self.clear();
            }
        }

        self.name = Some(Name::from_parts(&[
            self.username.as_bytes(),
            self.pin.as_bytes(),
            self.smid_appendix.as_bytes(),
        ]));
    }

    /// Stores the rid and its encryption under the derived key. Resets the
    /// packet on any failure.
    pub fn set_rid(&mut self, rid: &[u8]) {
        self.rid = SecretBytes::from(rid);
        if self.rid.is_empty() {
            warn!("mid packet cleared: empty rid");
            return self.clear();
        }

        let Some(derived) = &self.derived else {
            warn!("mid packet cleared: no key material to encrypt rid with");
            return self.clear();
        };

        match aead::encrypt(derived.key(), derived.nonce(), self.rid.as_bytes()) {
            Ok(encrypted) => self.encrypted_rid = encrypted,
            Err(_) => {
                warn!("mid packet cleared: rid encryption failed");
                self.clear();
            }
        }
    }

    /// Recovers the rid from a fetched ciphertext and stores both. Returns
    /// `None` and resets the packet on any failure.
    pub fn decrypt_rid(&mut self, encrypted_rid: &[u8]) -> Option<SecretBytes> {
        if self.username.is_empty() || self.pin.is_empty() || encrypted_rid.is_empty() {
            warn!("mid packet cleared: empty ciphertext or user data");
            self.clear();
            return None;
        }

        let Some(derived) = &self.derived else {
            self.clear();
            return None;
        };

        match aead::decrypt(derived.key(), derived.nonce(), encrypted_rid) {
            Ok(rid) => {
                self.encrypted_rid = encrypted_rid.to_vec();
                self.rid = SecretBytes::from_bytes(rid);
                Some(self.rid.clone())
            }
            Err(_) => {
                warn!("mid packet cleared: rid decryption failed");
                self.clear();
                None
            }
        }
    }

    /// Resets every field; secret-bearing buffers are overwritten.
    pub fn clear(&mut self) {
        self.name = None;
        self.username.clear();
        self.pin.clear();
        self.smid_appendix.clear();
        self.encrypted_rid.clear();
        self.salt.clear();
        self.derived = None;
        self.rid.clear();
    }

    /// A packet is valid once its name is derived; every failure path
    /// removes the name.
    pub fn is_valid(&self) -> bool {
        self.name.is_some()
    }

    pub fn name(&self) -> Option<&Name> {
        self.name.as_ref()
    }

    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn pin(&self) -> &str {
        &self.pin
    }

    pub fn smid_appendix(&self) -> &str {
        &self.smid_appendix
    }

    pub fn rid(&self) -> &SecretBytes {
        &self.rid
    }

    /// The stored payload; the network address of the packet is
    /// [`MidPacket::name`].
    pub fn encrypted_rid(&self) -> &[u8] {
        &self.encrypted_rid
    }
}

impl fmt::Debug for MidPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Everything beyond kind and name is user data or key material.
        f.debug_struct("MidPacket")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use crate::name::Name;
    use crate::packet::PacketKind;

    use super::MidPacket;

    #[test]
    fn name_commits_to_credentials() {
        let packet = MidPacket::new("user1", "1234", "");
        assert!(packet.is_valid());
        assert_eq!(packet.kind(), PacketKind::Mid);
        assert_eq!(
            packet.name(),
            Some(&Name::from_parts(&[b"user1", b"1234", b""]))
        );
    }

    #[test]
    fn rid_round_trip() {
        let mut packet = MidPacket::new("user1", "1234", "");
        packet.set_rid(b"R");
        assert!(packet.is_valid());

        let encrypted = packet.encrypted_rid().to_vec();
        assert!(!encrypted.is_empty());

        // A sibling packet derived from the same credentials recovers it.
        let mut sibling = MidPacket::new("user1", "1234", "");
        let rid = sibling.decrypt_rid(&encrypted).unwrap();
        assert_eq!(rid.as_bytes(), b"R");
        assert_eq!(sibling.rid().as_bytes(), b"R");
    }

    #[test]
    fn wrong_credentials_fail_closed() {
        let mut packet = MidPacket::new("user1", "1234", "");
        packet.set_rid(b"R");
        let encrypted = packet.encrypted_rid().to_vec();

        let mut other = MidPacket::new("user1", "4321", "");
        assert!(other.decrypt_rid(&encrypted).is_none());
        assert!(!other.is_valid());
    }

    #[test]
    fn quiet_failures_leave_empty_packets() {
        assert!(!MidPacket::new("", "1234", "").is_valid());
        assert!(!MidPacket::new("user1", "", "").is_valid());
        assert!(!MidPacket::new("user1", "12ab", "").is_valid());
        assert!(!MidPacket::new("user1", "-1", "").is_valid());

        let mut packet = MidPacket::new("user1", "1234", "");
        packet.set_rid(b"");
        assert!(!packet.is_valid());
        assert!(packet.username().is_empty());
        assert!(packet.rid().is_empty());
    }

    #[test]
    fn surrogate_gets_its_own_address() {
        let mid = MidPacket::new("user1", "1234", "");
        let smid = MidPacket::new("user1", "1234", "1");
        assert_eq!(smid.kind(), PacketKind::Smid);
        assert_ne!(mid.name(), smid.name());
        assert_ne!(mid, smid);
    }

    #[test]
    fn addresses_are_stable() {
        let a = MidPacket::new("user1", "1234", "");
        let b = MidPacket::new("user1", "1234", "");
        assert_eq!(a.name(), b.name());
        assert_eq!(a, b);
    }

    #[test]
    fn clear_wipes_everything() {
        let mut packet = MidPacket::new("user1", "1234", "");
        packet.set_rid(b"R");
        packet.clear();

        assert!(!packet.is_valid());
        assert!(packet.name().is_none());
        assert!(packet.username().is_empty());
        assert!(packet.pin().is_empty());
        assert!(packet.rid().is_empty());
        assert!(packet.encrypted_rid().is_empty());
    }
}
