// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;

use tracing::{debug, warn};

use crate::crypto::kdf::{secure_password, DerivedKey};
use crate::crypto::sha2::sha2_512;
use crate::crypto::xor::xor;
use crate::crypto::{aead, SecretBytes};
use crate::name::Name;
use crate::packet::{parse_pin, PacketKind};

/// Credential packet storing the obfuscated, encrypted master data blob.
///
/// The blob is recoverable only with the exact `(username, pin, password)`
/// triple: the pin yields the rid, the rid and password drive the cipher
/// key derivation, and username and pin drive a second keystream that the
/// plaintext is XORed with before encryption. The packet name is the hash
/// of the ciphertext, so the stored blob is content-addressed.
#[derive(Clone, PartialEq, Eq)]
pub struct TmidPacket {
    kind: PacketKind,
    username: String,
    pin: String,
    password: SecretBytes,
    rid: SecretBytes,
    plain_text_master_data: SecretBytes,
    obfuscation_salt: Vec<u8>,
    obfuscated_master_data: Vec<u8>,
    encrypted_master_data: Vec<u8>,
    salt: Vec<u8>,
    derived: Option<DerivedKey>,
    name: Option<Name>,
}

/// Repeats the keystream seed until it covers `len` bytes.
fn tile(seed: &[u8], len: usize) -> Vec<u8> {
    seed.iter().copied().cycle().take(len).collect()
}

impl TmidPacket {
    /// Derives all key material, obfuscates and encrypts the master data
    /// and names the packet after the resulting ciphertext.
    ///
    /// Any sub-step failure leaves an empty packet; callers inspect
    /// [`TmidPacket::is_valid`]. The surrogate flag selects the Stmid kind.
    pub fn new(
        username: &str,
        pin: &str,
        surrogate: bool,
        password: &str,
        plain_text_master_data: &[u8],
    ) -> Self {
        let mut packet = Self {
            kind: if surrogate {
                PacketKind::Stmid
            } else {
                PacketKind::Tmid
            },
            username: username.to_owned(),
            pin: pin.to_owned(),
            password: SecretBytes::from(password.as_bytes()),
            rid: SecretBytes::from(&sha2_512(&[pin.as_bytes()])[..]),
            plain_text_master_data: SecretBytes::from(plain_text_master_data),
            obfuscation_salt: Vec::new(),
            obfuscated_master_data: Vec::new(),
            encrypted_master_data: Vec::new(),
            salt: Vec::new(),
            derived: None,
            name: None,
        };
        packet.initialise();
        packet
    }

    /// A packet carrying only the credentials needed to later call
    /// [`TmidPacket::decrypt_master_data`] on a fetched ciphertext. It has
    /// no payload and no name until then.
    pub fn for_login(username: &str, pin: &str, surrogate: bool) -> Self {
        let mut packet = Self {
            kind: if surrogate {
                PacketKind::Stmid
            } else {
                PacketKind::Tmid
            },
            username: username.to_owned(),
            pin: pin.to_owned(),
            password: SecretBytes::new(),
            rid: SecretBytes::from(&sha2_512(&[pin.as_bytes()])[..]),
            plain_text_master_data: SecretBytes::new(),
            obfuscation_salt: Vec::new(),
            obfuscated_master_data: Vec::new(),
            encrypted_master_data: Vec::new(),
            salt: Vec::new(),
            derived: None,
            name: None,
        };
        if packet.username.is_empty() || packet.pin.is_empty() {
            debug!("tmid login packet left empty: missing username or pin");
            packet.clear();
        }
        packet
    }

    fn initialise(&mut self) {
        if self.username.is_empty() || self.pin.is_empty() || self.rid.is_empty() {
            debug!("tmid packet left empty: missing username or pin");
            return self.clear();
        }

        if !self.set_password() {
            warn!("tmid packet left empty: password rejected");
            return self.clear();
        }
        if !self.obfuscate_plain_data() {
            warn!("tmid packet left empty: obfuscation failed");
            return self.clear();
        }
        if !self.set_plain_data() {
            warn!("tmid packet left empty: master data encryption failed");
            return self.clear();
        }

        self.name = Some(Name::new(&self.encrypted_master_data));
    }

    /// Derives the cipher key from password and rid. The round count comes
    /// from the first four rid bytes read little-endian, which makes it
    /// data-dependent and part of the wire contract.
    fn set_password(&mut self) -> bool {
        if self.password.is_empty() || self.rid.len() < 4 {
            self.salt.clear();
            self.derived = None;
            return false;
        }

        self.salt = sha2_512(&[self.rid.as_bytes(), self.password.as_bytes()]).to_vec();

        let rounds = u32::from_le_bytes(
            self.rid.as_bytes()[..4]
                .try_into()
                .expect("four rid bytes checked above"),
        );

        match secure_password(self.password.as_bytes(), &self.salt, rounds) {
            Ok(derived) => {
                self.derived = Some(derived);
                true
            }
            Err(err) => {
                warn!(%err, "cipher key derivation failed");
                self.salt.clear();
                self.derived = None;
                false
            }
        }
    }

    /// Round count of the obfuscation keystream derivation. The branch on
    /// `pin / 2 == 0` is part of the wire contract; for pins below 2 the
    /// count legitimately comes out as 0 or 1.
    fn obfuscation_rounds(&self) -> Option<u32> {
        let pin = parse_pin(&self.pin).ok()?;
        Some(if pin / 2 == 0 { pin * 3 / 2 } else { pin / 2 })
    }

    fn obfuscation_keystream(&self, len: usize) -> Option<Vec<u8>> {
        let rounds = self.obfuscation_rounds()?;
        let obfuscation_salt = sha2_512(&[self.password.as_bytes(), self.rid.as_bytes()]);
        match secure_password(self.username.as_bytes(), &obfuscation_salt, rounds) {
            Ok(seed) => Some(tile(seed.as_bytes(), len)),
            Err(err) => {
                warn!(%err, "obfuscation keystream derivation failed");
                None
            }
        }
    }

    fn obfuscate_plain_data(&mut self) -> bool {
        if self.plain_text_master_data.is_empty()
            || self.username.is_empty()
            || self.pin.is_empty()
        {
            self.obfuscated_master_data.clear();
            return false;
        }

        self.obfuscation_salt = sha2_512(&[self.password.as_bytes(), self.rid.as_bytes()]).to_vec();

        let Some(keystream) = self.obfuscation_keystream(self.plain_text_master_data.len()) else {
            return false;
        };
        match xor(self.plain_text_master_data.as_bytes(), &keystream) {
            Ok(obfuscated) => {
                self.obfuscated_master_data = obfuscated;
                true
            }
            Err(_) => false,
        }
    }

    fn set_plain_data(&mut self) -> bool {
        let Some(derived) = &self.derived else {
            self.encrypted_master_data.clear();
            return false;
        };
        if self.obfuscated_master_data.is_empty() {
            self.encrypted_master_data.clear();
            return false;
        }

        match aead::encrypt(derived.key(), derived.nonce(), &self.obfuscated_master_data) {
            Ok(encrypted) => {
                self.encrypted_master_data = encrypted;
                true
            }
            Err(_) => {
                self.encrypted_master_data.clear();
                false
            }
        }
    }

    /// Inverts the obfuscation of a freshly decrypted blob.
    fn clarify_obfuscated_data(&mut self) -> bool {
        if self.username.is_empty() {
            return false;
        }
        let Some(keystream) = self.obfuscation_keystream(self.obfuscated_master_data.len()) else {
            return false;
        };
        match xor(&self.obfuscated_master_data, &keystream) {
            Ok(plain) => {
                self.plain_text_master_data = SecretBytes::from_bytes(plain);
                true
            }
            Err(_) => false,
        }
    }

    /// Recovers the master data from a fetched ciphertext using the given
    /// password; re-derives all key material first. Returns `None` and
    /// resets the packet on any failure, including a wrong password, which
    /// the authenticated cipher detects.
    pub fn decrypt_master_data(
        &mut self,
        password: &str,
        encrypted_master_data: &[u8],
    ) -> Option<SecretBytes> {
        self.password = SecretBytes::from(password.as_bytes());
        if !self.set_password() {
            warn!("tmid packet cleared: password rejected");
            self.clear();
            return None;
        }

        if encrypted_master_data.is_empty() {
            warn!("tmid packet cleared: empty ciphertext");
            self.clear();
            return None;
        }

        let derived = self.derived.as_ref().expect("derived by set_password");
        match aead::decrypt(derived.key(), derived.nonce(), encrypted_master_data) {
            Ok(obfuscated) => {
                self.encrypted_master_data = encrypted_master_data.to_vec();
                self.obfuscated_master_data = obfuscated;
            }
            Err(_) => {
                warn!("tmid packet cleared: master data decryption failed");
                self.clear();
                return None;
            }
        }

        if !self.clarify_obfuscated_data() {
            warn!("tmid packet cleared: clarification failed");
            self.clear();
            return None;
        }

        Some(self.plain_text_master_data.clone())
    }

    /// Resets every field; secret-bearing buffers are overwritten.
    pub fn clear(&mut self) {
        self.name = None;
        self.username.clear();
        self.pin.clear();
        self.password.clear();
        self.rid.clear();
        self.plain_text_master_data.clear();
        self.obfuscation_salt.clear();
        self.obfuscated_master_data.clear();
        self.encrypted_master_data.clear();
        self.salt.clear();
        self.derived = None;
    }

    /// A packet is valid once it is named after its ciphertext.
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

    pub fn rid(&self) -> &SecretBytes {
        &self.rid
    }

    pub fn plain_text_master_data(&self) -> &SecretBytes {
        &self.plain_text_master_data
    }

    /// The stored payload; the network address of the packet is
    /// [`TmidPacket::name`].
    pub fn encrypted_master_data(&self) -> &[u8] {
        &self.encrypted_master_data
    }
}

impl fmt::Debug for TmidPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Everything beyond kind and name is user data or key material.
        f.debug_struct("TmidPacket")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use crate::name::Name;
    use crate::packet::PacketKind;

    use super::TmidPacket;

    const MASTER_DATA: &[u8] = b"serialised session state, opaque to this layer";

    #[test]
    fn ciphertext_is_content_addressed() {
        let packet = TmidPacket::new("user1", "1234", false, "pw", MASTER_DATA);
        assert!(packet.is_valid());
        assert_eq!(packet.kind(), PacketKind::Tmid);
        assert_eq!(
            packet.name(),
            Some(&Name::new(packet.encrypted_master_data()))
        );
        assert_ne!(packet.encrypted_master_data(), MASTER_DATA);

        let surrogate = TmidPacket::new("user1", "1234", true, "pw", MASTER_DATA);
        assert_eq!(surrogate.kind(), PacketKind::Stmid);
    }

    #[test]
    fn master_data_round_trip() {
        let stored = TmidPacket::new("user1", "1234", false, "pw", MASTER_DATA);

        let mut login = TmidPacket::for_login("user1", "1234", false);
        let recovered = login
            .decrypt_master_data("pw", stored.encrypted_master_data())
            .unwrap();
        assert_eq!(recovered.as_bytes(), MASTER_DATA);
    }

    #[test]
    fn wrong_password_leaves_packet_empty() {
        let stored = TmidPacket::new("user1", "1234", false, "pw", MASTER_DATA);

        let mut login = TmidPacket::for_login("user1", "1234", false);
        assert!(login
            .decrypt_master_data("not-pw", stored.encrypted_master_data())
            .is_none());
        assert!(!login.is_valid());
        assert!(login.username().is_empty());
        assert!(login.rid().is_empty());
    }

    #[test]
    fn wrong_pin_cannot_recover() {
        let stored = TmidPacket::new("user1", "1234", false, "pw", MASTER_DATA);

        // A different pin yields a different rid, hence a different key.
        let mut login = TmidPacket::for_login("user1", "4321", false);
        assert!(login
            .decrypt_master_data("pw", stored.encrypted_master_data())
            .is_none());
        assert!(!login.is_valid());
    }

    #[test]
    fn tiny_pins_hit_the_low_round_branch() {
        // pin = 1: 1 / 2 == 0, so the keystream uses 1 * 3 / 2 = 1 round.
        let stored = TmidPacket::new("user1", "1", false, "pw", MASTER_DATA);
        assert!(stored.is_valid());

        let mut login = TmidPacket::for_login("user1", "1", false);
        let recovered = login
            .decrypt_master_data("pw", stored.encrypted_master_data())
            .unwrap();
        assert_eq!(recovered.as_bytes(), MASTER_DATA);

        // pin = 0 drives the round count all the way to zero.
        let stored = TmidPacket::new("user1", "0", false, "pw", MASTER_DATA);
        assert!(stored.is_valid());

        let mut login = TmidPacket::for_login("user1", "0", false);
        let recovered = login
            .decrypt_master_data("pw", stored.encrypted_master_data())
            .unwrap();
        assert_eq!(recovered.as_bytes(), MASTER_DATA);
    }

    #[test]
    fn quiet_failures_leave_empty_packets() {
        assert!(!TmidPacket::new("", "1234", false, "pw", MASTER_DATA).is_valid());
        assert!(!TmidPacket::new("user1", "", false, "pw", MASTER_DATA).is_valid());
        assert!(!TmidPacket::new("user1", "12ab", false, "pw", MASTER_DATA).is_valid());
        assert!(!TmidPacket::new("user1", "1234", false, "", MASTER_DATA).is_valid());
        assert!(!TmidPacket::new("user1", "1234", false, "pw", b"").is_valid());
    }

    #[test]
    fn addresses_are_stable() {
        let a = TmidPacket::new("user1", "1234", false, "pw", MASTER_DATA);
        let b = TmidPacket::new("user1", "1234", false, "pw", MASTER_DATA);
        assert_eq!(a.name(), b.name());
        assert_eq!(a, b);

        // The surrogate differs only in kind; the ciphertext is identical.
        let surrogate = TmidPacket::new("user1", "1234", true, "pw", MASTER_DATA);
        assert_eq!(a.name(), surrogate.name());
        assert_ne!(a, surrogate);
    }

    #[test]
    fn clear_wipes_everything() {
        let mut packet = TmidPacket::new("user1", "1234", false, "pw", MASTER_DATA);
        packet.clear();

        assert!(!packet.is_valid());
        assert!(packet.username().is_empty());
        assert!(packet.pin().is_empty());
        assert!(packet.rid().is_empty());
        assert!(packet.plain_text_master_data().is_empty());
        assert!(packet.encrypted_master_data().is_empty());
    }
}
