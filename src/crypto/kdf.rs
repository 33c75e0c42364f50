// SPDX-License-Identifier: MIT OR Apache-2.0

//! Password-based key derivation with PBKDF2-HMAC-SHA512.
use pbkdf2::pbkdf2_hmac;
use sha2::Sha512;
use thiserror::Error;
use zeroize::Zeroize;

use crate::crypto::aead::{KEY_SIZE, NONCE_SIZE};
use crate::crypto::secret::Secret;

/// Total length of one derivation: cipher key plus nonce material.
pub const DERIVED_SIZE: usize = KEY_SIZE + NONCE_SIZE;

/// Key material derived from a user secret, split into the symmetric cipher
/// key and nonce.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DerivedKey(Secret<DERIVED_SIZE>);

impl DerivedKey {
    pub fn key(&self) -> &[u8; KEY_SIZE] {
        self.0.as_bytes()[..KEY_SIZE]
            .try_into()
            .expect("derived key size")
    }

    pub fn nonce(&self) -> &[u8; NONCE_SIZE] {
        self.0.as_bytes()[KEY_SIZE..]
            .try_into()
            .expect("derived nonce size")
    }

    /// The whole derivation, used as keystream seed by the obfuscation
    /// scheme.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// Stretches a user secret into cipher key material.
///
/// The round count is applied verbatim; several derivations in the
/// credential packet scheme compute it from user data, including the values
/// 0 and 1, and the result must stay bit-compatible across implementations.
pub fn secure_password(
    input: &[u8],
    salt: &[u8],
    rounds: u32,
) -> Result<DerivedKey, DerivationError> {
    if input.is_empty() {
        return Err(DerivationError::EmptyInput);
    }
    if salt.is_empty() {
        return Err(DerivationError::EmptySalt);
    }

    let mut out = [0u8; DERIVED_SIZE];
    pbkdf2_hmac::<Sha512>(input, salt, rounds, &mut out);
    let derived = DerivedKey(Secret::from_bytes(out));
    out.zeroize();

    Ok(derived)
}

#[derive(Debug, Error)]
pub enum DerivationError {
    #[error("kdf input must not be empty")]
    EmptyInput,

    #[error("kdf salt must not be empty")]
    EmptySalt,
}
