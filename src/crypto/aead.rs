// SPDX-License-Identifier: MIT OR Apache-2.0

//! Methods to encrypt and decrypt data symmetrically with AES256 block
//! cipher using GCM operation mode.
//!
//! The authentication tag makes decryption fail closed: a wrong key or a
//! tampered ciphertext is an error, never garbage plaintext. The credential
//! packet round-trips rely on that property.
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};

use crate::crypto::CryptoError;

/// Key size of the AES256 cipher in bytes.
pub const KEY_SIZE: usize = 32;

/// Nonce size of the GCM operation mode in bytes.
pub const NONCE_SIZE: usize = 12;

/// Encrypts plaintext data symmetrically with AES256 using a secret key and
/// nonce, returning the ciphertext with the authentication tag appended.
pub fn encrypt(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key))
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|_| CryptoError::Encrypt)
}

/// Decrypts ciphertext symmetrically with AES256 using a secret key and
/// nonce.
pub fn decrypt(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key))
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Decrypt)
}
