// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cryptographic primitives the identity and credential layers are built on.
//!
//! Algorithms:
//! - SHA-512 content hashing
//! - AES-256-GCM AEAD symmetric cipher
//! - PBKDF2-HMAC-SHA512 password derivation
//! - RSA-2048 DSA and public-key encryption (one keypair serves both)
//!
//! Random Number Generator:
//! - ChaCha20 stream cipher, seeded from the operating system
//!
//! All operations are pure and caller-threaded; the random number generator
//! is the only shared resource and holds its own lock.
pub mod aead;
pub mod asymm;
pub mod kdf;
mod rng;
mod secret;
pub mod sha2;
pub mod xor;

pub use rng::{Rng, RngError};
pub use secret::{Secret, SecretBytes};

use thiserror::Error;

/// Failures reported by the primitives themselves.
///
/// Invalid key material, cipher failures and signing failures all surface
/// here; key derivation misuse has its own type in [`kdf`].
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("rsa operation failed: {0}")]
    Rsa(#[from] rsa::Error),

    #[error("invalid private key encoding: {0}")]
    Pkcs8(#[from] rsa::pkcs8::Error),

    #[error("invalid public key encoding: {0}")]
    Spki(#[from] rsa::pkcs8::spki::Error),

    #[error("signing failed")]
    Sign,

    #[error("symmetric encryption failed")]
    Encrypt,

    #[error("symmetric decryption failed")]
    Decrypt,

    #[error("xor inputs must have equal length ({0} != {1})")]
    LengthMismatch(usize, usize),

    #[error(transparent)]
    Rng(#[from] RngError),
}
