// SPDX-License-Identifier: MIT OR Apache-2.0

//! RSA-2048 keypairs behind typed wrappers.
//!
//! One keypair serves both roles the fob lineage needs: PKCS#1 v1.5
//! signatures over SHA-512 and PKCS#1 v1.5 public-key encryption. Keys
//! travel in their canonical DER encodings (PKCS#8 for private keys, SPKI
//! for public keys), which is also what gets hashed into fob names.
use std::fmt;

use rsa::pkcs1v15::{Signature as Pkcs1v15Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use sha2::Sha512;

use crate::crypto::rng::Rng;
use crate::crypto::CryptoError;

pub const KEY_BITS: usize = 2048;

/// Public half of an identity keypair.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(RsaPublicKey);

/// Private half of an identity keypair.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey(RsaPrivateKey);

/// Detached signature over arbitrary bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature(Vec<u8>);

/// Generates a fresh keypair from the given random number generator.
pub fn generate_key_pair(rng: &Rng) -> Result<(PublicKey, PrivateKey), CryptoError> {
    let private = rng.with(|rng| RsaPrivateKey::new(rng, KEY_BITS))??;
    let public = PublicKey(RsaPublicKey::from(&private));
    Ok((public, PrivateKey(private)))
}

impl PublicKey {
    /// Checks a signature over `bytes` against this key.
    pub fn verify(&self, bytes: &[u8], signature: &Signature) -> bool {
        let Ok(signature) = Pkcs1v15Signature::try_from(signature.as_bytes()) else {
            return false;
        };
        VerifyingKey::<Sha512>::new(self.0.clone())
            .verify(bytes, &signature)
            .is_ok()
    }

    pub fn encrypt(&self, rng: &Rng, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(rng.with(|rng| self.0.encrypt(rng, Pkcs1v15Encrypt, plaintext))??)
    }

    /// Canonical SubjectPublicKeyInfo DER encoding.
    pub fn to_der(&self) -> Result<Vec<u8>, CryptoError> {
        Ok(self.0.to_public_key_der()?.into_vec())
    }

    pub fn from_der(bytes: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self(RsaPublicKey::from_public_key_der(bytes)?))
    }
}

impl PrivateKey {
    /// Signs `bytes` with PKCS#1 v1.5 over SHA-512.
    pub fn sign(&self, bytes: &[u8]) -> Result<Signature, CryptoError> {
        let signing_key = SigningKey::<Sha512>::new(self.0.clone());
        let signature = signing_key.try_sign(bytes).map_err(|_| CryptoError::Sign)?;
        Ok(Signature(signature.to_vec()))
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(self.0.decrypt(Pkcs1v15Encrypt, ciphertext)?)
    }

    /// Canonical PKCS#8 DER encoding.
    pub fn to_der(&self) -> Result<Vec<u8>, CryptoError> {
        Ok(self.0.to_pkcs8_der()?.as_bytes().to_vec())
    }

    pub fn from_der(bytes: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self(RsaPrivateKey::from_pkcs8_der(bytes)?))
    }
}

impl Signature {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Signature {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey").finish_non_exhaustive()
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not reveal key material when printing debug info.
        f.debug_struct("PrivateKey").field("value", &"***").finish()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({} bytes)", self.0.len())
    }
}
