// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::crypto::CryptoError;

/// XOR two byte slices of equal length.
pub fn xor(a: &[u8], b: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if a.len() != b.len() {
        return Err(CryptoError::LengthMismatch(a.len(), b.len()));
    }
    Ok(a.iter().zip(b).map(|(x, y)| x ^ y).collect())
}
