// SPDX-License-Identifier: MIT OR Apache-2.0

//! Self-describing CBOR encodings for fobs and fob collections.
//!
//! This is the single boundary at which malformed input is rejected: every
//! decode re-checks the cross-field invariants (tag match, name commitment,
//! keypair probe) before a value is handed out, so all other components may
//! assume their inputs are coherent.
use ciborium::de::Error as DeserializeError;
use ciborium::ser::Error as SerializeError;
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;
use thiserror::Error;

use crate::crypto::asymm::{PrivateKey, PublicKey, Signature};
use crate::crypto::{CryptoError, Rng};
use crate::fob::{Fob, FobError, Tag};
use crate::keyring::{KeyChain, KeyRing, KeyRingError, PublicIdentity};
use crate::name::Name;

/// Account fobs in a key ring encoding, in fixed order.
const KEY_RING_TAGS: [Tag; 6] = [
    Tag::Anmid,
    Tag::Ansmid,
    Tag::Antmid,
    Tag::Anmaid,
    Tag::Maid,
    Tag::Pmid,
];

#[derive(Serialize, Deserialize)]
struct FobRecord {
    #[serde(rename = "type")]
    tag: u32,
    name: ByteBuf,
    encoded_private_key: ByteBuf,
    encoded_public_key: ByteBuf,
    validation_token: ByteBuf,
}

#[derive(Serialize, Deserialize)]
struct PmidEntry {
    pmid: ByteBuf,
}

#[derive(Serialize, Deserialize)]
struct PmidListRecord {
    pmids: Vec<PmidEntry>,
}

#[derive(Serialize, Deserialize)]
struct KeyChainRecord {
    anmaid: ByteBuf,
    maid: ByteBuf,
    pmid: ByteBuf,
}

#[derive(Serialize, Deserialize)]
struct KeyChainListRecord {
    keychains: Vec<KeyChainRecord>,
}

#[derive(Serialize, Deserialize)]
struct PublicIdentityRecord {
    public_id: ByteBuf,
    anmpid: ByteBuf,
    mpid: ByteBuf,
}

#[derive(Serialize, Deserialize)]
struct KeyRingRecord {
    fobs: Vec<ByteBuf>,
    public_identities: Vec<PublicIdentityRecord>,
}

/// Serializes a fob with all five fields, including its tag value.
pub fn encode_fob(fob: &Fob) -> Result<Vec<u8>, EncodeError> {
    let record = FobRecord {
        tag: fob.tag().value(),
        name: ByteBuf::from(fob.name().as_bytes().to_vec()),
        encoded_private_key: ByteBuf::from(fob.private_key().to_der()?),
        encoded_public_key: ByteBuf::from(fob.public_key().to_der()?),
        validation_token: ByteBuf::from(fob.validation_token().as_bytes().to_vec()),
    };

    let mut bytes = Vec::new();
    ciborium::ser::into_writer(&record, &mut bytes).map_err(Into::<EncodeError>::into)?;
    Ok(bytes)
}

/// Parses a fob of the requested tag, rejecting anything incoherent.
///
/// The validation token is not checked against a parent public key here;
/// that requires out-of-band possession of the parent fob and is the
/// caller's responsibility (see [`Fob::verify_signed_by`]).
pub fn decode_fob(expected: Tag, bytes: &[u8], rng: &Rng) -> Result<Fob, FobError> {
    let record =
        ciborium::from_reader::<FobRecord, _>(bytes).map_err(Into::<DecodeError>::into)?;

    let found = Tag::from_value(record.tag).ok_or(FobError::UnknownTag(record.tag))?;
    if found != expected {
        return Err(FobError::TagMismatch { expected, found });
    }

    let name = Name::try_from(record.name.as_slice())?;
    let private_key = PrivateKey::from_der(&record.encoded_private_key)?;
    let public_key = PublicKey::from_der(&record.encoded_public_key)?;
    let validation_token = Signature::from(record.validation_token.into_vec());

    let fob = Fob::from_parts(found, public_key, private_key, validation_token, name);
    fob.validate(rng)?;
    Ok(fob)
}

/// Serializes a sequence of Pmid fobs, preserving order.
pub fn encode_pmid_list(pmids: &[Fob]) -> Result<Vec<u8>, EncodeError> {
    let entries = pmids
        .iter()
        .map(|fob| {
            if fob.tag() != Tag::Pmid {
                return Err(EncodeError::UnexpectedTag {
                    expected: Tag::Pmid,
                    found: fob.tag(),
                });
            }
            Ok(PmidEntry {
                pmid: ByteBuf::from(encode_fob(fob)?),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut bytes = Vec::new();
    ciborium::ser::into_writer(&PmidListRecord { pmids: entries }, &mut bytes)
        .map_err(Into::<EncodeError>::into)?;
    Ok(bytes)
}

pub fn decode_pmid_list(bytes: &[u8], rng: &Rng) -> Result<Vec<Fob>, FobError> {
    let record =
        ciborium::from_reader::<PmidListRecord, _>(bytes).map_err(Into::<DecodeError>::into)?;
    record
        .pmids
        .iter()
        .map(|entry| decode_fob(Tag::Pmid, &entry.pmid, rng))
        .collect()
}

/// Serializes Anmaid-to-Pmid key chains, preserving order.
///
/// Private keys of every chain member are included; this layout exists for
/// development tooling only.
pub fn encode_key_chain_list(keychains: &[KeyChain]) -> Result<Vec<u8>, EncodeError> {
    let records = keychains
        .iter()
        .map(|keychain| {
            Ok(KeyChainRecord {
                anmaid: ByteBuf::from(encode_fob(&keychain.anmaid)?),
                maid: ByteBuf::from(encode_fob(&keychain.maid)?),
                pmid: ByteBuf::from(encode_fob(&keychain.pmid)?),
            })
        })
        .collect::<Result<Vec<_>, EncodeError>>()?;

    let mut bytes = Vec::new();
    ciborium::ser::into_writer(&KeyChainListRecord { keychains: records }, &mut bytes)
        .map_err(Into::<EncodeError>::into)?;
    Ok(bytes)
}

/// Parses key chains. The signing chain between the three members is not
/// re-verified here; see [`KeyChain::verify`].
pub fn decode_key_chain_list(bytes: &[u8], rng: &Rng) -> Result<Vec<KeyChain>, FobError> {
    let record =
        ciborium::from_reader::<KeyChainListRecord, _>(bytes).map_err(Into::<DecodeError>::into)?;
    record
        .keychains
        .iter()
        .map(|entry| {
            Ok(KeyChain {
                anmaid: decode_fob(Tag::Anmaid, &entry.anmaid, rng)?,
                maid: decode_fob(Tag::Maid, &entry.maid, rng)?,
                pmid: decode_fob(Tag::Pmid, &entry.pmid, rng)?,
            })
        })
        .collect()
}

/// Serializes a complete key ring: the six account fobs in fixed order plus
/// any selectable public identities.
pub fn encode_key_ring(key_ring: &KeyRing) -> Result<Vec<u8>, EncodeError> {
    let fobs = key_ring
        .account_fobs()
        .into_iter()
        .map(|fob| Ok(ByteBuf::from(encode_fob(fob)?)))
        .collect::<Result<Vec<_>, EncodeError>>()?;

    let public_identities = key_ring
        .identities()
        .iter()
        .map(|identity| {
            Ok(PublicIdentityRecord {
                public_id: ByteBuf::from(identity.public_id().to_vec()),
                anmpid: ByteBuf::from(encode_fob(identity.anmpid())?),
                mpid: ByteBuf::from(encode_fob(identity.mpid())?),
            })
        })
        .collect::<Result<Vec<_>, EncodeError>>()?;

    let record = KeyRingRecord {
        fobs,
        public_identities,
    };
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(&record, &mut bytes).map_err(Into::<EncodeError>::into)?;
    Ok(bytes)
}

pub fn decode_key_ring(bytes: &[u8], rng: &Rng) -> Result<KeyRing, KeyRingError> {
    let record = ciborium::from_reader::<KeyRingRecord, _>(bytes)
        .map_err(|err| FobError::from(DecodeError::from(err)))?;

    if record.fobs.len() != KEY_RING_TAGS.len() {
        return Err(KeyRingError::WrongFobCount {
            expected: KEY_RING_TAGS.len(),
            found: record.fobs.len(),
        });
    }

    let mut fobs = Vec::with_capacity(KEY_RING_TAGS.len());
    for (tag, bytes) in KEY_RING_TAGS.iter().zip(&record.fobs) {
        fobs.push(decode_fob(*tag, bytes, rng)?);
    }
    // Popping from the back keeps the fixed order without cloning.
    let pmid = fobs.pop().expect("six decoded fobs");
    let maid = fobs.pop().expect("six decoded fobs");
    let anmaid = fobs.pop().expect("six decoded fobs");
    let antmid = fobs.pop().expect("six decoded fobs");
    let ansmid = fobs.pop().expect("six decoded fobs");
    let anmid = fobs.pop().expect("six decoded fobs");

    let identities = record
        .public_identities
        .iter()
        .map(|entry| {
            Ok(PublicIdentity::from_parts(
                entry.public_id.to_vec(),
                decode_fob(Tag::Anmpid, &entry.anmpid, rng)?,
                decode_fob(Tag::Mpid, &entry.mpid, rng)?,
            ))
        })
        .collect::<Result<Vec<_>, FobError>>()?;

    Ok(KeyRing::from_parts(
        anmid, ansmid, antmid, anmaid, maid, pmid, identities,
    ))
}

#[derive(Debug, Error)]
pub enum EncodeError {
    /// An error occurred while writing bytes.
    #[error("an error occurred while writing bytes: {0}")]
    Io(std::io::Error),

    /// An error indicating a value that cannot be serialized.
    #[error("an error occurred while serializing value: {0}")]
    Value(String),

    /// A collection encoding was handed a fob of the wrong tag.
    #[error("expected a {expected:?} fob, found {found:?}")]
    UnexpectedTag { expected: Tag, found: Tag },

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl From<SerializeError<std::io::Error>> for EncodeError {
    fn from(value: SerializeError<std::io::Error>) -> Self {
        match value {
            SerializeError::Io(err) => EncodeError::Io(err),
            SerializeError::Value(err) => EncodeError::Value(err),
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    /// An error occurred while reading bytes.
    #[error("an error occurred while reading bytes: {0}")]
    Io(std::io::Error),

    /// An error occurred while parsing bytes.
    ///
    /// Contains the offset into the stream where the syntax error occurred.
    #[error("an error occurred while parsing bytes at position {0}")]
    Syntax(usize),

    /// An error occurred while processing a parsed value.
    #[error("an error occurred while processing a parsed value at position {0:?}: {1}")]
    Semantic(Option<usize>, String),

    /// The input caused serde to recurse too much.
    #[error("recursion limit exceeded while decoding")]
    RecursionLimitExceeded,
}

impl From<DeserializeError<std::io::Error>> for DecodeError {
    fn from(value: DeserializeError<std::io::Error>) -> Self {
        match value {
            DeserializeError::Io(err) => DecodeError::Io(err),
            DeserializeError::Syntax(offset) => DecodeError::Syntax(offset),
            DeserializeError::Semantic(offset, description) => {
                DecodeError::Semantic(offset, description)
            }
            DeserializeError::RecursionLimitExceeded => DecodeError::RecursionLimitExceeded,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_bytes::ByteBuf;

    use crate::crypto::Rng;
    use crate::fob::{Fob, FobError, Tag};
    use crate::keyring::KeyChain;

    use super::{
        decode_fob, decode_key_chain_list, decode_pmid_list, encode_fob, encode_key_chain_list,
        encode_pmid_list, EncodeError, FobRecord,
    };

    #[test]
    fn fob_round_trip_and_rejections() {
        let rng = Rng::from_seed([1; 32]);
        let anmaid = Fob::new_root(Tag::Anmaid, &rng).unwrap();

        let bytes = encode_fob(&anmaid).unwrap();
        let decoded = decode_fob(Tag::Anmaid, &bytes, &rng).unwrap();
        assert_eq!(anmaid, decoded);

        // Same bytes under a different requested tag.
        assert!(matches!(
            decode_fob(Tag::Anmid, &bytes, &rng),
            Err(FobError::TagMismatch {
                expected: Tag::Anmid,
                found: Tag::Anmaid,
            })
        ));

        // Not CBOR at all.
        assert!(matches!(
            decode_fob(Tag::Anmaid, b"junk", &rng),
            Err(FobError::Malformed(_))
        ));

        // A bit-flipped validation token no longer matches the name.
        let mut token = anmaid.validation_token().as_bytes().to_vec();
        token[0] ^= 0x01;
        let tampered = Fob::from_parts(
            Tag::Anmaid,
            anmaid.public_key().clone(),
            anmaid.private_key().clone(),
            token.into(),
            *anmaid.name(),
        );
        let bytes = encode_fob(&tampered).unwrap();
        assert!(matches!(
            decode_fob(Tag::Anmaid, &bytes, &rng),
            Err(FobError::NameMismatch)
        ));
    }

    #[test]
    fn unknown_tag_is_rejected_before_key_material() {
        let rng = Rng::default();
        let record = FobRecord {
            tag: 99,
            name: ByteBuf::from(vec![0u8; 64]),
            encoded_private_key: ByteBuf::from(vec![]),
            encoded_public_key: ByteBuf::from(vec![]),
            validation_token: ByteBuf::from(vec![]),
        };
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(&record, &mut bytes).unwrap();

        assert!(matches!(
            decode_fob(Tag::Pmid, &bytes, &rng),
            Err(FobError::UnknownTag(99))
        ));
    }

    #[test]
    fn mismatched_keypair_fails_probe() {
        let rng = Rng::from_seed([2; 32]);
        let a = Fob::new_root(Tag::Antmid, &rng).unwrap();
        let b = Fob::new_root(Tag::Antmid, &rng).unwrap();

        // Public half from `a`, private half from `b`; the name still
        // commits to `a`'s public key, so only the probe can catch this.
        let franken = Fob::from_parts(
            Tag::Antmid,
            a.public_key().clone(),
            b.private_key().clone(),
            a.validation_token().clone(),
            *a.name(),
        );
        let bytes = encode_fob(&franken).unwrap();
        assert!(matches!(
            decode_fob(Tag::Antmid, &bytes, &rng),
            Err(FobError::KeyPairMismatch)
        ));
    }

    #[test]
    fn mpid_round_trip() {
        let rng = Rng::from_seed([3; 32]);
        let anmpid = Fob::new_root(Tag::Anmpid, &rng).unwrap();
        let mpid = Fob::new_mpid(b"alice@example", &anmpid, &rng).unwrap();

        let bytes = encode_fob(&mpid).unwrap();
        assert_eq!(mpid, decode_fob(Tag::Mpid, &bytes, &rng).unwrap());
    }

    #[test]
    fn pmid_list_preserves_order() {
        let rng = Rng::from_seed([4; 32]);
        let chain = KeyChain::new(&rng).unwrap();
        let other_pmid = Fob::new_signed(Tag::Pmid, &chain.maid, &rng).unwrap();

        let pmids = vec![chain.pmid.clone(), other_pmid];
        let bytes = encode_pmid_list(&pmids).unwrap();
        assert_eq!(pmids, decode_pmid_list(&bytes, &rng).unwrap());

        assert!(matches!(
            encode_pmid_list(&[chain.maid.clone()]),
            Err(EncodeError::UnexpectedTag {
                expected: Tag::Pmid,
                found: Tag::Maid,
            })
        ));
    }

    #[test]
    fn key_chain_list_round_trip() {
        let rng = Rng::from_seed([5; 32]);
        let chain = KeyChain::new(&rng).unwrap();
        assert!(chain.verify());

        let bytes = encode_key_chain_list(std::slice::from_ref(&chain)).unwrap();
        let decoded = decode_key_chain_list(&bytes, &rng).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0], chain);
        assert!(decoded[0].verify());
    }
}
