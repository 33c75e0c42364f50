// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end checks over the fob family and its codec.
use ciborium::value::Value;

use keyfob::cbor::{decode_fob, encode_fob};
use keyfob::{Fob, FobError, Name, Rng, Tag};

/// Re-encodes a fob encoding after applying `edit` to its CBOR map.
fn tamper(bytes: &[u8], edit: impl FnOnce(&mut Vec<(Value, Value)>)) -> Vec<u8> {
    let mut value: Value = ciborium::from_reader(bytes).unwrap();
    if let Value::Map(entries) = &mut value {
        edit(entries);
    }
    let mut out = Vec::new();
    ciborium::ser::into_writer(&value, &mut out).unwrap();
    out
}

#[test]
fn account_chain_round_trips_and_verifies() {
    let rng = Rng::default();
    let anmaid = Fob::new_root(Tag::Anmaid, &rng).unwrap();
    let maid = Fob::new_signed(Tag::Maid, &anmaid, &rng).unwrap();
    let pmid = Fob::new_signed(Tag::Pmid, &maid, &rng).unwrap();

    for (tag, fob) in [
        (Tag::Anmaid, &anmaid),
        (Tag::Maid, &maid),
        (Tag::Pmid, &pmid),
    ] {
        let bytes = encode_fob(fob).unwrap();
        let decoded = decode_fob(tag, &bytes, &rng).unwrap();
        assert_eq!(fob, &decoded);
    }

    // The signed lineage holds and is checkable by whoever has the parent.
    assert!(maid.verify_signed_by(anmaid.public_key()));
    assert!(pmid.verify_signed_by(maid.public_key()));
    assert!(!pmid.verify_signed_by(anmaid.public_key()));

    // Names commit to public key and validation token.
    let public_der = pmid.public_key().to_der().unwrap();
    assert_eq!(
        pmid.name(),
        &Name::from_parts(&[&public_der, pmid.validation_token().as_bytes()])
    );
}

#[test]
fn mpid_is_named_after_its_chosen_string() {
    let rng = Rng::default();
    let anmpid = Fob::new_root(Tag::Anmpid, &rng).unwrap();
    let mpid = Fob::new_mpid(b"alice@example", &anmpid, &rng).unwrap();

    assert_eq!(mpid.name(), &Name::new(b"alice@example"));

    let public_der = mpid.public_key().to_der().unwrap();
    assert_ne!(
        mpid.name(),
        &Name::from_parts(&[&public_der, mpid.validation_token().as_bytes()])
    );

    let bytes = encode_fob(&mpid).unwrap();
    assert_eq!(mpid, decode_fob(Tag::Mpid, &bytes, &rng).unwrap());
}

#[test]
fn tampered_encodings_are_rejected() {
    let rng = Rng::default();
    let anmaid = Fob::new_root(Tag::Anmaid, &rng).unwrap();
    let maid = Fob::new_signed(Tag::Maid, &anmaid, &rng).unwrap();
    let pmid = Fob::new_signed(Tag::Pmid, &maid, &rng).unwrap();
    let bytes = encode_fob(&pmid).unwrap();

    // Tag field rewritten from Pmid to Maid.
    let retagged = tamper(&bytes, |entries| {
        for (key, value) in entries.iter_mut() {
            if matches!(key, Value::Text(field) if field == "type") {
                *value = Value::from(u64::from(Tag::Maid.value()));
            }
        }
    });
    assert!(matches!(
        decode_fob(Tag::Pmid, &retagged, &rng),
        Err(FobError::TagMismatch {
            expected: Tag::Pmid,
            found: Tag::Maid,
        })
    ));

    // A bit flip in the validation token breaks the name commitment.
    let flipped = tamper(&bytes, |entries| {
        for (key, value) in entries.iter_mut() {
            if matches!(key, Value::Text(field) if field == "validation_token") {
                if let Value::Bytes(token) = value {
                    token[0] ^= 0x01;
                }
            }
        }
    });
    assert!(matches!(
        decode_fob(Tag::Pmid, &flipped, &rng),
        Err(FobError::NameMismatch)
    ));

    // A field dropped altogether is a parse error.
    let missing = tamper(&bytes, |entries| {
        entries.retain(|(key, _)| !matches!(key, Value::Text(field) if field == "name"));
    });
    assert!(matches!(
        decode_fob(Tag::Pmid, &missing, &rng),
        Err(FobError::Malformed(_))
    ));
}
