// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed asymmetric identity records ("fobs").
//!
//! A fob binds a keypair to a role [`Tag`] through a validation token: a
//! signature over the encoded public key, made either by the fob's own
//! private key (self-signing roots) or by its parent's (leaf identities).
//! Except for [`Tag::Mpid`], whose name comes from a user-chosen string,
//! a fob's [`Name`] commits to the public key and the validation token, so
//! names are tamper-evident.
use std::fmt;

use thiserror::Error;

use crate::cbor::DecodeError;
use crate::crypto::asymm::{self, PrivateKey, PublicKey, Signature};
use crate::crypto::{CryptoError, Rng};
use crate::name::{Name, NameError};

/// Length of the random plaintext used to probe a decoded keypair.
const PROBE_LEN: usize = 64;

/// The role of a fob. The integer value of each tag is stable and
/// authoritative for codec tag matching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Root signer for Mid packets.
    Anmid,
    /// Root signer for Smid packets.
    Ansmid,
    /// Root signer for Tmid packets.
    Antmid,
    /// Root signer of the account identity chain.
    Anmaid,
    /// Account identity, signed by Anmaid.
    Maid,
    /// Storage node identity, signed by Maid.
    Pmid,
    /// Root signer of a public messaging identity.
    Anmpid,
    /// Public messaging identity, signed by Anmpid; named after a
    /// user-chosen string.
    Mpid,
}

/// Signing relationship of a tag, as data rather than inheritance. All fob
/// construction logic reads from this table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// The validation token is a self-signature.
    Root,
    /// The validation token is made by a fob of the given tag.
    SignedBy(Tag),
}

impl Tag {
    /// Stable wire value of this tag. Values 7 to 10 belong to the
    /// credential packet kinds and are kept disjoint.
    pub const fn value(self) -> u32 {
        match self {
            Tag::Anmid => 1,
            Tag::Ansmid => 2,
            Tag::Antmid => 3,
            Tag::Anmaid => 4,
            Tag::Maid => 5,
            Tag::Pmid => 6,
            Tag::Anmpid => 11,
            Tag::Mpid => 12,
        }
    }

    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            1 => Some(Tag::Anmid),
            2 => Some(Tag::Ansmid),
            3 => Some(Tag::Antmid),
            4 => Some(Tag::Anmaid),
            5 => Some(Tag::Maid),
            6 => Some(Tag::Pmid),
            11 => Some(Tag::Anmpid),
            12 => Some(Tag::Mpid),
            _ => None,
        }
    }

    pub const fn role(self) -> Role {
        match self {
            Tag::Anmid | Tag::Ansmid | Tag::Antmid | Tag::Anmaid | Tag::Anmpid => Role::Root,
            Tag::Maid => Role::SignedBy(Tag::Anmaid),
            Tag::Pmid => Role::SignedBy(Tag::Maid),
            Tag::Mpid => Role::SignedBy(Tag::Anmpid),
        }
    }

    /// True for tags whose name derives from a user-chosen string instead of
    /// the public key.
    pub const fn names_from_chosen_string(self) -> bool {
        matches!(self, Tag::Mpid)
    }
}

/// A self-contained identity record: keypair, validation token and
/// content-addressed name.
///
/// Immutable after construction; a failed decode produces an error, never a
/// half-initialised fob.
#[derive(Clone, PartialEq, Eq)]
pub struct Fob {
    tag: Tag,
    public_key: PublicKey,
    private_key: PrivateKey,
    validation_token: Signature,
    name: Name,
}

impl Fob {
    /// Mints a self-signing root fob.
    pub fn new_root(tag: Tag, rng: &Rng) -> Result<Self, FobError> {
        if tag.role() != Role::Root {
            return Err(FobError::NotSelfSigning(tag));
        }

        let (public_key, private_key) = asymm::generate_key_pair(rng)?;
        let public_der = public_key.to_der()?;
        let validation_token = private_key.sign(&public_der)?;
        let name = Name::from_parts(&[&public_der, validation_token.as_bytes()]);

        Ok(Self {
            tag,
            public_key,
            private_key,
            validation_token,
            name,
        })
    }

    /// Mints a fob whose validation token is made by its parent.
    pub fn new_signed(tag: Tag, parent: &Fob, rng: &Rng) -> Result<Self, FobError> {
        let Role::SignedBy(signer) = tag.role() else {
            return Err(FobError::SelfSigning(tag));
        };
        if tag.names_from_chosen_string() {
            return Err(FobError::ChosenNameRequired(tag));
        }
        if parent.tag != signer {
            return Err(FobError::WrongSigner {
                tag,
                signer: parent.tag,
            });
        }

        let (public_key, private_key) = asymm::generate_key_pair(rng)?;
        let public_der = public_key.to_der()?;
        let validation_token = parent.private_key.sign(&public_der)?;
        let name = Name::from_parts(&[&public_der, validation_token.as_bytes()]);

        Ok(Self {
            tag,
            public_key,
            private_key,
            validation_token,
            name,
        })
    }

    /// Mints an Mpid fob, the human-addressable messaging identity. Its name
    /// commits to the chosen name rather than the keypair.
    pub fn new_mpid(chosen_name: &[u8], parent: &Fob, rng: &Rng) -> Result<Self, FobError> {
        if chosen_name.is_empty() {
            return Err(FobError::EmptyChosenName);
        }
        if parent.tag != Tag::Anmpid {
            return Err(FobError::WrongSigner {
                tag: Tag::Mpid,
                signer: parent.tag,
            });
        }

        let (public_key, private_key) = asymm::generate_key_pair(rng)?;
        let public_der = public_key.to_der()?;
        let validation_token = parent.private_key.sign(&public_der)?;
        let name = Name::new(chosen_name);

        Ok(Self {
            tag: Tag::Mpid,
            public_key,
            private_key,
            validation_token,
            name,
        })
    }

    pub(crate) fn from_parts(
        tag: Tag,
        public_key: PublicKey,
        private_key: PrivateKey,
        validation_token: Signature,
        name: Name,
    ) -> Self {
        Self {
            tag,
            public_key,
            private_key,
            validation_token,
            name,
        }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    pub fn validation_token(&self) -> &Signature {
        &self.validation_token
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Checks the validation token against a claimed signer.
    ///
    /// Decoding only guarantees internal coherence; the signed lineage can
    /// be established by whoever holds the parent fob.
    pub fn verify_signed_by(&self, signer: &PublicKey) -> bool {
        match self.public_key.to_der() {
            Ok(public_der) => signer.verify(&public_der, &self.validation_token),
            Err(_) => false,
        }
    }

    /// Internal coherence checks run on every decode.
    ///
    /// 1. For every tag except Mpid the name must commit to the public key
    ///    and validation token.
    /// 2. A random plaintext must survive an encrypt/decrypt round trip, so
    ///    the two halves of the keypair actually belong together.
    pub(crate) fn validate(&self, rng: &Rng) -> Result<(), FobError> {
        if !self.tag.names_from_chosen_string() {
            let public_der = self.public_key.to_der()?;
            let expected = Name::from_parts(&[&public_der, self.validation_token.as_bytes()]);
            if expected != self.name {
                return Err(FobError::NameMismatch);
            }
        }

        let probe: [u8; PROBE_LEN] = rng.random_array().map_err(CryptoError::from)?;
        let ciphertext = self.public_key.encrypt(rng, &probe)?;
        let recovered = self
            .private_key
            .decrypt(&ciphertext)
            .map_err(|_| FobError::KeyPairMismatch)?;
        if recovered != probe {
            return Err(FobError::KeyPairMismatch);
        }

        Ok(())
    }
}

impl fmt::Debug for Fob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fob")
            .field("tag", &self.tag)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Error types for minting and decoding fobs.
#[derive(Debug, Error)]
pub enum FobError {
    /// The fob encoding itself could not be parsed.
    #[error("malformed fob encoding: {0}")]
    Malformed(#[from] DecodeError),

    /// The encoding carries a tag value outside the known set.
    #[error("unknown tag value {0}")]
    UnknownTag(u32),

    /// The encoding carries a different tag than the caller requested.
    #[error("fob is tagged {found:?}, expected {expected:?}")]
    TagMismatch { expected: Tag, found: Tag },

    /// The name does not commit to the public key and validation token.
    #[error("name does not match public key and validation token")]
    NameMismatch,

    /// The public and private halves do not form one keypair.
    #[error("keypair failed the encrypt/decrypt probe")]
    KeyPairMismatch,

    /// The name field has the wrong size.
    #[error(transparent)]
    Name(#[from] NameError),

    /// Roots cannot be minted with a parent.
    #[error("{0:?} fobs are self-signing")]
    SelfSigning(Tag),

    /// Leaves cannot be minted without a parent.
    #[error("{0:?} fobs are not self-signing")]
    NotSelfSigning(Tag),

    /// The offered parent does not sign fobs of this tag.
    #[error("{signer:?} fobs do not sign {tag:?} fobs")]
    WrongSigner { tag: Tag, signer: Tag },

    /// The tag derives its name from a chosen string; use the dedicated
    /// constructor.
    #[error("a chosen name is required to mint a {0:?} fob")]
    ChosenNameRequired(Tag),

    /// The chosen name of a human-addressable identity must not be empty.
    #[error("chosen name must not be empty")]
    EmptyChosenName,

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
