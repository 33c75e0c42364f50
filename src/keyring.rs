// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aggregates of related fobs: the full account key ring and the
//! Anmaid-to-Pmid key chain used by storage tooling.
use thiserror::Error;

use crate::crypto::Rng;
use crate::fob::{Fob, FobError, Tag};

/// The three-link signing chain behind a storage node identity.
///
/// `maid` is signed by `anmaid` and `pmid` is signed by `maid`. Minting
/// through [`KeyChain::new`] establishes the chain; decoded chains can be
/// re-checked with [`KeyChain::verify`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyChain {
    pub anmaid: Fob,
    pub maid: Fob,
    pub pmid: Fob,
}

impl KeyChain {
    pub fn new(rng: &Rng) -> Result<Self, FobError> {
        let anmaid = Fob::new_root(Tag::Anmaid, rng)?;
        let maid = Fob::new_signed(Tag::Maid, &anmaid, rng)?;
        let pmid = Fob::new_signed(Tag::Pmid, &maid, rng)?;
        Ok(Self { anmaid, maid, pmid })
    }

    /// Checks both links of the signing chain.
    pub fn verify(&self) -> bool {
        self.maid.verify_signed_by(self.anmaid.public_key())
            && self.pmid.verify_signed_by(self.maid.public_key())
    }
}

/// A human-addressable messaging identity with its root signer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicIdentity {
    public_id: Vec<u8>,
    anmpid: Fob,
    mpid: Fob,
}

impl PublicIdentity {
    pub(crate) fn from_parts(public_id: Vec<u8>, anmpid: Fob, mpid: Fob) -> Self {
        Self {
            public_id,
            anmpid,
            mpid,
        }
    }

    pub fn public_id(&self) -> &[u8] {
        &self.public_id
    }

    pub fn anmpid(&self) -> &Fob {
        &self.anmpid
    }

    pub fn mpid(&self) -> &Fob {
        &self.mpid
    }

    pub fn verify(&self) -> bool {
        self.mpid.verify_signed_by(self.anmpid.public_key())
    }
}

/// Everything a user needs to act in the storage fabric: the six account
/// fobs plus any number of selectable public identities.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyRing {
    anmid: Fob,
    ansmid: Fob,
    antmid: Fob,
    anmaid: Fob,
    maid: Fob,
    pmid: Fob,
    identities: Vec<PublicIdentity>,
}

impl KeyRing {
    /// Mints a complete account: five root fobs and the Maid/Pmid chain.
    pub fn new(rng: &Rng) -> Result<Self, FobError> {
        let anmid = Fob::new_root(Tag::Anmid, rng)?;
        let ansmid = Fob::new_root(Tag::Ansmid, rng)?;
        let antmid = Fob::new_root(Tag::Antmid, rng)?;
        let anmaid = Fob::new_root(Tag::Anmaid, rng)?;
        let maid = Fob::new_signed(Tag::Maid, &anmaid, rng)?;
        let pmid = Fob::new_signed(Tag::Pmid, &maid, rng)?;

        Ok(Self {
            anmid,
            ansmid,
            antmid,
            anmaid,
            maid,
            pmid,
            identities: Vec::new(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        anmid: Fob,
        ansmid: Fob,
        antmid: Fob,
        anmaid: Fob,
        maid: Fob,
        pmid: Fob,
        identities: Vec<PublicIdentity>,
    ) -> Self {
        Self {
            anmid,
            ansmid,
            antmid,
            anmaid,
            maid,
            pmid,
            identities,
        }
    }

    /// Mints and attaches a selectable identity under the chosen public id.
    pub fn add_identity(&mut self, public_id: &[u8], rng: &Rng) -> Result<&PublicIdentity, KeyRingError> {
        if self.identity(public_id).is_some() {
            return Err(KeyRingError::IdentityExists);
        }

        let anmpid = Fob::new_root(Tag::Anmpid, rng)?;
        let mpid = Fob::new_mpid(public_id, &anmpid, rng)?;
        self.identities
            .push(PublicIdentity::from_parts(public_id.to_vec(), anmpid, mpid));
        Ok(self.identities.last().expect("just pushed"))
    }

    pub fn identity(&self, public_id: &[u8]) -> Option<&PublicIdentity> {
        self.identities
            .iter()
            .find(|identity| identity.public_id() == public_id)
    }

    /// Removes a selectable identity; returns whether it was present.
    pub fn remove_identity(&mut self, public_id: &[u8]) -> bool {
        let before = self.identities.len();
        self.identities
            .retain(|identity| identity.public_id() != public_id);
        self.identities.len() != before
    }

    pub fn identities(&self) -> &[PublicIdentity] {
        &self.identities
    }

    /// The six account fobs in their fixed encoding order.
    pub fn account_fobs(&self) -> [&Fob; 6] {
        [
            &self.anmid,
            &self.ansmid,
            &self.antmid,
            &self.anmaid,
            &self.maid,
            &self.pmid,
        ]
    }

    pub fn anmid(&self) -> &Fob {
        &self.anmid
    }

    pub fn ansmid(&self) -> &Fob {
        &self.ansmid
    }

    pub fn antmid(&self) -> &Fob {
        &self.antmid
    }

    pub fn anmaid(&self) -> &Fob {
        &self.anmaid
    }

    pub fn maid(&self) -> &Fob {
        &self.maid
    }

    pub fn pmid(&self) -> &Fob {
        &self.pmid
    }

    /// Checks every signing relationship in the ring: the roots
    /// self-verify, the account chain links up and each selectable identity
    /// is signed by its own root.
    pub fn verify(&self) -> bool {
        let roots = [&self.anmid, &self.ansmid, &self.antmid, &self.anmaid];
        roots
            .iter()
            .all(|root| root.verify_signed_by(root.public_key()))
            && self.maid.verify_signed_by(self.anmaid.public_key())
            && self.pmid.verify_signed_by(self.maid.public_key())
            && self.identities.iter().all(PublicIdentity::verify)
    }
}

#[derive(Debug, Error)]
pub enum KeyRingError {
    /// A selectable identity with this public id is already attached.
    #[error("public identity already exists")]
    IdentityExists,

    /// Key ring encodings carry a fixed number of account fobs.
    #[error("key ring encodings carry exactly {expected} fobs, found {found}")]
    WrongFobCount { expected: usize, found: usize },

    #[error(transparent)]
    Fob(#[from] FobError),
}
