// SPDX-License-Identifier: MIT OR Apache-2.0

//! Self-authenticating identity fobs and login credential packets for a
//! peer-to-peer storage fabric.
//!
//! A [`Fob`] is a typed asymmetric identity record with a signed lineage
//! and a content-addressed [`Name`]. The credential packets ([`MidPacket`],
//! [`TmidPacket`]) derive symmetric keys from user secrets so that session
//! state can be recovered from any node given only a username, numeric pin
//! and password.
pub mod cbor;
pub mod crypto;
pub mod fob;
pub mod keyring;
pub mod name;
pub mod packet;

pub use cbor::{DecodeError, EncodeError};
pub use crypto::{CryptoError, Rng, RngError, Secret, SecretBytes};
pub use fob::{Fob, FobError, Role, Tag};
pub use keyring::{KeyChain, KeyRing, KeyRingError, PublicIdentity};
pub use name::{Name, NameError};
pub use packet::{MidPacket, PacketKind, PinError, TmidPacket};
