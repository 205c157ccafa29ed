//! Fundamental types for fedchain.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! identity chain IDs, signing keys, directory-block heights, minutes and leader slots.

pub mod error;
pub mod hash;
pub mod identity;
pub mod keys;
pub mod location;
pub mod network;

pub use error::FedchainError;
pub use hash::Digest256;
pub use identity::IdentityChainId;
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use location::{DbHeight, MinuteLocation, SlotIndex, MINUTES_PER_BLOCK};
pub use network::NetworkId;
