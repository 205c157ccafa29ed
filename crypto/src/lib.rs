//! Cryptographic primitives for fedchain.
//!
//! - **Ed25519** for signing and verifying election messages (deterministic
//!   signatures, which the election state machine relies on for replay)
//! - **Blake2b** for signing digests and state fingerprints
//! - **SHA-256** for the audit-server volunteer priority order

pub mod hash;
pub mod keys;
pub mod sign;

pub use hash::{blake2b_256, blake2b_256_multi, sha256};
pub use keys::{
    derive_keypair, generate_keypair, keypair_from_private, keypair_from_seed, public_from_private,
};
pub use sign::{sign_message, verify_signature};
