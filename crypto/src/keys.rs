//! Ed25519 key pairs for server identities.

use ed25519_dalek::SigningKey;
use fedchain_types::{KeyPair, PrivateKey, PublicKey};
use rand::rngs::OsRng;

use crate::hash::blake2b_256_multi;

fn pair(signing: SigningKey) -> KeyPair {
    KeyPair {
        public: PublicKey(signing.verifying_key().to_bytes()),
        private: PrivateKey(signing.to_bytes()),
    }
}

/// Fresh key pair from the OS random source.
pub fn generate_keypair() -> KeyPair {
    pair(SigningKey::generate(&mut OsRng))
}

pub fn public_from_private(private: &PrivateKey) -> PublicKey {
    PublicKey(SigningKey::from_bytes(&private.0).verifying_key().to_bytes())
}

/// Rebuild the pair around an existing secret. Takes ownership so the secret
/// is not left behind in the caller.
pub fn keypair_from_private(private: PrivateKey) -> KeyPair {
    KeyPair {
        public: public_from_private(&private),
        private,
    }
}

/// The secret scalar is the seed itself.
pub fn keypair_from_seed(seed: &[u8; 32]) -> KeyPair {
    pair(SigningKey::from_bytes(seed))
}

/// Deterministic key pair for `material` under `domain`.
///
/// The seed is `blake2b_256(domain || material)`. Simulated rosters key every
/// identity this way; any process can rebuild the same keyring.
pub fn derive_keypair(domain: &[u8], material: &[u8]) -> KeyPair {
    keypair_from_seed(&blake2b_256_multi(&[domain, material]))
}
