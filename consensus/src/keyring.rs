//! Signing keys for a set of identities.
//!
//! A production node only holds its own key. Simulations and the search
//! harness hold every authority's key so they can sign seed volunteers and
//! peer votes.

use std::collections::BTreeMap;

use fedchain_crypto::{derive_keypair, keypair_from_private};
use fedchain_types::{IdentityChainId, KeyPair, PrivateKey, PublicKey};

/// Domain tag for deterministic simulation keys.
pub const SIMULATION_KEY_DOMAIN: &[u8] = b"fedchain/simulation-key";

#[derive(Default)]
pub struct Keyring {
    keys: BTreeMap<IdentityChainId, KeyPair>,
}

impl Keyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministic keys for `ids`, derived from each chain ID.
    pub fn simulated(ids: impl IntoIterator<Item = IdentityChainId>) -> Self {
        let keys = ids
            .into_iter()
            .map(|id| (id, derive_keypair(SIMULATION_KEY_DOMAIN, id.as_bytes())))
            .collect();
        Self { keys }
    }

    pub fn insert(&mut self, identity: IdentityChainId, keypair: KeyPair) {
        self.keys.insert(identity, keypair);
    }

    pub fn get(&self, identity: &IdentityChainId) -> Option<&KeyPair> {
        self.keys.get(identity)
    }

    pub fn public(&self, identity: &IdentityChainId) -> Option<PublicKey> {
        self.keys.get(identity).map(|kp| kp.public)
    }

    pub fn private(&self, identity: &IdentityChainId) -> Option<&PrivateKey> {
        self.keys.get(identity).map(|kp| &kp.private)
    }

    /// An owned copy of an identity's private key.
    pub fn private_copy(&self, identity: &IdentityChainId) -> Option<PrivateKey> {
        self.private(identity).map(|k| PrivateKey(k.0))
    }

    /// A keyring holding only `identity`'s key.
    pub fn only(&self, identity: &IdentityChainId) -> Self {
        let mut ring = Self::new();
        if let Some(private) = self.private_copy(identity) {
            ring.insert(*identity, keypair_from_private(private));
        }
        ring
    }

    pub fn identities(&self) -> impl Iterator<Item = &IdentityChainId> {
        self.keys.keys()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_keys_are_stable() {
        let ids: Vec<_> = (0..3).map(IdentityChainId::from_u32).collect();
        let a = Keyring::simulated(ids.clone());
        let b = Keyring::simulated(ids.clone());
        for id in &ids {
            assert_eq!(a.public(id), b.public(id));
        }
        assert_ne!(a.public(&ids[0]), a.public(&ids[1]));
    }

    #[test]
    fn only_keeps_a_single_identity() {
        let ids: Vec<_> = (0..3).map(IdentityChainId::from_u32).collect();
        let ring = Keyring::simulated(ids.clone());
        let local = ring.only(&ids[1]);
        assert_eq!(local.len(), 1);
        assert_eq!(local.public(&ids[1]), ring.public(&ids[1]));
        assert!(local.get(&ids[0]).is_none());
    }
}
