//! Immutable view of the authority set at one height.

use std::collections::BTreeMap;
use std::sync::Arc;

use fedchain_crypto::verify_signature;
use fedchain_types::{DbHeight, IdentityChainId, PublicKey, Signature, SlotIndex};

use crate::authority::{AuthorityStatus, Role};
use crate::error::RegistryError;
use crate::order;

#[derive(Clone, Debug, PartialEq, Eq)]
struct Member {
    status: AuthorityStatus,
    keys: Vec<PublicKey>,
}

/// The authorities as they stood at one directory-block height.
///
/// Built by [`AuthorityRegistry::snapshot`](crate::AuthorityRegistry::snapshot)
/// and shared behind an `Arc`; election contexts and message validators read
/// from it without touching the live registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthoritySet {
    height: DbHeight,
    members: BTreeMap<IdentityChainId, Member>,
    federated: Vec<IdentityChainId>,
    audit: Vec<IdentityChainId>,
}

impl AuthoritySet {
    pub(crate) fn build(
        height: DbHeight,
        entries: impl IntoIterator<Item = (IdentityChainId, AuthorityStatus, Vec<PublicKey>)>,
    ) -> Self {
        let mut members: BTreeMap<IdentityChainId, Member> = BTreeMap::new();
        for (identity, status, keys) in entries {
            // A re-added identity may appear twice (retired and live record);
            // the active record wins.
            match members.get(&identity) {
                Some(existing) if existing.status.is_active() => continue,
                _ => {
                    members.insert(identity, Member { status, keys });
                }
            }
        }
        let with_status = |wanted: AuthorityStatus| {
            members
                .iter()
                .filter(|(_, m)| m.status == wanted)
                .map(|(id, _)| *id)
                .collect::<Vec<_>>()
        };
        let federated = with_status(AuthorityStatus::Federated);
        let audit = with_status(AuthorityStatus::Audit);
        Self {
            height,
            members,
            federated,
            audit,
        }
    }

    /// Convenience constructor for tests and simulations: a set of federated
    /// and audit servers, each with a single signing key.
    pub fn from_roster(
        height: DbHeight,
        federated: &[(IdentityChainId, PublicKey)],
        audit: &[(IdentityChainId, PublicKey)],
    ) -> Arc<Self> {
        let entries = federated
            .iter()
            .map(|(id, key)| (*id, AuthorityStatus::Federated, vec![*key]))
            .chain(
                audit
                    .iter()
                    .map(|(id, key)| (*id, AuthorityStatus::Audit, vec![*key])),
            );
        Arc::new(Self::build(height, entries))
    }

    pub fn height(&self) -> DbHeight {
        self.height
    }

    /// Number of authorities with an active status.
    pub fn active_count(&self) -> usize {
        self.members.values().filter(|m| m.status.is_active()).count()
    }

    /// Strict majority of the active authorities: `floor(active / 2) + 1`.
    pub fn quorum_size(&self) -> usize {
        self.active_count() / 2 + 1
    }

    pub fn status(&self, identity: &IdentityChainId) -> AuthorityStatus {
        self.members
            .get(identity)
            .map(|m| m.status)
            .unwrap_or_default()
    }

    pub fn role(&self, identity: &IdentityChainId) -> Option<Role> {
        self.status(identity).role()
    }

    pub fn is_active(&self, identity: &IdentityChainId) -> bool {
        self.status(identity).is_active()
    }

    /// Federated servers in chain-ID order. Position in this list is the
    /// leader slot index.
    pub fn federated(&self) -> &[IdentityChainId] {
        &self.federated
    }

    /// Audit servers in chain-ID order.
    pub fn audit(&self) -> &[IdentityChainId] {
        &self.audit
    }

    pub fn slot_count(&self) -> usize {
        self.federated.len()
    }

    pub fn leader(&self, slot: SlotIndex) -> Option<IdentityChainId> {
        self.federated.get(slot).copied()
    }

    pub fn slot_of(&self, identity: &IdentityChainId) -> Option<SlotIndex> {
        self.federated.iter().position(|id| id == identity)
    }

    /// Every active authority, in chain-ID order.
    pub fn active(&self) -> impl Iterator<Item = IdentityChainId> + '_ {
        self.members
            .iter()
            .filter(|(_, m)| m.status.is_active())
            .map(|(id, _)| *id)
    }

    /// Authenticate `signature` over `payload` as coming from `identity`.
    ///
    /// Accepts the current signing key and any historic key that was valid
    /// at this height. Returns the signer's role.
    pub fn verify(
        &self,
        identity: &IdentityChainId,
        payload: &[u8],
        signature: &Signature,
    ) -> Result<Role, RegistryError> {
        let member = self
            .members
            .get(identity)
            .ok_or(RegistryError::UnknownIdentity(*identity))?;
        let role = member.status.role().ok_or(RegistryError::Inactive {
            identity: *identity,
            height: self.height.as_u32(),
        })?;
        if member.keys.is_empty() {
            return Err(RegistryError::NoSigningKey(*identity));
        }
        if member
            .keys
            .iter()
            .any(|key| verify_signature(payload, signature, key))
        {
            Ok(role)
        } else {
            Err(RegistryError::InvalidSignature(*identity))
        }
    }

    /// Audit servers ordered by volunteer priority for `slot` in `round`.
    pub fn volunteer_order(&self, minute: u8, slot: SlotIndex, round: u32) -> Vec<IdentityChainId> {
        let mut candidates = self.audit.clone();
        order::rank(&mut candidates, self.height, minute, slot, round);
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedchain_crypto::{keypair_from_seed, sign_message};

    fn roster() -> (Arc<AuthoritySet>, Vec<fedchain_types::KeyPair>) {
        let keys: Vec<_> = (0..5u8).map(|i| keypair_from_seed(&[i + 1; 32])).collect();
        let feds: Vec<_> = (0..3)
            .map(|i| (IdentityChainId::from_u32(i), keys[i as usize].public))
            .collect();
        let audits: Vec<_> = (3..5)
            .map(|i| (IdentityChainId::from_u32(i), keys[i as usize].public))
            .collect();
        (
            AuthoritySet::from_roster(DbHeight::new(1), &feds, &audits),
            keys,
        )
    }

    #[test]
    fn quorum_of_five_is_three() {
        let (set, _) = roster();
        assert_eq!(set.active_count(), 5);
        assert_eq!(set.quorum_size(), 3);
        assert_eq!(set.slot_count(), 3);
        assert_eq!(set.slot_of(&IdentityChainId::from_u32(2)), Some(2));
        assert_eq!(set.leader(3), None);
    }

    #[test]
    fn verify_returns_role() {
        let (set, keys) = roster();
        let sig = sign_message(b"payload", &keys[4].private);
        assert_eq!(
            set.verify(&IdentityChainId::from_u32(4), b"payload", &sig),
            Ok(Role::Audit)
        );
        assert_eq!(
            set.verify(&IdentityChainId::from_u32(3), b"payload", &sig),
            Err(RegistryError::InvalidSignature(IdentityChainId::from_u32(3)))
        );
        assert_eq!(
            set.verify(&IdentityChainId::from_u32(9), b"payload", &sig),
            Err(RegistryError::UnknownIdentity(IdentityChainId::from_u32(9)))
        );
    }

    #[test]
    fn volunteer_order_is_a_permutation_of_audits() {
        let (set, _) = roster();
        let mut order = set.volunteer_order(0, 1, 0);
        order.sort();
        assert_eq!(order, set.audit().to_vec());
    }
}
