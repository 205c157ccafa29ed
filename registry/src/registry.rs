//! The live authority registry.
//!
//! Authorities live in a generation-tagged slot table with a hash index on
//! the identity chain ID, so lookups are O(1) and a removed authority's index
//! goes stale instead of silently pointing at whoever reuses the slot.
//! Removed authorities are retired, not forgotten: they keep counting toward
//! quorum for heights before their removal.

use std::collections::HashMap;
use std::sync::Arc;

use fedchain_crypto::verify_signature;
use fedchain_types::{DbHeight, IdentityChainId, PublicKey, Signature, SlotIndex};
use tracing::debug;

use crate::authority::{Authority, AuthorityStatus, KeyType, Role};
use crate::error::RegistryError;
use crate::order;
use crate::snapshot::AuthoritySet;

/// Handle to an authority in the registry's slot table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AuthorityIndex {
    slot: u32,
    generation: u32,
}

impl AuthorityIndex {
    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Clone, Debug, Default)]
struct Entry {
    generation: u32,
    authority: Option<Authority>,
}

/// Registry of every known authority.
///
/// Not internally synchronized; the node wraps it in `Arc<RwLock<_>>` and
/// hands readers [`AuthoritySet`] snapshots.
#[derive(Clone, Debug, Default)]
pub struct AuthorityRegistry {
    entries: Vec<Entry>,
    free: Vec<u32>,
    index: HashMap<IdentityChainId, AuthorityIndex>,
    retired: Vec<Authority>,
    height: DbHeight,
}

impl AuthorityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The height new registrations and removals take effect at.
    pub fn height(&self) -> DbHeight {
        self.height
    }

    pub fn set_height(&mut self, height: DbHeight) {
        self.height = height;
    }

    /// Number of live (not removed) authorities.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Register a new identity with status `Pending` at the current height.
    pub fn add(&mut self, identity: IdentityChainId) -> Result<AuthorityIndex, RegistryError> {
        if self.index.contains_key(&identity) {
            return Err(RegistryError::Duplicate(identity));
        }
        let authority = Authority::new(identity, AuthorityStatus::Pending, self.height);
        let index = match self.free.pop() {
            Some(slot) => {
                let entry = &mut self.entries[slot as usize];
                entry.authority = Some(authority);
                AuthorityIndex {
                    slot,
                    generation: entry.generation,
                }
            }
            None => {
                let slot = u32::try_from(self.entries.len()).unwrap_or(u32::MAX);
                self.entries.push(Entry {
                    generation: 0,
                    authority: Some(authority),
                });
                AuthorityIndex {
                    slot,
                    generation: 0,
                }
            }
        };
        self.index.insert(identity, index);
        debug!(identity = ?identity, slot = index.slot, "authority added");
        Ok(index)
    }

    /// Retire an authority at the current height and release its slot.
    ///
    /// The index (and any copy of it) becomes stale. The authority keeps its
    /// status history, so it still counts for heights before the removal.
    pub fn remove(&mut self, index: AuthorityIndex) -> Result<(), RegistryError> {
        let height = self.height;
        let entry = self.entry_mut(index)?;
        let Some(mut authority) = entry.authority.take() else {
            return Err(RegistryError::StaleIndex {
                slot: index.slot,
                generation: index.generation,
            });
        };
        entry.generation = entry.generation.wrapping_add(1);
        authority.set_status(AuthorityStatus::Unassigned, height);
        self.index.remove(&authority.identity);
        self.free.push(index.slot);
        debug!(identity = ?authority.identity, %height, "authority removed");
        self.retired.push(authority);
        Ok(())
    }

    pub fn find(&self, identity: &IdentityChainId) -> Option<AuthorityIndex> {
        self.index.get(identity).copied()
    }

    pub fn get(&self, index: AuthorityIndex) -> Result<&Authority, RegistryError> {
        self.entries
            .get(index.slot as usize)
            .filter(|e| e.generation == index.generation)
            .and_then(|e| e.authority.as_ref())
            .ok_or(RegistryError::StaleIndex {
                slot: index.slot,
                generation: index.generation,
            })
    }

    fn entry_mut(&mut self, index: AuthorityIndex) -> Result<&mut Entry, RegistryError> {
        self.entries
            .get_mut(index.slot as usize)
            .filter(|e| e.generation == index.generation)
            .ok_or(RegistryError::StaleIndex {
                slot: index.slot,
                generation: index.generation,
            })
    }

    fn authority_mut(&mut self, index: AuthorityIndex) -> Result<&mut Authority, RegistryError> {
        self.entry_mut(index)?
            .authority
            .as_mut()
            .ok_or(RegistryError::StaleIndex {
                slot: index.slot,
                generation: index.generation,
            })
    }

    /// Record a status transition effective at `height`.
    pub fn set_status(
        &mut self,
        index: AuthorityIndex,
        status: AuthorityStatus,
        height: DbHeight,
    ) -> Result<(), RegistryError> {
        let authority = self.authority_mut(index)?;
        authority.set_status(status, height);
        debug!(
            identity = ?authority.identity,
            status = status.as_str(),
            %height,
            "authority status changed"
        );
        Ok(())
    }

    /// Register a key for an authority at the current height.
    ///
    /// `KeyType::Ed25519` rotates the message-signing key (the previous key
    /// stays valid for the heights it covered). `KeyType::Anchor(chain)` sets
    /// the anchor key at `level` for that chain.
    pub fn register_signing_key(
        &mut self,
        index: AuthorityIndex,
        key: PublicKey,
        key_type: KeyType,
        level: u8,
    ) -> Result<(), RegistryError> {
        let height = self.height;
        let authority = self.authority_mut(index)?;
        match key_type {
            KeyType::Ed25519 => authority.rotate_signing_key(key, height),
            KeyType::Anchor(chain) => authority.set_anchor_key(chain, level, key),
        }
        Ok(())
    }

    /// Live authorities followed by retired ones.
    pub fn authorities(&self) -> impl Iterator<Item = &Authority> {
        self.entries
            .iter()
            .filter_map(|e| e.authority.as_ref())
            .chain(self.retired.iter())
    }

    fn record(&self, identity: &IdentityChainId, height: DbHeight) -> Option<&Authority> {
        if let Some(index) = self.find(identity) {
            if let Ok(authority) = self.get(index) {
                if authority.status_at(height).is_active() {
                    return Some(authority);
                }
            }
        }
        self.retired
            .iter()
            .rev()
            .find(|a| a.identity == *identity && a.status_at(height).is_active())
            .or_else(|| self.find(identity).and_then(|i| self.get(i).ok()))
    }

    /// Number of active authorities as of `height`.
    pub fn active_count(&self, height: DbHeight) -> usize {
        self.snapshot(height).active_count()
    }

    /// `floor(active / 2) + 1` over authorities active at `height`.
    pub fn quorum_size(&self, height: DbHeight) -> usize {
        self.active_count(height) / 2 + 1
    }

    /// Federated servers at `height`, in chain-ID (slot) order.
    pub fn federated(&self, height: DbHeight) -> Vec<IdentityChainId> {
        self.with_status(height, AuthorityStatus::Federated)
    }

    /// Audit servers at `height`, in chain-ID order.
    pub fn audit(&self, height: DbHeight) -> Vec<IdentityChainId> {
        self.with_status(height, AuthorityStatus::Audit)
    }

    fn with_status(&self, height: DbHeight, status: AuthorityStatus) -> Vec<IdentityChainId> {
        let mut ids: Vec<_> = self
            .authorities()
            .filter(|a| a.status_at(height) == status)
            .map(|a| a.identity)
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Authenticate a signed payload from `identity` as of `height`.
    pub fn verify(
        &self,
        identity: &IdentityChainId,
        payload: &[u8],
        signature: &Signature,
        height: DbHeight,
    ) -> Result<Role, RegistryError> {
        let authority = self
            .record(identity, height)
            .ok_or(RegistryError::UnknownIdentity(*identity))?;
        let role = authority
            .status_at(height)
            .role()
            .ok_or(RegistryError::Inactive {
                identity: *identity,
                height: height.as_u32(),
            })?;
        let mut keys = authority.keys_valid_at(height).peekable();
        if keys.peek().is_none() {
            return Err(RegistryError::NoSigningKey(*identity));
        }
        if keys.any(|key| verify_signature(payload, signature, &key)) {
            Ok(role)
        } else {
            Err(RegistryError::InvalidSignature(*identity))
        }
    }

    /// Audit servers at `height`, highest volunteer priority first.
    pub fn volunteer_order(
        &self,
        height: DbHeight,
        minute: u8,
        slot: SlotIndex,
        round: u32,
    ) -> Vec<IdentityChainId> {
        let mut candidates = self.audit(height);
        order::rank(&mut candidates, height, minute, slot, round);
        candidates
    }

    /// Immutable view of the authority set as of `height`.
    pub fn snapshot(&self, height: DbHeight) -> Arc<AuthoritySet> {
        let entries = self.authorities().map(|a| {
            (
                a.identity,
                a.status_at(height),
                a.keys_valid_at(height).collect::<Vec<_>>(),
            )
        });
        Arc::new(AuthoritySet::build(height, entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedchain_crypto::{keypair_from_seed, sign_message};

    fn id(n: u32) -> IdentityChainId {
        IdentityChainId::from_u32(n)
    }

    fn federation(feds: u32, audits: u32) -> (AuthorityRegistry, Vec<AuthorityIndex>) {
        let mut reg = AuthorityRegistry::new();
        let mut indices = Vec::new();
        for n in 0..feds + audits {
            let index = reg.add(id(n)).unwrap();
            let status = if n < feds {
                AuthorityStatus::Federated
            } else {
                AuthorityStatus::Audit
            };
            reg.set_status(index, status, DbHeight::GENESIS).unwrap();
            let kp = keypair_from_seed(&[n as u8 + 1; 32]);
            reg.register_signing_key(index, kp.public, KeyType::Ed25519, 0)
                .unwrap();
            indices.push(index);
        }
        (reg, indices)
    }

    #[test]
    fn add_rejects_duplicates() {
        let mut reg = AuthorityRegistry::new();
        reg.add(id(1)).unwrap();
        assert_eq!(reg.add(id(1)), Err(RegistryError::Duplicate(id(1))));
    }

    #[test]
    fn find_is_consistent_with_add() {
        let (reg, indices) = federation(3, 2);
        for (n, index) in indices.iter().enumerate() {
            assert_eq!(reg.find(&id(n as u32)), Some(*index));
            assert_eq!(reg.get(*index).unwrap().identity, id(n as u32));
        }
        assert_eq!(reg.find(&id(99)), None);
    }

    #[test]
    fn quorum_counts_only_active_statuses() {
        let (mut reg, _) = federation(3, 2);
        assert_eq!(reg.quorum_size(DbHeight::GENESIS), 3);

        let pending = reg.add(id(10)).unwrap();
        assert_eq!(reg.active_count(DbHeight::GENESIS), 5);

        reg.set_status(pending, AuthorityStatus::Full, DbHeight::new(4))
            .unwrap();
        assert_eq!(reg.active_count(DbHeight::new(3)), 5);
        assert_eq!(reg.active_count(DbHeight::new(4)), 6);
        assert_eq!(reg.quorum_size(DbHeight::new(4)), 4);
    }

    #[test]
    fn remove_makes_index_stale_but_keeps_history() {
        let (mut reg, indices) = federation(3, 2);
        reg.set_height(DbHeight::new(10));
        reg.remove(indices[1]).unwrap();

        assert!(matches!(
            reg.get(indices[1]),
            Err(RegistryError::StaleIndex { .. })
        ));
        assert!(reg.remove(indices[1]).is_err());
        assert_eq!(reg.find(&id(1)), None);
        assert_eq!(reg.get(indices[0]).unwrap().identity, id(0));

        assert_eq!(reg.active_count(DbHeight::new(9)), 5);
        assert_eq!(reg.active_count(DbHeight::new(10)), 4);
        assert_eq!(reg.federated(DbHeight::new(9)), vec![id(0), id(1), id(2)]);
        assert_eq!(reg.federated(DbHeight::new(10)), vec![id(0), id(2)]);
    }

    #[test]
    fn reused_slot_gets_new_generation() {
        let (mut reg, indices) = federation(2, 0);
        reg.remove(indices[0]).unwrap();
        let fresh = reg.add(id(50)).unwrap();
        assert_eq!(fresh.slot(), indices[0].slot());
        assert_ne!(fresh.generation(), indices[0].generation());
        assert!(reg.get(indices[0]).is_err());
        assert_eq!(reg.get(fresh).unwrap().identity, id(50));
    }

    #[test]
    fn verify_accepts_historic_keys_at_their_heights() {
        let (mut reg, indices) = federation(3, 2);
        let old = keypair_from_seed(&[1; 32]);
        let new = keypair_from_seed(&[77; 32]);
        reg.set_height(DbHeight::new(20));
        reg.register_signing_key(indices[0], new.public, KeyType::Ed25519, 0)
            .unwrap();

        let old_sig = sign_message(b"msg", &old.private);
        let new_sig = sign_message(b"msg", &new.private);

        assert_eq!(
            reg.verify(&id(0), b"msg", &old_sig, DbHeight::new(19)),
            Ok(Role::Federated)
        );
        assert!(reg.verify(&id(0), b"msg", &old_sig, DbHeight::new(20)).is_err());
        assert_eq!(
            reg.verify(&id(0), b"msg", &new_sig, DbHeight::new(20)),
            Ok(Role::Federated)
        );
    }

    #[test]
    fn verify_rejects_inactive_and_unknown() {
        let (mut reg, _) = federation(3, 2);
        let pending = reg.add(id(30)).unwrap();
        let kp = keypair_from_seed(&[30; 32]);
        reg.register_signing_key(pending, kp.public, KeyType::Ed25519, 0)
            .unwrap();
        let sig = sign_message(b"m", &kp.private);
        assert!(matches!(
            reg.verify(&id(30), b"m", &sig, DbHeight::GENESIS),
            Err(RegistryError::Inactive { .. })
        ));
        assert_eq!(
            reg.verify(&id(31), b"m", &sig, DbHeight::GENESIS),
            Err(RegistryError::UnknownIdentity(id(31)))
        );
    }

    #[test]
    fn anchor_keys_do_not_affect_signing() {
        let (mut reg, indices) = federation(1, 0);
        reg.register_signing_key(indices[0], PublicKey([9; 32]), KeyType::Anchor("BTC".into()), 1)
            .unwrap();
        let a = reg.get(indices[0]).unwrap();
        assert_eq!(a.anchor_keys().len(), 1);
        assert_eq!(a.signing_key(), Some(keypair_from_seed(&[1; 32]).public));
    }

    #[test]
    fn snapshot_matches_registry_queries() {
        let (reg, _) = federation(3, 2);
        let snap = reg.snapshot(DbHeight::GENESIS);
        assert_eq!(snap.quorum_size(), reg.quorum_size(DbHeight::GENESIS));
        assert_eq!(snap.federated(), reg.federated(DbHeight::GENESIS).as_slice());
        assert_eq!(snap.audit(), reg.audit(DbHeight::GENESIS).as_slice());
        assert_eq!(
            snap.volunteer_order(3, 1, 2),
            reg.volunteer_order(DbHeight::GENESIS, 3, 1, 2)
        );
    }
}
