//! A single server identity and everything the registry tracks about it.

use fedchain_types::{DbHeight, IdentityChainId, PublicKey};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an authority.
///
/// Only `Federated`, `Audit` and `Full` servers count toward quorum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthorityStatus {
    #[default]
    Unassigned,
    Pending,
    Federated,
    Audit,
    Full,
}

impl AuthorityStatus {
    /// Whether this status counts toward quorum and may vote.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Federated | Self::Audit | Self::Full)
    }

    /// The voting role for an active status, `None` otherwise.
    pub fn role(&self) -> Option<Role> {
        match self {
            Self::Federated => Some(Role::Federated),
            Self::Audit => Some(Role::Audit),
            Self::Full => Some(Role::Full),
            Self::Unassigned | Self::Pending => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unassigned => "unassigned",
            Self::Pending => "pending",
            Self::Federated => "federated",
            Self::Audit => "audit",
            Self::Full => "full",
        }
    }
}

/// The role an authenticated signer holds at a given height.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Federated,
    Audit,
    Full,
}

/// Which key slot a registration targets.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    /// The Ed25519 key that signs election messages. Registering a new one
    /// rotates the previous key into history.
    Ed25519,
    /// A key used to anchor on an external chain (e.g. `"BTC"`).
    Anchor(String),
}

/// A key used for anchoring on an external chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorKey {
    pub chain: String,
    /// Priority level; lower levels are preferred.
    pub level: u8,
    pub key: PublicKey,
}

/// A signing key that was replaced, with the range of heights it was valid for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricKey {
    pub key: PublicKey,
    pub active_from: DbHeight,
    /// First height at which the key is no longer valid.
    pub retired_at: DbHeight,
}

impl HistoricKey {
    pub fn valid_at(&self, height: DbHeight) -> bool {
        self.active_from <= height && height < self.retired_at
    }
}

/// A server identity known to the registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
    pub identity: IdentityChainId,
    pub management_chain_id: Option<IdentityChainId>,
    /// Height-ordered status transitions. The status at height `h` is the
    /// last entry whose height is `<= h`.
    status_history: Vec<(DbHeight, AuthorityStatus)>,
    signing_key: Option<(PublicKey, DbHeight)>,
    key_history: Vec<HistoricKey>,
    anchor_keys: Vec<AnchorKey>,
}

impl Authority {
    pub fn new(identity: IdentityChainId, status: AuthorityStatus, since: DbHeight) -> Self {
        Self {
            identity,
            management_chain_id: None,
            status_history: vec![(since, status)],
            signing_key: None,
            key_history: Vec::new(),
            anchor_keys: Vec::new(),
        }
    }

    /// The most recent status, regardless of height.
    pub fn status(&self) -> AuthorityStatus {
        self.status_history
            .last()
            .map(|(_, s)| *s)
            .unwrap_or_default()
    }

    /// Status as of `height`.
    pub fn status_at(&self, height: DbHeight) -> AuthorityStatus {
        self.status_history
            .iter()
            .rev()
            .find(|(h, _)| *h <= height)
            .map(|(_, s)| *s)
            .unwrap_or_default()
    }

    pub fn status_history(&self) -> &[(DbHeight, AuthorityStatus)] {
        &self.status_history
    }

    /// Record a status transition at `height`.
    ///
    /// A transition at the same height as the latest entry replaces it;
    /// transitions at earlier heights are inserted in order.
    pub fn set_status(&mut self, status: AuthorityStatus, height: DbHeight) {
        match self.status_history.binary_search_by(|(h, _)| h.cmp(&height)) {
            Ok(pos) => self.status_history[pos].1 = status,
            Err(pos) => self.status_history.insert(pos, (height, status)),
        }
    }

    pub fn signing_key(&self) -> Option<PublicKey> {
        self.signing_key.map(|(k, _)| k)
    }

    pub fn key_history(&self) -> &[HistoricKey] {
        &self.key_history
    }

    pub fn anchor_keys(&self) -> &[AnchorKey] {
        &self.anchor_keys
    }

    /// Install a new message-signing key valid from `height`.
    ///
    /// The previous key (if any) moves into the history, retired at `height`.
    pub fn rotate_signing_key(&mut self, key: PublicKey, height: DbHeight) {
        if let Some((old, since)) = self.signing_key.take() {
            if old != key {
                self.key_history.push(HistoricKey {
                    key: old,
                    active_from: since,
                    retired_at: height,
                });
            } else {
                self.signing_key = Some((old, since));
                return;
            }
        }
        self.signing_key = Some((key, height));
    }

    /// Add or replace the anchor key for `(chain, level)`.
    pub fn set_anchor_key(&mut self, chain: String, level: u8, key: PublicKey) {
        if let Some(existing) = self
            .anchor_keys
            .iter_mut()
            .find(|a| a.chain == chain && a.level == level)
        {
            existing.key = key;
            return;
        }
        self.anchor_keys.push(AnchorKey { chain, level, key });
        self.anchor_keys
            .sort_by(|a, b| a.chain.cmp(&b.chain).then(a.level.cmp(&b.level)));
    }

    /// Every signing key that was valid at `height`, current key first.
    pub fn keys_valid_at(&self, height: DbHeight) -> impl Iterator<Item = PublicKey> + '_ {
        let current = self
            .signing_key
            .filter(|(_, since)| *since <= height)
            .map(|(k, _)| k);
        current.into_iter().chain(
            self.key_history
                .iter()
                .rev()
                .filter(move |h| h.valid_at(height))
                .map(|h| h.key),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> IdentityChainId {
        IdentityChainId::from_u32(n)
    }

    #[test]
    fn status_history_is_height_scoped() {
        let mut a = Authority::new(id(1), AuthorityStatus::Pending, DbHeight::new(0));
        a.set_status(AuthorityStatus::Federated, DbHeight::new(5));
        a.set_status(AuthorityStatus::Audit, DbHeight::new(10));

        assert_eq!(a.status_at(DbHeight::new(0)), AuthorityStatus::Pending);
        assert_eq!(a.status_at(DbHeight::new(7)), AuthorityStatus::Federated);
        assert_eq!(a.status_at(DbHeight::new(10)), AuthorityStatus::Audit);
        assert_eq!(a.status(), AuthorityStatus::Audit);
    }

    #[test]
    fn out_of_order_status_is_inserted_sorted() {
        let mut a = Authority::new(id(1), AuthorityStatus::Pending, DbHeight::new(0));
        a.set_status(AuthorityStatus::Audit, DbHeight::new(10));
        a.set_status(AuthorityStatus::Federated, DbHeight::new(3));
        let heights: Vec<u32> = a.status_history().iter().map(|(h, _)| h.as_u32()).collect();
        assert_eq!(heights, vec![0, 3, 10]);
    }

    #[test]
    fn rotation_moves_old_key_to_history() {
        let mut a = Authority::new(id(1), AuthorityStatus::Federated, DbHeight::new(0));
        a.rotate_signing_key(PublicKey([1; 32]), DbHeight::new(0));
        a.rotate_signing_key(PublicKey([2; 32]), DbHeight::new(8));

        assert_eq!(a.signing_key(), Some(PublicKey([2; 32])));
        assert_eq!(a.key_history().len(), 1);
        assert!(a.key_history()[0].valid_at(DbHeight::new(7)));
        assert!(!a.key_history()[0].valid_at(DbHeight::new(8)));

        let at_5: Vec<_> = a.keys_valid_at(DbHeight::new(5)).collect();
        assert_eq!(at_5, vec![PublicKey([1; 32])]);
        let at_9: Vec<_> = a.keys_valid_at(DbHeight::new(9)).collect();
        assert_eq!(at_9, vec![PublicKey([2; 32])]);
    }

    #[test]
    fn rotating_to_same_key_is_noop() {
        let mut a = Authority::new(id(1), AuthorityStatus::Federated, DbHeight::new(0));
        a.rotate_signing_key(PublicKey([1; 32]), DbHeight::new(0));
        a.rotate_signing_key(PublicKey([1; 32]), DbHeight::new(4));
        assert!(a.key_history().is_empty());
    }

    #[test]
    fn anchor_keys_sorted_by_chain_and_level() {
        let mut a = Authority::new(id(1), AuthorityStatus::Federated, DbHeight::new(0));
        a.set_anchor_key("BTC".into(), 2, PublicKey([2; 32]));
        a.set_anchor_key("BTC".into(), 1, PublicKey([1; 32]));
        a.set_anchor_key("BTC".into(), 2, PublicKey([9; 32]));
        let levels: Vec<u8> = a.anchor_keys().iter().map(|k| k.level).collect();
        assert_eq!(levels, vec![1, 2]);
        assert_eq!(a.anchor_keys()[1].key, PublicKey([9; 32]));
    }

    #[test]
    fn only_active_statuses_have_roles() {
        assert!(AuthorityStatus::Federated.is_active());
        assert!(AuthorityStatus::Audit.is_active());
        assert!(AuthorityStatus::Full.is_active());
        assert!(!AuthorityStatus::Pending.is_active());
        assert_eq!(AuthorityStatus::Unassigned.role(), None);
        assert_eq!(AuthorityStatus::Audit.role(), Some(Role::Audit));
    }
}
