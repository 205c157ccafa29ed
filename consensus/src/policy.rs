//! Quorum and tie-break rules.

use std::fmt;

use fedchain_registry::AuthoritySet;
use fedchain_types::IdentityChainId;

/// How many matching votes commit an election, and which winner is canonical
/// when peers report different ones.
pub trait QuorumPolicy: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Votes needed to commit, given the authorities at the election height.
    fn quorum(&self, authorities: &AuthoritySet) -> usize;

    /// The canonical winner among competing committed candidates.
    fn tie_break(&self, winners: &[IdentityChainId]) -> Option<IdentityChainId>;
}

/// Strict majority of active authorities; lowest chain ID wins ties.
#[derive(Clone, Copy, Debug, Default)]
pub struct MajorityPolicy;

impl QuorumPolicy for MajorityPolicy {
    fn name(&self) -> &'static str {
        "majority"
    }

    fn quorum(&self, authorities: &AuthoritySet) -> usize {
        authorities.quorum_size()
    }

    fn tie_break(&self, winners: &[IdentityChainId]) -> Option<IdentityChainId> {
        lowest_id(winners)
    }
}

/// Byte-lexicographically smallest chain ID.
pub fn lowest_id(ids: &[IdentityChainId]) -> Option<IdentityChainId> {
    ids.iter().min().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedchain_types::{DbHeight, PublicKey};

    #[test]
    fn majority_quorum_matches_registry_rule() {
        let feds: Vec<_> = (0..3)
            .map(|n| (IdentityChainId::from_u32(n), PublicKey([n as u8; 32])))
            .collect();
        let audits: Vec<_> = (3..5)
            .map(|n| (IdentityChainId::from_u32(n), PublicKey([n as u8; 32])))
            .collect();
        let set = AuthoritySet::from_roster(DbHeight::GENESIS, &feds, &audits);
        assert_eq!(MajorityPolicy.quorum(&set), 3);
    }

    #[test]
    fn tie_break_picks_lowest_regardless_of_order() {
        let a = IdentityChainId::from_u32(4);
        let b = IdentityChainId::from_u32(3);
        assert_eq!(MajorityPolicy.tie_break(&[a, b]), Some(b));
        assert_eq!(MajorityPolicy.tie_break(&[b, a]), Some(b));
        assert_eq!(MajorityPolicy.tie_break(&[]), None);
    }
}
