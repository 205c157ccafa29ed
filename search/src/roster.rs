//! Simulated authority sets.

use std::sync::Arc;

use fedchain_consensus::Keyring;
use fedchain_registry::AuthoritySet;
use fedchain_types::{DbHeight, IdentityChainId};

/// Federated and audit servers with deterministic keys.
///
/// Federated servers get chain IDs `0..feds` and audits the IDs after them,
/// so federated server `i` leads slot `i`.
pub struct Roster {
    pub federated: Vec<IdentityChainId>,
    pub audit: Vec<IdentityChainId>,
    pub keyring: Keyring,
    pub authorities: Arc<AuthoritySet>,
}

impl Roster {
    pub fn simulated(feds: u32, audits: u32, height: DbHeight) -> Self {
        let federated: Vec<_> = (0..feds).map(IdentityChainId::from_u32).collect();
        let audit: Vec<_> = (feds..feds + audits)
            .map(IdentityChainId::from_u32)
            .collect();
        let keyring = Keyring::simulated(federated.iter().chain(audit.iter()).copied());
        let with_keys = |ids: &[IdentityChainId]| {
            ids.iter()
                .filter_map(|id| keyring.public(id).map(|k| (*id, k)))
                .collect::<Vec<_>>()
        };
        let authorities =
            AuthoritySet::from_roster(height, &with_keys(&federated), &with_keys(&audit));
        Self {
            federated,
            audit,
            keyring,
            authorities,
        }
    }

    pub fn height(&self) -> DbHeight {
        self.authorities.height()
    }

    /// Every authority, federated first.
    pub fn all(&self) -> impl Iterator<Item = IdentityChainId> + '_ {
        self.federated.iter().chain(self.audit.iter()).copied()
    }
}
