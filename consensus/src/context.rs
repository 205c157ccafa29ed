//! Agreed, read-only data shared by every election of one height.

use std::fmt;
use std::sync::Arc;

use fedchain_registry::{AuthoritySet, Role};
use fedchain_types::{
    DbHeight, IdentityChainId, MinuteLocation, NetworkId, PrivateKey, MINUTES_PER_BLOCK,
};

use crate::policy::{MajorityPolicy, QuorumPolicy};

/// Minutes an election may stay open before a tick expires it.
pub const DEFAULT_ELECTION_WINDOW: u32 = MINUTES_PER_BLOCK as u32;

/// How a controller clone treats the [`SharedContext`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CloneMode {
    /// The clone points at the same context (`Arc::clone`).
    #[default]
    ShareContext,
    /// The clone gets its own copy, including the authority snapshot.
    DuplicateContext,
}

/// Height, minute, authority snapshot, quorum and local identity.
///
/// Immutable once built. Elections hold it behind an `Arc`.
pub struct SharedContext {
    location: MinuteLocation,
    authorities: Arc<AuthoritySet>,
    quorum: usize,
    local: IdentityChainId,
    local_key: PrivateKey,
    network: NetworkId,
    policy: Arc<dyn QuorumPolicy>,
    election_window: u32,
}

impl SharedContext {
    /// Context at the snapshot's height, minute 0, majority policy.
    pub fn new(
        authorities: Arc<AuthoritySet>,
        local: IdentityChainId,
        local_key: PrivateKey,
    ) -> Self {
        let policy: Arc<dyn QuorumPolicy> = Arc::new(MajorityPolicy);
        let quorum = policy.quorum(&authorities);
        Self {
            location: MinuteLocation::new(authorities.height(), 0),
            authorities,
            quorum,
            local,
            local_key,
            network: NetworkId::default(),
            policy,
            election_window: DEFAULT_ELECTION_WINDOW,
        }
    }

    pub fn with_minute(mut self, minute: u8) -> Self {
        self.location.minute = minute;
        self
    }

    pub fn with_network(mut self, network: NetworkId) -> Self {
        self.network = network;
        self
    }

    pub fn with_policy(mut self, policy: Arc<dyn QuorumPolicy>) -> Self {
        self.quorum = policy.quorum(&self.authorities);
        self.policy = policy;
        self
    }

    pub fn with_election_window(mut self, minutes: u32) -> Self {
        self.election_window = minutes;
        self
    }

    /// A deep copy: the authority snapshot is cloned rather than shared.
    pub fn duplicate(&self) -> Self {
        Self {
            location: self.location,
            authorities: Arc::new(AuthoritySet::clone(&self.authorities)),
            quorum: self.quorum,
            local: self.local,
            local_key: PrivateKey(self.local_key.0),
            network: self.network,
            policy: Arc::clone(&self.policy),
            election_window: self.election_window,
        }
    }

    pub fn height(&self) -> DbHeight {
        self.location.height
    }

    pub fn minute(&self) -> u8 {
        self.location.minute
    }

    pub fn location(&self) -> MinuteLocation {
        self.location
    }

    pub fn authorities(&self) -> &Arc<AuthoritySet> {
        &self.authorities
    }

    pub fn quorum(&self) -> usize {
        self.quorum
    }

    pub fn local(&self) -> IdentityChainId {
        self.local
    }

    pub fn local_key(&self) -> &PrivateKey {
        &self.local_key
    }

    pub fn local_role(&self) -> Option<Role> {
        self.authorities.role(&self.local)
    }

    /// Whether the local node may vote.
    pub fn local_is_active(&self) -> bool {
        self.authorities.is_active(&self.local)
    }

    pub fn network(&self) -> NetworkId {
        self.network
    }

    pub fn policy(&self) -> &dyn QuorumPolicy {
        self.policy.as_ref()
    }

    pub fn election_window(&self) -> u32 {
        self.election_window
    }

    /// The location at which an election opened at this context's minute
    /// expires.
    pub fn expiry(&self) -> MinuteLocation {
        self.location.advance(self.election_window)
    }
}

impl fmt::Debug for SharedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedContext")
            .field("location", &self.location)
            .field("quorum", &self.quorum)
            .field("local", &self.local)
            .field("network", &self.network)
            .field("policy", &self.policy.name())
            .field("election_window", &self.election_window)
            .finish_non_exhaustive()
    }
}
