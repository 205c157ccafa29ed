use fedchain_registry::RegistryError;
use fedchain_types::{IdentityChainId, SlotIndex};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsensusError {
    #[error("no leader slots at height {0}")]
    NoSlots(u32),

    #[error("slot {slot} out of range ({slots} slots)")]
    InvalidSlot { slot: SlotIndex, slots: usize },

    #[error("no signing key for {0:?}")]
    MissingKey(IdentityChainId),

    #[error("clone diverged from its source: {0}")]
    Clone(String),

    #[error(
        "safety violation in slot {slot} at height {height}: committed {local:?}, \
         {announcer:?} announced {peer:?}"
    )]
    SafetyViolation {
        slot: SlotIndex,
        height: u32,
        local: IdentityChainId,
        peer: IdentityChainId,
        announcer: IdentityChainId,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
