use fedchain_types::IdentityChainId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("authority {0:?} is already registered")]
    Duplicate(IdentityChainId),

    #[error("unknown authority {0:?}")]
    UnknownIdentity(IdentityChainId),

    #[error("stale authority index (slot {slot}, generation {generation})")]
    StaleIndex { slot: u32, generation: u32 },

    #[error("authority {0:?} has no signing key")]
    NoSigningKey(IdentityChainId),

    #[error("authority {identity:?} is not active at height {height}")]
    Inactive { identity: IdentityChainId, height: u32 },

    #[error("invalid signature from {0:?}")]
    InvalidSignature(IdentityChainId),
}
