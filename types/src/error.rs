//! Top-level error type shared across crates.

use thiserror::Error;

/// Common error type for fedchain.
#[derive(Debug, Error)]
pub enum FedchainError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("unknown identity {0}")]
    UnknownIdentity(String),

    #[error("invalid slot {slot}: only {slots} leader slots exist")]
    InvalidSlot { slot: usize, slots: usize },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Other(String),
}
