use fedchain_consensus::ConsensusError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("non-deterministic delivery at depth {depth}: {message}")]
    Determinism { depth: usize, message: String },

    #[error(transparent)]
    Consensus(#[from] ConsensusError),
}
