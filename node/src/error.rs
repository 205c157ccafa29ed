use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("consensus error: {0}")]
    Consensus(#[from] fedchain_consensus::ConsensusError),

    #[error("registry error: {0}")]
    Registry(#[from] fedchain_registry::RegistryError),

    #[error("message error: {0}")]
    Message(#[from] fedchain_messages::MessageError),

    #[error("search error: {0}")]
    Search(#[from] fedchain_search::SearchError),

    #[error("config error: {0}")]
    Config(String),

    #[error("logging setup failed: {0}")]
    Logging(String),

    #[error("queue {0} closed")]
    QueueClosed(&'static str),

    #[error("authority registry lock poisoned")]
    RegistryPoisoned,

    #[error("task failed: {0}")]
    Task(String),

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
