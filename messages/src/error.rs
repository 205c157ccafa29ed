use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("message too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
}
