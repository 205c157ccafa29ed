//! Bincode wire codec for [`Message`].

use bincode::Options;

use crate::error::MessageError;
use crate::message::Message;

/// Upper bound on an encoded message.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_MESSAGE_SIZE as u64)
}

pub fn encode(message: &Message) -> Result<Vec<u8>, MessageError> {
    let bytes = options().serialize(message)?;
    if bytes.len() > MAX_MESSAGE_SIZE {
        return Err(MessageError::TooLarge {
            size: bytes.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(bytes)
}

pub fn decode(bytes: &[u8]) -> Result<Message, MessageError> {
    if bytes.len() > MAX_MESSAGE_SIZE {
        return Err(MessageError::TooLarge {
            size: bytes.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(options().deserialize(bytes)?)
}
