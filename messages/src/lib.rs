//! Election message types for fedchain.
//!
//! Every message that can reach a leader-slot election is one of the
//! variants of [`Message`]. Signed messages commit to a Blake2b digest of
//! their fields in canonical order (see [`signing`]); the wire codec in
//! [`codec`] is bincode with a size limit.

pub mod codec;
pub mod error;
pub mod message;
pub mod signing;

pub use codec::{decode, encode, MAX_MESSAGE_SIZE};
pub use error::MessageError;
pub use message::{
    BlockKind, BlockMessage, CommitAnnouncement, Message, MessageKind, Tick, VolunteerMessage,
    VoteMessage,
};
pub use signing::Signed;
