//! The messages an election consumes and produces.

use fedchain_types::{DbHeight, IdentityChainId, MinuteLocation, Signature, SlotIndex};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An audit server offering to replace the faulted leader of `slot`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VolunteerMessage {
    pub proposer: IdentityChainId,
    pub slot: SlotIndex,
    pub height: DbHeight,
    pub minute: u8,
    /// Fault round for the slot; bumped each time a volunteer fails to take over.
    pub round: u32,
    pub signature: Signature,
}

/// A vote by an authority for a volunteer to take `slot`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoteMessage {
    pub voter: IdentityChainId,
    pub candidate: IdentityChainId,
    pub slot: SlotIndex,
    pub height: DbHeight,
    pub signature: Signature,
}

/// Announces that `announcer` saw `winner` reach quorum for `slot`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitAnnouncement {
    pub announcer: IdentityChainId,
    pub slot: SlotIndex,
    pub height: DbHeight,
    pub winner: IdentityChainId,
    pub signature: Signature,
}

/// Housekeeping tick, generated locally. Also serves as the minute timeout
/// for fault detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tick {
    pub height: DbHeight,
    pub minute: u8,
}

impl Tick {
    pub fn new(height: DbHeight, minute: u8) -> Self {
        Self { height, minute }
    }

    pub fn location(&self) -> MinuteLocation {
        MinuteLocation::new(self.height, self.minute)
    }
}

/// Kinds of block-production traffic the election core passes through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    /// End-of-minute marker from a leader.
    Eom,
    DirectoryBlockSignature,
    Ack,
    Entry,
}

/// Opaque block-production message. Only the EOM sender and location are
/// interpreted (by the fault monitor); everything else is forwarded as is.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockMessage {
    pub kind: BlockKind,
    pub sender: IdentityChainId,
    pub height: DbHeight,
    pub minute: u8,
    pub payload: Vec<u8>,
}

/// Any message routed to the election core.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Message {
    Volunteer(VolunteerMessage),
    Vote(VoteMessage),
    Commit(CommitAnnouncement),
    Tick(Tick),
    Block(BlockMessage),
}

/// Discriminant of a [`Message`], used for logging and metrics labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Volunteer,
    Vote,
    Commit,
    Tick,
    Block,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Volunteer => "volunteer",
            Self::Vote => "vote",
            Self::Commit => "commit",
            Self::Tick => "tick",
            Self::Block => "block",
        }
    }
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Volunteer(_) => MessageKind::Volunteer,
            Self::Vote(_) => MessageKind::Vote,
            Self::Commit(_) => MessageKind::Commit,
            Self::Tick(_) => MessageKind::Tick,
            Self::Block(_) => MessageKind::Block,
        }
    }

    /// The leader slot this message is addressed to, if it targets one.
    pub fn slot(&self) -> Option<SlotIndex> {
        match self {
            Self::Volunteer(m) => Some(m.slot),
            Self::Vote(m) => Some(m.slot),
            Self::Commit(m) => Some(m.slot),
            Self::Tick(_) | Self::Block(_) => None,
        }
    }

    pub fn height(&self) -> DbHeight {
        match self {
            Self::Volunteer(m) => m.height,
            Self::Vote(m) => m.height,
            Self::Commit(m) => m.height,
            Self::Tick(m) => m.height,
            Self::Block(m) => m.height,
        }
    }

    /// The identity that signed (or sent) this message. Ticks have none.
    pub fn sender(&self) -> Option<IdentityChainId> {
        match self {
            Self::Volunteer(m) => Some(m.proposer),
            Self::Vote(m) => Some(m.voter),
            Self::Commit(m) => Some(m.announcer),
            Self::Block(m) => Some(m.sender),
            Self::Tick(_) => None,
        }
    }

    /// Whether this message is election traffic (as opposed to a tick or
    /// block-production traffic).
    pub fn is_election(&self) -> bool {
        self.slot().is_some()
    }
}

impl From<VolunteerMessage> for Message {
    fn from(m: VolunteerMessage) -> Self {
        Self::Volunteer(m)
    }
}

impl From<VoteMessage> for Message {
    fn from(m: VoteMessage) -> Self {
        Self::Vote(m)
    }
}

impl From<CommitAnnouncement> for Message {
    fn from(m: CommitAnnouncement) -> Self {
        Self::Commit(m)
    }
}

impl From<Tick> for Message {
    fn from(t: Tick) -> Self {
        Self::Tick(t)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Volunteer(m) => write!(
                f,
                "volunteer {} slot {} @{}/{} r{}",
                m.proposer.short(),
                m.slot,
                m.height,
                m.minute,
                m.round
            ),
            Self::Vote(m) => write!(
                f,
                "vote {}->{} slot {} @{}",
                m.voter.short(),
                m.candidate.short(),
                m.slot,
                m.height
            ),
            Self::Commit(m) => write!(
                f,
                "commit {} by {} slot {} @{}",
                m.winner.short(),
                m.announcer.short(),
                m.slot,
                m.height
            ),
            Self::Tick(t) => write!(f, "tick @{}/{}", t.height, t.minute),
            Self::Block(m) => write!(
                f,
                "block {:?} from {} @{}/{}",
                m.kind,
                m.sender.short(),
                m.height,
                m.minute
            ),
        }
    }
}
