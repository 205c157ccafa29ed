//! Signing digests for election messages.
//!
//! A message signs the Blake2b-256 digest of `tag | network magic | fields`,
//! fields in declaration order, integers big-endian. The tag separates the
//! message types so a vote can never be replayed as a volunteer.

use fedchain_crypto::{blake2b_256_multi, sign_message};
use fedchain_types::{
    DbHeight, Digest256, IdentityChainId, NetworkId, PrivateKey, Signature, SlotIndex,
};

use crate::message::{CommitAnnouncement, Message, VolunteerMessage, VoteMessage};

const TAG_VOLUNTEER: u8 = 0x01;
const TAG_VOTE: u8 = 0x02;
const TAG_COMMIT: u8 = 0x03;

fn slot_bytes(slot: SlotIndex) -> [u8; 8] {
    (slot as u64).to_be_bytes()
}

/// A message carrying a signature by one authority.
pub trait Signed {
    fn signer(&self) -> IdentityChainId;

    fn signature(&self) -> &Signature;

    fn set_signature(&mut self, signature: Signature);

    /// The digest the signature covers.
    fn signing_digest(&self, network: NetworkId) -> Digest256;

    /// Sign in place with `key`. Ed25519 is deterministic, so signing the
    /// same message twice yields the same bytes.
    fn sign_with(&mut self, key: &PrivateKey, network: NetworkId) {
        let digest = self.signing_digest(network);
        self.set_signature(sign_message(digest.as_bytes(), key));
    }
}

impl Signed for VolunteerMessage {
    fn signer(&self) -> IdentityChainId {
        self.proposer
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn set_signature(&mut self, signature: Signature) {
        self.signature = signature;
    }

    fn signing_digest(&self, network: NetworkId) -> Digest256 {
        Digest256::new(blake2b_256_multi(&[
            &[TAG_VOLUNTEER, network.magic()],
            self.proposer.as_bytes(),
            &slot_bytes(self.slot),
            &self.height.as_u32().to_be_bytes(),
            &[self.minute],
            &self.round.to_be_bytes(),
        ]))
    }
}

impl Signed for VoteMessage {
    fn signer(&self) -> IdentityChainId {
        self.voter
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn set_signature(&mut self, signature: Signature) {
        self.signature = signature;
    }

    fn signing_digest(&self, network: NetworkId) -> Digest256 {
        Digest256::new(blake2b_256_multi(&[
            &[TAG_VOTE, network.magic()],
            self.voter.as_bytes(),
            self.candidate.as_bytes(),
            &slot_bytes(self.slot),
            &self.height.as_u32().to_be_bytes(),
        ]))
    }
}

impl Signed for CommitAnnouncement {
    fn signer(&self) -> IdentityChainId {
        self.announcer
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn set_signature(&mut self, signature: Signature) {
        self.signature = signature;
    }

    fn signing_digest(&self, network: NetworkId) -> Digest256 {
        Digest256::new(blake2b_256_multi(&[
            &[TAG_COMMIT, network.magic()],
            self.announcer.as_bytes(),
            &slot_bytes(self.slot),
            &self.height.as_u32().to_be_bytes(),
            self.winner.as_bytes(),
        ]))
    }
}

impl Message {
    /// The signed view of this message, if it is a signed election message.
    pub fn as_signed(&self) -> Option<&dyn Signed> {
        match self {
            Self::Volunteer(m) => Some(m),
            Self::Vote(m) => Some(m),
            Self::Commit(m) => Some(m),
            Self::Tick(_) | Self::Block(_) => None,
        }
    }
}

impl VolunteerMessage {
    /// Build and sign a volunteer message.
    pub fn signed(
        proposer: IdentityChainId,
        slot: SlotIndex,
        height: DbHeight,
        minute: u8,
        round: u32,
        key: &PrivateKey,
        network: NetworkId,
    ) -> Self {
        let mut msg = Self {
            proposer,
            slot,
            height,
            minute,
            round,
            signature: Signature::EMPTY,
        };
        msg.sign_with(key, network);
        msg
    }
}

impl VoteMessage {
    /// Build and sign a vote.
    pub fn signed(
        voter: IdentityChainId,
        candidate: IdentityChainId,
        slot: SlotIndex,
        height: DbHeight,
        key: &PrivateKey,
        network: NetworkId,
    ) -> Self {
        let mut msg = Self {
            voter,
            candidate,
            slot,
            height,
            signature: Signature::EMPTY,
        };
        msg.sign_with(key, network);
        msg
    }
}

impl CommitAnnouncement {
    /// Build and sign a commit announcement.
    pub fn signed(
        announcer: IdentityChainId,
        slot: SlotIndex,
        height: DbHeight,
        winner: IdentityChainId,
        key: &PrivateKey,
        network: NetworkId,
    ) -> Self {
        let mut msg = Self {
            announcer,
            slot,
            height,
            winner,
            signature: Signature::EMPTY,
        };
        msg.sign_with(key, network);
        msg
    }
}
