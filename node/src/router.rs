//! Classification and authentication of inbound messages.
//!
//! The validator runs before any election sees a message. It checks that
//! election traffic addresses a real slot at the current height and carries
//! a valid signature from an active authority, and that block-production
//! traffic comes from an active authority. Ticks never come from the
//! network. Elections re-check everything they rely on; the validator keeps
//! garbage out of the per-slot queues.

use std::sync::Arc;

use fedchain_consensus::Rejection;
use fedchain_messages::{BlockKind, BlockMessage, Message, Signed};
use fedchain_registry::{AuthoritySet, AuthorityStatus, Role};
use fedchain_types::{DbHeight, NetworkId, SlotIndex};

/// Where a validated message goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    /// To the worker of `slot`.
    Election { slot: SlotIndex, message: Message },
    /// Block-production traffic, forwarded untouched. The block layer
    /// authenticates it and reports confirmed EOMs on the control path.
    Leader(BlockMessage),
    /// To the invalid-message queue.
    Invalid { message: Message, reason: Rejection },
}

/// Authenticates messages against a registry snapshot.
#[derive(Clone, Debug)]
pub struct Validator {
    authorities: Arc<AuthoritySet>,
    network: NetworkId,
}

impl Validator {
    pub fn new(authorities: Arc<AuthoritySet>, network: NetworkId) -> Self {
        Self {
            authorities,
            network,
        }
    }

    pub fn height(&self) -> DbHeight {
        self.authorities.height()
    }

    /// Swap in a newer snapshot.
    pub fn refresh(&mut self, authorities: Arc<AuthoritySet>) {
        self.authorities = authorities;
    }

    pub fn classify(&self, message: Message) -> Route {
        match self.check(&message) {
            Err(reason) => Route::Invalid { message, reason },
            Ok(()) => match message {
                Message::Block(block) => Route::Leader(block),
                other => match other.slot() {
                    Some(slot) => Route::Election {
                        slot,
                        message: other,
                    },
                    None => Route::Invalid {
                        message: other,
                        reason: Rejection::WrongSlot,
                    },
                },
            },
        }
    }

    fn check(&self, message: &Message) -> Result<(), Rejection> {
        match message {
            Message::Tick(_) => Err(Rejection::LocalOnly),
            Message::Block(block) => {
                match self.authorities.status(&block.sender) {
                    AuthorityStatus::Unassigned => return Err(Rejection::UnknownSigner),
                    status if !status.is_active() => return Err(Rejection::Inactive),
                    _ => {}
                }
                if block.kind == BlockKind::Eom
                    && self.authorities.slot_of(&block.sender).is_none()
                {
                    return Err(Rejection::WrongSlot);
                }
                Ok(())
            }
            _ => {
                let slot = message.slot().ok_or(Rejection::WrongSlot)?;
                if slot >= self.authorities.slot_count() {
                    return Err(Rejection::WrongSlot);
                }
                if message.height() != self.authorities.height() {
                    return Err(Rejection::WrongHeight);
                }
                let signed = message.as_signed().ok_or(Rejection::Unsigned)?;
                if signed.signature().is_empty() {
                    return Err(Rejection::Unsigned);
                }
                let digest = signed.signing_digest(self.network);
                let role = self.authorities.verify(
                    &signed.signer(),
                    digest.as_bytes(),
                    signed.signature(),
                )?;
                if matches!(message, Message::Volunteer(_)) && role != Role::Audit {
                    return Err(Rejection::NotAudit);
                }
                Ok(())
            }
        }
    }
}
