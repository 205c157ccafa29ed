//! One node's elections across every leader slot of a height.

use std::fmt;
use std::sync::Arc;

use fedchain_crypto::blake2b_256;
use fedchain_messages::{Message, VolunteerMessage};
use fedchain_types::{Digest256, IdentityChainId, SlotIndex};
use tracing::debug;

use crate::context::{CloneMode, SharedContext};
use crate::election::{Election, Rejection};
use crate::error::ConsensusError;
use crate::keyring::Keyring;
use crate::view::GlobalView;

/// Outcome of one [`Controller::deliver`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Messages produced, tagged with the slot that produced them.
    pub outbound: Vec<(SlotIndex, Message)>,
    /// Whether any election changed.
    pub changed: bool,
    /// Rejection reported by the addressed election, if any.
    pub rejection: Option<Rejection>,
}

/// Owns one election per leader slot plus the shared context and vote board.
///
/// Cloning is explicit via [`Controller::clone_with`]: elections and the
/// view are always deep-copied, the context is shared or duplicated per
/// [`CloneMode`].
#[derive(Debug)]
pub struct Controller {
    context: Arc<SharedContext>,
    elections: Vec<Election>,
    view: GlobalView,
    seeds: Vec<VolunteerMessage>,
}

impl Controller {
    /// One election per federated slot at the context height.
    pub fn new(context: Arc<SharedContext>) -> Result<Self, ConsensusError> {
        let slots = context.authorities().slot_count();
        if slots == 0 {
            return Err(ConsensusError::NoSlots(context.height().as_u32()));
        }
        let elections: Vec<Election> = (0..slots)
            .map(|slot| Election::new(slot, Arc::clone(&context)))
            .collect();
        let view = GlobalView::new(&elections);
        Ok(Self {
            context,
            elections,
            view,
            seeds: Vec::new(),
        })
    }

    /// Like [`Controller::new`], plus one signed seed volunteer per audit
    /// server and leader slot.
    pub fn with_seeds(
        context: Arc<SharedContext>,
        keyring: &Keyring,
    ) -> Result<Self, ConsensusError> {
        let mut controller = Self::new(context)?;
        let ctx = Arc::clone(&controller.context);
        let mut seeds = Vec::new();
        for audit in ctx.authorities().audit() {
            let key = keyring
                .private(audit)
                .ok_or(ConsensusError::MissingKey(*audit))?;
            for slot in 0..controller.elections.len() {
                seeds.push(VolunteerMessage::signed(
                    *audit,
                    slot,
                    ctx.height(),
                    ctx.minute(),
                    0,
                    key,
                    ctx.network(),
                ));
            }
        }
        controller.seeds = seeds;
        Ok(controller)
    }

    /// Clone for a search branch, sharing the context.
    pub fn clone_branch(&self) -> Result<Self, ConsensusError> {
        self.clone_with(CloneMode::ShareContext)
    }

    /// Clone with an explicit context policy.
    ///
    /// Fails with [`ConsensusError::Clone`] if the copy does not reproduce
    /// the source state.
    pub fn clone_with(&self, mode: CloneMode) -> Result<Self, ConsensusError> {
        let context = match mode {
            CloneMode::ShareContext => Arc::clone(&self.context),
            CloneMode::DuplicateContext => Arc::new(self.context.duplicate()),
        };
        let copy = Self {
            elections: self
                .elections
                .iter()
                .map(|e| e.rebind(Arc::clone(&context)))
                .collect(),
            context,
            view: self.view.clone(),
            seeds: self.seeds.clone(),
        };
        if copy.fingerprint() != self.fingerprint() || copy.view != self.view {
            return Err(ConsensusError::Clone(format!(
                "state fingerprint differs after {mode:?} clone"
            )));
        }
        Ok(copy)
    }

    /// Deliver a message and report everything it caused.
    ///
    /// Ticks go to every slot; election messages to the slot they address;
    /// block traffic is ignored.
    pub fn deliver(&mut self, message: &Message) -> Delivery {
        let mut delivery = Delivery::default();
        match message {
            Message::Tick(_) => {
                for election in &mut self.elections {
                    let exec = election.execute(message);
                    delivery.changed |= exec.changed;
                    let slot = election.slot();
                    delivery
                        .outbound
                        .extend(exec.outbound.into_iter().map(|m| (slot, m)));
                    self.view.record(election);
                }
            }
            Message::Block(_) => {
                delivery.rejection = Some(Rejection::NotElectionTraffic);
            }
            Message::Volunteer(_) | Message::Vote(_) | Message::Commit(_) => {
                let Some(slot) = message.slot() else {
                    return delivery;
                };
                let Some(election) = self.elections.get_mut(slot) else {
                    debug!(slot, slots = self.elections.len(), "message for unknown slot");
                    delivery.rejection = Some(Rejection::WrongSlot);
                    return delivery;
                };
                let exec = election.execute(message);
                delivery.changed = exec.changed;
                delivery.rejection = exec.rejection;
                delivery.outbound = exec.outbound.into_iter().map(|m| (slot, m)).collect();
                self.view.record(election);
            }
        }
        delivery
    }

    /// Route a message and return the outbound messages by slot.
    pub fn dispatch(&mut self, message: &Message) -> Vec<(SlotIndex, Message)> {
        self.deliver(message).outbound
    }

    /// Every election is committed, expired or halted.
    pub fn complete(&self) -> bool {
        self.elections.iter().all(Election::is_terminal)
    }

    pub fn committed_slots(&self) -> Vec<SlotIndex> {
        self.elections
            .iter()
            .filter(|e| e.is_committed())
            .map(Election::slot)
            .collect()
    }

    pub fn halted_slots(&self) -> Vec<SlotIndex> {
        self.elections
            .iter()
            .filter(|e| e.is_halted())
            .map(Election::slot)
            .collect()
    }

    /// First safety violation across the slots, if any.
    pub fn check_safety(&self) -> Result<(), ConsensusError> {
        self.elections.iter().try_for_each(Election::check_safety)
    }

    pub fn winner(&self, slot: SlotIndex) -> Option<IdentityChainId> {
        self.elections.get(slot).and_then(Election::committed_winner)
    }

    /// Blake2b digest of the normalized state of every election.
    pub fn fingerprint(&self) -> Digest256 {
        let mut bytes = Vec::with_capacity(self.elections.len() * 128);
        for election in &self.elections {
            election.encode_state(&mut bytes);
        }
        Digest256::new(blake2b_256(&bytes))
    }

    pub fn election(&self, slot: SlotIndex) -> Result<&Election, ConsensusError> {
        self.elections.get(slot).ok_or(ConsensusError::InvalidSlot {
            slot,
            slots: self.elections.len(),
        })
    }

    pub fn elections(&self) -> &[Election] {
        &self.elections
    }

    pub fn slot_count(&self) -> usize {
        self.elections.len()
    }

    pub fn context(&self) -> &Arc<SharedContext> {
        &self.context
    }

    pub fn view(&self) -> &GlobalView {
        &self.view
    }

    pub fn seeds(&self) -> &[VolunteerMessage] {
        &self.seeds
    }

    /// Hand the elections to their owners (one worker per slot).
    pub fn into_elections(self) -> Vec<Election> {
        self.elections
    }
}

impl fmt::Display for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:?} @{} quorum {}",
            self.context.local(),
            self.context.location(),
            self.context.quorum()
        )?;
        write!(f, "{}", self.view)
    }
}
