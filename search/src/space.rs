//! What the search explores.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use fedchain_consensus::{ConsensusError, Controller, SharedContext};
use fedchain_crypto::blake2b_256_multi;
use fedchain_messages::{Message, VoteMessage};
use fedchain_types::{Digest256, IdentityChainId, SlotIndex};

use crate::error::SearchError;
use crate::roster::Roster;

/// A message addressed to one node of the space.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Directed {
    pub target: usize,
    pub message: Message,
}

impl Directed {
    pub fn new(target: usize, message: Message) -> Self {
        Self { target, message }
    }
}

impl fmt::Display for Directed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "->{} {}", self.target, self.message)
    }
}

/// Result of delivering one directed message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Step {
    pub changed: bool,
    /// Outbound messages, already addressed.
    pub follow_ups: Vec<Directed>,
}

/// A state the search can clone, deliver into and inspect.
pub trait SearchSpace: Sized {
    /// The message pool the search starts from.
    fn initial(&self) -> Vec<Directed>;

    /// Independent copy for a branch.
    fn branch(&self) -> Result<Self, SearchError>;

    /// Whether `directed` can still matter (its target election is open).
    fn accepts(&self, directed: &Directed) -> bool;

    fn deliver(&mut self, directed: &Directed) -> Step;

    /// Winner of the first committed election, if any.
    fn solution(&self) -> Option<(SlotIndex, IdentityChainId)>;

    /// Local halts and cross-node disagreements.
    fn check_safety(&self) -> Result<(), ConsensusError>;

    /// Digest of the normalized state, for mirror detection.
    fn fingerprint(&self) -> Digest256;

    /// Human-readable state, logged with the first solution.
    fn describe(&self) -> String;
}

/// One node's controller, with the volunteers for a faulted slot and a vote
/// from every other surviving authority for every volunteer.
///
/// Votes bind on first arrival, so for each peer only the first of its votes
/// delivered counts and the rest are equivocations.
pub struct SlotScenario {
    controller: Controller,
    initial: Vec<Directed>,
}

impl SlotScenario {
    pub fn new(
        roster: &Roster,
        local: IdentityChainId,
        faulted: SlotIndex,
    ) -> Result<Self, SearchError> {
        let leader = roster.authorities.leader(faulted).ok_or_else(|| {
            SearchError::InvalidScenario(format!(
                "slot {faulted} out of range ({} leaders)",
                roster.federated.len()
            ))
        })?;
        if local == leader {
            return Err(SearchError::InvalidScenario(
                "local node is the faulted leader".to_string(),
            ));
        }
        let key = roster
            .keyring
            .private_copy(&local)
            .ok_or(ConsensusError::MissingKey(local))?;
        let context = Arc::new(SharedContext::new(
            Arc::clone(&roster.authorities),
            local,
            key,
        ));
        let controller = Controller::with_seeds(Arc::clone(&context), &roster.keyring)?;

        let mut initial: Vec<Directed> = controller
            .seeds()
            .iter()
            .filter(|s| s.slot == faulted)
            .map(|s| Directed::new(0, Message::Volunteer(s.clone())))
            .collect();
        for peer in roster.all().filter(|id| *id != local && *id != leader) {
            let key = roster
                .keyring
                .private(&peer)
                .ok_or(ConsensusError::MissingKey(peer))?;
            for candidate in &roster.audit {
                let vote = VoteMessage::signed(
                    peer,
                    *candidate,
                    faulted,
                    context.height(),
                    key,
                    context.network(),
                );
                initial.push(Directed::new(0, Message::Vote(vote)));
            }
        }
        Ok(Self {
            controller,
            initial,
        })
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }
}

impl SearchSpace for SlotScenario {
    fn initial(&self) -> Vec<Directed> {
        self.initial.clone()
    }

    fn branch(&self) -> Result<Self, SearchError> {
        Ok(Self {
            controller: self.controller.clone_branch()?,
            initial: Vec::new(),
        })
    }

    fn accepts(&self, directed: &Directed) -> bool {
        accepts(&self.controller, &directed.message)
    }

    fn deliver(&mut self, directed: &Directed) -> Step {
        let delivery = self.controller.deliver(&directed.message);
        // Peers are not simulated; their votes are already in the pool.
        Step {
            changed: delivery.changed,
            follow_ups: Vec::new(),
        }
    }

    fn solution(&self) -> Option<(SlotIndex, IdentityChainId)> {
        first_commit(&self.controller)
    }

    fn check_safety(&self) -> Result<(), ConsensusError> {
        self.controller.check_safety()
    }

    fn fingerprint(&self) -> Digest256 {
        self.controller.fingerprint()
    }

    fn describe(&self) -> String {
        self.controller.to_string()
    }
}

/// One controller per surviving authority. Every outbound message is
/// broadcast to every other node.
pub struct Federation {
    nodes: Vec<Controller>,
    initial: Vec<Directed>,
}

impl Federation {
    pub fn new(roster: &Roster, faulted: SlotIndex) -> Result<Self, SearchError> {
        let leader = roster.authorities.leader(faulted).ok_or_else(|| {
            SearchError::InvalidScenario(format!("slot {faulted} out of range"))
        })?;
        let mut nodes = Vec::new();
        for identity in roster.all().filter(|id| *id != leader) {
            let key = roster
                .keyring
                .private_copy(&identity)
                .ok_or(ConsensusError::MissingKey(identity))?;
            let context = Arc::new(SharedContext::new(
                Arc::clone(&roster.authorities),
                identity,
                key,
            ));
            nodes.push(Controller::with_seeds(context, &roster.keyring)?);
        }
        let Some(first) = nodes.first() else {
            return Err(SearchError::InvalidScenario("no surviving nodes".to_string()));
        };
        let volunteers: Vec<Message> = first
            .seeds()
            .iter()
            .filter(|s| s.slot == faulted)
            .map(|s| Message::Volunteer(s.clone()))
            .collect();
        let initial = volunteers
            .iter()
            .flat_map(|m| (0..nodes.len()).map(move |target| Directed::new(target, m.clone())))
            .collect();
        Ok(Self { nodes, initial })
    }

    pub fn nodes(&self) -> &[Controller] {
        &self.nodes
    }
}

impl SearchSpace for Federation {
    fn initial(&self) -> Vec<Directed> {
        self.initial.clone()
    }

    fn branch(&self) -> Result<Self, SearchError> {
        let nodes = self
            .nodes
            .iter()
            .map(Controller::clone_branch)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            nodes,
            initial: Vec::new(),
        })
    }

    fn accepts(&self, directed: &Directed) -> bool {
        self.nodes
            .get(directed.target)
            .is_some_and(|node| accepts(node, &directed.message))
    }

    fn deliver(&mut self, directed: &Directed) -> Step {
        let Some(node) = self.nodes.get_mut(directed.target) else {
            return Step::default();
        };
        let delivery = node.deliver(&directed.message);
        let count = self.nodes.len();
        let follow_ups = delivery
            .outbound
            .into_iter()
            .flat_map(|(_, message)| {
                (0..count)
                    .filter(move |peer| *peer != directed.target)
                    .map(move |peer| Directed::new(peer, message.clone()))
            })
            .collect();
        Step {
            changed: delivery.changed,
            follow_ups,
        }
    }

    fn solution(&self) -> Option<(SlotIndex, IdentityChainId)> {
        self.nodes.iter().find_map(first_commit)
    }

    fn check_safety(&self) -> Result<(), ConsensusError> {
        let mut winners: BTreeMap<SlotIndex, (IdentityChainId, IdentityChainId)> = BTreeMap::new();
        for node in &self.nodes {
            node.check_safety()?;
            for slot in node.committed_slots() {
                let Some(winner) = node.winner(slot) else {
                    continue;
                };
                let local = node.context().local();
                match winners.get(&slot) {
                    Some((first, _)) if *first == winner => {}
                    Some((first, _)) => {
                        return Err(ConsensusError::SafetyViolation {
                            slot,
                            height: node.context().height().as_u32(),
                            local: *first,
                            peer: winner,
                            announcer: local,
                        });
                    }
                    None => {
                        winners.insert(slot, (winner, local));
                    }
                }
            }
        }
        Ok(())
    }

    fn fingerprint(&self) -> Digest256 {
        let prints: Vec<Digest256> = self.nodes.iter().map(Controller::fingerprint).collect();
        let parts: Vec<&[u8]> = prints.iter().map(|d| d.as_bytes().as_slice()).collect();
        Digest256::new(blake2b_256_multi(&parts))
    }

    fn describe(&self) -> String {
        self.nodes
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn accepts(controller: &Controller, message: &Message) -> bool {
    match message.slot() {
        Some(slot) => controller
            .election(slot)
            .is_ok_and(|e| !e.is_terminal()),
        None => !controller.complete(),
    }
}

fn first_commit(controller: &Controller) -> Option<(SlotIndex, IdentityChainId)> {
    controller
        .committed_slots()
        .first()
        .and_then(|slot| controller.winner(*slot).map(|w| (*slot, w)))
}
