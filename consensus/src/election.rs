//! Election state machine for one leader slot.
//!
//! An election is opened when the leader of a slot is suspected faulted.
//! Audit servers volunteer to take the slot, authorities vote for
//! volunteers, and the first volunteer to collect a quorum of distinct votes
//! wins. [`Election::execute`] is the only mutator and is a pure function of
//! the current state and the delivered message: no clock, no I/O, ordered
//! collections and deterministic Ed25519 signatures. Two copies that see the
//! same messages end in the same state.
//!
//! ```text
//!   Idle ──volunteer/vote──▶ Collecting ──quorum──▶ Committed
//!     │                          │
//!     └──────────tick past window┴──────────────▶ Expired
//! ```
//!
//! Voting rules:
//! - A voter's first vote binds it. A later vote for another candidate is an
//!   equivocation and is rejected.
//! - Votes for a candidate that has not volunteered yet are kept, but the
//!   candidate cannot win until its volunteer message arrives.
//! - Peer commit announcements are evidence only. A peer announcing a
//!   different winner than the one committed here halts the slot.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use fedchain_messages::{
    CommitAnnouncement, Message, Signed, Tick, VolunteerMessage, VoteMessage,
};
use fedchain_registry::{RegistryError, Role};
use fedchain_types::{DbHeight, IdentityChainId, MinuteLocation, SlotIndex};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::context::SharedContext;
use crate::error::ConsensusError;

/// Lifecycle state of an election.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElectionState {
    /// Opened, nothing accepted yet.
    #[default]
    Idle,
    /// At least one volunteer, vote or peer announcement accepted.
    Collecting,
    /// A volunteer reached quorum. Terminal.
    Committed,
    /// A tick passed the election window without a commit. Terminal.
    Expired,
}

impl ElectionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Expired)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Collecting => "collecting",
            Self::Committed => "committed",
            Self::Expired => "expired",
        }
    }

    fn code(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Collecting => 1,
            Self::Committed => 2,
            Self::Expired => 3,
        }
    }
}

/// Why a message was discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// Addressed to another slot.
    WrongSlot,
    /// Addressed to another height.
    WrongHeight,
    /// The election already committed or expired.
    Terminal,
    /// The slot is halted after a safety violation.
    Halted,
    /// Block-production traffic, not for elections.
    NotElectionTraffic,
    Unsigned,
    UnknownSigner,
    BadSignature,
    /// The signer is known but not an active authority at this height.
    Inactive,
    /// A volunteer that is not an audit server.
    NotAudit,
    /// A second, different vote or announcement from the same identity.
    Equivocation,
    /// A tick from outside the node. Only the local clock may close minutes.
    LocalOnly,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WrongSlot => "wrong_slot",
            Self::WrongHeight => "wrong_height",
            Self::Terminal => "terminal",
            Self::Halted => "halted",
            Self::NotElectionTraffic => "not_election_traffic",
            Self::Unsigned => "unsigned",
            Self::UnknownSigner => "unknown_signer",
            Self::BadSignature => "bad_signature",
            Self::Inactive => "inactive",
            Self::NotAudit => "not_audit",
            Self::Equivocation => "equivocation",
            Self::LocalOnly => "local_only",
        }
    }

    /// Stale messages belong to another slot, height or a finished election.
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            Self::WrongSlot | Self::WrongHeight | Self::Terminal | Self::Halted
        )
    }
}

impl From<RegistryError> for Rejection {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownIdentity(_) => Self::UnknownSigner,
            RegistryError::Inactive { .. } => Self::Inactive,
            _ => Self::BadSignature,
        }
    }
}

/// Result of delivering one message to an election.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Execution {
    /// Messages to send to peers (a vote, a commit announcement, or both).
    pub outbound: Vec<Message>,
    /// Whether the election state changed.
    pub changed: bool,
    pub rejection: Option<Rejection>,
}

impl Execution {
    fn unchanged() -> Self {
        Self::default()
    }

    fn rejected(rejection: Rejection) -> Self {
        Self {
            rejection: Some(rejection),
            ..Self::default()
        }
    }

    fn changed(outbound: Vec<Message>) -> Self {
        Self {
            outbound,
            changed: true,
            rejection: None,
        }
    }
}

/// Two different winners committed for the same slot and height.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SafetyViolation {
    /// Winner committed by this node.
    pub local: IdentityChainId,
    /// Winner a peer announced.
    pub peer: IdentityChainId,
    pub announcer: IdentityChainId,
}

/// Election for one leader slot at one height.
///
/// `Clone` deep-copies tallies, votes and outbox and shares the context.
#[derive(Clone, Debug)]
pub struct Election {
    slot: SlotIndex,
    height: DbHeight,
    opened_at: MinuteLocation,
    expires_at: MinuteLocation,
    state: ElectionState,
    /// Registered volunteers and the fault round they volunteered in.
    volunteers: BTreeMap<IdentityChainId, u32>,
    /// candidate → distinct voters.
    candidates: BTreeMap<IdentityChainId, BTreeSet<IdentityChainId>>,
    /// voter → candidate. A voter's first vote binds.
    ballots: BTreeMap<IdentityChainId, IdentityChainId>,
    committed_winner: Option<IdentityChainId>,
    /// announcer → announced winner.
    peer_commits: BTreeMap<IdentityChainId, IdentityChainId>,
    violation: Option<SafetyViolation>,
    outbox: Vec<Message>,
    context: Arc<SharedContext>,
}

impl Election {
    pub fn new(slot: SlotIndex, context: Arc<SharedContext>) -> Self {
        Self {
            slot,
            height: context.height(),
            opened_at: context.location(),
            expires_at: context.expiry(),
            state: ElectionState::Idle,
            volunteers: BTreeMap::new(),
            candidates: BTreeMap::new(),
            ballots: BTreeMap::new(),
            committed_winner: None,
            peer_commits: BTreeMap::new(),
            violation: None,
            outbox: Vec::new(),
            context,
        }
    }

    /// A copy of this election bound to another context.
    pub fn rebind(&self, context: Arc<SharedContext>) -> Self {
        Self {
            context,
            ..self.clone()
        }
    }

    /// Deliver one message.
    ///
    /// Never panics on bad input: anything that cannot be applied comes back
    /// with `changed == false` and a [`Rejection`].
    pub fn execute(&mut self, message: &Message) -> Execution {
        let execution = self.apply(message);
        if let Some(rejection) = execution.rejection {
            if rejection != Rejection::Equivocation {
                debug!(
                    slot = self.slot,
                    reason = rejection.as_str(),
                    %message,
                    "message rejected"
                );
            }
        }
        self.outbox.extend(execution.outbound.iter().cloned());
        execution
    }

    fn apply(&mut self, message: &Message) -> Execution {
        if self.is_halted() {
            return Execution::rejected(Rejection::Halted);
        }
        match message {
            Message::Tick(tick) => self.on_tick(tick),
            Message::Block(_) => Execution::rejected(Rejection::NotElectionTraffic),
            Message::Volunteer(m) => match self.admit(message, m.slot, m.height, false) {
                Ok(role) => self.on_volunteer(m, role),
                Err(rejection) => Execution::rejected(rejection),
            },
            Message::Vote(m) => match self.admit(message, m.slot, m.height, false) {
                Ok(_) => self.on_vote(m),
                Err(rejection) => Execution::rejected(rejection),
            },
            Message::Commit(m) => match self.admit(message, m.slot, m.height, true) {
                Ok(_) => self.on_commit(m),
                Err(rejection) => Execution::rejected(rejection),
            },
        }
    }

    /// Addressing, lifecycle and signature checks shared by signed messages.
    fn admit(
        &self,
        message: &Message,
        slot: SlotIndex,
        height: DbHeight,
        allow_committed: bool,
    ) -> Result<Role, Rejection> {
        if slot != self.slot {
            return Err(Rejection::WrongSlot);
        }
        if height != self.height {
            return Err(Rejection::WrongHeight);
        }
        match self.state {
            ElectionState::Expired => return Err(Rejection::Terminal),
            ElectionState::Committed if !allow_committed => return Err(Rejection::Terminal),
            _ => {}
        }
        let signed = message.as_signed().ok_or(Rejection::Unsigned)?;
        if signed.signature().is_empty() {
            return Err(Rejection::Unsigned);
        }
        let digest = signed.signing_digest(self.context.network());
        let role = self
            .context
            .authorities()
            .verify(&signed.signer(), digest.as_bytes(), signed.signature())?;
        Ok(role)
    }

    fn on_tick(&mut self, tick: &Tick) -> Execution {
        if self.state.is_terminal() {
            return Execution::unchanged();
        }
        if tick.location() < self.expires_at {
            return Execution::unchanged();
        }
        self.state = ElectionState::Expired;
        info!(
            slot = self.slot,
            height = %self.height,
            at = %tick.location(),
            "election expired without a winner"
        );
        Execution::changed(Vec::new())
    }

    fn on_volunteer(&mut self, m: &VolunteerMessage, role: Role) -> Execution {
        if role != Role::Audit {
            return Execution::rejected(Rejection::NotAudit);
        }
        if self.volunteers.contains_key(&m.proposer) {
            return Execution::unchanged();
        }
        self.volunteers.insert(m.proposer, m.round);
        self.state = ElectionState::Collecting;
        debug!(slot = self.slot, volunteer = ?m.proposer, round = m.round, "volunteer registered");

        let mut outbound = Vec::new();
        let local = self.context.local();
        if self.context.local_is_active() && !self.ballots.contains_key(&local) {
            self.record_ballot(local, m.proposer);
            let vote = VoteMessage::signed(
                local,
                m.proposer,
                self.slot,
                self.height,
                self.context.local_key(),
                self.context.network(),
            );
            outbound.push(Message::Vote(vote));
        }
        self.try_commit(m.proposer, &mut outbound);
        Execution::changed(outbound)
    }

    fn on_vote(&mut self, m: &VoteMessage) -> Execution {
        match self.ballots.get(&m.voter) {
            Some(existing) if *existing == m.candidate => return Execution::unchanged(),
            Some(existing) => {
                warn!(
                    slot = self.slot,
                    voter = ?m.voter,
                    first = ?existing,
                    second = ?m.candidate,
                    "equivocating vote rejected"
                );
                return Execution::rejected(Rejection::Equivocation);
            }
            None => {}
        }
        self.record_ballot(m.voter, m.candidate);
        self.state = ElectionState::Collecting;

        let mut outbound = Vec::new();
        self.try_commit(m.candidate, &mut outbound);
        Execution::changed(outbound)
    }

    fn on_commit(&mut self, m: &CommitAnnouncement) -> Execution {
        if m.announcer == self.context.local() {
            return Execution::unchanged();
        }
        if let Some(local) = self.committed_winner {
            if local == m.winner {
                return Execution::unchanged();
            }
            self.halt(SafetyViolation {
                local,
                peer: m.winner,
                announcer: m.announcer,
            });
            return Execution::changed(Vec::new());
        }
        match self.peer_commits.get(&m.announcer) {
            Some(existing) if *existing == m.winner => Execution::unchanged(),
            Some(existing) => {
                warn!(
                    slot = self.slot,
                    announcer = ?m.announcer,
                    first = ?existing,
                    second = ?m.winner,
                    "conflicting commit announcements from one peer"
                );
                Execution::rejected(Rejection::Equivocation)
            }
            None => {
                self.peer_commits.insert(m.announcer, m.winner);
                self.state = ElectionState::Collecting;
                Execution::changed(Vec::new())
            }
        }
    }

    fn record_ballot(&mut self, voter: IdentityChainId, candidate: IdentityChainId) {
        self.ballots.insert(voter, candidate);
        self.candidates.entry(candidate).or_default().insert(voter);
    }

    fn try_commit(&mut self, candidate: IdentityChainId, outbound: &mut Vec<Message>) {
        if self.committed_winner.is_some() || !self.volunteers.contains_key(&candidate) {
            return;
        }
        let tally = self.tally(&candidate);
        if tally < self.context.quorum() {
            return;
        }
        self.committed_winner = Some(candidate);
        self.state = ElectionState::Committed;
        info!(
            slot = self.slot,
            height = %self.height,
            winner = ?candidate,
            tally,
            quorum = self.context.quorum(),
            "election committed"
        );

        let conflict = self
            .peer_commits
            .iter()
            .find(|(_, winner)| **winner != candidate)
            .map(|(announcer, winner)| (*announcer, *winner));
        if let Some((announcer, peer)) = conflict {
            self.halt(SafetyViolation {
                local: candidate,
                peer,
                announcer,
            });
            return;
        }

        if self.context.local_is_active() {
            let announcement = CommitAnnouncement::signed(
                self.context.local(),
                self.slot,
                self.height,
                candidate,
                self.context.local_key(),
                self.context.network(),
            );
            outbound.push(Message::Commit(announcement));
        }
    }

    fn halt(&mut self, violation: SafetyViolation) {
        error!(
            slot = self.slot,
            height = %self.height,
            local = ?violation.local,
            peer = ?violation.peer,
            announcer = ?violation.announcer,
            "two winners committed for one slot, halting"
        );
        self.violation = Some(violation);
    }

    pub fn slot(&self) -> SlotIndex {
        self.slot
    }

    pub fn height(&self) -> DbHeight {
        self.height
    }

    pub fn opened_at(&self) -> MinuteLocation {
        self.opened_at
    }

    pub fn expires_at(&self) -> MinuteLocation {
        self.expires_at
    }

    pub fn state(&self) -> ElectionState {
        self.state
    }

    pub fn is_committed(&self) -> bool {
        self.committed_winner.is_some()
    }

    pub fn is_halted(&self) -> bool {
        self.violation.is_some()
    }

    /// Committed, expired or halted: no further message changes anything
    /// except peer announcements on a committed election.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal() || self.is_halted()
    }

    pub fn committed_winner(&self) -> Option<IdentityChainId> {
        self.committed_winner
    }

    /// Distinct voters for `candidate`.
    pub fn tally(&self, candidate: &IdentityChainId) -> usize {
        self.candidates.get(candidate).map_or(0, BTreeSet::len)
    }

    pub fn candidates(&self) -> &BTreeMap<IdentityChainId, BTreeSet<IdentityChainId>> {
        &self.candidates
    }

    pub fn volunteers(&self) -> &BTreeMap<IdentityChainId, u32> {
        &self.volunteers
    }

    /// The candidate `voter` is bound to, if it voted.
    pub fn ballot(&self, voter: &IdentityChainId) -> Option<IdentityChainId> {
        self.ballots.get(voter).copied()
    }

    pub fn peer_commits(&self) -> &BTreeMap<IdentityChainId, IdentityChainId> {
        &self.peer_commits
    }

    pub fn violation(&self) -> Option<SafetyViolation> {
        self.violation
    }

    /// `Err(SafetyViolation)` if the slot is halted.
    pub fn check_safety(&self) -> Result<(), ConsensusError> {
        match self.violation {
            None => Ok(()),
            Some(v) => Err(ConsensusError::SafetyViolation {
                slot: self.slot,
                height: self.height.as_u32(),
                local: v.local,
                peer: v.peer,
                announcer: v.announcer,
            }),
        }
    }

    /// Every message this election has produced, in order.
    pub fn outbox(&self) -> &[Message] {
        &self.outbox
    }

    pub fn context(&self) -> &Arc<SharedContext> {
        &self.context
    }

    /// The canonical winner across this node's commit and every peer
    /// announcement, resolved with the context's tie-break.
    pub fn canonical_winner(&self) -> Option<IdentityChainId> {
        let winners: Vec<IdentityChainId> = self
            .committed_winner
            .into_iter()
            .chain(self.peer_commits.values().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        self.context.policy().tie_break(&winners)
    }

    /// Canonical byte encoding of the election state, for fingerprints.
    ///
    /// Covers everything `execute` can change except the outbox, whose order
    /// depends on delivery order.
    pub fn encode_state(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.slot as u64).to_be_bytes());
        out.extend_from_slice(&self.height.as_u32().to_be_bytes());
        out.push(self.state.code());
        match self.committed_winner {
            Some(w) => {
                out.push(1);
                out.extend_from_slice(w.as_bytes());
            }
            None => out.push(0),
        }
        match self.violation {
            Some(v) => {
                out.push(1);
                out.extend_from_slice(v.peer.as_bytes());
                out.extend_from_slice(v.announcer.as_bytes());
            }
            None => out.push(0),
        }
        out.extend_from_slice(&(self.volunteers.len() as u32).to_be_bytes());
        for (id, round) in &self.volunteers {
            out.extend_from_slice(id.as_bytes());
            out.extend_from_slice(&round.to_be_bytes());
        }
        out.extend_from_slice(&(self.ballots.len() as u32).to_be_bytes());
        for (voter, candidate) in &self.ballots {
            out.extend_from_slice(voter.as_bytes());
            out.extend_from_slice(candidate.as_bytes());
        }
        out.extend_from_slice(&(self.peer_commits.len() as u32).to_be_bytes());
        for (announcer, winner) in &self.peer_commits {
            out.extend_from_slice(announcer.as_bytes());
            out.extend_from_slice(winner.as_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyring::Keyring;
    use fedchain_registry::AuthoritySet;
    use fedchain_types::NetworkId;

    fn id(n: u32) -> IdentityChainId {
        IdentityChainId::from_u32(n)
    }

    /// 3 federated (0..3) + 2 audit (3..5); local is federated 0.
    fn setup() -> (Election, Keyring) {
        let ids: Vec<_> = (0..5).map(id).collect();
        let ring = Keyring::simulated(ids.clone());
        let feds: Vec<_> = ids[..3].iter().map(|i| (*i, ring.public(i).unwrap())).collect();
        let audits: Vec<_> = ids[3..].iter().map(|i| (*i, ring.public(i).unwrap())).collect();
        let set = AuthoritySet::from_roster(DbHeight::new(1), &feds, &audits);
        let ctx = SharedContext::new(set, id(0), ring.private_copy(&id(0)).unwrap());
        (Election::new(1, Arc::new(ctx)), ring)
    }

    fn volunteer(ring: &Keyring, who: u32) -> Message {
        Message::Volunteer(VolunteerMessage::signed(
            id(who),
            1,
            DbHeight::new(1),
            0,
            0,
            ring.private(&id(who)).unwrap(),
            NetworkId::Local,
        ))
    }

    fn vote(ring: &Keyring, voter: u32, candidate: u32) -> Message {
        Message::Vote(VoteMessage::signed(
            id(voter),
            id(candidate),
            1,
            DbHeight::new(1),
            ring.private(&id(voter)).unwrap(),
            NetworkId::Local,
        ))
    }

    fn commit(ring: &Keyring, announcer: u32, winner: u32) -> Message {
        Message::Commit(CommitAnnouncement::signed(
            id(announcer),
            1,
            DbHeight::new(1),
            id(winner),
            ring.private(&id(announcer)).unwrap(),
            NetworkId::Local,
        ))
    }

    #[test]
    fn volunteer_triggers_local_vote() {
        let (mut e, ring) = setup();
        let exec = e.execute(&volunteer(&ring, 3));
        assert!(exec.changed);
        assert_eq!(e.state(), ElectionState::Collecting);
        assert_eq!(exec.outbound.len(), 1);
        let Message::Vote(v) = &exec.outbound[0] else {
            panic!("expected a vote");
        };
        assert_eq!(v.voter, id(0));
        assert_eq!(v.candidate, id(3));
        assert_eq!(e.tally(&id(3)), 1);
    }

    #[test]
    fn two_votes_do_not_commit_three_do() {
        let (mut e, ring) = setup();
        e.execute(&volunteer(&ring, 3));
        let exec = e.execute(&vote(&ring, 2, 3));
        assert!(exec.changed);
        assert!(!e.is_committed());
        assert_eq!(e.tally(&id(3)), 2);

        let exec = e.execute(&vote(&ring, 4, 3));
        assert!(exec.changed);
        assert_eq!(e.committed_winner(), Some(id(3)));
        assert_eq!(e.state(), ElectionState::Committed);
        assert!(matches!(exec.outbound.as_slice(), [Message::Commit(c)] if c.winner == id(3)));
    }

    #[test]
    fn duplicate_vote_is_a_noop() {
        let (mut e, ring) = setup();
        e.execute(&volunteer(&ring, 3));
        assert!(e.execute(&vote(&ring, 2, 3)).changed);
        let again = e.execute(&vote(&ring, 2, 3));
        assert!(!again.changed);
        assert_eq!(again.rejection, None);
        assert_eq!(e.tally(&id(3)), 2);
    }

    #[test]
    fn equivocating_vote_is_rejected() {
        let (mut e, ring) = setup();
        e.execute(&volunteer(&ring, 3));
        e.execute(&volunteer(&ring, 4));
        assert!(e.execute(&vote(&ring, 2, 3)).changed);
        let second = e.execute(&vote(&ring, 2, 4));
        assert!(!second.changed);
        assert_eq!(second.rejection, Some(Rejection::Equivocation));
        assert_eq!(e.ballot(&id(2)), Some(id(3)));
        assert_eq!(e.tally(&id(4)), 0);
    }

    #[test]
    fn votes_before_volunteer_wait_for_it() {
        let (mut e, ring) = setup();
        e.execute(&vote(&ring, 1, 3));
        e.execute(&vote(&ring, 2, 3));
        assert!(!e.is_committed());
        // Local vote on arrival makes three.
        let exec = e.execute(&volunteer(&ring, 3));
        assert_eq!(e.committed_winner(), Some(id(3)));
        assert_eq!(exec.outbound.len(), 2);
        assert!(matches!(exec.outbound[0], Message::Vote(_)));
        assert!(matches!(exec.outbound[1], Message::Commit(_)));
    }

    #[test]
    fn committed_election_discards_votes() {
        let (mut e, ring) = setup();
        e.execute(&volunteer(&ring, 3));
        e.execute(&vote(&ring, 1, 3));
        e.execute(&vote(&ring, 2, 3));
        assert!(e.is_committed());
        let late = e.execute(&vote(&ring, 4, 3));
        assert!(!late.changed);
        assert_eq!(late.rejection, Some(Rejection::Terminal));
    }

    #[test]
    fn unsigned_and_forged_messages_are_rejected() {
        let (mut e, ring) = setup();
        let Message::Vote(mut forged) = vote(&ring, 2, 3) else {
            unreachable!()
        };
        forged.candidate = id(4);
        let exec = e.execute(&Message::Vote(forged.clone()));
        assert_eq!(exec.rejection, Some(Rejection::BadSignature));

        forged.signature = fedchain_types::Signature::EMPTY;
        let exec = e.execute(&Message::Vote(forged));
        assert_eq!(exec.rejection, Some(Rejection::Unsigned));
        assert_eq!(e.state(), ElectionState::Idle);
    }

    #[test]
    fn federated_volunteer_is_ineligible() {
        let (mut e, ring) = setup();
        let exec = e.execute(&volunteer(&ring, 2));
        assert_eq!(exec.rejection, Some(Rejection::NotAudit));
        assert!(e.volunteers().is_empty());
    }

    #[test]
    fn unknown_voter_is_rejected() {
        let (mut e, _) = setup();
        let outsider = Keyring::simulated([id(42)]);
        let msg = Message::Vote(VoteMessage::signed(
            id(42),
            id(3),
            1,
            DbHeight::new(1),
            outsider.private(&id(42)).unwrap(),
            NetworkId::Local,
        ));
        assert_eq!(e.execute(&msg).rejection, Some(Rejection::UnknownSigner));
    }

    #[test]
    fn other_slot_and_height_are_stale() {
        let (mut e, ring) = setup();
        let other_slot = Message::Vote(VoteMessage::signed(
            id(2),
            id(3),
            0,
            DbHeight::new(1),
            ring.private(&id(2)).unwrap(),
            NetworkId::Local,
        ));
        let other_height = Message::Vote(VoteMessage::signed(
            id(2),
            id(3),
            1,
            DbHeight::new(2),
            ring.private(&id(2)).unwrap(),
            NetworkId::Local,
        ));
        assert_eq!(e.execute(&other_slot).rejection, Some(Rejection::WrongSlot));
        assert_eq!(e.execute(&other_height).rejection, Some(Rejection::WrongHeight));
    }

    #[test]
    fn tick_past_window_expires() {
        let (mut e, ring) = setup();
        e.execute(&volunteer(&ring, 3));
        let early = e.execute(&Message::Tick(Tick::new(DbHeight::new(1), 9)));
        assert!(!early.changed);
        let late = e.execute(&Message::Tick(Tick::new(DbHeight::new(2), 0)));
        assert!(late.changed);
        assert_eq!(e.state(), ElectionState::Expired);
        assert!(!e.execute(&Message::Tick(Tick::new(DbHeight::new(3), 0))).changed);
        assert_eq!(
            e.execute(&vote(&ring, 2, 3)).rejection,
            Some(Rejection::Terminal)
        );
    }

    #[test]
    fn peer_announcement_alone_never_commits() {
        let (mut e, ring) = setup();
        e.execute(&volunteer(&ring, 3));
        let exec = e.execute(&commit(&ring, 1, 3));
        assert!(exec.changed);
        assert!(!e.is_committed());
        assert!(!e.execute(&commit(&ring, 1, 3)).changed);
    }

    #[test]
    fn matching_peer_announcement_is_a_noop() {
        let (mut e, ring) = setup();
        e.execute(&volunteer(&ring, 3));
        e.execute(&vote(&ring, 1, 3));
        e.execute(&vote(&ring, 2, 3));
        assert!(!e.execute(&commit(&ring, 1, 3)).changed);
        assert!(e.check_safety().is_ok());
    }

    #[test]
    fn conflicting_announcement_halts_the_slot() {
        let (mut e, ring) = setup();
        e.execute(&volunteer(&ring, 4));
        e.execute(&vote(&ring, 1, 4));
        e.execute(&vote(&ring, 2, 4));
        assert_eq!(e.committed_winner(), Some(id(4)));

        let exec = e.execute(&commit(&ring, 3, 3));
        assert!(exec.changed);
        assert!(exec.outbound.is_empty());
        assert!(e.is_halted());
        assert!(matches!(
            e.check_safety(),
            Err(ConsensusError::SafetyViolation { slot: 1, .. })
        ));
        assert_eq!(e.canonical_winner(), Some(id(3)));
        // The winner never reverts.
        assert_eq!(e.committed_winner(), Some(id(4)));

        let after = e.execute(&commit(&ring, 1, 3));
        assert!(!after.changed);
        assert_eq!(after.rejection, Some(Rejection::Halted));
    }

    #[test]
    fn conflicting_evidence_halts_on_local_commit() {
        let (mut e, ring) = setup();
        e.execute(&commit(&ring, 3, 3));
        e.execute(&volunteer(&ring, 4));
        e.execute(&vote(&ring, 1, 4));
        let exec = e.execute(&vote(&ring, 2, 4));
        assert!(e.is_committed());
        assert!(e.is_halted());
        assert!(exec.outbound.is_empty());
    }

    #[test]
    fn clone_shares_context_but_not_state() {
        let (mut e, ring) = setup();
        e.execute(&volunteer(&ring, 3));
        let mut copy = e.clone();
        copy.execute(&vote(&ring, 2, 3));
        assert!(Arc::ptr_eq(e.context(), copy.context()));
        assert_eq!(e.tally(&id(3)), 1);
        assert_eq!(copy.tally(&id(3)), 2);
    }
}
