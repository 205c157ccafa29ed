//! Cross-slot vote board and commit record.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use fedchain_types::{IdentityChainId, SlotIndex};

use crate::election::{Election, ElectionState};

/// What one slot looked like after the last delivery.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlotView {
    pub state: ElectionState,
    pub volunteers: BTreeSet<IdentityChainId>,
    /// candidate → distinct voters.
    pub tallies: BTreeMap<IdentityChainId, BTreeSet<IdentityChainId>>,
    pub winner: Option<IdentityChainId>,
    /// announcer → announced winner.
    pub peer_commits: BTreeMap<IdentityChainId, IdentityChainId>,
    pub halted: bool,
}

impl SlotView {
    fn of(election: &Election) -> Self {
        Self {
            state: election.state(),
            volunteers: election.volunteers().keys().copied().collect(),
            tallies: election.candidates().clone(),
            winner: election.committed_winner(),
            peer_commits: election.peer_commits().clone(),
            halted: election.is_halted(),
        }
    }
}

/// The vote board across every slot of a controller.
///
/// Updated after each delivery. Always deep-copied when a controller is
/// cloned.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GlobalView {
    slots: BTreeMap<SlotIndex, SlotView>,
    deliveries: u64,
}

impl GlobalView {
    pub fn new(elections: &[Election]) -> Self {
        Self {
            slots: elections
                .iter()
                .map(|e| (e.slot(), SlotView::of(e)))
                .collect(),
            deliveries: 0,
        }
    }

    /// Refresh `slot` from its election after a delivery.
    pub fn record(&mut self, election: &Election) {
        self.deliveries += 1;
        self.slots.insert(election.slot(), SlotView::of(election));
    }

    pub fn slot(&self, slot: SlotIndex) -> Option<&SlotView> {
        self.slots.get(&slot)
    }

    /// Committed winners by slot.
    pub fn commits(&self) -> BTreeMap<SlotIndex, IdentityChainId> {
        self.slots
            .iter()
            .filter_map(|(slot, v)| v.winner.map(|w| (*slot, w)))
            .collect()
    }

    pub fn deliveries(&self) -> u64 {
        self.deliveries
    }
}

impl fmt::Display for GlobalView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>4}  {:<10}  {:<11}  votes", "slot", "state", "winner")?;
        for (slot, view) in &self.slots {
            let state = if view.halted {
                "HALTED"
            } else {
                view.state.as_str()
            };
            let winner = view
                .winner
                .map(|w| format!("{w:?}"))
                .unwrap_or_else(|| "-".to_string());
            write!(f, "{slot:>4}  {state:<10}  {winner:<11} ")?;
            for (candidate, voters) in &view.tallies {
                let mark = if view.volunteers.contains(candidate) {
                    ""
                } else {
                    "?"
                };
                write!(f, " {candidate:?}{mark}={}", voters.len())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
