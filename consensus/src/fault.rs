//! Leader fault detection.
//!
//! Every minute each federated leader signals end-of-minute (EOM). The
//! monitor records which leaders have synced for the current minute. When the
//! minute times out it picks the first silent leader's slot, bumps that
//! slot's round and, if this node is the audit server with the highest
//! volunteer priority for the slot and round, produces a signed volunteer.
//! The timer itself is external: a [`Tick`] for a minute is its timeout.

use std::collections::BTreeMap;
use std::sync::Arc;

use fedchain_messages::{BlockKind, BlockMessage, Tick, VolunteerMessage};
use fedchain_registry::rank;
use fedchain_types::{MinuteLocation, SlotIndex};
use tracing::{debug, info, warn};

use crate::context::SharedContext;

/// Result of feeding the monitor an EOM.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncStatus {
    /// Not an EOM, not from a leader, or for an older minute.
    Ignored,
    /// Recorded; some leaders still missing.
    Pending { missing: usize },
    /// Every leader has synced this minute. Rounds reset.
    Complete,
}

/// Result of a minute timing out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FaultAction {
    /// The timeout is for a minute older than the one being tracked.
    Stale,
    /// Every leader synced.
    AllSynced,
    /// More than half of the leaders are silent; the node cannot tell whether
    /// it is the one partitioned off, so it waits for the next timeout.
    GiveUp { silent: usize },
    /// `slot` is faulted in `round`. `volunteer` is set when this node is the
    /// top-priority audit server for it.
    Fault {
        slot: SlotIndex,
        round: u32,
        volunteer: Option<VolunteerMessage>,
    },
}

/// Tracks leader EOM sync for one minute at a time.
#[derive(Clone, Debug)]
pub struct FaultMonitor {
    context: Arc<SharedContext>,
    location: Option<MinuteLocation>,
    synced: Vec<bool>,
    rounds: BTreeMap<SlotIndex, u32>,
}

impl FaultMonitor {
    pub fn new(context: Arc<SharedContext>) -> Self {
        Self {
            context,
            location: None,
            synced: Vec::new(),
            rounds: BTreeMap::new(),
        }
    }

    fn leaders(&self) -> usize {
        self.context.authorities().slot_count()
    }

    /// Start tracking `location` if it is newer than the current minute.
    fn enter(&mut self, location: MinuteLocation) -> bool {
        match self.location {
            Some(current) if current > location => false,
            Some(current) if current == location => true,
            _ => {
                debug!(at = %location, leaders = self.leaders(), "sync starting");
                self.location = Some(location);
                self.synced = vec![false; self.leaders()];
                true
            }
        }
    }

    pub fn observe_eom(&mut self, message: &BlockMessage) -> SyncStatus {
        if message.kind != BlockKind::Eom {
            return SyncStatus::Ignored;
        }
        let Some(slot) = self.context.authorities().slot_of(&message.sender) else {
            return SyncStatus::Ignored;
        };
        if !self.enter(MinuteLocation::new(message.height, message.minute)) {
            return SyncStatus::Ignored;
        }
        self.synced[slot] = true;
        let missing = self.synced.iter().filter(|s| !**s).count();
        if missing == 0 {
            self.rounds.clear();
            debug!(leaders = self.synced.len(), "sync complete");
            SyncStatus::Complete
        } else {
            SyncStatus::Pending { missing }
        }
    }

    /// Handle the timeout for `tick`'s minute.
    pub fn on_timeout(&mut self, tick: &Tick) -> FaultAction {
        let location = tick.location();
        if !self.enter(location) {
            return FaultAction::Stale;
        }
        let silent = self.synced.iter().filter(|s| !**s).count();
        let Some(slot) = self.synced.iter().position(|s| !*s) else {
            return FaultAction::AllSynced;
        };

        let round = {
            let r = self.rounds.entry(slot).or_insert(0);
            *r += 1;
            *r
        };

        if silent > self.leaders() / 2 {
            warn!(silent, leaders = self.leaders(), at = %location, "majority of leaders silent, not electing");
            return FaultAction::GiveUp { silent };
        }

        info!(slot, round, silent, at = %location, "leader fault detected");
        let mut order = self.context.authorities().audit().to_vec();
        rank(&mut order, location.height, location.minute, slot, round);
        let local = self.context.local();
        let volunteer = (order.first() == Some(&local)).then(|| {
            VolunteerMessage::signed(
                local,
                slot,
                location.height,
                location.minute,
                round,
                self.context.local_key(),
                self.context.network(),
            )
        });
        FaultAction::Fault {
            slot,
            round,
            volunteer,
        }
    }

    pub fn round(&self, slot: SlotIndex) -> u32 {
        self.rounds.get(&slot).copied().unwrap_or(0)
    }

    pub fn location(&self) -> Option<MinuteLocation> {
        self.location
    }
}
