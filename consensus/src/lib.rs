//! Leader-fault elections.
//!
//! When a federated leader stops producing end-of-minute acknowledgments,
//! the surviving servers elect an audit server to take over its slot.
//!
//! ## Module overview
//!
//! - [`election`]: per-slot state machine (Idle → Collecting → Committed/Expired).
//! - [`controller`]: one node's elections across every slot, with explicit cloning.
//! - [`context`]: the immutable [`SharedContext`] elections share.
//! - [`view`]: cross-slot vote board.
//! - [`policy`]: pluggable quorum and tie-break rules.
//! - [`fault`]: EOM sync tracking and volunteer selection.
//! - [`keyring`]: signing keys for simulated authorities.
//! - [`error`]: consensus error types.

pub mod context;
pub mod controller;
pub mod election;
pub mod error;
pub mod fault;
pub mod keyring;
pub mod policy;
pub mod view;

pub use context::{CloneMode, SharedContext, DEFAULT_ELECTION_WINDOW};
pub use controller::{Controller, Delivery};
pub use election::{Election, ElectionState, Execution, Rejection, SafetyViolation};
pub use error::ConsensusError;
pub use fault::{FaultAction, FaultMonitor, SyncStatus};
pub use keyring::{Keyring, SIMULATION_KEY_DOMAIN};
pub use policy::{lowest_id, MajorityPolicy, QuorumPolicy};
pub use view::{GlobalView, SlotView};
