//! Exhaustive exploration of election message orderings.
//!
//! [`dive`] walks every delivery order of a pool of directed messages,
//! cloning the full state before each delivery and backtracking after it.
//! A branch stops at the depth bound or as soon as any election commits.
//! Everything the walk learns is accumulated in a [`SearchContext`].
//!
//! Two [`SearchSpace`]s are provided: [`SlotScenario`] replays one node's
//! controller against seeded peer votes, [`Federation`] runs one controller
//! per authority and broadcasts every outbound message to the others.

pub mod context;
pub mod dive;
pub mod error;
pub mod roster;
pub mod space;

pub use context::{DepthCounters, SearchConfig, SearchContext, SearchReport};
pub use dive::{dive, explore, Outcome};
pub use error::SearchError;
pub use roster::Roster;
pub use space::{Directed, Federation, SearchSpace, SlotScenario, Step};
