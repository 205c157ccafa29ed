//! Span constructors shared by the pipeline tasks, so traces from different
//! nodes of a loopback run can be told apart.

use fedchain_types::{DbHeight, IdentityChainId, SlotIndex};
use tracing::{info_span, Span};

/// The validator/router task of one node.
pub fn router_span(local: &IdentityChainId, height: DbHeight) -> Span {
    info_span!("router", node = %local.short(), %height)
}

/// The worker that owns the election for one leader slot.
pub fn slot_span(local: &IdentityChainId, slot: SlotIndex, height: DbHeight) -> Span {
    info_span!("slot", node = %local.short(), slot, %height)
}

/// The loopback pump forwarding one node's output to its peers.
pub fn pump_span(local: &IdentityChainId, peers: usize) -> Span {
    info_span!("pump", node = %local.short(), peers)
}
