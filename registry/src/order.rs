//! Audit-server volunteer priority.
//!
//! When a leader faults, every audit server computes the same priority for
//! each audit candidate; the highest priority volunteers first. Including the
//! round means a candidate that failed to take over is displaced when the
//! round is bumped.

use fedchain_crypto::sha256;
use fedchain_types::{DbHeight, IdentityChainId, SlotIndex};

/// Priority of `identity` for replacing `slot` at `(height, minute)` in `round`.
///
/// SHA-256 over `round (u32 BE) | height (u32 BE) | minute | slot (u16 BE) |
/// chain ID`. Larger digests rank higher.
pub fn volunteer_priority(
    identity: &IdentityChainId,
    height: DbHeight,
    minute: u8,
    slot: SlotIndex,
    round: u32,
) -> [u8; 32] {
    let slot = u16::try_from(slot).unwrap_or(u16::MAX);
    let mut data = Vec::with_capacity(4 + 4 + 1 + 2 + 32);
    data.extend_from_slice(&round.to_be_bytes());
    data.extend_from_slice(&height.as_u32().to_be_bytes());
    data.push(minute);
    data.extend_from_slice(&slot.to_be_bytes());
    data.extend_from_slice(identity.as_bytes());
    sha256(&data)
}

/// Sort `candidates` from highest to lowest priority.
///
/// Equal digests (not expected in practice) fall back to chain-ID order.
pub fn rank(
    candidates: &mut [IdentityChainId],
    height: DbHeight,
    minute: u8,
    slot: SlotIndex,
    round: u32,
) {
    candidates.sort_by_cached_key(|id| {
        (
            std::cmp::Reverse(volunteer_priority(id, height, minute, slot, round)),
            *id,
        )
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: u32) -> Vec<IdentityChainId> {
        (0..n).map(IdentityChainId::from_u32).collect()
    }

    #[test]
    fn ranking_is_deterministic() {
        let mut a = ids(6);
        let mut b = ids(6);
        b.reverse();
        rank(&mut a, DbHeight::new(3), 4, 1, 0);
        rank(&mut b, DbHeight::new(3), 4, 1, 0);
        assert_eq!(a, b);
    }

    #[test]
    fn round_changes_priority() {
        let id = IdentityChainId::from_u32(7);
        let r0 = volunteer_priority(&id, DbHeight::new(1), 0, 0, 0);
        let r1 = volunteer_priority(&id, DbHeight::new(1), 0, 0, 1);
        assert_ne!(r0, r1);
    }

    #[test]
    fn first_ranked_has_max_priority() {
        let mut c = ids(8);
        rank(&mut c, DbHeight::new(9), 2, 3, 1);
        let top = volunteer_priority(&c[0], DbHeight::new(9), 2, 3, 1);
        for id in &c[1..] {
            assert!(top >= volunteer_priority(id, DbHeight::new(9), 2, 3, 1));
        }
    }
}
