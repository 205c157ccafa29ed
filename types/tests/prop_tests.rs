use proptest::prelude::*;

use fedchain_types::{DbHeight, IdentityChainId, MinuteLocation, MINUTES_PER_BLOCK};

proptest! {
    /// IdentityChainId ordering is byte-lexicographic.
    #[test]
    fn identity_order_matches_bytes(a in prop::array::uniform32(0u8..), b in prop::array::uniform32(0u8..)) {
        let ia = IdentityChainId::new(a);
        let ib = IdentityChainId::new(b);
        prop_assert_eq!(ia.cmp(&ib), a.cmp(&b));
    }

    /// from_u32 preserves numeric order.
    #[test]
    fn identity_from_u32_monotone(a in 0u32..u32::MAX, b in 0u32..u32::MAX) {
        let ia = IdentityChainId::from_u32(a);
        let ib = IdentityChainId::from_u32(b);
        prop_assert_eq!(ia < ib, a < b);
    }

    /// MinuteLocation::advance agrees with absolute minute arithmetic.
    #[test]
    fn advance_is_additive(h in 0u32..1_000_000, m in 0u8..MINUTES_PER_BLOCK, d in 0u32..10_000) {
        let loc = MinuteLocation::new(DbHeight::new(h), m);
        let moved = loc.advance(d);
        prop_assert_eq!(moved.absolute(), loc.absolute() + u64::from(d));
        prop_assert!(moved.minute < MINUTES_PER_BLOCK);
        prop_assert!(moved >= loc);
    }

    /// IdentityChainId bincode serialization roundtrip.
    #[test]
    fn identity_bincode_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let id = IdentityChainId::new(bytes);
        let encoded = bincode::serialize(&id).unwrap();
        let decoded: IdentityChainId = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, id);
    }
}
