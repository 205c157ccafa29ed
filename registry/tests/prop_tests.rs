use fedchain_registry::{AuthorityRegistry, AuthorityStatus};
use fedchain_types::{DbHeight, IdentityChainId};
use proptest::prelude::*;

fn status_strategy() -> impl Strategy<Value = AuthorityStatus> {
    prop_oneof![
        Just(AuthorityStatus::Unassigned),
        Just(AuthorityStatus::Pending),
        Just(AuthorityStatus::Federated),
        Just(AuthorityStatus::Audit),
        Just(AuthorityStatus::Full),
    ]
}

proptest! {
    #[test]
    fn quorum_is_strict_majority_of_active(statuses in prop::collection::vec(status_strategy(), 0..40)) {
        let mut reg = AuthorityRegistry::new();
        for (n, status) in statuses.iter().enumerate() {
            let index = reg.add(IdentityChainId::from_u32(n as u32)).unwrap();
            reg.set_status(index, *status, DbHeight::GENESIS).unwrap();
        }
        let active = statuses.iter().filter(|s| s.is_active()).count();
        let quorum = reg.quorum_size(DbHeight::GENESIS);

        prop_assert_eq!(quorum, active / 2 + 1);
        // Two disjoint sets of voters can never both reach quorum.
        prop_assert!(2 * quorum > active);
        prop_assert_eq!(reg.snapshot(DbHeight::GENESIS).quorum_size(), quorum);
    }

    #[test]
    fn find_tracks_adds_and_removes(removals in prop::collection::vec(any::<bool>(), 1..30)) {
        let mut reg = AuthorityRegistry::new();
        let indices: Vec<_> = (0..removals.len())
            .map(|n| reg.add(IdentityChainId::from_u32(n as u32)).unwrap())
            .collect();
        for (index, remove) in indices.iter().zip(&removals) {
            if *remove {
                reg.remove(*index).unwrap();
            }
        }
        for (n, (index, removed)) in indices.iter().zip(&removals).enumerate() {
            let id = IdentityChainId::from_u32(n as u32);
            if *removed {
                prop_assert_eq!(reg.find(&id), None);
                prop_assert!(reg.get(*index).is_err());
            } else {
                prop_assert_eq!(reg.find(&id), Some(*index));
                prop_assert_eq!(reg.get(*index).unwrap().identity, id);
            }
        }
        prop_assert_eq!(reg.len(), removals.iter().filter(|r| !**r).count());
    }
}
