use std::sync::Arc;

use fedchain_consensus::{Controller, Election, Keyring, SharedContext};
use fedchain_messages::{CommitAnnouncement, Message, VoteMessage};
use fedchain_registry::AuthoritySet;
use fedchain_types::{DbHeight, IdentityChainId, NetworkId, SlotIndex};
use proptest::prelude::*;

const HEIGHT: DbHeight = DbHeight::GENESIS;

fn id(n: u32) -> IdentityChainId {
    IdentityChainId::from_u32(n)
}

/// `feds` federated servers (ids 0..feds) and `audits` audit servers after
/// them. Local node is federated 0.
fn setup(feds: u32, audits: u32) -> (Controller, Keyring) {
    let ids: Vec<_> = (0..feds + audits).map(id).collect();
    let ring = Keyring::simulated(ids.clone());
    let split = feds as usize;
    let f: Vec<_> = ids[..split].iter().map(|i| (*i, ring.public(i).unwrap())).collect();
    let a: Vec<_> = ids[split..].iter().map(|i| (*i, ring.public(i).unwrap())).collect();
    let set = AuthoritySet::from_roster(HEIGHT, &f, &a);
    let ctx = SharedContext::new(set, id(0), ring.private_copy(&id(0)).unwrap());
    (Controller::with_seeds(Arc::new(ctx), &ring).unwrap(), ring)
}

fn vote(ring: &Keyring, voter: u32, candidate: u32, slot: SlotIndex) -> Message {
    Message::Vote(VoteMessage::signed(
        id(voter),
        id(candidate),
        slot,
        HEIGHT,
        ring.private(&id(voter)).unwrap(),
        NetworkId::Local,
    ))
}

/// Seeds for slot 1 plus a vote from every non-local authority for every
/// audit candidate (so equivocations are in the pool).
fn message_pool(controller: &Controller, ring: &Keyring, feds: u32, audits: u32) -> Vec<Message> {
    let mut pool: Vec<Message> = controller
        .seeds()
        .iter()
        .filter(|s| s.slot == 1)
        .cloned()
        .map(Message::Volunteer)
        .collect();
    for voter in 1..feds + audits {
        for candidate in feds..feds + audits {
            pool.push(vote(ring, voter, candidate, 1));
        }
    }
    pool
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn redelivery_is_idempotent(order in prop::collection::vec(0usize..64, 1..40)) {
        let (mut c, ring) = setup(3, 2);
        let pool = message_pool(&c, &ring, 3, 2);
        for i in order {
            let msg = &pool[i % pool.len()];
            c.deliver(msg);
            let before = c.fingerprint();
            let again = c.deliver(msg);
            prop_assert!(!again.changed);
            prop_assert_eq!(c.fingerprint(), before);
        }
    }

    #[test]
    fn same_sequence_same_state(order in prop::collection::vec(0usize..64, 1..40)) {
        let (mut a, ring) = setup(3, 2);
        let (mut b, _) = setup(3, 2);
        let pool = message_pool(&a, &ring, 3, 2);
        for i in order {
            let msg = &pool[i % pool.len()];
            let da = a.deliver(msg);
            let db = b.deliver(msg);
            prop_assert_eq!(da, db);
        }
        prop_assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn at_most_one_winner_under_any_order(order in prop::collection::vec(0usize..64, 1..60)) {
        let (mut c, ring) = setup(3, 2);
        let pool = message_pool(&c, &ring, 3, 2);
        let mut first_winner = None;
        for i in order {
            c.deliver(&pool[i % pool.len()]);
            if let Some(w) = c.winner(1) {
                let first = *first_winner.get_or_insert(w);
                // committed never reverts and never changes
                prop_assert_eq!(first, w);
            }
        }
        prop_assert!(c.halted_slots().is_empty());
        prop_assert!(c.check_safety().is_ok());
    }

    #[test]
    fn clone_then_replay_matches_original(split in 0usize..30, order in prop::collection::vec(0usize..64, 1..30)) {
        let (mut c, ring) = setup(3, 2);
        let pool = message_pool(&c, &ring, 3, 2);
        let split = split.min(order.len());
        for i in &order[..split] {
            c.deliver(&pool[i % pool.len()]);
        }
        let mut branch = c.clone_branch().unwrap();
        for i in &order[split..] {
            c.deliver(&pool[i % pool.len()]);
            branch.deliver(&pool[i % pool.len()]);
        }
        prop_assert_eq!(c.fingerprint(), branch.fingerprint());
        prop_assert_eq!(c.view(), branch.view());
    }

    #[test]
    fn commits_exactly_at_quorum(feds in 2u32..8, audits in 1u32..5, votes in 0u32..12) {
        let (c, ring) = setup(feds, audits);
        let active = (feds + audits) as usize;
        let quorum = c.context().quorum();
        prop_assert_eq!(quorum, active / 2 + 1);

        // Local node votes for the volunteer on arrival; add `votes` more.
        let mut election: Election = c.into_elections().remove(1);
        let candidate = feds;
        let volunteer = fedchain_messages::VolunteerMessage::signed(
            id(candidate), 1, HEIGHT, 0, 0, ring.private(&id(candidate)).unwrap(), NetworkId::Local,
        );
        election.execute(&Message::Volunteer(volunteer));
        let extra = votes.min(feds + audits - 1);
        for voter in 1..=extra {
            election.execute(&vote(&ring, voter, candidate, 1));
        }
        // Votes after the commit are discarded, so the tally stops at quorum.
        let offered = 1 + extra as usize;
        prop_assert_eq!(election.tally(&id(candidate)), offered.min(quorum));
        prop_assert_eq!(election.is_committed(), offered >= quorum);
    }

    #[test]
    fn canonical_winner_ignores_announcement_order(perm in Just(vec![1u32, 2, 3, 4]).prop_shuffle()) {
        let (c, ring) = setup(3, 2);
        let mut election = c.into_elections().remove(1);
        // Peers 1..=4 announce alternating winners 3 and 4.
        for announcer in perm {
            let winner = if announcer % 2 == 0 { 4 } else { 3 };
            let msg = Message::Commit(CommitAnnouncement::signed(
                id(announcer), 1, HEIGHT, id(winner), ring.private(&id(announcer)).unwrap(), NetworkId::Local,
            ));
            election.execute(&msg);
        }
        prop_assert!(!election.is_committed());
        prop_assert_eq!(election.canonical_winner(), Some(id(3)));
    }
}
