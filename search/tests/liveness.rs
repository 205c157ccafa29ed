//! Bounded liveness and safety of the election core under every delivery
//! order the search reaches.

use fedchain_search::{
    explore, Federation, Roster, SearchConfig, SearchContext, SearchSpace, SlotScenario,
};
use fedchain_types::DbHeight;

fn config(depth_limit: usize) -> SearchConfig {
    SearchConfig {
        depth_limit,
        mirror_min_depth: 0,
        ..SearchConfig::default()
    }
}

#[test]
fn faulted_slot_commits_within_depth_bound() {
    let roster = Roster::simulated(3, 2, DbHeight::new(1));
    let space = SlotScenario::new(&roster, roster.federated[0], 1).unwrap();
    let mut ctx = SearchContext::new(config(10));

    let outcome = explore(&space, &mut ctx).unwrap();

    assert!(outcome.solved);
    assert!(ctx.solutions > 0);
    assert_eq!(ctx.collisions, 0);
    // Only the faulted slot ever commits.
    assert_eq!(ctx.committed_slots.keys().copied().collect::<Vec<_>>(), vec![1]);
    // Every winner is an audit server.
    assert!(ctx.winners.keys().all(|w| roster.audit.contains(w)));

    let path = ctx.first_solution.clone().unwrap();
    assert!(path.len() <= 10);
    let mut replay = space.branch().unwrap();
    for directed in &path {
        replay.deliver(directed);
    }
    assert_eq!(replay.controller().committed_slots(), vec![1]);
    assert!(replay.controller().winner(0).is_none());
    assert!(replay.controller().winner(2).is_none());
}

#[test]
fn split_votes_are_reported_as_failures() {
    let roster = Roster::simulated(3, 2, DbHeight::new(1));
    let space = SlotScenario::new(&roster, roster.federated[0], 1).unwrap();
    let mut ctx = SearchContext::new(config(10));
    explore(&space, &mut ctx).unwrap();

    // Four voters over two candidates can split 2-2; those leaves are dead ends.
    assert!(ctx.failures > 0);
    assert!(ctx.dead_messages > 0);
}

#[test]
fn search_is_deterministic() {
    let roster = Roster::simulated(3, 2, DbHeight::new(1));
    let run = || {
        let space = SlotScenario::new(&roster, roster.federated[0], 1).unwrap();
        let mut ctx = SearchContext::new(config(10));
        explore(&space, &mut ctx).unwrap();
        ctx.report()
    };
    assert_eq!(run(), run());
}

#[test]
fn shallow_depth_hits_the_limit() {
    let roster = Roster::simulated(3, 2, DbHeight::new(1));
    let space = SlotScenario::new(&roster, roster.federated[0], 1).unwrap();
    let mut ctx = SearchContext::new(config(2));
    let outcome = explore(&space, &mut ctx).unwrap();

    // One volunteer plus one peer vote is only two votes; quorum is three.
    assert!(!outcome.solved);
    assert!(outcome.limit_hit);
    assert!(ctx.limit_hits > 0);
    assert_eq!(ctx.solutions, 0);
}

#[test]
fn federation_reaches_agreement_without_collisions() {
    let roster = Roster::simulated(3, 2, DbHeight::new(1));
    let space = Federation::new(&roster, 1).unwrap();
    let mut ctx = SearchContext::new(SearchConfig {
        stop_at_first_solution: true,
        max_visits: Some(20_000),
        ..config(12)
    });

    let outcome = explore(&space, &mut ctx).unwrap();

    assert!(outcome.solved);
    assert_eq!(ctx.solutions, 1);
    assert_eq!(ctx.collisions, 0);
    assert_eq!(ctx.committed_slots.keys().copied().collect::<Vec<_>>(), vec![1]);
}

#[test]
fn federation_bounded_exploration_stays_safe() {
    let roster = Roster::simulated(3, 2, DbHeight::new(1));
    let space = Federation::new(&roster, 1).unwrap();
    let mut ctx = SearchContext::new(SearchConfig {
        max_visits: Some(5_000),
        ..config(8)
    });

    explore(&space, &mut ctx).unwrap();

    assert_eq!(ctx.collisions, 0);
    assert!(ctx.visits <= 5_000);
    let report = ctx.report();
    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"collisions\":0"));
}
