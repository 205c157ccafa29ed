use criterion::{criterion_group, criterion_main, Criterion};
use fedchain_search::{explore, Roster, SearchConfig, SearchContext, SlotScenario};
use fedchain_types::DbHeight;

fn slot_scenario_bench(c: &mut Criterion) {
    let roster = Roster::simulated(3, 2, DbHeight::new(1));
    let space = SlotScenario::new(&roster, roster.federated[0], 1).expect("scenario");
    let config = SearchConfig {
        depth_limit: 10,
        mirror_min_depth: 0,
        verify_determinism: false,
        ..SearchConfig::default()
    };

    c.bench_function("dive_3f_2a_depth10", |b| {
        b.iter(|| {
            let mut ctx = SearchContext::new(config.clone());
            explore(&space, &mut ctx).expect("search");
            ctx.solutions
        })
    });
}

fn clone_branch_bench(c: &mut Criterion) {
    let roster = Roster::simulated(5, 4, DbHeight::new(1));
    let space = SlotScenario::new(&roster, roster.federated[0], 2).expect("scenario");

    c.bench_function("controller_clone_5f_4a", |b| {
        b.iter(|| space.controller().clone_branch().expect("clone"))
    });
}

criterion_group!(benches, slot_scenario_bench, clone_branch_bench);
criterion_main!(benches);
