//! Search configuration and the counters threaded through a dive.

use std::collections::{BTreeMap, HashSet};

use fedchain_types::{Digest256, IdentityChainId, SlotIndex};
use serde::{Deserialize, Serialize};

use crate::space::Directed;

fn default_depth_limit() -> usize {
    10
}

fn default_mirror_min_depth() -> usize {
    4
}

fn default_true() -> bool {
    true
}

/// Knobs for one search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum number of deliveries along one path.
    #[serde(default = "default_depth_limit")]
    pub depth_limit: usize,

    /// Stop the whole search once any solution is found.
    #[serde(default)]
    pub stop_at_first_solution: bool,

    /// Stop after visiting this many states.
    #[serde(default)]
    pub max_visits: Option<u64>,

    /// Prune states already visited on another path.
    #[serde(default = "default_true")]
    pub detect_mirrors: bool,

    /// Only look for mirrors at or below this depth.
    #[serde(default = "default_mirror_min_depth")]
    pub mirror_min_depth: usize,

    /// Re-run each delivery on a second clone and compare the results.
    #[serde(default = "default_true")]
    pub verify_determinism: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            depth_limit: default_depth_limit(),
            stop_at_first_solution: false,
            max_visits: None,
            detect_mirrors: true,
            mirror_min_depth: default_mirror_min_depth(),
            verify_determinism: true,
        }
    }
}

/// Per-depth counters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthCounters {
    pub visits: u64,
    pub solutions: u64,
    pub mirrors: u64,
    pub dead_messages: u64,
    pub failures: u64,
}

/// State of one search, passed by `&mut` through the recursion.
#[derive(Debug)]
pub struct SearchContext {
    config: SearchConfig,
    pub visits: u64,
    pub solutions: u64,
    pub limit_hits: u64,
    pub dead_messages: u64,
    pub mirrors: u64,
    /// Leaves where no delivery changed anything and nothing committed.
    pub failures: u64,
    /// Safety violations observed.
    pub collisions: u64,
    pub max_depth: usize,
    pub winners: BTreeMap<IdentityChainId, u64>,
    /// Slots seen committed at solutions.
    pub committed_slots: BTreeMap<SlotIndex, u64>,
    pub depths: Vec<DepthCounters>,
    pub first_solution: Option<Vec<Directed>>,
    pub budget_exhausted: bool,
    seen: HashSet<Digest256>,
}

impl SearchContext {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            visits: 0,
            solutions: 0,
            limit_hits: 0,
            dead_messages: 0,
            mirrors: 0,
            failures: 0,
            collisions: 0,
            max_depth: 0,
            winners: BTreeMap::new(),
            committed_slots: BTreeMap::new(),
            depths: Vec::new(),
            first_solution: None,
            budget_exhausted: false,
            seen: HashSet::new(),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    fn at(&mut self, depth: usize) -> &mut DepthCounters {
        if self.depths.len() <= depth {
            self.depths.resize_with(depth + 1, DepthCounters::default);
        }
        &mut self.depths[depth]
    }

    pub(crate) fn visit(&mut self, depth: usize) {
        self.visits += 1;
        self.max_depth = self.max_depth.max(depth);
        self.at(depth).visits += 1;
        if let Some(max) = self.config.max_visits {
            if self.visits >= max {
                self.budget_exhausted = true;
            }
        }
    }

    /// Whether the search as a whole should unwind.
    pub(crate) fn should_stop(&self) -> bool {
        self.budget_exhausted || (self.config.stop_at_first_solution && self.solutions > 0)
    }

    pub(crate) fn solution(
        &mut self,
        depth: usize,
        slot: SlotIndex,
        winner: IdentityChainId,
        path: &[Directed],
    ) {
        self.solutions += 1;
        self.at(depth).solutions += 1;
        *self.winners.entry(winner).or_insert(0) += 1;
        *self.committed_slots.entry(slot).or_insert(0) += 1;
        if self.first_solution.is_none() {
            self.first_solution = Some(path.to_vec());
        }
    }

    /// Record `fingerprint`; `true` if it was already seen.
    pub(crate) fn mirror(&mut self, depth: usize, fingerprint: Digest256) -> bool {
        if self.seen.insert(fingerprint) {
            return false;
        }
        self.mirrors += 1;
        self.at(depth).mirrors += 1;
        true
    }

    pub(crate) fn dead_message(&mut self, depth: usize) {
        self.dead_messages += 1;
        self.at(depth).dead_messages += 1;
    }

    pub(crate) fn failure(&mut self, depth: usize) {
        self.failures += 1;
        self.at(depth).failures += 1;
    }

    /// Distinct states recorded for mirror detection.
    pub fn distinct_states(&self) -> usize {
        self.seen.len()
    }

    pub fn report(&self) -> SearchReport {
        SearchReport {
            visits: self.visits,
            solutions: self.solutions,
            limit_hits: self.limit_hits,
            dead_messages: self.dead_messages,
            mirrors: self.mirrors,
            failures: self.failures,
            collisions: self.collisions,
            max_depth: self.max_depth,
            distinct_states: self.seen.len(),
            winners: self
                .winners
                .iter()
                .map(|(id, n)| (format!("{id:?}"), *n))
                .collect(),
            committed_slots: self.committed_slots.clone(),
            depths: self.depths.clone(),
            first_solution: self
                .first_solution
                .as_ref()
                .map(|path| path.iter().map(ToString::to_string).collect()),
            budget_exhausted: self.budget_exhausted,
        }
    }
}

/// Serializable summary of a finished search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchReport {
    pub visits: u64,
    pub solutions: u64,
    pub limit_hits: u64,
    pub dead_messages: u64,
    pub mirrors: u64,
    pub failures: u64,
    pub collisions: u64,
    pub max_depth: usize,
    pub distinct_states: usize,
    pub winners: BTreeMap<String, u64>,
    pub committed_slots: BTreeMap<SlotIndex, u64>,
    pub depths: Vec<DepthCounters>,
    pub first_solution: Option<Vec<String>>,
    pub budget_exhausted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_counters_grow_on_demand() {
        let mut ctx = SearchContext::new(SearchConfig::default());
        ctx.visit(0);
        ctx.visit(3);
        ctx.dead_message(3);
        assert_eq!(ctx.depths.len(), 4);
        assert_eq!(ctx.depths[3].visits, 1);
        assert_eq!(ctx.depths[3].dead_messages, 1);
        assert_eq!(ctx.max_depth, 3);
    }

    #[test]
    fn visit_budget_stops_search() {
        let mut ctx = SearchContext::new(SearchConfig {
            max_visits: Some(2),
            ..SearchConfig::default()
        });
        ctx.visit(0);
        assert!(!ctx.should_stop());
        ctx.visit(1);
        assert!(ctx.should_stop());
    }

    #[test]
    fn mirror_detection_counts_repeats_only() {
        let mut ctx = SearchContext::new(SearchConfig::default());
        let d = Digest256::new([1; 32]);
        assert!(!ctx.mirror(5, d));
        assert!(ctx.mirror(5, d));
        assert_eq!(ctx.mirrors, 1);
        assert_eq!(ctx.distinct_states(), 1);
    }
}
