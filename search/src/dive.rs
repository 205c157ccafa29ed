//! Depth-first exploration with explicit backtracking.

use tracing::{debug, info, warn};

use crate::context::SearchContext;
use crate::error::SearchError;
use crate::space::{Directed, SearchSpace};

/// What a subtree produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Some path below hit the depth limit.
    pub limit_hit: bool,
    /// No delivery changed the state here.
    pub leaf: bool,
    /// Some path below found a solution.
    pub solved: bool,
}

/// Explore every delivery order of `pending` from `space`.
///
/// For each pending message whose target is still open, the state is cloned,
/// the message is delivered to the clone, and the search recurses with that
/// message removed and the clone's outbound messages appended. The original
/// `space` is never mutated, so backtracking is just dropping the clone.
pub fn dive<S: SearchSpace>(
    space: &S,
    pending: &[Directed],
    depth: usize,
    ctx: &mut SearchContext,
    path: &mut Vec<Directed>,
) -> Result<Outcome, SearchError> {
    ctx.visit(depth);

    if let Err(violation) = space.check_safety() {
        ctx.collisions += 1;
        warn!(depth, %violation, "collision");
        return Ok(Outcome {
            leaf: true,
            ..Outcome::default()
        });
    }

    if let Some((slot, winner)) = space.solution() {
        if ctx.solutions == 0 {
            info!(depth, slot, winner = ?winner, "first solution");
            debug!("\n{}", space.describe());
        }
        ctx.solution(depth, slot, winner, path);
        return Ok(Outcome {
            leaf: true,
            solved: true,
            ..Outcome::default()
        });
    }

    if depth >= ctx.config().depth_limit {
        ctx.limit_hits += 1;
        return Ok(Outcome {
            limit_hit: true,
            ..Outcome::default()
        });
    }

    if ctx.config().detect_mirrors
        && depth >= ctx.config().mirror_min_depth
        && ctx.mirror(depth, space.fingerprint())
    {
        return Ok(Outcome::default());
    }

    let mut outcome = Outcome {
        leaf: true,
        ..Outcome::default()
    };
    for (index, directed) in pending.iter().enumerate() {
        if ctx.should_stop() {
            break;
        }
        if !space.accepts(directed) {
            continue;
        }

        let mut branch = space.branch()?;
        let step = branch.deliver(directed);

        if ctx.config().verify_determinism {
            let mut twin = space.branch()?;
            let twin_step = twin.deliver(directed);
            if twin_step != step || twin.fingerprint() != branch.fingerprint() {
                return Err(SearchError::Determinism {
                    depth,
                    message: directed.to_string(),
                });
            }
        }

        if !step.changed {
            ctx.dead_message(depth);
            continue;
        }
        outcome.leaf = false;

        let mut next = Vec::with_capacity(pending.len() - 1 + step.follow_ups.len());
        next.extend_from_slice(&pending[..index]);
        next.extend_from_slice(&pending[index + 1..]);
        next.extend(step.follow_ups);

        path.push(directed.clone());
        let child = dive(&branch, &next, depth + 1, ctx, path)?;
        path.pop();

        outcome.limit_hit |= child.limit_hit;
        outcome.solved |= child.solved;
    }

    if outcome.limit_hit {
        outcome.leaf = false;
    } else if outcome.leaf && !ctx.should_stop() {
        ctx.failure(depth);
    }
    Ok(outcome)
}

/// Run a full search from the space's initial message pool.
pub fn explore<S: SearchSpace>(space: &S, ctx: &mut SearchContext) -> Result<Outcome, SearchError> {
    let pending = space.initial();
    info!(
        messages = pending.len(),
        depth_limit = ctx.config().depth_limit,
        "search starting"
    );
    let mut path = Vec::new();
    let outcome = dive(space, &pending, 0, ctx, &mut path)?;
    info!(
        visits = ctx.visits,
        solutions = ctx.solutions,
        failures = ctx.failures,
        mirrors = ctx.mirrors,
        collisions = ctx.collisions,
        "search finished"
    );
    Ok(outcome)
}
