//! Anytime weighted-A* search over opaque state ids.
//!
//! The driver knows nothing about joints or voxels: it consumes a
//! [`SearchSpace`] (successors, heuristic, goal test over `usize` ids) and
//! runs weighted A* repeatedly with a shrinking inflation factor ε until ε
//! reaches its floor, the deadline passes, or [`StopHandle::stop`] is
//! raised. Each iteration restarts from scratch; the best (cheapest) path
//! found so far is the incumbent.
//!
//! The stop flag is checked once per expansion, so a stop request returns
//! within one expansion's worth of work.

// Safety: Deny unwrap/expect in library code. Tests may use them.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use plan_types::{PlanError, PlanStats};

/// Identifier of a state in the search graph.
pub type StateId = usize;

/// The graph the search runs over.
///
/// Successor generation and the heuristic take `&mut self`: both sides
/// cache lazily (interned states, partially expanded BFS).
pub trait SearchSpace {
    /// Appends `(successor, edge cost)` pairs of a state to `out`.
    fn successors(&mut self, id: StateId, out: &mut Vec<(StateId, i64)>);

    /// Admissible cost-to-go estimate of a state.
    fn heuristic(&mut self, id: StateId) -> i64;

    /// Whether a state satisfies the goal.
    fn is_goal(&self, id: StateId) -> bool;
}

/// Cooperative cancellation for a running search.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Creates an un-raised handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the search stop; it returns within one expansion.
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Configuration of the anytime loop.
#[derive(Debug, Clone, Copy)]
pub struct SearchConfig {
    /// Initial inflation factor.
    pub initial_epsilon: f64,
    /// Inflation floor; the loop stops after running at this value.
    pub final_epsilon: f64,
    /// Multiplicative shrink applied between iterations (0 < d < 1).
    pub epsilon_decrement: f64,
    /// Wall-clock budget for the whole anytime loop.
    pub allowed_time: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            initial_epsilon: 100.0,
            final_epsilon: 1.0,
            epsilon_decrement: 0.5,
            allowed_time: Duration::from_secs(10),
        }
    }
}

/// Result of a successful search: the state-id path and its cost.
#[derive(Debug, Clone)]
pub struct Solution {
    /// States from start to goal, inclusive.
    pub path: Vec<StateId>,
    /// Sum of edge costs along the path.
    pub cost: i64,
}

/// The anytime weighted-A* planner.
#[derive(Debug, Default)]
pub struct AnytimeAStar {
    stop: StopHandle,
}

impl AnytimeAStar {
    /// Creates a planner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle other threads (or a timeout watchdog) may use to stop the
    /// search.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Runs the anytime loop from `start`.
    ///
    /// # Errors
    ///
    /// [`PlanError::TimedOut`] when the budget (or a stop request) expires
    /// before any solution; [`PlanError::UnreachableGoal`] when the space
    /// is exhausted without reaching the goal.
    pub fn search(
        &mut self,
        space: &mut dyn SearchSpace,
        start: StateId,
        config: &SearchConfig,
    ) -> Result<(Solution, PlanStats), PlanError> {
        let t_start = Instant::now();
        let deadline = t_start + config.allowed_time;

        let mut stats = PlanStats::default();
        let mut incumbent: Option<Solution> = None;
        let mut epsilon = config.initial_epsilon.max(config.final_epsilon);
        let mut exhausted_at_floor = false;

        loop {
            debug!(epsilon, "weighted A* iteration");
            match self.weighted_astar(space, start, epsilon, deadline, &mut stats.expansions) {
                IterationOutcome::Found(solution) => {
                    if incumbent.is_none() {
                        stats.initial_solution_time = t_start.elapsed().as_secs_f64();
                    }
                    let better = incumbent
                        .as_ref()
                        .is_none_or(|best| solution.cost < best.cost);
                    if better {
                        info!(epsilon, cost = solution.cost, "solution improved");
                        stats.solution_epsilon = epsilon;
                        incumbent = Some(solution);
                    }
                }
                IterationOutcome::Exhausted => {
                    // The graph under this inflation holds no path; larger
                    // inflations only reorder expansions, so remember
                    // exhaustion at the floor and stop.
                    exhausted_at_floor = true;
                    break;
                }
                IterationOutcome::Interrupted => break,
            }

            if epsilon <= config.final_epsilon {
                break;
            }
            epsilon = (epsilon * config.epsilon_decrement).max(config.final_epsilon);
        }

        stats.solution_time = t_start.elapsed().as_secs_f64();
        match incumbent {
            Some(solution) => {
                stats.solution_cost = solution.cost;
                stats.path_length = solution.path.len();
                Ok((solution, stats))
            }
            None if exhausted_at_floor => Err(PlanError::UnreachableGoal),
            None => Err(PlanError::TimedOut),
        }
    }

    fn weighted_astar(
        &self,
        space: &mut dyn SearchSpace,
        start: StateId,
        epsilon: f64,
        deadline: Instant,
        expansions: &mut usize,
    ) -> IterationOutcome {
        let mut g: HashMap<StateId, i64> = HashMap::new();
        let mut parent: HashMap<StateId, StateId> = HashMap::new();
        let mut open: BinaryHeap<Reverse<(i64, StateId)>> = BinaryHeap::new();
        let mut succs = Vec::new();

        g.insert(start, 0);
        open.push(Reverse((inflate(0, space.heuristic(start), epsilon), start)));

        while let Some(Reverse((_, id))) = open.pop() {
            if self.stop.is_stopped() || Instant::now() >= deadline {
                return IterationOutcome::Interrupted;
            }
            if space.is_goal(id) {
                return IterationOutcome::Found(reconstruct(&parent, &g, start, id));
            }
            *expansions += 1;

            let g_id = g.get(&id).copied().unwrap_or(i64::MAX);
            succs.clear();
            space.successors(id, &mut succs);
            for &(sid, cost) in &succs {
                let tentative = g_id.saturating_add(cost);
                if tentative < g.get(&sid).copied().unwrap_or(i64::MAX) {
                    g.insert(sid, tentative);
                    parent.insert(sid, id);
                    open.push(Reverse((
                        inflate(tentative, space.heuristic(sid), epsilon),
                        sid,
                    )));
                }
            }
        }
        IterationOutcome::Exhausted
    }
}

enum IterationOutcome {
    Found(Solution),
    Exhausted,
    Interrupted,
}

/// `g + ε·h`, saturating well below `i64::MAX` so queue keys never wrap.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn inflate(g: i64, h: i64, epsilon: f64) -> i64 {
    let f = (g as f64) + epsilon * (h as f64);
    if f >= (i64::MAX / 2) as f64 {
        i64::MAX / 2
    } else {
        f as i64
    }
}

fn reconstruct(
    parent: &HashMap<StateId, StateId>,
    g: &HashMap<StateId, i64>,
    start: StateId,
    goal: StateId,
) -> Solution {
    let mut path = vec![goal];
    let mut cur = goal;
    while cur != start {
        match parent.get(&cur) {
            Some(&p) => {
                path.push(p);
                cur = p;
            }
            None => break,
        }
    }
    path.reverse();
    Solution {
        path,
        cost: g.get(&goal).copied().unwrap_or(0),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// A 1D corridor 0..=20: step ±1 costs 10, goal at 20.
    struct Corridor {
        blocked: Option<StateId>,
    }

    impl SearchSpace for Corridor {
        fn successors(&mut self, id: StateId, out: &mut Vec<(StateId, i64)>) {
            for next in [id.wrapping_sub(1), id + 1] {
                if next <= 20 && Some(next) != self.blocked {
                    out.push((next, 10));
                }
            }
        }

        fn heuristic(&mut self, id: StateId) -> i64 {
            #[allow(clippy::cast_possible_wrap)]
            let d = (20 - id as i64).abs();
            d * 10
        }

        fn is_goal(&self, id: StateId) -> bool {
            id == 20
        }
    }

    #[test]
    fn test_finds_shortest_path() {
        let mut space = Corridor { blocked: None };
        let mut planner = AnytimeAStar::new();
        let (solution, stats) = planner
            .search(&mut space, 0, &SearchConfig::default())
            .unwrap();
        assert_eq!(solution.path.len(), 21);
        assert_eq!(solution.cost, 200);
        assert!((stats.solution_epsilon - 1.0).abs() < 1e-9 || stats.solution_epsilon > 1.0);
        assert!(stats.expansions > 0);
    }

    #[test]
    fn test_start_is_goal() {
        let mut space = Corridor { blocked: None };
        let mut planner = AnytimeAStar::new();
        let (solution, _) = planner
            .search(&mut space, 20, &SearchConfig::default())
            .unwrap();
        assert_eq!(solution.path, vec![20]);
        assert_eq!(solution.cost, 0);
    }

    #[test]
    fn test_unreachable_goal() {
        let mut space = Corridor { blocked: Some(10) };
        let mut planner = AnytimeAStar::new();
        let r = planner.search(&mut space, 0, &SearchConfig::default());
        assert!(matches!(r, Err(PlanError::UnreachableGoal)));
    }

    #[test]
    fn test_stop_handle_interrupts() {
        let mut space = Corridor { blocked: None };
        let mut planner = AnytimeAStar::new();
        planner.stop_handle().stop();
        let r = planner.search(&mut space, 0, &SearchConfig::default());
        assert!(matches!(r, Err(PlanError::TimedOut)));
    }

    #[test]
    fn test_zero_budget_times_out() {
        let mut space = Corridor { blocked: None };
        let mut planner = AnytimeAStar::new();
        let config = SearchConfig {
            allowed_time: Duration::ZERO,
            ..SearchConfig::default()
        };
        let r = planner.search(&mut space, 0, &config);
        assert!(matches!(r, Err(PlanError::TimedOut)));
    }

    #[test]
    fn test_anytime_improves_to_optimal() {
        // With a strongly inflated heuristic the first pass is still
        // optimal in this corridor, so the incumbent must end at the
        // optimal cost either way.
        let mut space = Corridor { blocked: None };
        let mut planner = AnytimeAStar::new();
        let config = SearchConfig {
            initial_epsilon: 50.0,
            final_epsilon: 1.0,
            epsilon_decrement: 0.1,
            ..SearchConfig::default()
        };
        let (solution, stats) = planner.search(&mut space, 0, &config).unwrap();
        assert_eq!(solution.cost, 200);
        assert!(stats.initial_solution_time <= stats.solution_time);
    }
}
