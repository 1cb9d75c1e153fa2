//! The manipulation lattice: a discrete graph over joint configurations.
//!
//! Continuous joint configurations are discretized per joint
//! (`c_i = round(θ_i / Δ_i)`, continuous joints normalized to `(-π, π]`
//! first) and interned: equal coordinate vectors always map to the same
//! state id, and id 0 is reserved for the goal sentinel. Successors come
//! from the action space, are validated against joint limits and the
//! collision checker, and are interned only after every check passes.
//!
//! [`LatticePlanningSpace`] pairs the lattice with the BFS heuristic to
//! form the [`SearchSpace`](plan_search::SearchSpace) the anytime search
//! driver consumes.

// Safety: Deny unwrap/expect in library code. Tests may use them.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod lattice;
mod planning_space;
mod state;

pub use lattice::ManipLattice;
pub use planning_space::LatticePlanningSpace;
pub use state::{discretize_joint, GOAL_STATE_ID};
