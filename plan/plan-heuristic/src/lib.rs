//! Workspace BFS heuristic for the lattice search.
//!
//! A boolean wall grid is sized from the occupancy grid and seeded with
//! every voxel the distance field reports closer to an obstacle than the
//! inflation radius (the planning link's bounding sphere). A breadth-first
//! search from the goal voxel labels free voxels with their path length in
//! cells; the heuristic for a state is that label at the state's
//! forward-kinematics voxel, scaled by the cost per cell.
//!
//! The BFS is **26-connected with unit step cost**: a diagonal step costs
//! the same one cell as an axis step, so the cell label equals the
//! Chebyshev distance in an empty grid. The BFS expands lazily: queries
//! outside the explored region pump the frontier until the queried cell is
//! labeled or the frontier dies.

// Safety: Deny unwrap/expect in library code. Tests may use them.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod bfs;
mod heuristic;

pub use bfs::Bfs3D;
pub use heuristic::BfsHeuristic;

/// Cost sentinel for walls and unreachable cells.
pub const INFINITE_COST: i64 = i64::MAX / 4;
