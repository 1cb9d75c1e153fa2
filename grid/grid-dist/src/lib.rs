//! Voxel-grid distance maps for arm motion planning.
//!
//! This crate provides the workspace representation underneath the collision
//! checker and the search heuristic:
//!
//! - [`GridCoord`] - integer voxel coordinates
//! - [`PropagationDistanceField`] - per-cell distance to the nearest obstacle,
//!   maintained incrementally under point insertion and removal
//! - [`OccupancyGrid`] - metric/index translation and occupancy queries on top
//!   of the distance field
//!
//! # Coordinate Systems
//!
//! World coordinates are continuous `f64` values (`nalgebra::Point3`). Grid
//! coordinates are discrete `i32` values. A cell `(gx, gy, gz)` has its center
//! at `origin + (g + 0.5) * resolution`.
//!
//! # Example
//!
//! ```
//! use grid_dist::{OccupancyGrid, PropagationDistanceField};
//! use nalgebra::{Point3, Vector3};
//!
//! let field = PropagationDistanceField::new(
//!     Point3::origin(),
//!     Vector3::new(10.0, 10.0, 10.0),
//!     1.0, // resolution
//!     5.0, // max propagation distance
//! )
//! .unwrap();
//! let mut grid = OccupancyGrid::new(field);
//!
//! grid.add_points(&[Point3::new(5.5, 5.5, 5.5)]);
//! assert_eq!(grid.distance(Point3::new(5.5, 5.5, 5.5)), 0.0);
//! assert_eq!(grid.distance(Point3::new(5.5, 5.5, 6.5)), 1.0);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod error;
mod field;
mod occupancy;
mod voxel;

pub use error::GridError;
pub use field::PropagationDistanceField;
pub use occupancy::OccupancyGrid;
pub use voxel::GridCoord;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector3};
