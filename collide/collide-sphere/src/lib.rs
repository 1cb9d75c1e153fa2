//! Bounding-sphere collision geometry.
//!
//! Robot links are approximated by sets of *covering spheres*: every point of
//! the link's collision shape lies within some sphere. This crate produces
//! those sphere centers from primitive shapes ([`voxelize`]) and organizes
//! them into a balanced binary hierarchy ([`SphereTree`]) for broad-phase
//! pruning during collision queries.
//!
//! # Example
//!
//! ```
//! use collide_sphere::{voxelize, SphereSpec, SphereTree};
//!
//! // Cover a 0.4 x 0.2 x 0.1 box with spheres of radius 0.05.
//! let centers = voxelize::box_spheres(0.4, 0.2, 0.1, 0.05).unwrap();
//!
//! let leaves: Vec<_> = centers
//!     .iter()
//!     .enumerate()
//!     .map(|(i, &c)| SphereSpec::new(format!("b{i}"), c, 0.05))
//!     .collect();
//! let tree = SphereTree::build(leaves).unwrap();
//!
//! // The root bounds every leaf.
//! let root = tree.node(tree.root());
//! assert!(root.radius >= 0.05);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod error;
mod tree;
pub mod voxelize;

pub use error::SphereError;
pub use tree::{SphereNode, SphereSpec, SphereTree};
