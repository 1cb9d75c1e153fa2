//! Robot collision model, state, and self/environment collision checking.
//!
//! A [`RobotCollisionModel`] holds the immutable description of a robot's
//! links and joints together with each link's bounding-sphere tree and
//! voxelized shape. A [`RobotCollisionState`] mirrors the model with mutable
//! world-frame data (link transforms, sphere positions, voxel positions),
//! updated lazily through dirty flags as joint variables change.
//!
//! The [`SelfCollisionModel`] answers the planner's central question: is a
//! configuration collision free against the environment (an occupancy grid)
//! and against the robot itself (under an [`AllowedCollisionMatrix`])?
//! [`CollisionSpace`] packages the grid and the self-collision model behind
//! the `plan-types` [`CollisionChecker`](plan_types::CollisionChecker)
//! capability the planning graph consumes.

// Safety: Deny unwrap/expect in library code. Tests may use them.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod acm;
mod error;
mod model;
mod self_model;
mod space;
mod state;

pub use acm::{AllowedCollision, AllowedCollisionMatrix};
pub use error::CollideError;
pub use model::{
    JointKind, JointSpec, RobotCollisionModel, RobotCollisionModelBuilder, VoxelsModel,
};
pub use self_model::SelfCollisionModel;
pub use space::CollisionSpace;
pub use state::RobotCollisionState;
