//! Shared types and capability traits for the arm motion planner.
//!
//! The planning graph, action space, and heuristic consume two external
//! capabilities defined here:
//!
//! - [`RobotModel`] - joint limits, forward kinematics, inverse kinematics
//! - [`CollisionChecker`] - state and state-to-state validity
//!
//! alongside the value types threaded through the planner: [`Pose`],
//! [`GoalConstraint`], [`MotionPrimitive`], [`PlanningParams`],
//! [`PlanStats`], and the [`PlanError`] error kinds. The [`viz`] module
//! holds the process-wide debug visualization registry.

// Safety: Deny unwrap/expect in library code. Tests may use them.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod angles;
mod checker;
mod error;
mod goal;
mod params;
mod pose;
mod primitive;
mod robot;
mod stats;
pub mod viz;

pub use checker::{CollisionChecker, PathValidity, Validity};
pub use error::PlanError;
pub use goal::{BoxGoal, GoalConstraint, JointGoal, PoseGoal};
pub use params::PlanningParams;
pub use pose::Pose;
pub use primitive::{Action, MotionPrimitive, MotionPrimitiveKind};
pub use robot::{IkOption, RobotModel};
pub use stats::PlanStats;
