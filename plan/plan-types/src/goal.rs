//! Goal constraints.

use nalgebra::Point3;

use crate::pose::Pose;

/// A workspace pose goal with per-axis tolerances.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoseGoal {
    /// Target pose of the planning link.
    pub pose: Pose,
    /// Per-axis position tolerances, in meters.
    pub position_tolerance: [f64; 3],
    /// Per-axis orientation tolerances (roll, pitch, yaw), in radians.
    pub orientation_tolerance: [f64; 3],
}

/// A 6-DoF workspace box goal: the planning link pose must fall inside the
/// per-component interval.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoxGoal {
    /// Minimum corner `[x, y, z, roll, pitch, yaw]`.
    pub min: [f64; 6],
    /// Maximum corner `[x, y, z, roll, pitch, yaw]`.
    pub max: [f64; 6],
}

/// A joint-space goal with per-joint tolerances.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointGoal {
    /// Target configuration.
    pub angles: Vec<f64>,
    /// Per-joint tolerances, in radians.
    pub tolerances: Vec<f64>,
}

/// What the planner is asked to reach.
///
/// # Example
///
/// ```
/// use plan_types::{GoalConstraint, Pose};
///
/// let goal = GoalConstraint::pose(
///     Pose::new(0.5, 0.1, 0.3, 0.0, 0.0, 0.0),
///     [0.02; 3],
///     [0.05; 3],
/// );
/// assert!(goal.satisfied_by_pose(&Pose::new(0.51, 0.1, 0.3, 0.0, 0.0, 0.01)));
/// assert!(!goal.satisfied_by_pose(&Pose::new(0.6, 0.1, 0.3, 0.0, 0.0, 0.0)));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GoalConstraint {
    /// Workspace pose with tolerances.
    Pose(PoseGoal),
    /// Workspace 6-DoF box.
    Box(BoxGoal),
    /// Joint-space configuration with tolerances.
    Joints(JointGoal),
}

impl GoalConstraint {
    /// Creates a workspace pose goal.
    #[must_use]
    pub const fn pose(
        pose: Pose,
        position_tolerance: [f64; 3],
        orientation_tolerance: [f64; 3],
    ) -> Self {
        Self::Pose(PoseGoal {
            pose,
            position_tolerance,
            orientation_tolerance,
        })
    }

    /// Creates a workspace box goal.
    #[must_use]
    pub const fn pose_box(min: [f64; 6], max: [f64; 6]) -> Self {
        Self::Box(BoxGoal { min, max })
    }

    /// Creates a joint-space goal.
    #[must_use]
    pub const fn joints(angles: Vec<f64>, tolerances: Vec<f64>) -> Self {
        Self::Joints(JointGoal { angles, tolerances })
    }

    /// Returns whether this is a workspace (pose or box) goal.
    #[must_use]
    pub const fn is_workspace(&self) -> bool {
        matches!(self, Self::Pose(_) | Self::Box(_))
    }

    /// Returns the joint-space goal, if that is what this is.
    #[must_use]
    pub const fn as_joints(&self) -> Option<&JointGoal> {
        match self {
            Self::Joints(j) => Some(j),
            _ => None,
        }
    }

    /// Returns a representative workspace position for heuristic seeding:
    /// the target position for pose goals, the box center for box goals.
    #[must_use]
    pub fn position(&self) -> Option<Point3<f64>> {
        match self {
            Self::Pose(g) => Some(g.pose.position()),
            Self::Box(g) => Some(Point3::new(
                (g.min[0] + g.max[0]) / 2.0,
                (g.min[1] + g.max[1]) / 2.0,
                (g.min[2] + g.max[2]) / 2.0,
            )),
            Self::Joints(_) => None,
        }
    }

    /// Returns the target pose for workspace pose goals.
    #[must_use]
    pub const fn target_pose(&self) -> Option<&Pose> {
        match self {
            Self::Pose(g) => Some(&g.pose),
            _ => None,
        }
    }

    /// Checks a workspace pose against this goal.
    ///
    /// Pose goals compare the position under the L∞ norm and each axis-angle
    /// error against its tolerance; box goals check interval membership.
    /// Joint goals never match a pose (the lattice checks them in joint
    /// space).
    #[must_use]
    pub fn satisfied_by_pose(&self, pose: &Pose) -> bool {
        match self {
            Self::Pose(g) => {
                let dp = pose.position() - g.pose.position();
                if dp.x.abs() > g.position_tolerance[0]
                    || dp.y.abs() > g.position_tolerance[1]
                    || dp.z.abs() > g.position_tolerance[2]
                {
                    return false;
                }
                let err = pose.orientation_errors(&g.pose);
                err.x <= g.orientation_tolerance[0]
                    && err.y <= g.orientation_tolerance[1]
                    && err.z <= g.orientation_tolerance[2]
            }
            Self::Box(g) => pose
                .as_array()
                .iter()
                .zip(g.min.iter().zip(g.max.iter()))
                .all(|(v, (lo, hi))| v >= lo && v <= hi),
            Self::Joints(_) => false,
        }
    }
}
