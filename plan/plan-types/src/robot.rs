//! The robot model capability consumed by the planner.

use crate::error::PlanError;
use crate::pose::Pose;

/// Constraint options for inverse kinematics queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IkOption {
    /// All joints free.
    #[default]
    Unrestricted,
    /// Hold the joints that drive position; orient only.
    RestrictXyz,
}

/// Kinematic description of the planning group.
///
/// Implemented outside the planner core (the reference implementation is a
/// serial chain); the lattice, action space, and heuristic consume it
/// through this trait only.
pub trait RobotModel {
    /// Number of planning joint variables.
    fn joint_count(&self) -> usize;

    /// Lower position limit of a joint.
    fn min_pos_limit(&self, jidx: usize) -> f64;

    /// Upper position limit of a joint.
    fn max_pos_limit(&self, jidx: usize) -> f64;

    /// Whether a joint has position limits at all.
    fn has_pos_limit(&self, jidx: usize) -> bool;

    /// Whether a joint is continuous (wraps at ±π).
    fn is_continuous(&self, jidx: usize) -> bool;

    /// Velocity limit of a joint; 0 means unlimited.
    fn vel_limit(&self, jidx: usize) -> f64;

    /// Acceleration limit of a joint; 0 means unlimited.
    fn acc_limit(&self, jidx: usize) -> f64;

    /// Name of the link whose pose is compared against workspace goals.
    fn planning_link(&self) -> &str;

    /// Returns whether every angle is within its joint's limits.
    fn check_joint_limits(&self, angles: &[f64]) -> bool;

    /// Forward kinematics of an arbitrary link.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::InvalidInput`] for unknown links or
    /// [`PlanError::JointCountMismatch`] for malformed joint vectors.
    fn compute_fk(&self, angles: &[f64], link: &str) -> Result<Pose, PlanError>;

    /// Forward kinematics of the planning link.
    ///
    /// # Errors
    ///
    /// As [`Self::compute_fk`].
    fn compute_planning_link_fk(&self, angles: &[f64]) -> Result<Pose, PlanError> {
        let link = self.planning_link().to_owned();
        self.compute_fk(angles, &link)
    }

    /// Computes an inverse kinematics solution seeded at `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::KinematicsFailure`] when no solution converges.
    fn compute_ik(
        &self,
        pose: &Pose,
        seed: &[f64],
        option: IkOption,
    ) -> Result<Vec<f64>, PlanError>;

    /// Computes multiple inverse kinematics solutions.
    ///
    /// The default forwards to [`Self::compute_ik`] and yields at most one.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::KinematicsFailure`] when no solution converges.
    fn compute_ik_multi(
        &self,
        pose: &Pose,
        seed: &[f64],
        option: IkOption,
    ) -> Result<Vec<Vec<f64>>, PlanError> {
        self.compute_ik(pose, seed, option).map(|s| vec![s])
    }
}
