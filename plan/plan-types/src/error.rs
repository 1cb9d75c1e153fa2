//! Planner error kinds.

/// Errors surfaced across the planner crates.
///
/// Collision invalidity is *not* an error: checkers report it as a value.
/// Errors are reserved for malformed inputs, kinematics failures, and
/// planner-level outcomes.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PlanError {
    /// Malformed caller input; reported, never retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A joint vector had the wrong number of entries.
    #[error("joint count mismatch: expected {expected}, got {actual}")]
    JointCountMismatch {
        /// Number of planning joints.
        expected: usize,
        /// Number of entries supplied.
        actual: usize,
    },

    /// The search exhausted the space without reaching the goal.
    #[error("goal is unreachable")]
    UnreachableGoal,

    /// The search hit its time budget before finding a solution.
    #[error("planning timed out")]
    TimedOut,

    /// Inverse kinematics did not converge; the corresponding primitive
    /// yields no successor.
    #[error("inverse kinematics did not converge")]
    KinematicsFailure,

    /// The operation is recognized but intentionally unimplemented.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
}
