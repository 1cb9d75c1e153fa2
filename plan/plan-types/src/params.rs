//! Planning parameters.

use std::f64::consts::PI;
use std::time::Duration;

/// Tunable parameters shared across the lattice, action space, heuristic,
/// and search.
///
/// Built in the builder style; defaults match a 7-DoF arm with 3°
/// discretization.
///
/// # Example
///
/// ```
/// use plan_types::PlanningParams;
/// use std::time::Duration;
///
/// let params = PlanningParams::new(7)
///     .with_cost_per_cell(100)
///     .with_allowed_time(Duration::from_secs(10));
/// assert_eq!(params.discretization.len(), 7);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlanningParams {
    /// Per-joint discretization Δᵢ, in radians.
    pub discretization: Vec<f64>,
    /// Base cost of moving one discretization step.
    pub cost_per_cell: i32,
    /// Fixed cost of a snap (IK) action.
    pub cost_per_snap: i32,
    /// Distance to the goal below which short primitives activate.
    pub short_dist_thresh: f64,
    /// Workspace distance below which snap-to-xyz activates.
    pub snap_xyz_thresh: f64,
    /// Workspace distance below which snap-to-rpy activates.
    pub snap_rpy_thresh: f64,
    /// Workspace distance below which snap-to-xyzrpy activates.
    pub snap_xyzrpy_thresh: f64,
    /// Whether snap primitives fan out over multiple IK solutions.
    pub use_multiple_ik_solutions: bool,
    /// Max per-joint motion between interpolated collision-check waypoints.
    pub interpolation_inc: f64,
    /// Initial inflation factor of the anytime search.
    pub initial_epsilon: f64,
    /// Final inflation factor the anytime search works down to.
    pub final_epsilon: f64,
    /// Multiplicative step the inflation shrinks by between iterations.
    pub epsilon_decrement: f64,
    /// Wall-clock planning budget.
    pub allowed_time: Duration,
}

impl PlanningParams {
    /// Default discretization: 3 degrees.
    pub const DEFAULT_DISCRETIZATION: f64 = PI / 60.0;

    /// Creates defaults for a robot with `joint_count` planning joints.
    #[must_use]
    pub fn new(joint_count: usize) -> Self {
        Self {
            discretization: vec![Self::DEFAULT_DISCRETIZATION; joint_count],
            cost_per_cell: 100,
            cost_per_snap: 1000,
            short_dist_thresh: 0.2,
            snap_xyz_thresh: 0.2,
            snap_rpy_thresh: 0.2,
            snap_xyzrpy_thresh: 0.2,
            use_multiple_ik_solutions: false,
            interpolation_inc: PI / 36.0,
            initial_epsilon: 100.0,
            final_epsilon: 1.0,
            epsilon_decrement: 0.5,
            allowed_time: Duration::from_secs(10),
        }
    }

    /// Sets the per-joint discretization to a uniform value.
    #[must_use]
    pub fn with_uniform_discretization(mut self, delta: f64) -> Self {
        for d in &mut self.discretization {
            *d = delta;
        }
        self
    }

    /// Sets the base step cost.
    #[must_use]
    pub const fn with_cost_per_cell(mut self, cost: i32) -> Self {
        self.cost_per_cell = cost;
        self
    }

    /// Sets the fixed snap-action cost.
    #[must_use]
    pub const fn with_cost_per_snap(mut self, cost: i32) -> Self {
        self.cost_per_snap = cost;
        self
    }

    /// Sets the short-primitive activation distance.
    #[must_use]
    pub const fn with_short_dist_thresh(mut self, thresh: f64) -> Self {
        self.short_dist_thresh = thresh;
        self
    }

    /// Sets all three snap activation distances at once.
    #[must_use]
    pub const fn with_snap_thresh(mut self, thresh: f64) -> Self {
        self.snap_xyz_thresh = thresh;
        self.snap_rpy_thresh = thresh;
        self.snap_xyzrpy_thresh = thresh;
        self
    }

    /// Enables or disables multi-solution IK fan-out.
    #[must_use]
    pub const fn with_multiple_ik_solutions(mut self, enable: bool) -> Self {
        self.use_multiple_ik_solutions = enable;
        self
    }

    /// Sets the wall-clock planning budget.
    #[must_use]
    pub const fn with_allowed_time(mut self, time: Duration) -> Self {
        self.allowed_time = time;
        self
    }

    /// Sets the anytime epsilon schedule.
    #[must_use]
    pub const fn with_epsilon_schedule(
        mut self,
        initial: f64,
        final_: f64,
        decrement: f64,
    ) -> Self {
        self.initial_epsilon = initial;
        self.final_epsilon = final_;
        self.epsilon_decrement = decrement;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = PlanningParams::new(7);
        assert_eq!(p.discretization.len(), 7);
        assert_eq!(p.cost_per_cell, 100);
        assert!(p.initial_epsilon >= p.final_epsilon);
    }

    #[test]
    fn test_builder() {
        let p = PlanningParams::new(3)
            .with_uniform_discretization(0.1)
            .with_cost_per_cell(50)
            .with_snap_thresh(0.3);
        assert_eq!(p.discretization, vec![0.1, 0.1, 0.1]);
        assert_eq!(p.cost_per_cell, 50);
        assert_eq!(p.snap_rpy_thresh, 0.3);
    }
}
