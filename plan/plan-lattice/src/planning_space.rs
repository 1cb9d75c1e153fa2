//! Glue between the lattice, the BFS heuristic, and the search driver.

use tracing::warn;

use plan_heuristic::BfsHeuristic;
use plan_search::{SearchSpace, StateId};
use plan_types::{GoalConstraint, PlanError};

use crate::lattice::ManipLattice;
use crate::state::GOAL_STATE_ID;

/// A [`ManipLattice`] paired with a [`BfsHeuristic`], forming the
/// [`SearchSpace`] the anytime search driver runs over.
pub struct LatticePlanningSpace {
    lattice: ManipLattice,
    heuristic: BfsHeuristic,
}

impl LatticePlanningSpace {
    /// Pairs a lattice with its heuristic.
    #[must_use]
    pub const fn new(lattice: ManipLattice, heuristic: BfsHeuristic) -> Self {
        Self { lattice, heuristic }
    }

    /// The wrapped lattice.
    #[must_use]
    pub const fn lattice(&self) -> &ManipLattice {
        &self.lattice
    }

    /// Mutable access to the wrapped lattice.
    pub fn lattice_mut(&mut self) -> &mut ManipLattice {
        &mut self.lattice
    }

    /// Installs the goal in the lattice and seeds the heuristic's BFS
    /// from the goal's workspace position. Joint-space goals seed from
    /// the forward kinematics of the goal configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::KinematicsFailure`] when a joint-space goal's
    /// forward kinematics cannot be computed.
    pub fn set_goal(&mut self, goal: GoalConstraint) -> Result<(), PlanError> {
        let seed = match goal.position() {
            Some(pos) => pos,
            None => match goal.as_joints() {
                Some(jg) => self
                    .lattice
                    .robot()
                    .compute_planning_link_fk(&jg.angles)?
                    .position(),
                None => return Err(PlanError::InvalidInput("goal names no position".into())),
            },
        };
        self.heuristic.set_goal(seed);
        self.lattice.set_goal(goal);
        Ok(())
    }
}

impl SearchSpace for LatticePlanningSpace {
    fn successors(&mut self, id: StateId, out: &mut Vec<(StateId, i64)>) {
        match self.lattice.succs(id) {
            Ok(succs) => out.extend(succs),
            Err(err) => warn!(id, %err, "successor generation failed"),
        }
    }

    fn heuristic(&mut self, id: StateId) -> i64 {
        if id == GOAL_STATE_ID {
            return 0;
        }
        match self.lattice.state_planning_link_position(id) {
            Some(pos) => self.heuristic.cost_to_goal(pos),
            // No kinematics for this state: fall back to the (admissible)
            // zero estimate.
            None => 0,
        }
    }

    fn is_goal(&self, id: StateId) -> bool {
        id == GOAL_STATE_ID
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use grid_dist::{OccupancyGrid, PropagationDistanceField};
    use nalgebra::{Point3, Vector3};
    use plan_action::ActionSpace;
    use plan_search::{AnytimeAStar, SearchConfig};
    use plan_types::{
        CollisionChecker, IkOption, PathValidity, PlanningParams, Pose, RobotModel, Validity,
    };

    /// A 1-DoF slider: planning link at (θ0, 0, 0) meters.
    struct Slider;

    impl RobotModel for Slider {
        fn joint_count(&self) -> usize {
            1
        }
        fn min_pos_limit(&self, _: usize) -> f64 {
            -10.0
        }
        fn max_pos_limit(&self, _: usize) -> f64 {
            10.0
        }
        fn has_pos_limit(&self, _: usize) -> bool {
            true
        }
        fn is_continuous(&self, _: usize) -> bool {
            false
        }
        fn vel_limit(&self, _: usize) -> f64 {
            0.0
        }
        fn acc_limit(&self, _: usize) -> f64 {
            0.0
        }
        fn planning_link(&self) -> &str {
            "slide"
        }
        fn check_joint_limits(&self, angles: &[f64]) -> bool {
            angles[0].abs() <= 10.0
        }
        fn compute_fk(&self, angles: &[f64], _link: &str) -> Result<Pose, PlanError> {
            Ok(Pose::new(angles[0], 0.0, 0.0, 0.0, 0.0, 0.0))
        }
        fn compute_ik(
            &self,
            pose: &Pose,
            _seed: &[f64],
            _option: IkOption,
        ) -> Result<Vec<f64>, PlanError> {
            Ok(vec![pose.x])
        }
    }

    struct AlwaysValid;

    impl CollisionChecker for AlwaysValid {
        fn is_state_valid(&mut self, _: &[f64]) -> Result<Validity, PlanError> {
            Ok(Validity {
                valid: true,
                distance: 1.0,
            })
        }
        fn is_state_to_state_valid(
            &mut self,
            _: &[f64],
            _: &[f64],
        ) -> Result<PathValidity, PlanError> {
            Ok(PathValidity {
                valid: true,
                path_length: 2,
                checks: 1,
                distance: 1.0,
            })
        }
        fn interpolate_path(
            &self,
            start: &[f64],
            end: &[f64],
            _inc: f64,
        ) -> Result<Vec<Vec<f64>>, PlanError> {
            Ok(vec![start.to_vec(), end.to_vec()])
        }
    }

    fn planning_space() -> LatticePlanningSpace {
        let params = PlanningParams::new(1).with_uniform_discretization(0.5);
        let mut actions = ActionSpace::new(&params);
        actions.add_motion_primitive(vec![0.5], false, true);

        let lattice =
            ManipLattice::new(Box::new(Slider), Box::new(AlwaysValid), actions, params).unwrap();

        let field = PropagationDistanceField::new(
            Point3::new(-10.0, -10.0, -10.0),
            Vector3::new(20.0, 20.0, 20.0),
            0.5,
            2.0,
        )
        .unwrap();
        let heuristic = BfsHeuristic::new(&OccupancyGrid::new(field), 100, 0.0);
        LatticePlanningSpace::new(lattice, heuristic)
    }

    #[test]
    fn test_end_to_end_plan_to_pose() {
        let mut space = planning_space();
        space
            .set_goal(GoalConstraint::pose(
                Pose::new(2.0, 0.0, 0.0, 0.0, 0.0, 0.0),
                [0.01; 3],
                [0.1; 3],
            ))
            .unwrap();
        let start = space.lattice_mut().set_start(&[0.0]).unwrap();

        let mut planner = AnytimeAStar::new();
        let (solution, stats) = planner
            .search(&mut space, start, &SearchConfig::default())
            .unwrap();

        assert_eq!(*solution.path.last().unwrap(), GOAL_STATE_ID);
        let path = space.lattice().extract_path(&solution.path).unwrap();
        // Four +0.5 steps from 0.0 to 2.0.
        assert_eq!(path.len(), 5);
        assert_eq!(path.last().unwrap()[0], 2.0);
        assert!(stats.expansions >= 4);
    }

    #[test]
    fn test_goal_state_heuristic_is_zero() {
        let mut space = planning_space();
        space
            .set_goal(GoalConstraint::pose(
                Pose::new(2.0, 0.0, 0.0, 0.0, 0.0, 0.0),
                [0.01; 3],
                [0.1; 3],
            ))
            .unwrap();
        assert_eq!(space.heuristic(GOAL_STATE_ID), 0);
    }

    #[test]
    fn test_heuristic_monotone_toward_goal() {
        let mut space = planning_space();
        space
            .set_goal(GoalConstraint::pose(
                Pose::new(4.0, 0.0, 0.0, 0.0, 0.0, 0.0),
                [0.01; 3],
                [0.1; 3],
            ))
            .unwrap();
        let near = space.lattice_mut().set_start(&[3.5]).unwrap();
        let far = space.lattice_mut().set_start(&[0.0]).unwrap();
        assert!(space.heuristic(near) < space.heuristic(far));
    }
}
