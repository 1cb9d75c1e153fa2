//! The lattice graph.

use std::f64::consts::PI;

use hashbrown::HashMap;
use nalgebra::Point3;
use tracing::{debug, warn};

use plan_action::ActionSpace;
use plan_search::StateId;
use plan_types::angles::shortest_angle_dist;
use plan_types::{
    CollisionChecker, GoalConstraint, MotionPrimitiveKind, PlanError, PlanningParams, RobotModel,
};

use crate::state::{discretize_joint, LatticeState, GOAL_STATE_ID};

/// The discrete joint-configuration graph the search expands.
///
/// States are interned lazily as the search discovers novel
/// discretizations and persist until the lattice is dropped. Interning is
/// stable: equal coordinate vectors always map to the same id, and no
/// state other than the goal sentinel ever has id 0.
pub struct ManipLattice {
    robot: Box<dyn RobotModel>,
    checker: Box<dyn CollisionChecker>,
    actions: ActionSpace,
    params: PlanningParams,

    states: Vec<LatticeState>,
    ids: HashMap<Vec<i32>, StateId>,
    goal: Option<GoalConstraint>,
    /// Concrete goal-satisfying configurations, keyed by the predecessor
    /// that reached the goal sentinel.
    goal_entries: HashMap<StateId, Vec<f64>>,
    start_id: Option<StateId>,
}

impl ManipLattice {
    /// Creates a lattice.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::InvalidInput`] when the parameter
    /// discretization does not cover every robot joint.
    pub fn new(
        robot: Box<dyn RobotModel>,
        checker: Box<dyn CollisionChecker>,
        actions: ActionSpace,
        params: PlanningParams,
    ) -> Result<Self, PlanError> {
        if params.discretization.len() != robot.joint_count() {
            return Err(PlanError::InvalidInput(format!(
                "discretization covers {} joints, robot has {}",
                params.discretization.len(),
                robot.joint_count()
            )));
        }
        Ok(Self {
            robot,
            checker,
            actions,
            params,
            // Id 0 is the goal sentinel; its empty coordinate vector can
            // never equal a real state's.
            states: vec![LatticeState {
                coords: Vec::new(),
                angles: Vec::new(),
            }],
            ids: HashMap::new(),
            goal: None,
            goal_entries: HashMap::new(),
            start_id: None,
        })
    }

    /// The robot model the lattice plans for.
    #[must_use]
    pub fn robot(&self) -> &dyn RobotModel {
        &*self.robot
    }

    /// Number of interned states, goal sentinel included.
    #[must_use]
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// The interned id of the start state, once set.
    #[must_use]
    pub const fn start_id(&self) -> Option<StateId> {
        self.start_id
    }

    /// Installs the goal and forwards it to the action space.
    pub fn set_goal(&mut self, goal: GoalConstraint) {
        self.actions.update_goal(goal.clone());
        self.goal = Some(goal);
    }

    /// The installed goal.
    #[must_use]
    pub const fn goal(&self) -> Option<&GoalConstraint> {
        self.goal.as_ref()
    }

    /// Validates and interns the start configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::InvalidInput`] when the start violates joint
    /// limits or is in collision, and the checker's error for malformed
    /// vectors.
    pub fn set_start(&mut self, angles: &[f64]) -> Result<StateId, PlanError> {
        if !self.robot.check_joint_limits(angles) {
            return Err(PlanError::InvalidInput(
                "start configuration violates joint limits".into(),
            ));
        }
        let validity = self.checker.is_state_valid(angles)?;
        if !validity.valid {
            return Err(PlanError::InvalidInput(
                "start configuration is in collision".into(),
            ));
        }
        let id = self.intern(angles.to_vec());
        self.start_id = Some(id);
        Ok(id)
    }

    /// The continuous configuration of an interned state. The goal
    /// sentinel has none.
    #[must_use]
    pub fn state_angles(&self, id: StateId) -> Option<&[f64]> {
        if id == GOAL_STATE_ID {
            return None;
        }
        self.states.get(id).map(|s| s.angles.as_slice())
    }

    /// The workspace position of a state's planning link; for the goal
    /// sentinel, the goal's own position.
    #[must_use]
    pub fn state_planning_link_position(&self, id: StateId) -> Option<Point3<f64>> {
        if id == GOAL_STATE_ID {
            return self.goal.as_ref().and_then(GoalConstraint::position);
        }
        let angles = self.state_angles(id)?;
        self.robot
            .compute_planning_link_fk(angles)
            .ok()
            .map(|pose| pose.position())
    }

    /// Generates the successors of a state.
    ///
    /// Every action waypoint must satisfy joint limits; the interpolated
    /// path from the parent through the waypoints must be collision free.
    /// Endpoints satisfying the goal yield the sentinel id 0; all other
    /// endpoints are interned after the checks pass. Collision-checker
    /// failures invalidate the action rather than aborting the expansion.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] when the state id is unknown or the action
    /// space rejects the stored configuration.
    pub fn succs(&mut self, id: StateId) -> Result<Vec<(StateId, i64)>, PlanError> {
        if id == GOAL_STATE_ID {
            return Ok(Vec::new());
        }
        let state = self
            .states
            .get(id)
            .ok_or_else(|| PlanError::InvalidInput(format!("unknown state id {id}")))?;
        let parent = state.angles.clone();
        let parent_coords = state.coords.clone();

        let actions = self.actions.apply(&*self.robot, &parent)?;
        let mut succs = Vec::with_capacity(actions.len());
        for (kind, action) in actions {
            if action.is_empty() {
                continue;
            }
            if !action.iter().all(|wp| self.robot.check_joint_limits(wp)) {
                continue;
            }
            if !self.action_path_valid(&parent, &action) {
                continue;
            }

            // Interning happens only after all validity checks pass.
            let Some(endpoint) = action.last().cloned() else {
                continue;
            };
            let cost = self.action_cost(&parent_coords, &endpoint, kind);
            if self.satisfies_goal(&endpoint) {
                self.goal_entries.insert(id, endpoint);
                succs.push((GOAL_STATE_ID, cost));
            } else {
                let sid = self.intern(endpoint);
                if sid != id {
                    succs.push((sid, cost));
                }
            }
        }
        debug!(id, count = succs.len(), "expanded state");
        Ok(succs)
    }

    /// Checks the interpolated path from `parent` through every waypoint.
    fn action_path_valid(&mut self, parent: &[f64], action: &[Vec<f64>]) -> bool {
        let mut from = parent;
        for waypoint in action {
            match self.checker.is_state_to_state_valid(from, waypoint) {
                Ok(v) if v.valid => from = waypoint,
                Ok(_) => return false,
                Err(err) => {
                    // A checker failure is "state invalid", not a search
                    // abort.
                    warn!(%err, "collision check failed; treating action as invalid");
                    return false;
                }
            }
        }
        true
    }

    /// Cost of an action: snaps cost their fixed price; distance actions
    /// cost `cost_per_cell` per largest per-joint coordinate change (at
    /// least one cell).
    fn action_cost(&self, parent_coords: &[i32], endpoint: &[f64], kind: MotionPrimitiveKind) -> i64 {
        if kind.is_snap() {
            return i64::from(self.params.cost_per_snap);
        }
        let endpoint_coords = self.coords_of(endpoint);
        let max_dc = parent_coords
            .iter()
            .zip(endpoint_coords.iter())
            .enumerate()
            .map(|(j, (&a, &b))| {
                let dc = i64::from((a - b).abs());
                if self.robot.is_continuous(j) {
                    // Coordinates of continuous joints live on a ring.
                    #[allow(clippy::cast_possible_truncation)]
                    let cells = (2.0 * PI / self.params.discretization[j]).round() as i64;
                    dc.min(cells - dc)
                } else {
                    dc
                }
            })
            .max()
            .unwrap_or(0)
            .max(1);
        i64::from(self.params.cost_per_cell) * max_dc
    }

    /// Whether a configuration satisfies the installed goal.
    #[must_use]
    fn satisfies_goal(&self, angles: &[f64]) -> bool {
        match &self.goal {
            None => false,
            Some(GoalConstraint::Joints(jg)) => angles
                .iter()
                .zip(jg.angles.iter().zip(jg.tolerances.iter()))
                .enumerate()
                .all(|(j, (&a, (&g, &tol)))| {
                    let err = if self.robot.is_continuous(j) {
                        shortest_angle_dist(a, g)
                    } else {
                        (a - g).abs()
                    };
                    err <= tol
                }),
            Some(goal) => self
                .robot
                .compute_planning_link_fk(angles)
                .is_ok_and(|pose| goal.satisfied_by_pose(&pose)),
        }
    }

    fn coords_of(&self, angles: &[f64]) -> Vec<i32> {
        angles
            .iter()
            .enumerate()
            .map(|(j, &a)| {
                discretize_joint(a, self.params.discretization[j], self.robot.is_continuous(j))
            })
            .collect()
    }

    /// Interns a configuration, returning the stable id of its
    /// discretization.
    fn intern(&mut self, angles: Vec<f64>) -> StateId {
        let coords = self.coords_of(&angles);
        if let Some(&id) = self.ids.get(&coords) {
            return id;
        }
        let id = self.states.len();
        self.ids.insert(coords.clone(), id);
        self.states.push(LatticeState { coords, angles });
        id
    }

    /// Maps a state-id path back to joint configurations. The goal
    /// sentinel resolves through the concrete configuration recorded when
    /// its predecessor reached it.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::InvalidInput`] for unknown ids or a goal
    /// sentinel with no recorded entry.
    pub fn extract_path(&self, ids: &[StateId]) -> Result<Vec<Vec<f64>>, PlanError> {
        let mut path = Vec::with_capacity(ids.len());
        for (i, &id) in ids.iter().enumerate() {
            if id == GOAL_STATE_ID {
                let pred = i
                    .checked_sub(1)
                    .map(|p| ids[p])
                    .ok_or_else(|| PlanError::InvalidInput("path starts at the goal sentinel".into()))?;
                let entry = self.goal_entries.get(&pred).ok_or_else(|| {
                    PlanError::InvalidInput(format!("no goal entry recorded for state {pred}"))
                })?;
                path.push(entry.clone());
            } else {
                let angles = self
                    .state_angles(id)
                    .ok_or_else(|| PlanError::InvalidInput(format!("unknown state id {id}")))?;
                path.push(angles.to_vec());
            }
        }
        Ok(path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use plan_types::{IkOption, PathValidity, Pose, Validity};

    /// A free-floating 7-DoF arm whose planning link sits at
    /// (θ0, θ1, θ2); collision checking always passes.
    struct Arm7;

    impl RobotModel for Arm7 {
        fn joint_count(&self) -> usize {
            7
        }
        fn min_pos_limit(&self, _: usize) -> f64 {
            -PI
        }
        fn max_pos_limit(&self, _: usize) -> f64 {
            PI
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
            "wrist"
        }
        fn check_joint_limits(&self, angles: &[f64]) -> bool {
            angles.iter().all(|a| a.abs() <= PI)
        }
        fn compute_fk(&self, angles: &[f64], _link: &str) -> Result<Pose, PlanError> {
            Ok(Pose::new(angles[0], angles[1], angles[2], 0.0, 0.0, 0.0))
        }
        fn compute_ik(
            &self,
            pose: &Pose,
            _seed: &[f64],
            _option: IkOption,
        ) -> Result<Vec<f64>, PlanError> {
            Ok(vec![pose.x, pose.y, pose.z, 0.0, 0.0, 0.0, 0.0])
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

    fn lattice_with_one_primitive() -> ManipLattice {
        let params = PlanningParams::new(7);
        let mut actions = ActionSpace::new(&params);
        let delta = PlanningParams::DEFAULT_DISCRETIZATION;
        actions.add_motion_primitive(
            vec![delta, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            false,
            false,
        );
        ManipLattice::new(Box::new(Arm7), Box::new(AlwaysValid), actions, params).unwrap()
    }

    #[test]
    fn test_single_primitive_successor() {
        let mut lattice = lattice_with_one_primitive();
        let start = lattice.set_start(&[0.0; 7]).unwrap();

        let succs = lattice.succs(start).unwrap();
        assert_eq!(succs.len(), 1);
        let (sid, cost) = succs[0];
        assert_eq!(cost, 100);
        assert_eq!(
            lattice.states[sid].coords,
            vec![1, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_interning_is_stable() {
        let mut lattice = lattice_with_one_primitive();
        let start = lattice.set_start(&[0.0; 7]).unwrap();
        let first = lattice.succs(start).unwrap()[0].0;
        let second = lattice.succs(start).unwrap()[0].0;
        assert_eq!(first, second);
        assert_ne!(first, GOAL_STATE_ID);
    }

    #[test]
    fn test_goal_yields_sentinel_id() {
        let mut lattice = lattice_with_one_primitive();
        let delta = PlanningParams::DEFAULT_DISCRETIZATION;
        lattice.set_goal(GoalConstraint::pose(
            Pose::new(delta, 0.0, 0.0, 0.0, 0.0, 0.0),
            [1e-6; 3],
            [0.1; 3],
        ));
        let start = lattice.set_start(&[0.0; 7]).unwrap();

        let succs = lattice.succs(start).unwrap();
        assert_eq!(succs.len(), 1);
        assert_eq!(succs[0].0, GOAL_STATE_ID);

        // The concrete goal configuration is recoverable from the path.
        let path = lattice.extract_path(&[start, GOAL_STATE_ID]).unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[1][0], delta);
    }

    #[test]
    fn test_limit_violating_action_skipped() {
        let params = PlanningParams::new(7);
        let mut actions = ActionSpace::new(&params);
        // A primitive stepping far past the +π limit.
        actions.add_motion_primitive(vec![4.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], false, false);
        let mut lattice =
            ManipLattice::new(Box::new(Arm7), Box::new(AlwaysValid), actions, params).unwrap();
        let start = lattice.set_start(&[0.0; 7]).unwrap();
        assert!(lattice.succs(start).unwrap().is_empty());
    }

    #[test]
    fn test_colliding_action_skipped() {
        struct NeverValid;
        impl CollisionChecker for NeverValid {
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
                    valid: false,
                    path_length: 2,
                    checks: 1,
                    distance: 0.0,
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

        let params = PlanningParams::new(7);
        let mut actions = ActionSpace::new(&params);
        let delta = PlanningParams::DEFAULT_DISCRETIZATION;
        actions.add_motion_primitive(vec![delta, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], false, false);
        let mut lattice =
            ManipLattice::new(Box::new(Arm7), Box::new(NeverValid), actions, params).unwrap();
        let start = lattice.set_start(&[0.0; 7]).unwrap();
        assert!(lattice.succs(start).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_start_rejected() {
        let mut lattice = lattice_with_one_primitive();
        let r = lattice.set_start(&[5.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(matches!(r, Err(PlanError::InvalidInput(_))));
    }

    #[test]
    fn test_discretization_mismatch_rejected() {
        let params = PlanningParams::new(3);
        let actions = ActionSpace::new(&params);
        let r = ManipLattice::new(Box::new(Arm7), Box::new(AlwaysValid), actions, params);
        assert!(matches!(r, Err(PlanError::InvalidInput(_))));
    }

    #[test]
    fn test_goal_expansion_is_terminal() {
        let mut lattice = lattice_with_one_primitive();
        assert!(lattice.succs(GOAL_STATE_ID).unwrap().is_empty());
    }
}
