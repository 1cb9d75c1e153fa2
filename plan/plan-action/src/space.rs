//! Adaptive successor generation.

use std::collections::HashMap;

use tracing::debug;

use plan_types::angles::{normalize_angle, shortest_angle_dist};
use plan_types::{
    Action, GoalConstraint, IkOption, MotionPrimitive, MotionPrimitiveKind, PlanError,
    PlanningParams, RobotModel,
};

/// The repertoire of motions available from a configuration.
///
/// Distance primitives come from a primitive file; snap primitives are
/// synthesized here and activated per kind. Applying the space to a parent
/// configuration yields the actions the lattice turns into successor
/// states.
///
/// Activation rules:
///
/// - long-distance primitives apply unconditionally;
/// - short-distance primitives apply within `short_dist_thresh` of the
///   goal. For joint-space goals the distance is the largest per-joint
///   error; workspace goals, which name no goal configuration, stand in
///   the planning link's workspace distance;
/// - snap primitives apply within their per-kind workspace threshold and
///   require a workspace pose goal to aim the IK query at.
pub struct ActionSpace {
    primitives: Vec<MotionPrimitive>,
    enabled: HashMap<MotionPrimitiveKind, bool>,
    thresholds: HashMap<MotionPrimitiveKind, f64>,
    use_multiple_ik_solutions: bool,
    goal: Option<GoalConstraint>,
}

impl ActionSpace {
    /// Creates an action space configured from planning parameters, with
    /// no distance primitives loaded and snap primitives disabled.
    #[must_use]
    pub fn new(params: &PlanningParams) -> Self {
        let mut space = Self {
            primitives: Vec::new(),
            enabled: HashMap::new(),
            thresholds: HashMap::new(),
            use_multiple_ik_solutions: params.use_multiple_ik_solutions,
            goal: None,
        };
        space
            .thresholds
            .insert(MotionPrimitiveKind::ShortDistance, params.short_dist_thresh);
        space
            .thresholds
            .insert(MotionPrimitiveKind::SnapToXyz, params.snap_xyz_thresh);
        space
            .thresholds
            .insert(MotionPrimitiveKind::SnapToRpy, params.snap_rpy_thresh);
        space.thresholds.insert(
            MotionPrimitiveKind::SnapToXyzRpy,
            params.snap_xyzrpy_thresh,
        );
        for kind in [
            MotionPrimitiveKind::SnapToXyz,
            MotionPrimitiveKind::SnapToRpy,
            MotionPrimitiveKind::SnapToXyzRpy,
        ] {
            space.primitives.push(MotionPrimitive::snap(kind));
            space.enabled.insert(kind, false);
        }
        space
    }

    /// Appends loaded distance primitives.
    pub fn add_primitives(&mut self, primitives: Vec<MotionPrimitive>) {
        self.primitives.extend(primitives);
    }

    /// Adds one distance primitive, optionally with its negation.
    pub fn add_motion_primitive(&mut self, delta: Vec<f64>, short: bool, add_converse: bool) {
        let kind = if short {
            MotionPrimitiveKind::ShortDistance
        } else {
            MotionPrimitiveKind::LongDistance
        };
        let mp = MotionPrimitive::distance(kind, delta);
        if add_converse {
            self.primitives.push(mp.negated());
        }
        self.primitives.push(mp);
    }

    /// Removes all distance primitives and disables all snap primitives.
    pub fn clear(&mut self) {
        self.primitives
            .retain(|mp| mp.kind.is_snap());
        for enabled in self.enabled.values_mut() {
            *enabled = false;
        }
    }

    /// Enables or disables an adaptive primitive kind.
    pub fn set_enabled(&mut self, kind: MotionPrimitiveKind, enable: bool) {
        self.enabled.insert(kind, enable);
    }

    /// Whether an adaptive primitive kind is enabled.
    #[must_use]
    pub fn is_enabled(&self, kind: MotionPrimitiveKind) -> bool {
        self.enabled.get(&kind).copied().unwrap_or(true)
    }

    /// Sets the activation threshold of a primitive kind.
    pub fn set_threshold(&mut self, kind: MotionPrimitiveKind, thresh: f64) {
        self.thresholds.insert(kind, thresh);
    }

    /// Number of loaded long-distance primitives.
    #[must_use]
    pub fn long_dist_count(&self) -> usize {
        self.primitives
            .iter()
            .filter(|mp| mp.kind == MotionPrimitiveKind::LongDistance)
            .count()
    }

    /// Number of loaded short-distance primitives.
    #[must_use]
    pub fn short_dist_count(&self) -> usize {
        self.primitives
            .iter()
            .filter(|mp| mp.kind == MotionPrimitiveKind::ShortDistance)
            .count()
    }

    /// Installs the goal the adaptive rules aim at.
    pub fn update_goal(&mut self, goal: GoalConstraint) {
        self.goal = Some(goal);
    }

    /// Distance from a configuration to the goal, in the metric the
    /// activation rules use. `None` without a goal.
    fn dist_to_goal(&self, robot: &dyn RobotModel, parent: &[f64]) -> Option<f64> {
        let goal = self.goal.as_ref()?;
        match goal {
            GoalConstraint::Joints(jg) => parent
                .iter()
                .zip(jg.angles.iter())
                .enumerate()
                .map(|(j, (&a, &b))| {
                    if robot.is_continuous(j) {
                        shortest_angle_dist(a, b)
                    } else {
                        (a - b).abs()
                    }
                })
                .fold(None, |acc: Option<f64>, d| {
                    Some(acc.map_or(d, |m| m.max(d)))
                }),
            _ => {
                let fk = robot.compute_planning_link_fk(parent).ok()?;
                let goal_pos = goal.position()?;
                Some((fk.position() - goal_pos).norm())
            }
        }
    }

    /// Returns the actions applicable from `parent`, each tagged with the
    /// kind of the primitive that produced it (the lattice costs snap
    /// actions differently).
    ///
    /// Kinematics failures in snap primitives yield no action, not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::JointCountMismatch`] when `parent` does not
    /// match the robot's joint count.
    pub fn apply(
        &self,
        robot: &dyn RobotModel,
        parent: &[f64],
    ) -> Result<Vec<(MotionPrimitiveKind, Action)>, PlanError> {
        if parent.len() != robot.joint_count() {
            return Err(PlanError::JointCountMismatch {
                expected: robot.joint_count(),
                actual: parent.len(),
            });
        }

        let goal_dist = self.dist_to_goal(robot, parent);
        let mut actions = Vec::new();
        for mp in &self.primitives {
            match mp.kind {
                MotionPrimitiveKind::LongDistance => {
                    actions.push((mp.kind, self.apply_deltas(robot, parent, mp)));
                }
                MotionPrimitiveKind::ShortDistance => {
                    if self.active(mp.kind, goal_dist) {
                        actions.push((mp.kind, self.apply_deltas(robot, parent, mp)));
                    }
                }
                kind => {
                    if self.active(kind, goal_dist) {
                        self.apply_snap(robot, parent, kind, &mut actions);
                    }
                }
            }
        }
        debug!(
            count = actions.len(),
            goal_dist, "actions applicable from parent"
        );
        Ok(actions)
    }

    fn active(&self, kind: MotionPrimitiveKind, goal_dist: Option<f64>) -> bool {
        if !self.is_enabled(kind) {
            return false;
        }
        match (goal_dist, self.thresholds.get(&kind)) {
            (Some(d), Some(&t)) => d <= t,
            _ => false,
        }
    }

    /// A distance primitive's action: each waypoint is the parent plus the
    /// waypoint's delta, with continuous joints renormalized.
    fn apply_deltas(
        &self,
        robot: &dyn RobotModel,
        parent: &[f64],
        mp: &MotionPrimitive,
    ) -> Action {
        mp.deltas
            .iter()
            .map(|delta| {
                parent
                    .iter()
                    .zip(delta.iter())
                    .enumerate()
                    .map(|(j, (&p, &d))| {
                        let v = p + d;
                        if robot.is_continuous(j) {
                            normalize_angle(v)
                        } else {
                            v
                        }
                    })
                    .collect()
            })
            .collect()
    }

    /// A snap primitive's actions: IK to the goal pose, seeded at the
    /// parent.
    fn apply_snap(
        &self,
        robot: &dyn RobotModel,
        parent: &[f64],
        kind: MotionPrimitiveKind,
        actions: &mut Vec<(MotionPrimitiveKind, Action)>,
    ) {
        let Some(goal_pose) = self.goal.as_ref().and_then(GoalConstraint::target_pose) else {
            return;
        };
        let Ok(current) = robot.compute_planning_link_fk(parent) else {
            return;
        };

        // Aim at the goal components this snap kind cares about, keeping
        // the current pose for the rest.
        let (target, option) = match kind {
            MotionPrimitiveKind::SnapToXyz => (
                current.with_position(goal_pose.position()),
                IkOption::Unrestricted,
            ),
            MotionPrimitiveKind::SnapToRpy => (
                current.with_orientation(goal_pose.roll, goal_pose.pitch, goal_pose.yaw),
                IkOption::RestrictXyz,
            ),
            _ => (*goal_pose, IkOption::Unrestricted),
        };

        if self.use_multiple_ik_solutions {
            if let Ok(solutions) = robot.compute_ik_multi(&target, parent, option) {
                for solution in solutions {
                    actions.push((kind, vec![solution]));
                }
            }
        } else if let Ok(solution) = robot.compute_ik(&target, parent, option) {
            actions.push((kind, vec![solution]));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use plan_types::Pose;
    use std::f64::consts::PI;

    /// A 3-DoF gantry: the planning link sits at (θ0, θ1, θ2). IK reads
    /// the position straight back.
    struct Gantry;

    impl RobotModel for Gantry {
        fn joint_count(&self) -> usize {
            3
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
        fn is_continuous(&self, jidx: usize) -> bool {
            jidx == 2
        }
        fn vel_limit(&self, _: usize) -> f64 {
            0.0
        }
        fn acc_limit(&self, _: usize) -> f64 {
            0.0
        }
        fn planning_link(&self) -> &str {
            "tool"
        }
        fn check_joint_limits(&self, angles: &[f64]) -> bool {
            angles.iter().all(|a| a.abs() <= 10.0)
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
            Ok(vec![pose.x, pose.y, pose.z])
        }
    }

    fn space_with_goal(goal_xyz: [f64; 3]) -> ActionSpace {
        let params = PlanningParams::new(3)
            .with_short_dist_thresh(0.5)
            .with_snap_thresh(0.5);
        let mut space = ActionSpace::new(&params);
        space.add_motion_primitive(vec![0.1, 0.0, 0.0], false, false);
        space.add_motion_primitive(vec![0.0, 0.02, 0.0], true, false);
        space.update_goal(GoalConstraint::pose(
            Pose::new(goal_xyz[0], goal_xyz[1], goal_xyz[2], 0.0, 0.0, 0.0),
            [0.02; 3],
            [0.05; 3],
        ));
        space
    }

    #[test]
    fn test_long_primitives_always_apply() {
        let space = space_with_goal([5.0, 5.0, 5.0]);
        let actions = space.apply(&Gantry, &[0.0, 0.0, 0.0]).unwrap();
        // Far from the goal only the long primitive fires.
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].0, MotionPrimitiveKind::LongDistance);
        assert_eq!(actions[0].1, vec![vec![0.1, 0.0, 0.0]]);
    }

    #[test]
    fn test_short_primitives_near_goal() {
        let space = space_with_goal([0.3, 0.0, 0.0]);
        let actions = space.apply(&Gantry, &[0.0, 0.0, 0.0]).unwrap();
        // Long + short + three snaps are all within 0.5 of this goal, but
        // snaps are disabled by default.
        assert_eq!(actions.len(), 2);
    }

    #[test]
    fn test_snap_produces_ik_action() {
        let mut space = space_with_goal([0.3, 0.1, 0.0]);
        space.set_enabled(MotionPrimitiveKind::SnapToXyzRpy, true);
        let actions = space.apply(&Gantry, &[0.0, 0.0, 0.0]).unwrap();
        assert_eq!(actions.len(), 3);
        // The snap action lands exactly on the goal position.
        assert!(actions.iter().any(|(kind, a)| {
            *kind == MotionPrimitiveKind::SnapToXyzRpy && a == &vec![vec![0.3, 0.1, 0.0]]
        }));
    }

    #[test]
    fn test_snap_to_xyz_keeps_current_orientation() {
        let mut space = space_with_goal([0.3, 0.0, 0.0]);
        space.set_enabled(MotionPrimitiveKind::SnapToXyz, true);
        let actions = space.apply(&Gantry, &[0.1, 0.0, 0.0]).unwrap();
        assert!(actions
            .iter()
            .any(|(_, a)| a == &vec![vec![0.3, 0.0, 0.0]]));
    }

    #[test]
    fn test_continuous_joint_renormalizes() {
        let params = PlanningParams::new(3);
        let mut space = ActionSpace::new(&params);
        space.add_motion_primitive(vec![0.0, 0.0, 0.2], false, false);
        let actions = space.apply(&Gantry, &[0.0, 0.0, PI - 0.1]).unwrap();
        let endpoint = &actions[0].1[0];
        // π + 0.1 wraps to -π + 0.1.
        assert!((endpoint[2] - (-PI + 0.1)).abs() < 1e-12);
    }

    #[test]
    fn test_joint_goal_uses_joint_distance() {
        let params = PlanningParams::new(3).with_short_dist_thresh(0.5);
        let mut space = ActionSpace::new(&params);
        space.add_motion_primitive(vec![0.0, 0.02, 0.0], true, false);
        space.update_goal(GoalConstraint::joints(vec![0.2, 0.2, 0.2], vec![0.05; 3]));

        // Max per-joint error 0.2 <= 0.5: the short primitive fires.
        let near = space.apply(&Gantry, &[0.0, 0.0, 0.0]).unwrap();
        assert_eq!(near.len(), 1);

        // One joint 2.0 away: it does not.
        let far = space.apply(&Gantry, &[2.2, 0.0, 0.0]).unwrap();
        assert!(far.is_empty());
    }

    #[test]
    fn test_no_goal_no_adaptive_actions() {
        let params = PlanningParams::new(3);
        let mut space = ActionSpace::new(&params);
        space.add_motion_primitive(vec![0.1, 0.0, 0.0], false, false);
        space.add_motion_primitive(vec![0.0, 0.02, 0.0], true, false);
        let actions = space.apply(&Gantry, &[0.0, 0.0, 0.0]).unwrap();
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn test_joint_count_mismatch() {
        let space = space_with_goal([1.0, 0.0, 0.0]);
        assert!(matches!(
            space.apply(&Gantry, &[0.0]),
            Err(PlanError::JointCountMismatch { .. })
        ));
    }

    #[test]
    fn test_clear_removes_distance_primitives() {
        let mut space = space_with_goal([0.3, 0.0, 0.0]);
        space.set_enabled(MotionPrimitiveKind::SnapToXyzRpy, true);
        space.clear();
        let actions = space.apply(&Gantry, &[0.0, 0.0, 0.0]).unwrap();
        assert!(actions.is_empty());
        assert_eq!(space.long_dist_count(), 0);
    }
}
