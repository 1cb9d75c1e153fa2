//! The serial kinematic chain.

use nalgebra::{DMatrix, DVector, Isometry3, Translation3, Unit, UnitQuaternion, Vector3, Vector6};

use plan_types::angles::normalize_angle;
use plan_types::{IkOption, PlanError, Pose, RobotModel};

/// How a chain joint moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChainJointKind {
    /// Rotation about the axis within position limits.
    Revolute {
        /// Lower position limit, radians.
        min: f64,
        /// Upper position limit, radians.
        max: f64,
    },
    /// Unlimited rotation about the axis.
    Continuous,
    /// Translation along the axis within position limits.
    Prismatic {
        /// Lower position limit, meters.
        min: f64,
        /// Upper position limit, meters.
        max: f64,
    },
}

/// One actuated joint of the chain, producing one link.
#[derive(Debug, Clone)]
pub struct ChainJoint {
    /// Joint name.
    pub name: String,
    /// Name of the link this joint produces.
    pub link: String,
    /// Motion kind and limits.
    pub kind: ChainJointKind,
    /// Transform from the previous link frame to this joint frame.
    pub origin: Isometry3<f64>,
    /// Motion axis in the joint frame.
    pub axis: Unit<Vector3<f64>>,
    /// Velocity limit; 0 means unlimited.
    pub vel_limit: f64,
    /// Acceleration limit; 0 means unlimited.
    pub acc_limit: f64,
}

impl ChainJoint {
    /// Creates a joint producing `link`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        link: impl Into<String>,
        kind: ChainJointKind,
        origin: Isometry3<f64>,
        axis: Vector3<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            link: link.into(),
            kind,
            origin,
            axis: Unit::new_normalize(axis),
            vel_limit: 0.0,
            acc_limit: 0.0,
        }
    }

    fn motion(&self, q: f64) -> Isometry3<f64> {
        match self.kind {
            ChainJointKind::Revolute { .. } | ChainJointKind::Continuous => Isometry3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_axis_angle(&self.axis, q),
            ),
            ChainJointKind::Prismatic { .. } => {
                Isometry3::translation(self.axis.x * q, self.axis.y * q, self.axis.z * q)
            }
        }
    }

    fn clamp(&self, q: f64) -> f64 {
        match self.kind {
            ChainJointKind::Revolute { min, max } | ChainJointKind::Prismatic { min, max } => {
                q.clamp(min, max)
            }
            ChainJointKind::Continuous => normalize_angle(q),
        }
    }

    fn within_limits(&self, q: f64) -> bool {
        match self.kind {
            ChainJointKind::Revolute { min, max } | ChainJointKind::Prismatic { min, max } => {
                q >= min && q <= max
            }
            ChainJointKind::Continuous => true,
        }
    }
}

/// An open serial chain of actuated joints.
///
/// The planning link defaults to the last link.
///
/// # Example
///
/// ```
/// use nalgebra::{Isometry3, Vector3};
/// use plan_chain::{ChainJoint, ChainJointKind, SerialChain};
/// use plan_types::RobotModel;
///
/// let chain = SerialChain::new(vec![
///     ChainJoint::new(
///         "shoulder",
///         "upper_arm",
///         ChainJointKind::Continuous,
///         Isometry3::identity(),
///         Vector3::z(),
///     ),
///     ChainJoint::new(
///         "elbow",
///         "forearm",
///         ChainJointKind::Continuous,
///         Isometry3::translation(1.0, 0.0, 0.0),
///         Vector3::z(),
///     ),
/// ])
/// .unwrap();
///
/// assert_eq!(chain.joint_count(), 2);
/// assert_eq!(chain.planning_link(), "forearm");
/// ```
#[derive(Debug, Clone)]
pub struct SerialChain {
    joints: Vec<ChainJoint>,
    planning_link: String,
    /// Tip offset applied after the last joint's link frame.
    tip_offset: Isometry3<f64>,
}

/// Damped-least-squares parameters; fixed, tuned for planning-resolution
/// accuracy.
const IK_MAX_ITERATIONS: usize = 200;
const IK_POS_TOLERANCE: f64 = 1e-4;
const IK_ROT_TOLERANCE: f64 = 1e-3;
const IK_DAMPING: f64 = 0.05;
const JACOBIAN_STEP: f64 = 1e-6;

impl SerialChain {
    /// Creates a chain from its joints, planning for the last link.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::InvalidInput`] for an empty chain or
    /// duplicate link names.
    pub fn new(joints: Vec<ChainJoint>) -> Result<Self, PlanError> {
        let Some(last) = joints.last() else {
            return Err(PlanError::InvalidInput("chain has no joints".into()));
        };
        for (i, j) in joints.iter().enumerate() {
            if joints[..i].iter().any(|other| other.link == j.link) {
                return Err(PlanError::InvalidInput(format!(
                    "duplicate link '{}' in chain",
                    j.link
                )));
            }
        }
        let planning_link = last.link.clone();
        Ok(Self {
            joints,
            planning_link,
            tip_offset: Isometry3::identity(),
        })
    }

    /// Plans for a different link of the chain.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::InvalidInput`] for links not in the chain.
    pub fn with_planning_link(mut self, link: &str) -> Result<Self, PlanError> {
        if !self.joints.iter().any(|j| j.link == link) {
            return Err(PlanError::InvalidInput(format!(
                "planning link '{link}' is not in the chain"
            )));
        }
        self.planning_link = link.to_owned();
        Ok(self)
    }

    /// Applies a fixed tool offset after the last link.
    #[must_use]
    pub fn with_tip_offset(mut self, offset: Isometry3<f64>) -> Self {
        self.tip_offset = offset;
        self
    }

    /// The chain's joints, base to tip.
    #[must_use]
    pub fn joints(&self) -> &[ChainJoint] {
        &self.joints
    }

    fn link_index(&self, link: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.link == link)
    }

    fn fk_isometry(&self, angles: &[f64], upto: usize) -> Isometry3<f64> {
        let mut t = Isometry3::identity();
        for (joint, &q) in self.joints.iter().zip(angles.iter()).take(upto + 1) {
            t *= joint.origin * joint.motion(q);
        }
        if upto + 1 == self.joints.len() {
            t *= self.tip_offset;
        }
        t
    }

    fn check_angles(&self, angles: &[f64]) -> Result<(), PlanError> {
        if angles.len() == self.joints.len() {
            Ok(())
        } else {
            Err(PlanError::JointCountMismatch {
                expected: self.joints.len(),
                actual: angles.len(),
            })
        }
    }

    /// Pose error as a 6-vector `[position; rotation-vector]`.
    fn pose_error(target: &Isometry3<f64>, current: &Isometry3<f64>) -> Vector6<f64> {
        let dp = target.translation.vector - current.translation.vector;
        let dr = (target.rotation * current.rotation.inverse()).scaled_axis();
        Vector6::new(dp.x, dp.y, dp.z, dr.x, dr.y, dr.z)
    }

    /// Numeric 6×n Jacobian of the planning-link pose at `angles`.
    fn numeric_jacobian(&self, angles: &[f64], link_idx: usize) -> DMatrix<f64> {
        let n = self.joints.len();
        let base = self.fk_isometry(angles, link_idx);
        let mut jac = DMatrix::zeros(6, n);
        let mut perturbed = angles.to_vec();
        for j in 0..n {
            perturbed[j] = angles[j] + JACOBIAN_STEP;
            let plus = self.fk_isometry(&perturbed, link_idx);
            perturbed[j] = angles[j];

            let col = Self::pose_error(&plus, &base) / JACOBIAN_STEP;
            for r in 0..6 {
                jac[(r, j)] = col[r];
            }
        }
        jac
    }
}

impl RobotModel for SerialChain {
    fn joint_count(&self) -> usize {
        self.joints.len()
    }

    fn min_pos_limit(&self, jidx: usize) -> f64 {
        match self.joints[jidx].kind {
            ChainJointKind::Revolute { min, .. } | ChainJointKind::Prismatic { min, .. } => min,
            ChainJointKind::Continuous => -std::f64::consts::PI,
        }
    }

    fn max_pos_limit(&self, jidx: usize) -> f64 {
        match self.joints[jidx].kind {
            ChainJointKind::Revolute { max, .. } | ChainJointKind::Prismatic { max, .. } => max,
            ChainJointKind::Continuous => std::f64::consts::PI,
        }
    }

    fn has_pos_limit(&self, jidx: usize) -> bool {
        !matches!(self.joints[jidx].kind, ChainJointKind::Continuous)
    }

    fn is_continuous(&self, jidx: usize) -> bool {
        matches!(self.joints[jidx].kind, ChainJointKind::Continuous)
    }

    fn vel_limit(&self, jidx: usize) -> f64 {
        self.joints[jidx].vel_limit
    }

    fn acc_limit(&self, jidx: usize) -> f64 {
        self.joints[jidx].acc_limit
    }

    fn planning_link(&self) -> &str {
        &self.planning_link
    }

    fn check_joint_limits(&self, angles: &[f64]) -> bool {
        angles.len() == self.joints.len()
            && self
                .joints
                .iter()
                .zip(angles.iter())
                .all(|(j, &q)| j.within_limits(q))
    }

    fn compute_fk(&self, angles: &[f64], link: &str) -> Result<Pose, PlanError> {
        self.check_angles(angles)?;
        let idx = self
            .link_index(link)
            .ok_or_else(|| PlanError::InvalidInput(format!("unknown link '{link}'")))?;
        Ok(Pose::from_isometry(&self.fk_isometry(angles, idx)))
    }

    /// Damped least squares seeded at `seed`; joints clamp to their
    /// limits every step. With [`IkOption::RestrictXyz`] only the
    /// orientation error drives the update (the position rows are
    /// zeroed), which keeps the position-driving joints close to the
    /// seed.
    fn compute_ik(
        &self,
        pose: &Pose,
        seed: &[f64],
        option: IkOption,
    ) -> Result<Vec<f64>, PlanError> {
        self.check_angles(seed)?;
        let Some(link_idx) = self.link_index(&self.planning_link) else {
            return Err(PlanError::KinematicsFailure);
        };
        let target = pose.to_isometry();
        let mut q = seed.to_vec();

        let mut converged = false;
        for _ in 0..IK_MAX_ITERATIONS {
            let current = self.fk_isometry(&q, link_idx);
            let mut err = Self::pose_error(&target, &current);
            if option == IkOption::RestrictXyz {
                err[0] = 0.0;
                err[1] = 0.0;
                err[2] = 0.0;
            }

            let pos_err = (err[0] * err[0] + err[1] * err[1] + err[2] * err[2]).sqrt();
            let rot_err = (err[3] * err[3] + err[4] * err[4] + err[5] * err[5]).sqrt();
            if pos_err < IK_POS_TOLERANCE && rot_err < IK_ROT_TOLERANCE {
                converged = true;
                break;
            }

            let mut jac = self.numeric_jacobian(&q, link_idx);
            if option == IkOption::RestrictXyz {
                for c in 0..jac.ncols() {
                    jac[(0, c)] = 0.0;
                    jac[(1, c)] = 0.0;
                    jac[(2, c)] = 0.0;
                }
            }

            // dq = Jᵀ (J Jᵀ + λ²I)⁻¹ e
            let jjt =
                &jac * jac.transpose() + DMatrix::identity(6, 6) * (IK_DAMPING * IK_DAMPING);
            let Some(y) = jjt.lu().solve(&DVector::from_column_slice(err.as_slice())) else {
                break;
            };
            let dq = jac.transpose() * y;
            for (qi, (joint, d)) in q.iter_mut().zip(self.joints.iter().zip(dq.iter())) {
                *qi = joint.clamp(*qi + d);
            }
        }

        // Single failure path: anything short of a converged, in-limits
        // solution is a kinematics failure.
        if converged && self.check_joint_limits(&q) {
            Ok(q)
        } else {
            Err(PlanError::KinematicsFailure)
        }
    }
}
