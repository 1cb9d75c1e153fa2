//! The collision space: grid + self-collision model behind the
//! `CollisionChecker` capability.

use std::sync::Arc;

use grid_dist::OccupancyGrid;
use plan_types::angles::shortest_angle_diff;
use plan_types::{CollisionChecker, PathValidity, PlanError, Validity};

use crate::error::CollideError;
use crate::model::RobotCollisionModel;
use crate::self_model::SelfCollisionModel;

/// One planning query's collision world: the occupancy grid, the robot
/// model, and the self-collision model, checked for a fixed group.
///
/// Implements [`CollisionChecker`], which is what the planning graph sees.
pub struct CollisionSpace {
    grid: OccupancyGrid,
    model: Arc<RobotCollisionModel>,
    scm: SelfCollisionModel,
    gidx: usize,
    /// Continuous-joint flags, index-aligned with joint variables.
    continuous: Vec<bool>,
    /// Max per-joint motion between interpolated waypoints, in radians.
    interpolation_inc: f64,
}

impl CollisionSpace {
    /// Creates a collision space checking the named group.
    ///
    /// `continuous` flags which joint variables wrap at ±π; it must be
    /// index-aligned with the model's variables.
    ///
    /// # Errors
    ///
    /// Returns [`CollideError::UnknownGroup`] or
    /// [`CollideError::JointCountMismatch`].
    pub fn new(
        grid: OccupancyGrid,
        model: Arc<RobotCollisionModel>,
        group: &str,
        continuous: Vec<bool>,
    ) -> Result<Self, CollideError> {
        let gidx = model
            .group_index(group)
            .ok_or_else(|| CollideError::UnknownGroup(group.to_owned()))?;
        if continuous.len() != model.var_count() {
            return Err(CollideError::JointCountMismatch {
                expected: model.var_count(),
                actual: continuous.len(),
            });
        }
        let scm = SelfCollisionModel::new(Arc::clone(&model));
        Ok(Self {
            grid,
            model,
            scm,
            gidx,
            continuous,
            interpolation_inc: std::f64::consts::PI / 36.0,
        })
    }

    /// Sets the interpolation increment used by state-to-state checks.
    #[must_use]
    pub const fn with_interpolation_inc(mut self, inc: f64) -> Self {
        self.interpolation_inc = inc;
        self
    }

    /// The occupancy grid (world obstacles plus outside-group links).
    #[must_use]
    pub const fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }

    /// Mutable access to the grid, for world updates between queries.
    pub fn grid_mut(&mut self) -> &mut OccupancyGrid {
        &mut self.grid
    }

    /// The robot collision model.
    #[must_use]
    pub fn model(&self) -> &Arc<RobotCollisionModel> {
        &self.model
    }

    /// The self-collision model.
    pub fn self_collision_model_mut(&mut self) -> &mut SelfCollisionModel {
        &mut self.scm
    }

    /// Joint-variable difference honoring continuous joints.
    fn joint_diff(&self, var: usize, from: f64, to: f64) -> f64 {
        if self.continuous[var] {
            shortest_angle_diff(to, from)
        } else {
            to - from
        }
    }
}

impl CollisionChecker for CollisionSpace {
    fn is_state_valid(&mut self, angles: &[f64]) -> Result<Validity, PlanError> {
        self.scm
            .check_collision(&mut self.grid, angles, self.gidx)
            .map_err(PlanError::from)
    }

    fn is_state_to_state_valid(
        &mut self,
        start: &[f64],
        end: &[f64],
    ) -> Result<PathValidity, PlanError> {
        let path = self.interpolate_path(start, end, self.interpolation_inc)?;
        let mut checks = 0;
        let mut min_dist = f64::INFINITY;
        // The start waypoint was validated when its state was expanded.
        for waypoint in path.iter().skip(1) {
            let v = self.is_state_valid(waypoint)?;
            checks += 1;
            min_dist = min_dist.min(v.distance);
            if !v.valid {
                return Ok(PathValidity {
                    valid: false,
                    path_length: path.len(),
                    checks,
                    distance: min_dist,
                });
            }
        }
        Ok(PathValidity {
            valid: true,
            path_length: path.len(),
            checks,
            distance: min_dist,
        })
    }

    fn interpolate_path(
        &self,
        start: &[f64],
        end: &[f64],
        inc: f64,
    ) -> Result<Vec<Vec<f64>>, PlanError> {
        let expected = self.model.var_count();
        if start.len() != expected || end.len() != expected {
            return Err(PlanError::JointCountMismatch {
                expected,
                actual: start.len().max(end.len()),
            });
        }
        if !(inc > 0.0) {
            return Err(PlanError::InvalidInput(format!(
                "interpolation increment must be positive, got {inc}"
            )));
        }

        let diffs: Vec<f64> = start
            .iter()
            .zip(end.iter())
            .enumerate()
            .map(|(var, (&a, &b))| self.joint_diff(var, a, b))
            .collect();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let steps = diffs
            .iter()
            .map(|d| (d.abs() / inc).ceil() as usize)
            .max()
            .unwrap_or(0)
            .max(1);

        let mut path = Vec::with_capacity(steps + 1);
        for k in 0..=steps {
            #[allow(clippy::cast_precision_loss)]
            let t = k as f64 / steps as f64;
            path.push(
                start
                    .iter()
                    .zip(diffs.iter())
                    .map(|(&a, &d)| a + t * d)
                    .collect(),
            );
        }
        Ok(path)
    }
}
