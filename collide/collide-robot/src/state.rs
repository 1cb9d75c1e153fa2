//! Mutable, lazily updated collision state over a robot collision model.

use std::sync::Arc;

use nalgebra::{Isometry3, Point3};

use crate::error::CollideError;
use crate::model::RobotCollisionModel;

/// World-frame position of one sphere of a link's tree.
#[derive(Debug, Clone, Copy)]
struct SphereState {
    pos: Point3<f64>,
    dirty: bool,
}

/// World-frame voxel centers of one link.
#[derive(Debug, Clone)]
struct VoxelsState {
    voxels: Vec<Point3<f64>>,
    dirty: bool,
}

/// The mutable twin of a [`RobotCollisionModel`].
///
/// Holds joint variable positions, per-link world transforms, and the
/// world-frame mirrors of each link's sphere tree and voxels model. Setting
/// a joint variable marks the affected subtree dirty but computes nothing;
/// transforms, sphere positions, and voxel positions refresh lazily on
/// demand and the updates are idempotent.
#[derive(Debug, Clone)]
pub struct RobotCollisionState {
    model: Arc<RobotCollisionModel>,
    positions: Vec<f64>,
    link_transforms: Vec<Isometry3<f64>>,
    link_dirty: Vec<bool>,
    sphere_states: Vec<Vec<SphereState>>,
    voxels_states: Vec<Option<VoxelsState>>,
}

impl RobotCollisionState {
    /// Creates a state at the all-zero configuration, fully dirty.
    #[must_use]
    pub fn new(model: Arc<RobotCollisionModel>) -> Self {
        let link_count = model.link_count();
        #[allow(clippy::cast_possible_truncation)]
        let sphere_states = (0..link_count)
            .map(|l| {
                model.sphere_tree(l as u32).map_or_else(Vec::new, |tree| {
                    vec![
                        SphereState {
                            pos: Point3::origin(),
                            dirty: true,
                        };
                        tree.len()
                    ]
                })
            })
            .collect();
        #[allow(clippy::cast_possible_truncation)]
        let voxels_states = (0..link_count)
            .map(|l| {
                model.voxels_model(l as u32).map(|vm| VoxelsState {
                    voxels: vm.centers.clone(),
                    dirty: true,
                })
            })
            .collect();
        Self {
            positions: vec![0.0; model.var_count()],
            link_transforms: vec![Isometry3::identity(); link_count],
            link_dirty: vec![true; link_count],
            model,
            sphere_states,
            voxels_states,
        }
    }

    /// The model this state mirrors.
    #[must_use]
    pub fn model(&self) -> &Arc<RobotCollisionModel> {
        &self.model
    }

    /// Current joint variable positions.
    #[must_use]
    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    /// Sets one joint variable, marking the descendant subtree dirty.
    ///
    /// Setting a variable to its current value is a no-op.
    pub fn set_joint_position(&mut self, var: usize, value: f64) {
        if self.positions[var] == value {
            return;
        }
        self.positions[var] = value;
        let child = self.model.var_child_link(var);
        for lidx in self.model.descendant_links(child) {
            self.link_dirty[lidx as usize] = true;
            for s in &mut self.sphere_states[lidx as usize] {
                s.dirty = true;
            }
            if let Some(vs) = &mut self.voxels_states[lidx as usize] {
                vs.dirty = true;
            }
        }
    }

    /// Sets all joint variables.
    ///
    /// # Errors
    ///
    /// Returns [`CollideError::JointCountMismatch`] when `values` does not
    /// match the model's variable count.
    pub fn set_joint_positions(&mut self, values: &[f64]) -> Result<(), CollideError> {
        if values.len() != self.positions.len() {
            return Err(CollideError::JointCountMismatch {
                expected: self.positions.len(),
                actual: values.len(),
            });
        }
        for (var, &value) in values.iter().enumerate() {
            self.set_joint_position(var, value);
        }
        Ok(())
    }

    /// Returns the world transform of a link, refreshing stale ancestors.
    pub fn link_transform(&mut self, lidx: u32) -> Isometry3<f64> {
        self.update_link_transform(lidx);
        self.link_transforms[lidx as usize]
    }

    fn update_link_transform(&mut self, lidx: u32) {
        if !self.link_dirty[lidx as usize] {
            return;
        }
        // Refresh the dirty chain root-down: collect stale ancestors first.
        let mut chain = vec![lidx];
        let mut cur = lidx;
        while let Some(parent) = self.model.parent_link(cur) {
            if self.link_dirty[parent as usize] {
                chain.push(parent);
            }
            cur = parent;
        }
        for &l in chain.iter().rev() {
            let transform = match self.model.parent_joint(l) {
                None => Isometry3::identity(),
                Some(jidx) => {
                    let parent = self.model.parent_link(l).unwrap_or(0);
                    let q = self
                        .model
                        .joint_var(jidx)
                        .map_or(0.0, |v| self.positions[v as usize]);
                    self.link_transforms[parent as usize] * self.model.joint_transform(jidx, q)
                }
            };
            self.link_transforms[l as usize] = transform;
            self.link_dirty[l as usize] = false;
        }
    }

    /// Whether a sphere state is stale.
    #[must_use]
    pub fn sphere_state_dirty(&self, lidx: u32, node: u32) -> bool {
        self.sphere_states[lidx as usize][node as usize].dirty
    }

    /// Returns the world position of one sphere of a link's tree,
    /// refreshing it (and any stale ancestor transforms) if needed.
    ///
    /// Repeated calls without intervening joint changes are no-ops.
    pub fn update_sphere_state(&mut self, lidx: u32, node: u32) -> Point3<f64> {
        if self.sphere_states[lidx as usize][node as usize].dirty {
            self.update_link_transform(lidx);
            let center = self
                .model
                .sphere_tree(lidx)
                .map_or_else(Point3::origin, |tree| tree.node(node).center);
            let pos = self.link_transforms[lidx as usize] * center;
            let state = &mut self.sphere_states[lidx as usize][node as usize];
            state.pos = pos;
            state.dirty = false;
        }
        self.sphere_states[lidx as usize][node as usize].pos
    }

    /// Whether a link's voxels state is stale.
    #[must_use]
    pub fn voxels_state_dirty(&self, lidx: u32) -> bool {
        self.voxels_states[lidx as usize]
            .as_ref()
            .is_some_and(|vs| vs.dirty)
    }

    /// Returns the stored world-frame voxels of a link *without* refreshing
    /// them: while stale, these are the positions last stamped into the
    /// occupancy grid.
    #[must_use]
    pub fn stamped_voxels(&self, lidx: u32) -> &[Point3<f64>] {
        self.voxels_states[lidx as usize]
            .as_ref()
            .map_or(&[], |vs| vs.voxels.as_slice())
    }

    /// Transforms a link's voxels model to the current configuration and
    /// clears its dirty flag. Idempotent.
    pub fn update_voxels_state(&mut self, lidx: u32) {
        if !self.voxels_state_dirty(lidx) {
            return;
        }
        self.update_link_transform(lidx);
        let transform = self.link_transforms[lidx as usize];
        let centers = self
            .model
            .voxels_model(lidx)
            .map(|vm| vm.centers.clone())
            .unwrap_or_default();
        if let Some(vs) = &mut self.voxels_states[lidx as usize] {
            vs.voxels = centers.iter().map(|c| transform * c).collect();
            vs.dirty = false;
        }
    }
}
