//! Self and environment collision checking.
//!
//! The environment check walks a *meta tree*: a bounding-sphere tree whose
//! leaves are the root spheres of each group link's own tree, so one
//! distance-field lookup can prune a whole link (or several). The self
//! check runs a synchronized descent over the sphere trees of each link
//! pair that the allowed collision matrix does not exempt.

use std::sync::Arc;

use tracing::debug;

use collide_sphere::{SphereSpec, SphereTree};
use grid_dist::OccupancyGrid;
use plan_types::Validity;

use crate::acm::{AllowedCollision, AllowedCollisionMatrix};
use crate::error::CollideError;
use crate::model::RobotCollisionModel;
use crate::state::RobotCollisionState;

/// Traversal frame of the environment check: either a node of the meta
/// tree, or a node inside one link's kinematic sphere tree.
#[derive(Debug, Clone, Copy)]
enum Frame {
    Meta(u32),
    Kinematic { link: u32, node: u32 },
}

/// Checks robot configurations against the environment and against the
/// robot itself.
///
/// The model owns its own [`RobotCollisionState`] copy; callers pass joint
/// positions and the occupancy grid per query. Links *outside* the active
/// collision group are stamped into the grid as obstacles (the arm must not
/// hit the torso it hangs from); switching groups exchanges exactly the
/// difference between the two outside sets.
pub struct SelfCollisionModel {
    model: Arc<RobotCollisionModel>,
    state: RobotCollisionState,
    acm: AllowedCollisionMatrix,
    padding: f64,

    /// Active group, if any check has run yet.
    gidx: Option<usize>,
    /// Sorted indices of voxel links currently stamped into the grid.
    outside_voxels_links: Vec<u32>,
    /// Link pairs the self check examines for the active group.
    pair_checks: Vec<(u32, u32)>,
}

impl SelfCollisionModel {
    /// Creates a checker over a model. Adjacent links start allowed in the
    /// collision matrix.
    #[must_use]
    pub fn new(model: Arc<RobotCollisionModel>) -> Self {
        let acm = AllowedCollisionMatrix::from_model(&model);
        let state = RobotCollisionState::new(Arc::clone(&model));
        Self {
            model,
            state,
            acm,
            padding: 0.0,
            gidx: None,
            outside_voxels_links: Vec::new(),
            pair_checks: Vec::new(),
        }
    }

    /// The allowed collision matrix in effect.
    #[must_use]
    pub const fn allowed_collision_matrix(&self) -> &AllowedCollisionMatrix {
        &self.acm
    }

    /// Replaces the allowed collision matrix and re-derives the pair list.
    pub fn set_allowed_collision_matrix(&mut self, acm: AllowedCollisionMatrix) {
        self.acm = acm;
        self.update_pair_checks();
    }

    /// Merges entries into the allowed collision matrix and re-derives the
    /// pair list.
    pub fn update_allowed_collision_matrix(&mut self, patch: &AllowedCollisionMatrix) {
        self.acm.update(patch);
        self.update_pair_checks();
    }

    /// Sets the padding added to every sphere radius during *environment*
    /// checks. Self checks are never padded.
    pub fn set_padding(&mut self, padding: f64) {
        self.padding = padding;
    }

    /// Checks whether a configuration is collision free for a group.
    ///
    /// Returns `Ok` with the verdict and the minimum obstacle distance
    /// observed; a collision is a non-error verdict.
    ///
    /// # Errors
    ///
    /// Returns [`CollideError::InvalidGroup`] or
    /// [`CollideError::JointCountMismatch`] for malformed queries; callers
    /// must distinguish these from collisions.
    pub fn check_collision(
        &mut self,
        grid: &mut OccupancyGrid,
        positions: &[f64],
        gidx: usize,
    ) -> Result<Validity, CollideError> {
        if gidx >= self.model.group_count() {
            return Err(CollideError::InvalidGroup {
                index: gidx,
                count: self.model.group_count(),
            });
        }
        if positions.len() != self.model.var_count() {
            return Err(CollideError::JointCountMismatch {
                expected: self.model.var_count(),
                actual: positions.len(),
            });
        }

        self.update_group(grid, gidx);
        self.state.set_joint_positions(positions)?;

        let mut dist = grid.max_distance();
        if let Some(hit) = self.check_environment(grid, gidx, &mut dist) {
            return Ok(Validity {
                valid: false,
                distance: hit,
            });
        }
        if let Some(hit) = self.check_self_pairs(&mut dist) {
            return Ok(Validity {
                valid: false,
                distance: hit,
            });
        }
        Ok(Validity {
            valid: true,
            distance: dist,
        })
    }

    /// Minimum distance between the robot and any obstacle.
    ///
    /// # Errors
    ///
    /// Always returns [`CollideError::NotImplemented`]: the quantity is
    /// not computed yet, and an explicit error beats a silent zero.
    pub fn collision_distance(
        &mut self,
        _positions: &[f64],
        _gidx: usize,
    ) -> Result<f64, CollideError> {
        Err(CollideError::NotImplemented("collision distance"))
    }

    /// Switches the active collision group.
    ///
    /// Links that left the outside set have their stamped voxels removed
    /// from the grid; links that entered it are stamped in. Both sides go
    /// through as single batches.
    fn update_group(&mut self, grid: &mut OccupancyGrid, gidx: usize) {
        if self.gidx == Some(gidx) {
            return;
        }
        let old = std::mem::take(&mut self.outside_voxels_links);
        let new = self.model.group_outside_voxels_links(gidx);

        // Sorted set differences between the old and new outside sets.
        let removed: Vec<u32> = old.iter().copied().filter(|l| !new.contains(l)).collect();
        let inserted: Vec<u32> = new.iter().copied().filter(|l| !old.contains(l)).collect();

        let mut points_rem = Vec::new();
        for &l in &removed {
            points_rem.extend_from_slice(self.state.stamped_voxels(l));
        }
        let mut points_ins = Vec::new();
        for &l in &inserted {
            self.state.update_voxels_state(l);
            points_ins.extend_from_slice(self.state.stamped_voxels(l));
        }

        debug!(
            from = ?self.gidx,
            to = gidx,
            removed = points_rem.len(),
            inserted = points_ins.len(),
            "switch collision group"
        );
        if !points_rem.is_empty() {
            grid.remove_points(&points_rem);
        }
        if !points_ins.is_empty() {
            grid.add_points(&points_ins);
        }

        self.outside_voxels_links = new;
        self.gidx = Some(gidx);
        self.update_pair_checks();
    }

    /// Re-stamps any outside-group link whose voxels went stale, as one
    /// batched remove plus one batched insert.
    fn refresh_outside_voxels(&mut self, grid: &mut OccupancyGrid) {
        let mut points_rem = Vec::new();
        let mut points_ins = Vec::new();
        let links = self.outside_voxels_links.clone();
        for l in links {
            if self.state.voxels_state_dirty(l) {
                points_rem.extend_from_slice(self.state.stamped_voxels(l));
                self.state.update_voxels_state(l);
                points_ins.extend_from_slice(self.state.stamped_voxels(l));
            }
        }
        if !points_rem.is_empty() {
            grid.remove_points(&points_rem);
        }
        if !points_ins.is_empty() {
            grid.add_points(&points_ins);
        }
    }

    /// Pairs of sphere-carrying group links the ACM does not exempt.
    fn update_pair_checks(&mut self) {
        self.pair_checks.clear();
        let Some(gidx) = self.gidx else {
            return;
        };
        let links = self.model.group_sphere_links(gidx);
        for (i, &a) in links.iter().enumerate() {
            for &b in &links[i + 1..] {
                let allowed = self
                    .acm
                    .entry(self.model.link_name(a), self.model.link_name(b))
                    == Some(AllowedCollision::Always);
                if !allowed {
                    self.pair_checks.push((a, b));
                }
            }
        }
    }

    /// Environment check: meta tree over the group links' root spheres,
    /// pruned by distance-field lookups.
    ///
    /// Returns the obstacle distance at the colliding sphere, if any.
    fn check_environment(
        &mut self,
        grid: &mut OccupancyGrid,
        gidx: usize,
        min_dist: &mut f64,
    ) -> Option<f64> {
        self.refresh_outside_voxels(grid);

        let links = self.model.group_sphere_links(gidx);
        if links.is_empty() {
            return None;
        }

        // Leaves of the meta tree: each link's root sphere at its current
        // world position. Leaf index i corresponds to links[i].
        let mut leaves = Vec::with_capacity(links.len());
        for &l in &links {
            let tree = self.model.sphere_tree(l)?;
            let root = tree.root();
            let pos = self.state.update_sphere_state(l, root);
            leaves.push(SphereSpec::new("meta", pos, tree.node(root).radius));
        }
        let meta = SphereTree::build(leaves).ok()?;

        let mut stack = vec![Frame::Meta(meta.root())];
        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Meta(mi) => {
                    let node = meta.node(mi);
                    let d = grid.distance(node.center);
                    *min_dist = min_dist.min(d);
                    if d >= node.radius + self.padding {
                        continue;
                    }
                    if let Some(li) = meta.node(mi).leaf {
                        // Bridge into the link's own tree.
                        let link = links[li as usize];
                        let tree = self.model.sphere_tree(link)?;
                        let root_node = tree.node(tree.root());
                        if root_node.is_leaf() {
                            debug!(link, dist = d, "environment collision");
                            return Some(d);
                        }
                        push_kinematic_children(&mut stack, tree, link, tree.root());
                    } else {
                        // Examine the larger child first.
                        let (l, r) = (node.left?, node.right?);
                        if meta.node(l).radius > meta.node(r).radius {
                            stack.push(Frame::Meta(r));
                            stack.push(Frame::Meta(l));
                        } else {
                            stack.push(Frame::Meta(l));
                            stack.push(Frame::Meta(r));
                        }
                    }
                }
                Frame::Kinematic { link, node } => {
                    let tree = self.model.sphere_tree(link)?;
                    let radius = tree.node(node).radius;
                    let pos = self.state.update_sphere_state(link, node);
                    let d = grid.distance(pos);
                    *min_dist = min_dist.min(d);
                    if d >= radius + self.padding {
                        continue;
                    }
                    if tree.node(node).is_leaf() {
                        debug!(link, node, dist = d, "environment collision");
                        return Some(d);
                    }
                    push_kinematic_children(&mut stack, tree, link, node);
                }
            }
        }
        None
    }

    /// Self check over the precomputed pair list.
    ///
    /// Returns the center distance of the colliding leaf pair, if any.
    fn check_self_pairs(&mut self, min_dist: &mut f64) -> Option<f64> {
        let pairs = self.pair_checks.clone();
        for (l1, l2) in pairs {
            if let Some(hit) = self.check_sphere_tree_pair(l1, l2, min_dist) {
                return Some(hit);
            }
        }
        None
    }

    /// Synchronized descent over two links' sphere trees.
    fn check_sphere_tree_pair(&mut self, l1: u32, l2: u32, min_dist: &mut f64) -> Option<f64> {
        let model = Arc::clone(&self.model);
        let t1 = model.sphere_tree(l1)?;
        let t2 = model.sphere_tree(l2)?;

        let mut stack = vec![(t1.root(), t2.root())];
        while let Some((a, b)) = stack.pop() {
            let pa = self.state.update_sphere_state(l1, a);
            let pb = self.state.update_sphere_state(l2, b);
            let (ra, rb) = (t1.node(a).radius, t2.node(b).radius);

            let gap2 = (pb - pa).norm_squared();
            let reach = ra + rb;
            if gap2 > reach * reach {
                *min_dist = min_dist.min(gap2.sqrt() - reach);
                continue;
            }

            let (a_leaf, b_leaf) = (t1.node(a).is_leaf(), t2.node(b).is_leaf());
            if a_leaf && b_leaf {
                // Overlapping leaves collide unless this name pair is
                // explicitly allowed.
                let n1 = &t1.leaf_spec(a)?.name;
                let n2 = &t2.leaf_spec(b)?.name;
                if self.acm.is_allowed(n1, n2) {
                    continue;
                }
                debug!(sphere1 = %n1, sphere2 = %n2, "self collision");
                return Some(gap2.sqrt());
            }

            // Split the non-leaf; when both are interior, split the larger
            // for more information about the underlying surface.
            let split_first = if a_leaf {
                false
            } else if b_leaf {
                true
            } else {
                ra > rb
            };

            if split_first {
                let (sl, sr) = (t1.node(a).left?, t1.node(a).right?);
                let pl = self.state.update_sphere_state(l1, sl);
                let pr = self.state.update_sphere_state(l1, sr);
                // Examine the closer child pair first.
                if (pb - pl).norm_squared() < (pb - pr).norm_squared() {
                    stack.push((sr, b));
                    stack.push((sl, b));
                } else {
                    stack.push((sl, b));
                    stack.push((sr, b));
                }
            } else {
                let (sl, sr) = (t2.node(b).left?, t2.node(b).right?);
                let pl = self.state.update_sphere_state(l2, sl);
                let pr = self.state.update_sphere_state(l2, sr);
                if (pa - pl).norm_squared() < (pa - pr).norm_squared() {
                    stack.push((a, sr));
                    stack.push((a, sl));
                } else {
                    stack.push((a, sl));
                    stack.push((a, sr));
                }
            }
        }
        None
    }
}

/// Pushes a node's children, larger radius popped first.
fn push_kinematic_children(stack: &mut Vec<Frame>, tree: &SphereTree, link: u32, node: u32) {
    let n = tree.node(node);
    if let (Some(l), Some(r)) = (n.left, n.right) {
        if tree.node(l).radius > tree.node(r).radius {
            stack.push(Frame::Kinematic { link, node: r });
            stack.push(Frame::Kinematic { link, node: l });
        } else {
            stack.push(Frame::Kinematic { link, node: l });
            stack.push(Frame::Kinematic { link, node: r });
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::model::{JointSpec, VoxelsModel};
    use grid_dist::{GridCoord, PropagationDistanceField};
    use nalgebra::{Isometry3, Point3, Vector3};

    fn empty_grid() -> OccupancyGrid {
        let field = PropagationDistanceField::new(
            Point3::new(-5.0, -5.0, -5.0),
            Vector3::new(10.0, 10.0, 10.0),
            0.1,
            2.0,
        )
        .unwrap();
        OccupancyGrid::new(field)
    }

    fn single_sphere_tree(name: &str, radius: f64) -> SphereTree {
        SphereTree::build(vec![SphereSpec::new(name, Point3::origin(), radius)]).unwrap()
    }

    /// Two sliding spheres on prismatic joints off a common base; the pair
    /// is non-adjacent so the self check examines it.
    fn sliding_spheres() -> Arc<RobotCollisionModel> {
        Arc::new(
            RobotCollisionModel::builder("base")
                .add_link(
                    "ball_a",
                    "base",
                    JointSpec::prismatic("slide_a", Isometry3::identity(), Vector3::x()),
                )
                .add_link(
                    "ball_b",
                    "base",
                    JointSpec::prismatic("slide_b", Isometry3::identity(), Vector3::x()),
                )
                .attach_spheres("ball_a", single_sphere_tree("ball_a_s", 0.5))
                .attach_spheres("ball_b", single_sphere_tree("ball_b_s", 0.5))
                .add_group("balls", &["ball_a", "ball_b"])
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_sphere_vs_sphere_self_collision() {
        let mut scm = SelfCollisionModel::new(sliding_spheres());
        let mut grid = empty_grid();

        // Centers 0.8 apart with radii 0.5 + 0.5: overlapping.
        let hit = scm.check_collision(&mut grid, &[0.0, 0.8], 0).unwrap();
        assert!(!hit.valid);

        // Centers 1.01 apart: clear.
        let clear = scm.check_collision(&mut grid, &[0.0, 1.01], 0).unwrap();
        assert!(clear.valid);
    }

    #[test]
    fn test_acm_exempts_pair() {
        let mut scm = SelfCollisionModel::new(sliding_spheres());
        let mut grid = empty_grid();

        let mut patch = AllowedCollisionMatrix::new();
        patch.set_entry("ball_a_s", "ball_b_s", AllowedCollision::Always);
        scm.update_allowed_collision_matrix(&patch);

        let r = scm.check_collision(&mut grid, &[0.0, 0.0], 0).unwrap();
        assert!(r.valid);
    }

    #[test]
    fn test_pair_check_symmetric() {
        // The same geometry declared with the links swapped in the group
        // must produce the same verdict.
        for group_links in [["ball_a", "ball_b"], ["ball_b", "ball_a"]] {
            let model = Arc::new(
                RobotCollisionModel::builder("base")
                    .add_link(
                        "ball_a",
                        "base",
                        JointSpec::prismatic("slide_a", Isometry3::identity(), Vector3::x()),
                    )
                    .add_link(
                        "ball_b",
                        "base",
                        JointSpec::prismatic("slide_b", Isometry3::identity(), Vector3::x()),
                    )
                    .attach_spheres("ball_a", single_sphere_tree("ball_a_s", 0.5))
                    .attach_spheres("ball_b", single_sphere_tree("ball_b_s", 0.5))
                    .add_group("balls", &[group_links[0], group_links[1]])
                    .build()
                    .unwrap(),
            );
            let mut scm = SelfCollisionModel::new(model);
            let mut grid = empty_grid();
            let hit = scm.check_collision(&mut grid, &[0.0, 0.8], 0).unwrap();
            assert!(!hit.valid);
        }
    }

    #[test]
    fn test_environment_collision() {
        let model = Arc::new(
            RobotCollisionModel::builder("base")
                .add_link(
                    "ball",
                    "base",
                    JointSpec::prismatic("slide", Isometry3::identity(), Vector3::x()),
                )
                .attach_spheres("ball", single_sphere_tree("ball_s", 0.3))
                .add_group("arm", &["ball"])
                .build()
                .unwrap(),
        );
        let mut scm = SelfCollisionModel::new(model);
        let mut grid = empty_grid();

        // Obstacle at x = 1.0; sphere radius 0.3.
        grid.add_points(&[Point3::new(1.0, 0.0, 0.0)]);

        let clear = scm.check_collision(&mut grid, &[0.0], 0).unwrap();
        assert!(clear.valid);
        assert!(clear.distance < grid.max_distance());

        let hit = scm.check_collision(&mut grid, &[0.95], 0).unwrap();
        assert!(!hit.valid);
    }

    #[test]
    fn test_padding_environment_only() {
        let model = Arc::new(
            RobotCollisionModel::builder("base")
                .add_link(
                    "ball",
                    "base",
                    JointSpec::prismatic("slide", Isometry3::identity(), Vector3::x()),
                )
                .attach_spheres("ball", single_sphere_tree("ball_s", 0.3))
                .add_group("arm", &["ball"])
                .build()
                .unwrap(),
        );
        let mut scm = SelfCollisionModel::new(model);
        let mut grid = empty_grid();
        grid.add_points(&[Point3::new(1.0, 0.0, 0.0)]);

        // Sphere surface 0.2 from the obstacle cell: clear unpadded.
        let clear = scm.check_collision(&mut grid, &[0.5], 0).unwrap();
        assert!(clear.valid);

        // 0.3 of padding turns the near-miss into a collision.
        scm.set_padding(0.3);
        let hit = scm.check_collision(&mut grid, &[0.5], 0).unwrap();
        assert!(!hit.valid);
    }

    #[test]
    fn test_group_switch_exchanges_voxels() {
        let voxels = |x: f64| VoxelsModel {
            centers: vec![Point3::new(x, 0.0, 0.0)],
            resolution: 0.1,
        };
        let model = Arc::new(
            RobotCollisionModel::builder("base")
                .add_link("l1", "base", JointSpec::fixed("j1", Isometry3::identity()))
                .add_link("l2", "base", JointSpec::fixed("j2", Isometry3::identity()))
                .add_link("l3", "base", JointSpec::fixed("j3", Isometry3::identity()))
                .attach_voxels("l1", voxels(-2.0))
                .attach_voxels("l2", voxels(0.0))
                .attach_voxels("l3", voxels(2.0))
                .add_group("a", &["l1", "l2"])
                .add_group("b", &["l2", "l3"])
                .build()
                .unwrap(),
        );
        let mut scm = SelfCollisionModel::new(model);
        let mut grid = empty_grid();

        // Group A active: l3 is outside, so only its voxel is stamped.
        scm.check_collision(&mut grid, &[], 0).unwrap();
        assert!(grid.is_occupied(grid.world_to_grid(Point3::new(2.0, 0.0, 0.0))));
        assert!(!grid.is_occupied(grid.world_to_grid(Point3::new(-2.0, 0.0, 0.0))));

        // Switch to group B: l3's voxel leaves the grid, l1's enters.
        scm.check_collision(&mut grid, &[], 1).unwrap();
        assert!(!grid.is_occupied(grid.world_to_grid(Point3::new(2.0, 0.0, 0.0))));
        assert!(grid.is_occupied(grid.world_to_grid(Point3::new(-2.0, 0.0, 0.0))));
        assert_eq!(grid.occupied_voxel_count(), 1);
    }

    #[test]
    fn test_invalid_group_is_error_not_collision() {
        let mut scm = SelfCollisionModel::new(sliding_spheres());
        let mut grid = empty_grid();
        let r = scm.check_collision(&mut grid, &[0.0, 0.0], 5);
        assert!(matches!(r, Err(CollideError::InvalidGroup { .. })));
    }

    #[test]
    fn test_joint_mismatch_is_error() {
        let mut scm = SelfCollisionModel::new(sliding_spheres());
        let mut grid = empty_grid();
        let r = scm.check_collision(&mut grid, &[0.0], 0);
        assert!(matches!(r, Err(CollideError::JointCountMismatch { .. })));
    }

    #[test]
    fn test_collision_distance_unimplemented() {
        let mut scm = SelfCollisionModel::new(sliding_spheres());
        let r = scm.collision_distance(&[0.0, 0.0], 0);
        assert!(matches!(r, Err(CollideError::NotImplemented(_))));
    }

    #[test]
    fn test_grid_unchanged_when_no_voxel_links() {
        let mut scm = SelfCollisionModel::new(sliding_spheres());
        let mut grid = empty_grid();
        scm.check_collision(&mut grid, &[0.0, 2.0], 0).unwrap();
        assert_eq!(grid.occupied_voxel_count(), 0);
        assert!(!grid.is_occupied(GridCoord::new(0, 0, 0)));
    }
}
