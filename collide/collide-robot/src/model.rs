//! The immutable robot collision model.
//!
//! Links and joints are stored in arenas and refer to each other by index,
//! so the model is `Clone` and free of lifetime coupling. Link 0 is the
//! root; every other link hangs off exactly one joint.

use nalgebra::{Isometry3, Point3, Translation3, Unit, UnitQuaternion, Vector3};

use collide_sphere::SphereTree;

use crate::error::CollideError;

/// How a joint moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointKind {
    /// No motion; a rigid attachment.
    Fixed,
    /// Rotation about the axis, position limited.
    Revolute,
    /// Rotation about the axis, unlimited (wraps at ±π).
    Continuous,
    /// Translation along the axis.
    Prismatic,
}

/// Description of one joint, used when building a model.
#[derive(Debug, Clone)]
pub struct JointSpec {
    /// Joint name.
    pub name: String,
    /// Motion kind.
    pub kind: JointKind,
    /// Transform from the parent link frame to the joint frame.
    pub origin: Isometry3<f64>,
    /// Motion axis, in the joint frame.
    pub axis: Unit<Vector3<f64>>,
}

impl JointSpec {
    /// A revolute joint about `axis` at `origin`.
    #[must_use]
    pub fn revolute(name: impl Into<String>, origin: Isometry3<f64>, axis: Vector3<f64>) -> Self {
        Self {
            name: name.into(),
            kind: JointKind::Revolute,
            origin,
            axis: Unit::new_normalize(axis),
        }
    }

    /// A continuous joint about `axis` at `origin`.
    #[must_use]
    pub fn continuous(
        name: impl Into<String>,
        origin: Isometry3<f64>,
        axis: Vector3<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: JointKind::Continuous,
            origin,
            axis: Unit::new_normalize(axis),
        }
    }

    /// A prismatic joint along `axis` at `origin`.
    #[must_use]
    pub fn prismatic(
        name: impl Into<String>,
        origin: Isometry3<f64>,
        axis: Vector3<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: JointKind::Prismatic,
            origin,
            axis: Unit::new_normalize(axis),
        }
    }

    /// A fixed attachment at `origin`.
    #[must_use]
    pub fn fixed(name: impl Into<String>, origin: Isometry3<f64>) -> Self {
        Self {
            name: name.into(),
            kind: JointKind::Fixed,
            origin,
            axis: Vector3::z_axis(),
        }
    }
}

/// The voxelized shape of a link: cell centers in the link frame.
#[derive(Debug, Clone)]
pub struct VoxelsModel {
    /// Voxel centers in the link frame.
    pub centers: Vec<Point3<f64>>,
    /// Cell edge length the centers were produced at, in meters.
    pub resolution: f64,
}

#[derive(Debug, Clone)]
struct Joint {
    name: String,
    kind: JointKind,
    origin: Isometry3<f64>,
    axis: Unit<Vector3<f64>>,
    parent_link: u32,
    child_link: u32,
    /// Index into the joint variable vector; `None` for fixed joints.
    var: Option<u32>,
}

#[derive(Debug, Clone)]
struct Link {
    name: String,
    parent_joint: Option<u32>,
    children: Vec<u32>,
    spheres: Option<SphereTree>,
    voxels: Option<VoxelsModel>,
}

#[derive(Debug, Clone)]
struct Group {
    name: String,
    links: Vec<u32>,
}

/// Immutable kinematic and collision-shape description of a robot.
///
/// Built through [`RobotCollisionModelBuilder`]; consumed by
/// [`RobotCollisionState`](crate::RobotCollisionState) and
/// [`SelfCollisionModel`](crate::SelfCollisionModel).
#[derive(Debug, Clone)]
pub struct RobotCollisionModel {
    links: Vec<Link>,
    joints: Vec<Joint>,
    groups: Vec<Group>,
    var_count: usize,
    /// `var_joints[v]` is the joint driven by variable `v`.
    var_joints: Vec<u32>,
}

impl RobotCollisionModel {
    /// Starts building a model rooted at a link with the given name.
    #[must_use]
    pub fn builder(root_link: impl Into<String>) -> RobotCollisionModelBuilder {
        RobotCollisionModelBuilder {
            model: Self {
                links: vec![Link {
                    name: root_link.into(),
                    parent_joint: None,
                    children: Vec::new(),
                    spheres: None,
                    voxels: None,
                }],
                joints: Vec::new(),
                groups: Vec::new(),
                var_count: 0,
                var_joints: Vec::new(),
            },
            error: None,
        }
    }

    /// Number of links, including the root.
    #[must_use]
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Number of joint variables (fixed joints carry none).
    #[must_use]
    pub const fn var_count(&self) -> usize {
        self.var_count
    }

    /// Name of a link.
    #[must_use]
    pub fn link_name(&self, lidx: u32) -> &str {
        &self.links[lidx as usize].name
    }

    /// Index of a link by name.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn link_index(&self, name: &str) -> Option<u32> {
        self.links
            .iter()
            .position(|l| l.name == name)
            .map(|i| i as u32)
    }

    /// The parent link of a link, or `None` for the root.
    #[must_use]
    pub fn parent_link(&self, lidx: u32) -> Option<u32> {
        self.links[lidx as usize]
            .parent_joint
            .map(|j| self.joints[j as usize].parent_link)
    }

    /// The joint above a link, or `None` for the root.
    #[must_use]
    pub fn parent_joint(&self, lidx: u32) -> Option<u32> {
        self.links[lidx as usize].parent_joint
    }

    /// The link driven by a joint variable.
    #[must_use]
    pub fn var_child_link(&self, var: usize) -> u32 {
        self.joints[self.var_joints[var] as usize].child_link
    }

    /// Links whose parent joint hangs off `lidx`.
    #[must_use]
    pub fn child_links(&self, lidx: u32) -> &[u32] {
        &self.links[lidx as usize].children
    }

    /// The subtree rooted at `lidx`, including `lidx` itself.
    #[must_use]
    pub fn descendant_links(&self, lidx: u32) -> Vec<u32> {
        let mut out = Vec::new();
        let mut stack = vec![lidx];
        while let Some(l) = stack.pop() {
            out.push(l);
            stack.extend_from_slice(self.child_links(l));
        }
        out
    }

    /// Whether two links share a joint.
    #[must_use]
    pub fn links_adjacent(&self, a: u32, b: u32) -> bool {
        self.parent_link(a) == Some(b) || self.parent_link(b) == Some(a)
    }

    /// The local transform a joint contributes at variable value `q`.
    ///
    /// Fixed joints ignore `q`.
    #[must_use]
    pub fn joint_transform(&self, jidx: u32, q: f64) -> Isometry3<f64> {
        let joint = &self.joints[jidx as usize];
        let motion = match joint.kind {
            JointKind::Fixed => Isometry3::identity(),
            JointKind::Revolute | JointKind::Continuous => Isometry3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_axis_angle(&joint.axis, q),
            ),
            JointKind::Prismatic => {
                Isometry3::translation(joint.axis.x * q, joint.axis.y * q, joint.axis.z * q)
            }
        };
        joint.origin * motion
    }

    /// The variable index a joint is driven by, or `None` for fixed joints.
    #[must_use]
    pub fn joint_var(&self, jidx: u32) -> Option<u32> {
        self.joints[jidx as usize].var
    }

    /// The sphere tree attached to a link.
    #[must_use]
    pub fn sphere_tree(&self, lidx: u32) -> Option<&SphereTree> {
        self.links[lidx as usize].spheres.as_ref()
    }

    /// Whether a link carries a sphere model.
    #[must_use]
    pub fn has_sphere_model(&self, lidx: u32) -> bool {
        self.links[lidx as usize].spheres.is_some()
    }

    /// The voxels model attached to a link.
    #[must_use]
    pub fn voxels_model(&self, lidx: u32) -> Option<&VoxelsModel> {
        self.links[lidx as usize].voxels.as_ref()
    }

    /// Number of collision groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Name of a group.
    #[must_use]
    pub fn group_name(&self, gidx: usize) -> &str {
        &self.groups[gidx].name
    }

    /// Index of a group by name.
    #[must_use]
    pub fn group_index(&self, name: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.name == name)
    }

    /// Sorted link indices of a group.
    #[must_use]
    pub fn group_links(&self, gidx: usize) -> &[u32] {
        &self.groups[gidx].links
    }

    /// Sorted indices of voxel-carrying links *outside* a group; these are
    /// the links stamped into the occupancy grid while the group is active.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn group_outside_voxels_links(&self, gidx: usize) -> Vec<u32> {
        (0..self.links.len() as u32)
            .filter(|&l| {
                self.links[l as usize].voxels.is_some() && !self.groups[gidx].links.contains(&l)
            })
            .collect()
    }

    /// Sorted indices of sphere-carrying links inside a group.
    #[must_use]
    pub fn group_sphere_links(&self, gidx: usize) -> Vec<u32> {
        self.groups[gidx]
            .links
            .iter()
            .copied()
            .filter(|&l| self.links[l as usize].spheres.is_some())
            .collect()
    }
}

/// Incremental builder for [`RobotCollisionModel`].
///
/// # Example
///
/// ```
/// use collide_robot::{JointSpec, RobotCollisionModel};
/// use nalgebra::{Isometry3, Vector3};
///
/// let model = RobotCollisionModel::builder("base")
///     .add_link(
///         "upper_arm",
///         "base",
///         JointSpec::revolute("shoulder", Isometry3::identity(), Vector3::z()),
///     )
///     .add_group("arm", &["upper_arm"])
///     .build()
///     .unwrap();
///
/// assert_eq!(model.link_count(), 2);
/// assert_eq!(model.var_count(), 1);
/// ```
#[derive(Debug)]
pub struct RobotCollisionModelBuilder {
    model: RobotCollisionModel,
    error: Option<CollideError>,
}

impl RobotCollisionModelBuilder {
    /// Adds a link under `parent` through `joint`.
    #[must_use]
    pub fn add_link(mut self, name: impl Into<String>, parent: &str, joint: JointSpec) -> Self {
        if self.error.is_some() {
            return self;
        }
        let name = name.into();
        if self.model.link_index(&name).is_some() {
            self.error = Some(CollideError::DuplicateLink(name));
            return self;
        }
        let Some(parent_idx) = self.model.link_index(parent) else {
            self.error = Some(CollideError::UnknownLink(parent.to_owned()));
            return self;
        };

        #[allow(clippy::cast_possible_truncation)]
        let lidx = self.model.links.len() as u32;
        #[allow(clippy::cast_possible_truncation)]
        let jidx = self.model.joints.len() as u32;

        let var = if joint.kind == JointKind::Fixed {
            None
        } else {
            #[allow(clippy::cast_possible_truncation)]
            let v = self.model.var_count as u32;
            self.model.var_count += 1;
            self.model.var_joints.push(jidx);
            Some(v)
        };

        self.model.joints.push(Joint {
            name: joint.name,
            kind: joint.kind,
            origin: joint.origin,
            axis: joint.axis,
            parent_link: parent_idx,
            child_link: lidx,
            var,
        });
        self.model.links[parent_idx as usize].children.push(lidx);
        self.model.links.push(Link {
            name,
            parent_joint: Some(jidx),
            children: Vec::new(),
            spheres: None,
            voxels: None,
        });
        self
    }

    /// Attaches a bounding-sphere tree to a link.
    #[must_use]
    pub fn attach_spheres(mut self, link: &str, tree: SphereTree) -> Self {
        if self.error.is_some() {
            return self;
        }
        match self.model.link_index(link) {
            Some(lidx) => self.model.links[lidx as usize].spheres = Some(tree),
            None => self.error = Some(CollideError::UnknownLink(link.to_owned())),
        }
        self
    }

    /// Attaches a voxels model to a link.
    #[must_use]
    pub fn attach_voxels(mut self, link: &str, voxels: VoxelsModel) -> Self {
        if self.error.is_some() {
            return self;
        }
        match self.model.link_index(link) {
            Some(lidx) => self.model.links[lidx as usize].voxels = Some(voxels),
            None => self.error = Some(CollideError::UnknownLink(link.to_owned())),
        }
        self
    }

    /// Declares a named collision group over the listed links.
    #[must_use]
    pub fn add_group(mut self, name: impl Into<String>, links: &[&str]) -> Self {
        if self.error.is_some() {
            return self;
        }
        let mut indices = Vec::with_capacity(links.len());
        for link in links {
            match self.model.link_index(link) {
                Some(lidx) => indices.push(lidx),
                None => {
                    self.error = Some(CollideError::UnknownLink((*link).to_owned()));
                    return self;
                }
            }
        }
        indices.sort_unstable();
        self.model.groups.push(Group {
            name: name.into(),
            links: indices,
        });
        self
    }

    /// Finishes the model.
    ///
    /// # Errors
    ///
    /// Returns the first structural error recorded while building (unknown
    /// parent link, duplicate link name, unknown group member).
    pub fn build(self) -> Result<RobotCollisionModel, CollideError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.model),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn two_link_model() -> RobotCollisionModel {
        RobotCollisionModel::builder("base")
            .add_link(
                "upper",
                "base",
                JointSpec::revolute("shoulder", Isometry3::identity(), Vector3::z()),
            )
            .add_link(
                "lower",
                "upper",
                JointSpec::revolute("elbow", Isometry3::translation(1.0, 0.0, 0.0), Vector3::z()),
            )
            .add_group("arm", &["upper", "lower"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_structure() {
        let model = two_link_model();
        assert_eq!(model.link_count(), 3);
        assert_eq!(model.var_count(), 2);
        assert_eq!(model.link_index("lower"), Some(2));
        assert_eq!(model.parent_link(2), Some(1));
        assert_eq!(model.parent_link(0), None);
        assert_eq!(model.child_links(0), &[1]);
        assert!(model.links_adjacent(1, 2));
        assert!(!model.links_adjacent(0, 2));
    }

    #[test]
    fn test_descendants() {
        let model = two_link_model();
        let mut desc = model.descendant_links(1);
        desc.sort_unstable();
        assert_eq!(desc, vec![1, 2]);
    }

    #[test]
    fn test_joint_transform_revolute() {
        let model = two_link_model();
        // Elbow joint: origin 1m along x, rotation about z.
        let t = model.joint_transform(1, FRAC_PI_2);
        let p = t * nalgebra::Point3::new(1.0, 0.0, 0.0);
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_fixed_joint_has_no_var() {
        let model = RobotCollisionModel::builder("base")
            .add_link("tool", "base", JointSpec::fixed("mount", Isometry3::identity()))
            .build()
            .unwrap();
        assert_eq!(model.var_count(), 0);
        assert_eq!(model.joint_var(0), None);
    }

    #[test]
    fn test_duplicate_link_rejected() {
        let r = RobotCollisionModel::builder("base")
            .add_link("a", "base", JointSpec::fixed("j1", Isometry3::identity()))
            .add_link("a", "base", JointSpec::fixed("j2", Isometry3::identity()))
            .build();
        assert!(matches!(r, Err(CollideError::DuplicateLink(_))));
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let r = RobotCollisionModel::builder("base")
            .add_link("a", "nope", JointSpec::fixed("j1", Isometry3::identity()))
            .build();
        assert!(matches!(r, Err(CollideError::UnknownLink(_))));
    }

    #[test]
    fn test_group_membership() {
        let model = two_link_model();
        assert_eq!(model.group_index("arm"), Some(0));
        assert_eq!(model.group_links(0), &[1, 2]);
        assert!(model.group_outside_voxels_links(0).is_empty());
    }
}
