//! Hierarchical bounding-sphere trees.
//!
//! The tree is stored as an arena of nodes referring to each other by index,
//! so it is `Clone` and serializable and carries no lifetime coupling. It is
//! built top-down: leaves are bounded by an AABB, split along the longest
//! axis at the median of their centers, and every interior node is the
//! minimum enclosing sphere of its two children.

use nalgebra::Point3;

use crate::error::SphereError;

/// An input leaf sphere: one collision sphere of a link.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SphereSpec {
    /// Name reported in collision results (ACM lookups key on this).
    pub name: String,
    /// Center in the link frame.
    pub center: Point3<f64>,
    /// Radius in meters.
    pub radius: f64,
    /// Check priority; lower values are checked earlier.
    pub priority: u8,
}

impl SphereSpec {
    /// Creates a leaf sphere with default priority.
    #[must_use]
    pub fn new(name: impl Into<String>, center: Point3<f64>, radius: f64) -> Self {
        Self {
            name: name.into(),
            center,
            radius,
            priority: 1,
        }
    }

    /// Sets the check priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }
}

/// One node of a [`SphereTree`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SphereNode {
    /// Sphere center in the link frame.
    pub center: Point3<f64>,
    /// Sphere radius in meters.
    pub radius: f64,
    /// Parent node index; `None` for the root.
    pub parent: Option<u32>,
    /// Left child index; `None` for leaves.
    pub left: Option<u32>,
    /// Right child index; `None` for leaves.
    pub right: Option<u32>,
    /// Index of the leaf sphere this node represents, for leaves.
    pub leaf: Option<u32>,
}

impl SphereNode {
    /// Returns whether this node is a leaf.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// A balanced binary hierarchy of bounding spheres over a set of leaf
/// spheres.
///
/// Invariant: the ball of every interior node contains the balls of both of
/// its children, so pruning a node prunes its whole subtree.
///
/// # Example
///
/// ```
/// use collide_sphere::{SphereSpec, SphereTree};
/// use nalgebra::Point3;
///
/// let tree = SphereTree::build(vec![
///     SphereSpec::new("a", Point3::new(0.0, 0.0, 0.0), 0.1),
///     SphereSpec::new("b", Point3::new(0.4, 0.0, 0.0), 0.1),
/// ])
/// .unwrap();
///
/// let root = tree.node(tree.root());
/// assert!(!root.is_leaf());
/// assert!(root.radius >= 0.3); // covers both leaves
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SphereTree {
    nodes: Vec<SphereNode>,
    leaves: Vec<SphereSpec>,
    root: u32,
}

impl SphereTree {
    /// Builds a tree over the given leaf spheres.
    ///
    /// # Errors
    ///
    /// Returns [`SphereError::EmptyLeafSet`] when no leaves are supplied, or
    /// [`SphereError::InvalidRadius`] when a leaf radius is not positive.
    pub fn build(leaves: Vec<SphereSpec>) -> Result<Self, SphereError> {
        if leaves.is_empty() {
            return Err(SphereError::EmptyLeafSet);
        }
        for leaf in &leaves {
            if !(leaf.radius > 0.0) {
                return Err(SphereError::InvalidRadius(leaf.radius));
            }
        }

        let mut nodes = Vec::with_capacity(2 * leaves.len());
        #[allow(clippy::cast_possible_truncation)]
        let mut order: Vec<u32> = (0..leaves.len() as u32).collect();
        let root = Self::build_node(&mut nodes, &leaves, &mut order, None);
        Ok(Self {
            nodes,
            leaves,
            root,
        })
    }

    fn build_node(
        nodes: &mut Vec<SphereNode>,
        leaves: &[SphereSpec],
        order: &mut [u32],
        parent: Option<u32>,
    ) -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        let idx = nodes.len() as u32;

        if let [only] = order {
            let leaf = &leaves[*only as usize];
            nodes.push(SphereNode {
                center: leaf.center,
                radius: leaf.radius,
                parent,
                left: None,
                right: None,
                leaf: Some(*only),
            });
            return idx;
        }

        // Split along the longest AABB axis at the median of centers.
        let mut min = leaves[order[0] as usize].center;
        let mut max = min;
        for &li in order.iter() {
            let c = leaves[li as usize].center;
            min = Point3::new(min.x.min(c.x), min.y.min(c.y), min.z.min(c.z));
            max = Point3::new(max.x.max(c.x), max.y.max(c.y), max.z.max(c.z));
        }
        let extent = max - min;
        let axis = if extent.x >= extent.y && extent.x >= extent.z {
            0
        } else if extent.y >= extent.z {
            1
        } else {
            2
        };

        order.sort_by(|&a, &b| {
            let ca = leaves[a as usize].center[axis];
            let cb = leaves[b as usize].center[axis];
            ca.partial_cmp(&cb).unwrap_or(std::cmp::Ordering::Equal)
        });
        let mid = order.len() / 2;

        // Reserve the interior slot, then build both subtrees.
        nodes.push(SphereNode {
            center: Point3::origin(),
            radius: 0.0,
            parent,
            left: None,
            right: None,
            leaf: None,
        });

        let (lo, hi) = order.split_at_mut(mid);
        let left = Self::build_node(nodes, leaves, lo, Some(idx));
        let right = Self::build_node(nodes, leaves, hi, Some(idx));

        let (center, radius) = enclosing_sphere(
            nodes[left as usize].center,
            nodes[left as usize].radius,
            nodes[right as usize].center,
            nodes[right as usize].radius,
        );
        let node = &mut nodes[idx as usize];
        node.center = center;
        node.radius = radius;
        node.left = Some(left);
        node.right = Some(right);
        idx
    }

    /// Returns the root node index.
    #[must_use]
    pub const fn root(&self) -> u32 {
        self.root
    }

    /// Returns a node by index.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of range; indices come from this tree's
    /// own nodes.
    #[must_use]
    pub fn node(&self, idx: u32) -> &SphereNode {
        &self.nodes[idx as usize]
    }

    /// Returns the number of nodes (leaves and interiors).
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns whether the tree has no nodes. Built trees never are.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the input leaf spheres.
    #[must_use]
    pub fn leaves(&self) -> &[SphereSpec] {
        &self.leaves
    }

    /// Returns the leaf sphere a leaf node represents.
    #[must_use]
    pub fn leaf_spec(&self, node_idx: u32) -> Option<&SphereSpec> {
        self.node(node_idx)
            .leaf
            .map(|li| &self.leaves[li as usize])
    }

    /// Returns the maximum depth of the tree (a single leaf has depth 0).
    #[must_use]
    pub fn depth(&self) -> usize {
        fn walk(tree: &SphereTree, idx: u32) -> usize {
            let node = tree.node(idx);
            match (node.left, node.right) {
                (Some(l), Some(r)) => 1 + walk(tree, l).max(walk(tree, r)),
                _ => 0,
            }
        }
        walk(self, self.root)
    }
}

/// The minimum sphere enclosing two spheres.
///
/// When one ball already contains the other it is returned unchanged;
/// otherwise the center lies on the segment between the children, offset
/// toward the larger one, and the radius spans both boundaries.
fn enclosing_sphere(
    c1: Point3<f64>,
    r1: f64,
    c2: Point3<f64>,
    r2: f64,
) -> (Point3<f64>, f64) {
    let d = (c2 - c1).norm();
    if d + r2 <= r1 {
        return (c1, r1);
    }
    if d + r1 <= r2 {
        return (c2, r2);
    }
    let radius = (d + r1 + r2) / 2.0;
    let center = c1 + (c2 - c1) * ((radius - r1) / d);
    (center, radius)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn leaf(name: &str, x: f64, y: f64, z: f64, r: f64) -> SphereSpec {
        SphereSpec::new(name, Point3::new(x, y, z), r)
    }

    fn line_of_leaves(n: usize) -> Vec<SphereSpec> {
        (0..n)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let x = 0.1 * i as f64;
                leaf(&format!("s{i}"), x, 0.0, 0.0, 0.04)
            })
            .collect()
    }

    /// Every interior ball must contain both child balls.
    fn assert_containment(tree: &SphereTree) {
        for idx in 0..tree.len() {
            #[allow(clippy::cast_possible_truncation)]
            let node = tree.node(idx as u32);
            for child in [node.left, node.right].into_iter().flatten() {
                let c = tree.node(child);
                let d = (c.center - node.center).norm();
                assert!(
                    d + c.radius <= node.radius + 1e-9,
                    "child {child} ball escapes its parent"
                );
            }
        }
    }

    #[test]
    fn test_empty_leaf_set() {
        assert!(matches!(
            SphereTree::build(vec![]),
            Err(SphereError::EmptyLeafSet)
        ));
    }

    #[test]
    fn test_single_leaf() {
        let tree = SphereTree::build(vec![leaf("only", 1.0, 2.0, 3.0, 0.5)]).unwrap();
        assert_eq!(tree.len(), 1);
        let root = tree.node(tree.root());
        assert!(root.is_leaf());
        assert_eq!(root.radius, 0.5);
        assert_eq!(tree.leaf_spec(tree.root()).unwrap().name, "only");
    }

    #[test]
    fn test_two_leaves_enclosed() {
        let tree = SphereTree::build(vec![
            leaf("a", 0.0, 0.0, 0.0, 0.1),
            leaf("b", 1.0, 0.0, 0.0, 0.1),
        ])
        .unwrap();
        let root = tree.node(tree.root());
        assert_relative_eq!(root.radius, 0.6, epsilon = 1e-12);
        assert_relative_eq!(root.center.x, 0.5, epsilon = 1e-12);
        assert_containment(&tree);
    }

    #[test]
    fn test_contained_child_is_absorbed() {
        let (c, r) = enclosing_sphere(
            Point3::origin(),
            1.0,
            Point3::new(0.2, 0.0, 0.0),
            0.3,
        );
        assert_eq!(c, Point3::origin());
        assert_eq!(r, 1.0);
    }

    #[test]
    fn test_containment_invariant_many_leaves() {
        let tree = SphereTree::build(line_of_leaves(17)).unwrap();
        assert_containment(&tree);
        assert_eq!(tree.leaves().len(), 17);
        // 2n - 1 nodes for n leaves.
        assert_eq!(tree.len(), 33);
    }

    #[test]
    fn test_balanced_depth() {
        // Median splits keep the depth logarithmic: 16 leaves -> depth 4.
        let tree = SphereTree::build(line_of_leaves(16)).unwrap();
        assert_eq!(tree.depth(), 4);
    }

    #[test]
    fn test_splits_longest_axis() {
        // Leaves spread along y; the first split should separate low-y from
        // high-y leaves.
        let tree = SphereTree::build(vec![
            leaf("a", 0.0, 0.0, 0.0, 0.05),
            leaf("b", 0.0, 1.0, 0.0, 0.05),
            leaf("c", 0.01, 0.05, 0.0, 0.05),
            leaf("d", 0.01, 0.95, 0.0, 0.05),
        ])
        .unwrap();
        let root = tree.node(tree.root());
        let left = tree.node(root.left.unwrap());
        let right = tree.node(root.right.unwrap());
        assert!(left.center.y < 0.5);
        assert!(right.center.y > 0.5);
        assert_containment(&tree);
    }

    #[test]
    fn test_parent_back_pointers() {
        let tree = SphereTree::build(line_of_leaves(5)).unwrap();
        for idx in 0..tree.len() {
            #[allow(clippy::cast_possible_truncation)]
            let idx = idx as u32;
            let node = tree.node(idx);
            for child in [node.left, node.right].into_iter().flatten() {
                assert_eq!(tree.node(child).parent, Some(idx));
            }
        }
        assert_eq!(tree.node(tree.root()).parent, None);
    }

    #[test]
    fn test_invalid_leaf_radius() {
        assert!(matches!(
            SphereTree::build(vec![leaf("bad", 0.0, 0.0, 0.0, 0.0)]),
            Err(SphereError::InvalidRadius(_))
        ));
    }
}
