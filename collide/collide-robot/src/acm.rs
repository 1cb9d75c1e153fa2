//! Allowed collision matrix.

use std::collections::HashMap;

use crate::model::RobotCollisionModel;

/// Whether a pair of links is permitted to overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowedCollision {
    /// The pair may always overlap; it is never checked.
    Always,
    /// The pair must never overlap; it is always checked.
    Never,
    /// Permission depends on context; the pair is checked.
    Conditional,
}

/// A symmetric, name-keyed relation over links recording which pairs may
/// legally collide.
///
/// Adjacent links (sharing a joint) necessarily touch and default to
/// [`AllowedCollision::Always`]; see [`AllowedCollisionMatrix::from_model`].
///
/// # Example
///
/// ```
/// use collide_robot::{AllowedCollision, AllowedCollisionMatrix};
///
/// let mut acm = AllowedCollisionMatrix::new();
/// acm.set_entry("gripper_l", "gripper_r", AllowedCollision::Always);
///
/// // The relation is symmetric.
/// assert!(acm.is_allowed("gripper_r", "gripper_l"));
/// assert!(!acm.is_allowed("gripper_l", "forearm"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct AllowedCollisionMatrix {
    entries: HashMap<(String, String), AllowedCollision>,
}

fn key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_owned(), b.to_owned())
    } else {
        (b.to_owned(), a.to_owned())
    }
}

impl AllowedCollisionMatrix {
    /// Creates an empty matrix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the default matrix for a model: every adjacent link pair is
    /// [`AllowedCollision::Always`].
    #[must_use]
    pub fn from_model(model: &RobotCollisionModel) -> Self {
        let mut acm = Self::new();
        #[allow(clippy::cast_possible_truncation)]
        for lidx in 0..model.link_count() as u32 {
            if let Some(parent) = model.parent_link(lidx) {
                acm.set_entry(
                    model.link_name(lidx),
                    model.link_name(parent),
                    AllowedCollision::Always,
                );
            }
        }
        acm
    }

    /// Sets the entry for a pair of names (order-insensitive).
    pub fn set_entry(&mut self, a: &str, b: &str, allowed: AllowedCollision) {
        self.entries.insert(key(a, b), allowed);
    }

    /// Returns the entry for a pair, if one was set.
    #[must_use]
    pub fn entry(&self, a: &str, b: &str) -> Option<AllowedCollision> {
        self.entries.get(&key(a, b)).copied()
    }

    /// Whether a pair was set.
    #[must_use]
    pub fn has_entry(&self, a: &str, b: &str) -> bool {
        self.entries.contains_key(&key(a, b))
    }

    /// Whether a pair is always allowed to collide. Unset pairs are not.
    #[must_use]
    pub fn is_allowed(&self, a: &str, b: &str) -> bool {
        self.entry(a, b) == Some(AllowedCollision::Always)
    }

    /// Merges another matrix's entries over this one.
    pub fn update(&mut self, other: &Self) {
        for ((a, b), allowed) in &other.entries {
            self.entries.insert((a.clone(), b.clone()), *allowed);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::JointSpec;
    use nalgebra::{Isometry3, Vector3};

    #[test]
    fn test_symmetry() {
        let mut acm = AllowedCollisionMatrix::new();
        acm.set_entry("b", "a", AllowedCollision::Never);
        assert_eq!(acm.entry("a", "b"), Some(AllowedCollision::Never));
        assert_eq!(acm.entry("b", "a"), Some(AllowedCollision::Never));
    }

    #[test]
    fn test_adjacent_links_default_allowed() {
        let model = RobotCollisionModel::builder("base")
            .add_link(
                "upper",
                "base",
                JointSpec::revolute("shoulder", Isometry3::identity(), Vector3::z()),
            )
            .add_link(
                "lower",
                "upper",
                JointSpec::revolute("elbow", Isometry3::identity(), Vector3::z()),
            )
            .build()
            .unwrap();
        let acm = AllowedCollisionMatrix::from_model(&model);
        assert!(acm.is_allowed("base", "upper"));
        assert!(acm.is_allowed("upper", "lower"));
        assert!(!acm.is_allowed("base", "lower"));
    }

    #[test]
    fn test_update_overrides() {
        let mut acm = AllowedCollisionMatrix::new();
        acm.set_entry("a", "b", AllowedCollision::Never);
        let mut patch = AllowedCollisionMatrix::new();
        patch.set_entry("a", "b", AllowedCollision::Always);
        acm.update(&patch);
        assert!(acm.is_allowed("a", "b"));
    }
}
