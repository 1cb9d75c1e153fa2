//! Workspace poses as position + roll/pitch/yaw.

use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};

/// A 6-DoF workspace pose `(x, y, z, roll, pitch, yaw)`.
///
/// This is the wire format the planner exchanges with robot models and goal
/// constraints; convert to an [`Isometry3`] for composition.
///
/// # Example
///
/// ```
/// use plan_types::Pose;
///
/// let pose = Pose::new(0.5, 0.0, 0.3, 0.0, 0.0, std::f64::consts::FRAC_PI_2);
/// let round = Pose::from_isometry(&pose.to_isometry());
/// assert!((round.yaw - pose.yaw).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pose {
    /// Position x, in meters.
    pub x: f64,
    /// Position y, in meters.
    pub y: f64,
    /// Position z, in meters.
    pub z: f64,
    /// Rotation about x, in radians.
    pub roll: f64,
    /// Rotation about y, in radians.
    pub pitch: f64,
    /// Rotation about z, in radians.
    pub yaw: f64,
}

impl Pose {
    /// Creates a pose from its six components.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64, roll: f64, pitch: f64, yaw: f64) -> Self {
        Self {
            x,
            y,
            z,
            roll,
            pitch,
            yaw,
        }
    }

    /// Creates a pose from a `[x, y, z, roll, pitch, yaw]` array.
    #[must_use]
    pub const fn from_array(a: [f64; 6]) -> Self {
        Self::new(a[0], a[1], a[2], a[3], a[4], a[5])
    }

    /// Returns the pose as a `[x, y, z, roll, pitch, yaw]` array.
    #[must_use]
    pub const fn as_array(&self) -> [f64; 6] {
        [self.x, self.y, self.z, self.roll, self.pitch, self.yaw]
    }

    /// Returns the position component.
    #[must_use]
    pub const fn position(&self) -> Point3<f64> {
        Point3::new(self.x, self.y, self.z)
    }

    /// Converts to an isometry (XYZ-convention Euler angles).
    #[must_use]
    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::new(self.x, self.y, self.z),
            UnitQuaternion::from_euler_angles(self.roll, self.pitch, self.yaw),
        )
    }

    /// Extracts a pose from an isometry.
    #[must_use]
    pub fn from_isometry(iso: &Isometry3<f64>) -> Self {
        let (roll, pitch, yaw) = iso.rotation.euler_angles();
        Self::new(
            iso.translation.x,
            iso.translation.y,
            iso.translation.z,
            roll,
            pitch,
            yaw,
        )
    }

    /// Euclidean distance between the position components.
    #[must_use]
    pub fn position_distance(&self, other: &Self) -> f64 {
        (self.position() - other.position()).norm()
    }

    /// Replaces the position component.
    #[must_use]
    pub fn with_position(mut self, p: Point3<f64>) -> Self {
        self.x = p.x;
        self.y = p.y;
        self.z = p.z;
        self
    }

    /// Replaces the orientation component.
    #[must_use]
    pub const fn with_orientation(mut self, roll: f64, pitch: f64, yaw: f64) -> Self {
        self.roll = roll;
        self.pitch = pitch;
        self.yaw = yaw;
        self
    }

    /// Magnitudes of the per-axis angular errors to another pose, taking
    /// the shortest arc on each axis.
    #[must_use]
    pub fn orientation_errors(&self, other: &Self) -> Vector3<f64> {
        use crate::angles::shortest_angle_dist;
        Vector3::new(
            shortest_angle_dist(self.roll, other.roll),
            shortest_angle_dist(self.pitch, other.pitch),
            shortest_angle_dist(self.yaw, other.yaw),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_isometry_round_trip() {
        let pose = Pose::new(1.0, -2.0, 0.5, 0.3, -0.2, 1.1);
        let round = Pose::from_isometry(&pose.to_isometry());
        for (a, b) in pose.as_array().iter().zip(round.as_array().iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_position_distance() {
        let a = Pose::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        let b = Pose::new(3.0, 4.0, 0.0, 0.0, 0.0, 0.0);
        assert_relative_eq!(a.position_distance(&b), 5.0);
    }

    #[test]
    fn test_orientation_errors_wrap() {
        let a = Pose::default().with_orientation(PI - 0.1, 0.0, 0.0);
        let b = Pose::default().with_orientation(-PI + 0.1, 0.0, 0.0);
        let err = a.orientation_errors(&b);
        assert_relative_eq!(err.x, 0.2, epsilon = 1e-9);
    }

    #[test]
    fn test_with_helpers() {
        let p = Pose::default()
            .with_position(Point3::new(1.0, 2.0, 3.0))
            .with_orientation(0.0, 0.0, FRAC_PI_2);
        assert_eq!(p.position(), Point3::new(1.0, 2.0, 3.0));
        assert_eq!(p.yaw, FRAC_PI_2);
    }
}
