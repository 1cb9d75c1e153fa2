//! Angle normalization helpers.
//!
//! Continuous joints are compared on the circle: positions are normalized to
//! `(-π, π]` and differences take the shortest arc.

use std::f64::consts::PI;

/// Normalizes an angle into `(-π, π]`.
///
/// # Example
///
/// ```
/// use plan_types::angles::normalize_angle;
/// use std::f64::consts::PI;
///
/// assert!((normalize_angle(3.0 * PI) - PI).abs() < 1e-12);
/// assert!((normalize_angle(-PI) - PI).abs() < 1e-12);
/// ```
#[must_use]
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * PI);
    if a <= -PI {
        a += 2.0 * PI;
    } else if a > PI {
        a -= 2.0 * PI;
    }
    a
}

/// Signed shortest angular difference `a - b`, in `(-π, π]`.
#[must_use]
pub fn shortest_angle_diff(a: f64, b: f64) -> f64 {
    normalize_angle(a - b)
}

/// Magnitude of the shortest angular difference between two angles.
#[must_use]
pub fn shortest_angle_dist(a: f64, b: f64) -> f64 {
    shortest_angle_diff(a, b).abs()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normalize_in_range() {
        for a in [-7.0, -3.2, 0.0, 1.0, 3.2, 9.9] {
            let n = normalize_angle(a);
            assert!(n > -PI && n <= PI, "{a} normalized to {n}");
        }
    }

    #[test]
    fn test_normalize_identity_in_range() {
        assert_eq!(normalize_angle(0.5), 0.5);
        assert_eq!(normalize_angle(-0.5), -0.5);
    }

    #[test]
    fn test_shortest_dist_wraps() {
        assert_relative_eq!(shortest_angle_dist(3.1, -3.1), 2.0 * PI - 6.2, epsilon = 1e-12);
        assert_relative_eq!(shortest_angle_dist(0.0, 2.0 * PI), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_diff_signed() {
        assert_relative_eq!(shortest_angle_diff(0.1, -0.1), 0.2, epsilon = 1e-12);
        assert_relative_eq!(shortest_angle_diff(-0.1, 0.1), -0.2, epsilon = 1e-12);
    }
}
