//! Motion primitives.

/// An action: the sequence of absolute joint configurations (waypoints) the
/// robot moves through to reach a successor state. The final waypoint is the
/// successor.
pub type Action = Vec<Vec<f64>>;

/// The kinds of motion primitive the action space knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MotionPrimitiveKind {
    /// A fixed joint delta, applied anywhere in the space.
    LongDistance,
    /// A fixed joint delta, applied only near the goal.
    ShortDistance,
    /// An IK jump to the goal position, keeping the current orientation.
    SnapToXyz,
    /// An IK jump to the goal orientation, keeping the current position.
    SnapToRpy,
    /// An IK jump to the full goal pose.
    SnapToXyzRpy,
}

impl MotionPrimitiveKind {
    /// Whether this primitive is an adaptive IK (snap) primitive.
    #[must_use]
    pub const fn is_snap(self) -> bool {
        matches!(
            self,
            Self::SnapToXyz | Self::SnapToRpy | Self::SnapToXyzRpy
        )
    }
}

impl std::fmt::Display for MotionPrimitiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::LongDistance => "long-distance",
            Self::ShortDistance => "short-distance",
            Self::SnapToXyz => "snap-to-xyz",
            Self::SnapToRpy => "snap-to-rpy",
            Self::SnapToXyzRpy => "snap-to-xyzrpy",
        };
        f.write_str(s)
    }
}

/// A motion primitive: a typed sequence of joint-delta waypoints.
///
/// Distance primitives carry their deltas (radians, one vector per
/// waypoint); snap primitives carry none, since their motion comes from an
/// IK solution computed at expansion time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionPrimitive {
    /// The primitive's kind.
    pub kind: MotionPrimitiveKind,
    /// Joint-delta waypoints, in radians.
    pub deltas: Vec<Vec<f64>>,
}

impl MotionPrimitive {
    /// Creates a distance primitive with a single-waypoint delta.
    #[must_use]
    pub fn distance(kind: MotionPrimitiveKind, delta: Vec<f64>) -> Self {
        Self {
            kind,
            deltas: vec![delta],
        }
    }

    /// Creates a snap primitive of the given kind.
    #[must_use]
    pub const fn snap(kind: MotionPrimitiveKind) -> Self {
        Self {
            kind,
            deltas: Vec::new(),
        }
    }

    /// Returns the primitive with every delta negated.
    #[must_use]
    pub fn negated(&self) -> Self {
        Self {
            kind: self.kind,
            deltas: self
                .deltas
                .iter()
                .map(|wp| wp.iter().map(|d| -d).collect())
                .collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert!(MotionPrimitiveKind::SnapToXyz.is_snap());
        assert!(!MotionPrimitiveKind::LongDistance.is_snap());
        assert_eq!(MotionPrimitiveKind::SnapToRpy.to_string(), "snap-to-rpy");
    }

    #[test]
    fn test_negated() {
        let mp = MotionPrimitive::distance(
            MotionPrimitiveKind::LongDistance,
            vec![0.1, -0.2, 0.0],
        );
        assert_eq!(mp.negated().deltas, vec![vec![-0.1, 0.2, 0.0]]);
    }
}
