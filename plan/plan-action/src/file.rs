//! Motion-primitive file parsing.
//!
//! The file format is line-oriented UTF-8:
//!
//! ```text
//! Motion_Primitives(degrees): <N_total> <N_joints> <N_short>
//! <N_joints whitespace-separated signed decimals, in degrees>
//! ...
//! ```
//!
//! The first `N_total - N_short` primitives are long-distance; the
//! remainder are short-distance. Values convert to radians on load, and
//! each primitive may have its negation added alongside it.

use std::path::Path;

use plan_types::{MotionPrimitive, MotionPrimitiveKind, PlanError};

const HEADER: &str = "Motion_Primitives(degrees):";

/// Parses primitive file text.
///
/// # Errors
///
/// Returns [`PlanError::InvalidInput`] for a malformed header, a bad
/// count, a row with the wrong number of columns, or an unparsable value.
pub fn parse_primitive_file(
    text: &str,
    add_converse: bool,
) -> Result<Vec<MotionPrimitive>, PlanError> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let header = lines
        .next()
        .ok_or_else(|| PlanError::InvalidInput("empty motion primitive file".into()))?;
    let mut tokens = header.split_whitespace();
    if tokens.next() != Some(HEADER) {
        return Err(PlanError::InvalidInput(format!(
            "motion primitive file must start with '{HEADER}'"
        )));
    }
    let mut next_count = |what: &str| -> Result<usize, PlanError> {
        tokens
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| PlanError::InvalidInput(format!("bad {what} in primitive header")))
    };
    let total = next_count("primitive count")?;
    let joints = next_count("joint count")?;
    let short = next_count("short-distance count")?;
    if short > total {
        return Err(PlanError::InvalidInput(format!(
            "{short} short-distance primitives but only {total} total"
        )));
    }

    let mut primitives = Vec::with_capacity(if add_converse { 2 * total } else { total });
    for i in 0..total {
        let line = lines.next().ok_or_else(|| {
            PlanError::InvalidInput(format!("expected {total} primitive rows, found {i}"))
        })?;
        let degrees: Vec<f64> = line
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|e| PlanError::InvalidInput(format!("primitive row {i}: {e}")))?;
        if degrees.len() != joints {
            return Err(PlanError::InvalidInput(format!(
                "primitive row {i} has {} values, expected {joints}",
                degrees.len()
            )));
        }

        let kind = if i < total - short {
            MotionPrimitiveKind::LongDistance
        } else {
            MotionPrimitiveKind::ShortDistance
        };
        let radians: Vec<f64> = degrees.iter().map(|d| d.to_radians()).collect();
        let mp = MotionPrimitive::distance(kind, radians);
        if add_converse {
            primitives.push(mp.negated());
        }
        primitives.push(mp);
    }
    Ok(primitives)
}

/// Reads and parses a primitive file from disk.
///
/// # Errors
///
/// Returns [`PlanError::InvalidInput`] for I/O failures and malformed
/// content.
pub fn load_primitive_file(
    path: impl AsRef<Path>,
    add_converse: bool,
) -> Result<Vec<MotionPrimitive>, PlanError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| {
        PlanError::InvalidInput(format!("cannot read {}: {e}", path.display()))
    })?;
    parse_primitive_file(&text, add_converse)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SAMPLE: &str = "\
Motion_Primitives(degrees): 3 7 1
3 0 0 0 0 0 0
0 3 0 0 0 0 0
1 0 0 0 0 0 0
";

    #[test]
    fn test_parse_counts_and_kinds() {
        let prims = parse_primitive_file(SAMPLE, false).unwrap();
        assert_eq!(prims.len(), 3);
        assert_eq!(prims[0].kind, MotionPrimitiveKind::LongDistance);
        assert_eq!(prims[1].kind, MotionPrimitiveKind::LongDistance);
        assert_eq!(prims[2].kind, MotionPrimitiveKind::ShortDistance);
    }

    #[test]
    fn test_degrees_to_radians() {
        let prims = parse_primitive_file(SAMPLE, false).unwrap();
        assert_relative_eq!(prims[0].deltas[0][0], 3.0f64.to_radians(), epsilon = 1e-12);
        assert_eq!(prims[0].deltas[0][1], 0.0);
    }

    #[test]
    fn test_converse_doubles_count() {
        let prims = parse_primitive_file(SAMPLE, true).unwrap();
        assert_eq!(prims.len(), 6);
        // Converse immediately precedes its source row.
        assert_relative_eq!(
            prims[0].deltas[0][0],
            -(3.0f64.to_radians()),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_bad_header() {
        assert!(matches!(
            parse_primitive_file("Primitives: 1 7 0\n0 0 0 0 0 0 0\n", false),
            Err(PlanError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_row_width_mismatch() {
        let text = "Motion_Primitives(degrees): 1 7 0\n1 2 3\n";
        assert!(matches!(
            parse_primitive_file(text, false),
            Err(PlanError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_missing_rows() {
        let text = "Motion_Primitives(degrees): 2 2 0\n1 2\n";
        assert!(matches!(
            parse_primitive_file(text, false),
            Err(PlanError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_short_exceeds_total() {
        let text = "Motion_Primitives(degrees): 1 2 5\n1 2\n";
        assert!(matches!(
            parse_primitive_file(text, false),
            Err(PlanError::InvalidInput(_))
        ));
    }
}
