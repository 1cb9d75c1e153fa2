//! Chain description parsing.
//!
//! A chain file is line-oriented UTF-8; `#` starts a comment. Each
//! `joint` line appends one joint (and the link it produces) to the
//! chain, base to tip:
//!
//! ```text
//! # name   link      kind        axis      origin xyz rpy      [min max]
//! joint j1 upper_arm revolute    0 0 1     0 0 0.3 0 0 0       -2.9 2.9
//! joint j2 forearm   continuous  0 1 0     0.4 0 0 0 0 0
//! planning_link forearm
//! tip_offset 0.1 0 0 0 0 0
//! ```
//!
//! `planning_link` and `tip_offset` lines are optional and may appear
//! once each, after the joints they refer to.

use std::path::Path;

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

use plan_types::PlanError;

use crate::chain::{ChainJoint, ChainJointKind, SerialChain};

fn bad(line_no: usize, why: impl std::fmt::Display) -> PlanError {
    PlanError::InvalidInput(format!("chain file line {line_no}: {why}"))
}

fn take_f64(
    tokens: &mut std::str::SplitWhitespace<'_>,
    line_no: usize,
    what: &str,
) -> Result<f64, PlanError> {
    tokens
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| bad(line_no, format!("missing or malformed {what}")))
}

fn take_isometry(
    tokens: &mut std::str::SplitWhitespace<'_>,
    line_no: usize,
) -> Result<Isometry3<f64>, PlanError> {
    let x = take_f64(tokens, line_no, "origin x")?;
    let y = take_f64(tokens, line_no, "origin y")?;
    let z = take_f64(tokens, line_no, "origin z")?;
    let roll = take_f64(tokens, line_no, "origin roll")?;
    let pitch = take_f64(tokens, line_no, "origin pitch")?;
    let yaw = take_f64(tokens, line_no, "origin yaw")?;
    Ok(Isometry3::from_parts(
        Translation3::new(x, y, z),
        UnitQuaternion::from_euler_angles(roll, pitch, yaw),
    ))
}

/// Parses chain description text.
///
/// # Errors
///
/// Returns [`PlanError::InvalidInput`] for malformed lines, unknown
/// keywords, or a chain with no joints.
pub fn parse_chain_file(text: &str) -> Result<SerialChain, PlanError> {
    let mut joints = Vec::new();
    let mut planning_link: Option<String> = None;
    let mut tip_offset: Option<Isometry3<f64>> = None;

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("joint") => {
                let name = tokens
                    .next()
                    .ok_or_else(|| bad(line_no, "missing joint name"))?;
                let link = tokens
                    .next()
                    .ok_or_else(|| bad(line_no, "missing link name"))?;
                let kind_word = tokens
                    .next()
                    .ok_or_else(|| bad(line_no, "missing joint kind"))?;
                let ax = take_f64(&mut tokens, line_no, "axis x")?;
                let ay = take_f64(&mut tokens, line_no, "axis y")?;
                let az = take_f64(&mut tokens, line_no, "axis z")?;
                let origin = take_isometry(&mut tokens, line_no)?;

                let kind = match kind_word {
                    "continuous" => ChainJointKind::Continuous,
                    "revolute" | "prismatic" => {
                        let min = take_f64(&mut tokens, line_no, "lower limit")?;
                        let max = take_f64(&mut tokens, line_no, "upper limit")?;
                        if min > max {
                            return Err(bad(line_no, format!("limits [{min}, {max}] inverted")));
                        }
                        if kind_word == "revolute" {
                            ChainJointKind::Revolute { min, max }
                        } else {
                            ChainJointKind::Prismatic { min, max }
                        }
                    }
                    other => return Err(bad(line_no, format!("unknown joint kind '{other}'"))),
                };
                joints.push(ChainJoint::new(
                    name,
                    link,
                    kind,
                    origin,
                    Vector3::new(ax, ay, az),
                ));
            }
            Some("planning_link") => {
                let link = tokens
                    .next()
                    .ok_or_else(|| bad(line_no, "missing planning link name"))?;
                planning_link = Some(link.to_owned());
            }
            Some("tip_offset") => {
                tip_offset = Some(take_isometry(&mut tokens, line_no)?);
            }
            Some(other) => return Err(bad(line_no, format!("unknown keyword '{other}'"))),
            None => {}
        }
    }

    let mut chain = SerialChain::new(joints)?;
    if let Some(offset) = tip_offset {
        chain = chain.with_tip_offset(offset);
    }
    if let Some(link) = planning_link {
        chain = chain.with_planning_link(&link)?;
    }
    Ok(chain)
}

/// Reads and parses a chain file from disk.
///
/// # Errors
///
/// Returns [`PlanError::InvalidInput`] for I/O failures and malformed
/// content.
pub fn load_chain_file(path: impl AsRef<Path>) -> Result<SerialChain, PlanError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| PlanError::InvalidInput(format!("cannot read {}: {e}", path.display())))?;
    parse_chain_file(&text)
}
