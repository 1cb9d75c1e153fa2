//! A serial-chain implementation of the planner's robot model capability.
//!
//! The chain is an ordered list of actuated joints; each joint carries an
//! origin transform from the previous link, a motion axis, and limits.
//! Forward kinematics composes isometries down the chain; inverse
//! kinematics runs damped least squares over a numeric Jacobian, seeded at
//! the caller's configuration.
//!
//! [`parse_chain_file`] reads the compact line-oriented description the
//! CLI feeds robots in with.

// Safety: Deny unwrap/expect in library code. Tests may use them.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod chain;
mod parse;

pub use chain::{ChainJoint, ChainJointKind, SerialChain};
pub use parse::{load_chain_file, parse_chain_file};
