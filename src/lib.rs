//! Two-bus AC power flow.
//!
//! A slack bus (fixed magnitude, zero angle) feeds a load bus through a
//! series line impedance with a shunt branch at each end. The load bus
//! angle, or angle and magnitude, are found by Newton's method; a
//! fixed-point current/voltage recursion is also provided.

mod error;
mod fixed_point;
mod jac;
mod math;
mod mpopt;
mod newton;
mod parse;
mod power;
mod ybus;

pub mod debug;
pub mod report;

pub use error::*;
pub use fixed_point::*;
pub use jac::*;
pub use math::*;
pub use mpopt::*;
pub use newton::*;
pub use parse::*;
pub use power::*;
pub use ybus::*;
