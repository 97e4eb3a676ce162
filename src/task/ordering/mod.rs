//! Position index and move algorithm.
//!
//! Tasks inside one (project, column) group carry dense zero-based ranks.
//! This module computes the bulk shifts that keep those ranks dense when a
//! task moves or is removed; stores apply the shifts inside one
//! transaction.

mod density;
mod plan;

pub use density::{DensityViolation, check_dense};
pub use plan::{MovePlan, PositionShift, ShiftDelta, plan_move, plan_removal};
