//! Verification of the dense position invariant.

use crate::task::domain::Position;
use thiserror::Error;

/// Way in which a column's positions fail to be `0..n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DensityViolation {
    /// Two tasks share a position.
    #[error("position {0} is used more than once")]
    Duplicate(Position),

    /// A position was skipped.
    #[error("expected position {expected}, found {found}")]
    Gap {
        /// Next position the sequence should contain.
        expected: Position,
        /// Position actually found.
        found: Position,
    },
}

/// Checks that `positions` form exactly `{0, 1, ..., n-1}`.
///
/// # Errors
///
/// Returns the first [`DensityViolation`] found in ascending order.
pub fn check_dense(positions: impl IntoIterator<Item = Position>) -> Result<(), DensityViolation> {
    let mut sorted: Vec<Position> = positions.into_iter().collect();
    sorted.sort_unstable();

    let mut expected = Position::ZERO;
    for found in sorted {
        if found < expected {
            return Err(DensityViolation::Duplicate(found));
        }
        if found != expected {
            return Err(DensityViolation::Gap { expected, found });
        }
        expected = expected.next();
    }
    Ok(())
}
