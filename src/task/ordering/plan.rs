//! Move planning over the dense position index.

use crate::task::domain::{ColumnName, Placement, Position};

/// Direction in which a sibling shift moves positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShiftDelta {
    /// Add one to every matching position (opens a slot).
    Increment,
    /// Subtract one from every matching position (closes a gap).
    Decrement,
}

impl ShiftDelta {
    /// Returns the signed step applied to matching rows.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Increment => 1,
            Self::Decrement => -1,
        }
    }
}

/// Bulk shift of every task in `column` whose position lies in
/// `from..=through` (unbounded above when `through` is `None`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PositionShift {
    /// Column whose tasks are shifted.
    pub column: ColumnName,
    /// Lowest affected position.
    pub from: Position,
    /// Highest affected position, inclusive.
    pub through: Option<Position>,
    /// Step applied to each affected position.
    pub delta: ShiftDelta,
}

impl PositionShift {
    /// Returns `true` when a task at `column`/`position` is affected.
    #[must_use]
    pub fn covers(&self, column: &ColumnName, position: Position) -> bool {
        self.column == *column
            && position >= self.from
            && self.through.is_none_or(|through| position <= through)
    }

    /// Returns `position` after the shift, or `None` if it would go negative.
    #[must_use]
    pub const fn apply(&self, position: Position) -> Option<Position> {
        match self.delta {
            ShiftDelta::Increment => Some(position.next()),
            ShiftDelta::Decrement => position.previous(),
        }
    }
}

/// Position updates required to move one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovePlan {
    /// Target equals the current placement; nothing is written.
    Unchanged,
    /// Siblings are shifted in order, then the task takes `target`.
    Reposition {
        /// Sibling shifts, applied in order before the task is placed.
        shifts: Vec<PositionShift>,
        /// Final placement of the moved task.
        target: Placement,
    },
}

impl MovePlan {
    /// Returns `true` for the no-op plan.
    #[must_use]
    pub const fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }

    /// Returns the sibling shifts (empty for the no-op plan).
    #[must_use]
    pub fn shifts(&self) -> &[PositionShift] {
        match self {
            Self::Unchanged => &[],
            Self::Reposition { shifts, .. } => shifts,
        }
    }

    /// Returns the final placement, if the task moves.
    #[must_use]
    pub const fn target(&self) -> Option<&Placement> {
        match self {
            Self::Unchanged => None,
            Self::Reposition { target, .. } => Some(target),
        }
    }
}

/// Computes the shifts needed to move a task from `current` to
/// (`target_column`, `requested`).
///
/// `destination_len` is the number of tasks in the destination column before
/// the move, counting the moving task itself when the move stays inside one
/// column. Out-of-range indices are clamped: a cross-column move appends at
/// `destination_len`, a same-column move lands on the last slot.
///
/// The moving task is never matched by its own shifts: source ranges start
/// strictly after its old position and destination ranges only touch the
/// other column.
#[must_use]
pub fn plan_move(
    current: &Placement,
    target_column: &ColumnName,
    requested: Position,
    destination_len: u32,
) -> MovePlan {
    if current.column == *target_column {
        plan_reorder(current, requested, destination_len)
    } else {
        plan_transfer(current, target_column, requested, destination_len)
    }
}

fn plan_reorder(current: &Placement, requested: Position, column_len: u32) -> MovePlan {
    let last = Position::new(column_len.saturating_sub(1));
    let target = requested.min(last);
    let old = current.position;

    let shift = if target > old {
        PositionShift {
            column: current.column.clone(),
            from: old.next(),
            through: Some(target),
            delta: ShiftDelta::Decrement,
        }
    } else if let Some(below_old) = old.previous()
        && target < old
    {
        PositionShift {
            column: current.column.clone(),
            from: target,
            through: Some(below_old),
            delta: ShiftDelta::Increment,
        }
    } else {
        return MovePlan::Unchanged;
    };

    MovePlan::Reposition {
        shifts: vec![shift],
        target: Placement::new(current.column.clone(), target),
    }
}

fn plan_transfer(
    current: &Placement,
    target_column: &ColumnName,
    requested: Position,
    destination_len: u32,
) -> MovePlan {
    let append_slot = Position::new(destination_len);
    let target = requested.min(append_slot);

    let mut shifts = vec![PositionShift {
        column: current.column.clone(),
        from: current.position.next(),
        through: None,
        delta: ShiftDelta::Decrement,
    }];
    if target < append_slot {
        shifts.push(PositionShift {
            column: target_column.clone(),
            from: target,
            through: None,
            delta: ShiftDelta::Increment,
        });
    }

    MovePlan::Reposition {
        shifts,
        target: Placement::new(target_column.clone(), target),
    }
}

/// Computes the gap-closing shift applied after removing the task at
/// `placement` from its column.
#[must_use]
pub fn plan_removal(placement: &Placement) -> PositionShift {
    PositionShift {
        column: placement.column.clone(),
        from: placement.position.next(),
        through: None,
        delta: ShiftDelta::Decrement,
    }
}
