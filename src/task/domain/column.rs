//! Column labels, dense positions and the keys that group them.

use super::{ProjectId, TaskDomainError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kanban column label such as `Todo` or `In Review`.
///
/// Columns carry no identity beyond their label; the label is trimmed and
/// compared exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColumnName(String);

impl ColumnName {
    /// Longest accepted column label, in characters.
    pub const MAX_LENGTH: usize = 100;

    /// Creates a validated column label.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyColumn`] for blank labels and
    /// [`TaskDomainError::ColumnTooLong`] when the label exceeds
    /// [`Self::MAX_LENGTH`] characters.
    pub fn new(value: impl Into<String>) -> Result<Self, TaskDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TaskDomainError::EmptyColumn);
        }
        if trimmed.chars().count() > Self::MAX_LENGTH {
            return Err(TaskDomainError::ColumnTooLong(raw));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the label as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ColumnName {
    type Error = TaskDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ColumnName> for String {
    fn from(value: ColumnName) -> Self {
        value.0
    }
}

impl AsRef<str> for ColumnName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Zero-based rank of a task inside its (project, column) group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(u32);

impl Position {
    /// The first slot of a column.
    pub const ZERO: Self = Self(0);

    /// Wraps a raw position value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Converts a client-supplied index, rejecting negative values.
    ///
    /// Indices beyond the position range saturate to `u32::MAX`; move
    /// planning clamps them to the end of the column.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidPosition`] when the value is
    /// negative.
    pub fn from_index(value: i64) -> Result<Self, TaskDomainError> {
        if value < 0 {
            return Err(TaskDomainError::InvalidPosition(value));
        }
        Ok(Self(u32::try_from(value).unwrap_or(u32::MAX)))
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Returns the slot directly after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Returns the slot directly before this one, if any.
    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        match self.0.checked_sub(1) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Column a task occupies together with its rank inside that column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    /// Column label.
    pub column: ColumnName,
    /// Rank inside the column.
    pub position: Position,
}

impl Placement {
    /// Creates a placement.
    #[must_use]
    pub const fn new(column: ColumnName, position: Position) -> Self {
        Self { column, position }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.column, self.position)
    }
}

/// Grouping key of the position index: one dense ordering per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnKey {
    /// Owning project.
    pub project_id: ProjectId,
    /// Column label inside the project.
    pub column: ColumnName,
}

impl ColumnKey {
    /// Creates a grouping key.
    #[must_use]
    pub const fn new(project_id: ProjectId, column: ColumnName) -> Self {
        Self { project_id, column }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.project_id, self.column)
    }
}
