//! Error types for task domain validation and parsing.

use super::{SubtaskId, TaskId};
use thiserror::Error;

/// Errors returned while constructing or mutating domain task values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The task title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTitle,

    /// The task title exceeds the allowed length.
    #[error("task title has {actual} characters, exceeds limit of {max}")]
    TitleTooLong {
        /// Maximum number of characters.
        max: usize,
        /// Actual number of characters.
        actual: usize,
    },

    /// The column label is empty after trimming.
    #[error("column name must not be empty")]
    EmptyColumn,

    /// The column label exceeds the allowed length.
    #[error("column name '{0}' is too long")]
    ColumnTooLong(String),

    /// A position or index was negative or outside the representable range.
    #[error("invalid position {0}, expected a non-negative integer")]
    InvalidPosition(i64),

    /// The priority value is not one of the supported levels.
    #[error("unknown priority: {0}")]
    UnknownPriority(String),

    /// The subtask title is empty after trimming.
    #[error("subtask title must not be empty")]
    EmptySubtaskTitle,

    /// The referenced subtask does not belong to the task.
    #[error("subtask {subtask_id} not found on task {task_id}")]
    SubtaskNotFound {
        /// Task that was searched.
        task_id: TaskId,
        /// Missing subtask.
        subtask_id: SubtaskId,
    },
}
