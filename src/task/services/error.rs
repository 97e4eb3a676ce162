//! Service-level errors for board operations.

use thiserror::Error;

use super::column_locks::ColumnLockTimeout;
use crate::task::{
    domain::{SubtaskId, TaskDomainError, TaskId},
    ports::{AuthorizationError, TaskRepositoryError},
};

/// Coarse classification used by transports to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The referenced task or subtask does not exist.
    NotFound,
    /// A concurrent writer won; the caller may retry with fresh state.
    Conflict,
    /// The request was malformed and must not be retried as is.
    InvalidArgument,
    /// The caller may not perform the operation.
    Forbidden,
    /// Infrastructure failure.
    Internal,
}

/// Errors returned by [`super::TaskBoardService`].
#[derive(Debug, Error)]
pub enum TaskBoardError {
    /// The task does not exist.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// The subtask does not exist on the task.
    #[error("subtask {subtask_id} not found on task {task_id}")]
    SubtaskNotFound {
        /// Owning task.
        task_id: TaskId,
        /// Missing subtask.
        subtask_id: SubtaskId,
    },

    /// The operation collided with a concurrent writer.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Input validation failed.
    #[error(transparent)]
    InvalidArgument(TaskDomainError),

    /// The caller lacks permission.
    #[error("not allowed to modify this board")]
    Forbidden,

    /// Persistence failure.
    #[error(transparent)]
    Repository(TaskRepositoryError),

    /// The authorization backend failed.
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
}

impl TaskBoardError {
    /// Returns the error class.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::TaskNotFound(_) | Self::SubtaskNotFound { .. } => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Forbidden => ErrorKind::Forbidden,
            Self::Repository(_) | Self::Authorization(_) => ErrorKind::Internal,
        }
    }
}

impl From<TaskDomainError> for TaskBoardError {
    fn from(err: TaskDomainError) -> Self {
        match err {
            TaskDomainError::SubtaskNotFound {
                task_id,
                subtask_id,
            } => Self::SubtaskNotFound {
                task_id,
                subtask_id,
            },
            other => Self::InvalidArgument(other),
        }
    }
}

impl From<TaskRepositoryError> for TaskBoardError {
    fn from(err: TaskRepositoryError) -> Self {
        match err {
            TaskRepositoryError::NotFound(id) => Self::TaskNotFound(id),
            TaskRepositoryError::Rejected(domain) => Self::from(domain),
            conflict if conflict.is_conflict() => Self::Conflict(conflict.to_string()),
            other => Self::Repository(other),
        }
    }
}

impl From<ColumnLockTimeout> for TaskBoardError {
    fn from(err: ColumnLockTimeout) -> Self {
        Self::Conflict(err.to_string())
    }
}

/// Result type for board service operations.
pub type TaskBoardResult<T> = Result<T, TaskBoardError>;
