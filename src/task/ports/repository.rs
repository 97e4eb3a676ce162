//! Repository port for task persistence and the position index.

use crate::task::{
    domain::{
        ActivityEntry, ColumnKey, Placement, Position, ProjectId, Task, TaskDomainError, TaskId,
    },
    ordering::PositionShift,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for task repository operations.
pub type TaskRepositoryResult<T> = Result<T, TaskRepositoryError>;

/// Unit of work over the position index.
///
/// Every call made through one transaction commits together or not at all.
/// Implementations hold the locks for the requested column keys for the
/// lifetime of the transaction.
pub trait PositionTransaction {
    /// Reads a task inside the transaction.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError`] when the read fails.
    fn find(&mut self, id: TaskId) -> TaskRepositoryResult<Option<Task>>;

    /// Counts the tasks in a column.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError`] when the read fails.
    fn column_len(&mut self, key: &ColumnKey) -> TaskRepositoryResult<u32>;

    /// Returns the highest position in a column, or `None` when it is empty.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError`] when the read fails.
    fn max_position(&mut self, key: &ColumnKey) -> TaskRepositoryResult<Option<Position>>;

    /// Shifts every task of `project_id` matching `shift` by its delta and
    /// returns the number of affected tasks.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError`] when the write fails; the whole
    /// transaction is then rolled back.
    fn shift_positions(
        &mut self,
        project_id: ProjectId,
        shift: &PositionShift,
    ) -> TaskRepositoryResult<u64>;

    /// Sets the column and position of one task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the task does not exist.
    fn set_position(
        &mut self,
        id: TaskId,
        placement: &Placement,
        updated_at: DateTime<Utc>,
    ) -> TaskRepositoryResult<()>;

    /// Inserts a task at the placement it carries.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::DuplicateTask`] when the identifier is
    /// already taken.
    fn insert(&mut self, task: &Task) -> TaskRepositoryResult<()>;

    /// Removes a task without touching its siblings.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the task does not exist.
    fn delete(&mut self, id: TaskId) -> TaskRepositoryResult<()>;
}

/// Task persistence contract.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Finds a task by identifier.
    ///
    /// Returns `None` when the task does not exist.
    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>>;

    /// Returns the tasks of one column ordered by position.
    async fn list_by_column(&self, key: &ColumnKey) -> TaskRepositoryResult<Vec<Task>>;

    /// Returns every task of a project ordered by column, then position.
    async fn list_by_project(&self, project_id: ProjectId) -> TaskRepositoryResult<Vec<Task>>;

    /// Returns the highest position in a column, or `None` when it is empty.
    async fn max_position(&self, key: &ColumnKey) -> TaskRepositoryResult<Option<Position>>;

    /// Applies `edit` to the stored task and persists its content fields
    /// (title, description, assignee, priority, labels, subtasks, timestamps).
    ///
    /// The read, the edit and the write happen under one lock on the task,
    /// so concurrent edits never overwrite each other. Column and position
    /// are never written. Activity entries the edit adds are appended to the
    /// stored log; entries appended concurrently are kept.
    ///
    /// Returns the stored task after the edit with the edit's own result.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the task does not exist
    /// and [`TaskRepositoryError::Rejected`] when `edit` fails, in which case
    /// nothing is written.
    async fn modify_content<T, F>(&self, id: TaskId, edit: F) -> TaskRepositoryResult<(Task, T)>
    where
        T: Send + 'static,
        F: FnOnce(&mut Task) -> Result<T, TaskDomainError> + Send + 'static;

    /// Appends one entry to a task's activity log.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the task does not exist.
    async fn append_activity(&self, id: TaskId, entry: &ActivityEntry)
    -> TaskRepositoryResult<()>;

    /// Runs `work` inside one transaction holding the locks for `scope`.
    ///
    /// When `work` returns an error every write it made is discarded.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `work`, or
    /// [`TaskRepositoryError::LockTimeout`] when the column locks could not
    /// be taken in time.
    async fn in_position_transaction<T, F>(
        &self,
        scope: Vec<ColumnKey>,
        work: F,
    ) -> TaskRepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn PositionTransaction) -> TaskRepositoryResult<T> + Send + 'static;
}

/// Errors returned by task repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskRepositoryError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// Column locks could not be acquired before the deadline.
    #[error("timed out waiting for column lock")]
    LockTimeout,

    /// A content edit refused to apply to the stored task.
    #[error(transparent)]
    Rejected(TaskDomainError),

    /// The database aborted the transaction because of a concurrent writer.
    #[error("transaction aborted by a concurrent update")]
    SerializationFailure,

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }

    /// Returns `true` for failures caused by a concurrent writer.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::LockTimeout | Self::SerializationFailure)
    }
}
