//! Drives one speculative move from drag to settlement.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::cache::{BoardCache, CacheError, PendingMoveState};
use crate::task::domain::{ColumnName, Position, TaskId, TaskView};

/// Why the server refused or failed a move.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The task no longer exists.
    #[error("task not found")]
    NotFound,
    /// A concurrent move won; re-fetch the board before retrying.
    #[error("move conflicted with a concurrent change: {0}")]
    Conflict(String),
    /// The request was rejected as invalid or forbidden.
    #[error("move rejected: {0}")]
    Rejected(String),
    /// The server could not be reached or failed internally.
    #[error("move request failed: {0}")]
    Unavailable(String),
}

/// Sends move requests to the board server.
#[async_trait]
pub trait MoveTransport: Send + Sync {
    /// Requests the move and returns the server's view of the task.
    async fn move_task(
        &self,
        task_id: TaskId,
        column: &ColumnName,
        position: Position,
    ) -> Result<TaskView, TransportError>;
}

/// Failure of [`OptimisticMover::move_task`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    /// The move could not be started or settled in the cache.
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// The server refused the move; the cache was rolled back.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Applies moves optimistically and settles them with the server's answer.
///
/// The request runs on its own task, so dropping the future returned by
/// [`Self::move_task`] does not cancel a move the server is already
/// applying; the broadcast will reconcile the cache.
#[derive(Debug)]
pub struct OptimisticMover<T> {
    cache: Arc<Mutex<BoardCache>>,
    transport: Arc<T>,
}

impl<T> Clone for OptimisticMover<T> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T> OptimisticMover<T>
where
    T: MoveTransport + 'static,
{
    /// Creates a mover over a shared cache.
    #[must_use]
    pub fn new(cache: Arc<Mutex<BoardCache>>, transport: T) -> Self {
        Self {
            cache,
            transport: Arc::new(transport),
        }
    }

    /// Returns the shared cache.
    #[must_use]
    pub const fn cache(&self) -> &Arc<Mutex<BoardCache>> {
        &self.cache
    }

    /// Moves a task locally, asks the server, then confirms or rolls back.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError::Cache`] when the move cannot start (unknown task,
    /// move already in flight) and [`MoveError::Transport`] after a rollback.
    pub async fn move_task(
        &self,
        task_id: TaskId,
        column: ColumnName,
        position: Position,
    ) -> Result<PendingMoveState, MoveError> {
        let pending = self
            .cache
            .lock()
            .await
            .begin_move(task_id, column.clone(), position)?;

        let transport = Arc::clone(&self.transport);
        let request =
            tokio::spawn(async move { transport.move_task(task_id, &column, position).await });
        let answer = request
            .await
            .unwrap_or_else(|err| Err(TransportError::Unavailable(err.to_string())));

        let mut cache = self.cache.lock().await;
        match answer {
            Ok(view) => {
                let state = cache.confirm(pending, &view)?;
                debug!(task_id = %task_id, pending = %pending, "optimistic move confirmed");
                Ok(state)
            }
            Err(err) => {
                let state = cache.rollback(pending)?;
                warn!(
                    task_id = %task_id,
                    pending = %pending,
                    error = %err,
                    settled = ?state,
                    "move failed; optimistic change reverted"
                );
                if state == PendingMoveState::Confirmed {
                    return Ok(state);
                }
                Err(MoveError::Transport(err))
            }
        }
    }
}
