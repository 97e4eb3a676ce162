//! In-process transport calling the board service directly.

use async_trait::async_trait;
use mockable::Clock;

use super::mover::{MoveTransport, TransportError};
use crate::task::{
    domain::{ColumnName, Position, TaskId, TaskView, UserId},
    ports::TaskRepository,
    services::{ErrorKind, MoveTaskRequest, TaskBoardService},
};

/// [`MoveTransport`] that calls a [`TaskBoardService`] in the same process
/// on behalf of one user.
pub struct ServiceTransport<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    service: TaskBoardService<R, C>,
    actor: UserId,
}

impl<R, C> ServiceTransport<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    /// Creates a transport acting as `actor`.
    #[must_use]
    pub const fn new(service: TaskBoardService<R, C>, actor: UserId) -> Self {
        Self { service, actor }
    }
}

#[async_trait]
impl<R, C> MoveTransport for ServiceTransport<R, C>
where
    R: TaskRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    async fn move_task(
        &self,
        task_id: TaskId,
        column: &ColumnName,
        position: Position,
    ) -> Result<TaskView, TransportError> {
        let request = MoveTaskRequest::new(column.as_str(), i64::from(position.value()));
        self.service
            .move_task(self.actor, task_id, request)
            .await
            .map(|outcome| TaskView::from(&outcome.task))
            .map_err(|err| match err.kind() {
                ErrorKind::NotFound => TransportError::NotFound,
                ErrorKind::Conflict => TransportError::Conflict(err.to_string()),
                ErrorKind::InvalidArgument | ErrorKind::Forbidden => {
                    TransportError::Rejected(err.to_string())
                }
                ErrorKind::Internal => TransportError::Unavailable(err.to_string()),
            })
    }
}
