//! Authorization port consumed before board mutations.

use crate::task::domain::{ProjectId, TaskId, UserId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Decides whether a user may read or change a project's board.
#[async_trait]
pub trait TaskAuthorizer: Send + Sync {
    /// Returns whether `user_id` may modify `task_id` in `project_id`.
    async fn can_modify_task(
        &self,
        user_id: UserId,
        task_id: TaskId,
        project_id: ProjectId,
    ) -> Result<bool, AuthorizationError>;

    /// Returns whether `user_id` may view and add tasks in `project_id`.
    async fn can_access_project(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> Result<bool, AuthorizationError>;
}

/// Failure of the authorization backend itself (not a denial).
#[derive(Debug, Clone, Error)]
#[error("authorization backend error: {0}")]
pub struct AuthorizationError(pub Arc<dyn std::error::Error + Send + Sync>);

impl AuthorizationError {
    /// Wraps a backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self(Arc::new(err))
    }
}
