//! Project membership authorizer backed by `PostgreSQL`.

use super::{
    blocking::{TaskPgPool, run_blocking},
    schema::project_members,
};
use crate::task::{
    domain::{ProjectId, TaskId, UserId},
    ports::{AuthorizationError, TaskAuthorizer},
};
use async_trait::async_trait;
use diesel::prelude::*;

/// Grants access to users listed in `project_members`.
#[derive(Debug, Clone)]
pub struct PostgresProjectMembers {
    pool: TaskPgPool,
}

impl PostgresProjectMembers {
    /// Creates an authorizer from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self { pool }
    }

    async fn is_member(
        &self,
        project_id: ProjectId,
        user_id: UserId,
    ) -> Result<bool, AuthorizationError> {
        run_blocking(&self.pool, backend_failure, move |connection| {
            diesel::select(diesel::dsl::exists(
                project_members::table
                    .filter(project_members::project_id.eq(project_id.into_inner()))
                    .filter(project_members::user_id.eq(user_id.into_inner())),
            ))
            .get_result::<bool>(connection)
            .map_err(AuthorizationError::backend)
        })
        .await
    }
}

fn backend_failure(err: Box<dyn std::error::Error + Send + Sync>) -> AuthorizationError {
    AuthorizationError(err.into())
}

#[async_trait]
impl TaskAuthorizer for PostgresProjectMembers {
    async fn can_modify_task(
        &self,
        user_id: UserId,
        _task_id: TaskId,
        project_id: ProjectId,
    ) -> Result<bool, AuthorizationError> {
        self.is_member(project_id, user_id).await
    }

    async fn can_access_project(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> Result<bool, AuthorizationError> {
        self.is_member(project_id, user_id).await
    }
}
