//! Membership-based authorizer kept in memory.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use crate::task::{
    domain::{ProjectId, TaskId, UserId},
    ports::{AuthorizationError, TaskAuthorizer},
};

/// Grants access to users registered as members of a project.
///
/// An open instance grants everything, which suits single-user local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProjectMembers {
    open: bool,
    members: Arc<RwLock<HashSet<(ProjectId, UserId)>>>,
}

impl InMemoryProjectMembers {
    /// Creates an authorizer that denies everyone until members are granted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an authorizer that allows every user on every project.
    #[must_use]
    pub fn open() -> Self {
        Self {
            open: true,
            ..Self::default()
        }
    }

    /// Adds `user_id` as a member of `project_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizationError`] when the membership lock is poisoned.
    pub fn grant(&self, project_id: ProjectId, user_id: UserId) -> Result<(), AuthorizationError> {
        let mut members = self.members.write().map_err(poisoned)?;
        members.insert((project_id, user_id));
        Ok(())
    }

    /// Removes `user_id` from `project_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizationError`] when the membership lock is poisoned.
    pub fn revoke(&self, project_id: ProjectId, user_id: UserId) -> Result<(), AuthorizationError> {
        let mut members = self.members.write().map_err(poisoned)?;
        members.remove(&(project_id, user_id));
        Ok(())
    }

    fn is_member(&self, project_id: ProjectId, user_id: UserId) -> Result<bool, AuthorizationError> {
        if self.open {
            return Ok(true);
        }
        let members = self.members.read().map_err(poisoned)?;
        Ok(members.contains(&(project_id, user_id)))
    }
}

fn poisoned(err: impl std::fmt::Display) -> AuthorizationError {
    AuthorizationError::backend(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl TaskAuthorizer for InMemoryProjectMembers {
    async fn can_modify_task(
        &self,
        user_id: UserId,
        _task_id: TaskId,
        project_id: ProjectId,
    ) -> Result<bool, AuthorizationError> {
        self.is_member(project_id, user_id)
    }

    async fn can_access_project(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> Result<bool, AuthorizationError> {
        self.is_member(project_id, user_id)
    }
}
