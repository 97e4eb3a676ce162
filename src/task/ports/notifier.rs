//! Notification port for assignment changes.

use crate::task::domain::{ProjectId, TaskId, UserId};
use async_trait::async_trait;
use thiserror::Error;

/// Assignment notice handed to the external notification dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentNotification {
    /// Assigned task.
    pub task_id: TaskId,
    /// Project of the task.
    pub project_id: ProjectId,
    /// Task title at the time of assignment.
    pub title: String,
    /// User who received the task.
    pub assignee: UserId,
    /// User who made the assignment.
    pub assigned_by: UserId,
}

/// Dispatches assignment notices. Delivery is fire-and-forget: callers log
/// failures and carry on.
#[async_trait]
pub trait AssignmentNotifier: Send + Sync {
    /// Sends one notice.
    async fn notify(&self, notification: &AssignmentNotification)
    -> Result<(), NotificationError>;
}

/// Notification delivery failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("notification delivery failed: {0}")]
pub struct NotificationError(pub String);
