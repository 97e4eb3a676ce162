//! Assignment notifier that only logs.

use async_trait::async_trait;
use tracing::info;

use crate::task::ports::{AssignmentNotification, AssignmentNotifier, NotificationError};

/// Writes each assignment notice to the tracing log.
///
/// Stands in for a real dispatcher (mail, chat) in deployments without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl AssignmentNotifier for LogNotifier {
    async fn notify(
        &self,
        notification: &AssignmentNotification,
    ) -> Result<(), NotificationError> {
        info!(
            task_id = %notification.task_id,
            project_id = %notification.project_id,
            assignee = %notification.assignee,
            assigned_by = %notification.assigned_by,
            title = %notification.title,
            "task assigned"
        );
        Ok(())
    }
}
