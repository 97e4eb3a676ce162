//! Notifier that keeps every notice it receives.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::task::ports::{AssignmentNotification, AssignmentNotifier, NotificationError};

/// Records assignment notices for later inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<AssignmentNotification>>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the notices received so far, oldest first.
    #[must_use]
    pub fn sent(&self) -> Vec<AssignmentNotification> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AssignmentNotifier for RecordingNotifier {
    async fn notify(
        &self,
        notification: &AssignmentNotification,
    ) -> Result<(), NotificationError> {
        let mut sent = self
            .sent
            .lock()
            .map_err(|err| NotificationError(err.to_string()))?;
        sent.push(notification.clone());
        Ok(())
    }
}
