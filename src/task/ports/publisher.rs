//! Port through which committed board changes reach subscribers.

use crate::task::domain::{BoardEvent, ProjectId};

/// Delivery summary of one publish call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers that accepted the event.
    pub delivered: usize,
    /// Subscribers that could not take the event and were dropped.
    pub failed: usize,
}

/// Broadcasts committed events to everyone watching a project.
///
/// Callers publish only after the underlying transaction has committed.
/// Publishing never fails the caller; per-subscriber failures are reported
/// in the returned summary.
pub trait BoardEventPublisher: Send + Sync {
    /// Sends `event` to every subscriber of `project_id`.
    fn publish(&self, project_id: ProjectId, event: BoardEvent) -> PublishReport;
}
