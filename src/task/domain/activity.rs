//! Append-only activity log entries recorded against a task.

use super::UserId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Kind of change recorded in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    /// Task was created.
    Created,
    /// A content field changed.
    Updated,
    /// Task changed column or position.
    Moved,
    /// Task was assigned to a user.
    Assigned,
    /// Assignee was cleared.
    Unassigned,
}

/// Field-level change captured alongside an activity entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    /// Name of the changed field.
    pub field: &'static str,
    /// Rendered value before the change.
    pub old_value: Option<String>,
    /// Rendered value after the change.
    pub new_value: Option<String>,
}

impl FieldChange {
    /// Creates a field change record.
    #[must_use]
    pub const fn new(
        field: &'static str,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Self {
        Self {
            field,
            old_value,
            new_value,
        }
    }
}

/// One entry of a task's activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    /// User who performed the change.
    pub user: UserId,
    /// What happened.
    pub action: ActivityAction,
    /// Field affected, when the action concerns one field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Previous value of the field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    /// New value of the field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    /// When the change happened.
    pub timestamp: DateTime<Utc>,
}

impl ActivityEntry {
    /// Creates an entry without field details.
    #[must_use]
    pub fn new(user: UserId, action: ActivityAction, clock: &impl Clock) -> Self {
        Self {
            user,
            action,
            field: None,
            old_value: None,
            new_value: None,
            timestamp: clock.utc(),
        }
    }

    /// Creates an entry describing a single field change.
    #[must_use]
    pub fn for_change(
        user: UserId,
        action: ActivityAction,
        change: FieldChange,
        clock: &impl Clock,
    ) -> Self {
        Self {
            user,
            action,
            field: Some(change.field.to_owned()),
            old_value: change.old_value,
            new_value: change.new_value,
            timestamp: clock.utc(),
        }
    }
}
