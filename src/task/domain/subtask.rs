//! Checklist entries nested inside a task.

use super::{SubtaskId, TaskDomainError};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// A single checklist item on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    /// Subtask identifier.
    pub id: SubtaskId,
    /// Short description of the step.
    pub title: String,
    /// Whether the step is done.
    pub completed: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Subtask {
    /// Creates an open subtask.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptySubtaskTitle`] when the title is blank.
    pub fn new(title: impl Into<String>, clock: &impl Clock) -> Result<Self, TaskDomainError> {
        Ok(Self {
            id: SubtaskId::new(),
            title: normalize_subtask_title(title.into())?,
            completed: false,
            created_at: clock.utc(),
        })
    }
}

pub(super) fn normalize_subtask_title(title: String) -> Result<String, TaskDomainError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TaskDomainError::EmptySubtaskTitle);
    }
    Ok(trimmed.to_owned())
}

/// Percentage of completed subtasks, rounded to the nearest integer.
///
/// Returns `0` for an empty checklist.
#[must_use]
pub fn completion_percentage(subtasks: &[Subtask]) -> u8 {
    let total = subtasks.len();
    if total == 0 {
        return 0;
    }
    let completed = subtasks.iter().filter(|subtask| subtask.completed).count();
    // Round half up using integer arithmetic: (200 * c + t) / (2 * t).
    let scaled = (200 * completed + total)
        .checked_div(2 * total)
        .unwrap_or(0);
    u8::try_from(scaled).unwrap_or(100)
}
