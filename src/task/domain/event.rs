//! Board events broadcast to clients watching a project.
//!
//! The wire format is `{ "event": "<kind>", "payload": { ... } }` with
//! kebab-case event names and camelCase payload keys.

use super::{
    ActivityEntry, ColumnName, Position, Priority, ProjectId, Subtask, Task, TaskId, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Read model of a task as sent to clients.
///
/// Includes the derived `subtaskProgress` field, which is computed from the
/// subtasks whenever the view is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    /// Task identifier.
    pub id: TaskId,
    /// Owning project.
    pub project: ProjectId,
    /// Title.
    pub title: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Column label.
    pub column: ColumnName,
    /// Dense rank inside the column.
    pub position: Position,
    /// Optional assignee.
    #[serde(default)]
    pub assignee: Option<UserId>,
    /// Reporter.
    pub reporter: UserId,
    /// Priority.
    pub priority: Priority,
    /// Checklist entries.
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    /// Label set.
    #[serde(default)]
    pub labels: BTreeSet<String>,
    /// Activity log in append order.
    #[serde(default)]
    pub activity_log: Vec<ActivityEntry>,
    /// Rounded percentage of completed subtasks.
    pub subtask_progress: u8,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest change timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<&Task> for TaskView {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id(),
            project: task.project_id(),
            title: task.title().to_owned(),
            description: task.description().map(str::to_owned),
            column: task.column().clone(),
            position: task.position(),
            assignee: task.assignee(),
            reporter: task.reporter(),
            priority: task.priority(),
            subtasks: task.subtasks().to_vec(),
            labels: task.labels().clone(),
            activity_log: task.activity_log().to_vec(),
            subtask_progress: task.subtask_progress(),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
        }
    }
}

/// Payload of a `task-moved` event: the authoritative placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMoved {
    /// Moved task.
    pub task_id: TaskId,
    /// Column after the move.
    pub column: ColumnName,
    /// Position after the move.
    pub position: Position,
}

/// Payload of a `task-deleted` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDeleted {
    /// Deleted task.
    pub task_id: TaskId,
}

/// Lifecycle event for a task on a project board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum BoardEvent {
    /// A task was added to a column.
    TaskCreated(Box<TaskView>),
    /// Content fields of a task changed.
    TaskUpdated(Box<TaskView>),
    /// A task changed column and/or position.
    TaskMoved(TaskMoved),
    /// A task was removed.
    TaskDeleted(TaskDeleted),
}

impl BoardEvent {
    /// Builds a `task-created` event.
    #[must_use]
    pub fn created(task: &Task) -> Self {
        Self::TaskCreated(Box::new(TaskView::from(task)))
    }

    /// Builds a `task-updated` event.
    #[must_use]
    pub fn updated(task: &Task) -> Self {
        Self::TaskUpdated(Box::new(TaskView::from(task)))
    }

    /// Builds a `task-moved` event carrying the task's current placement.
    #[must_use]
    pub fn moved(task: &Task) -> Self {
        Self::TaskMoved(TaskMoved {
            task_id: task.id(),
            column: task.column().clone(),
            position: task.position(),
        })
    }

    /// Builds a `task-deleted` event.
    #[must_use]
    pub const fn deleted(task_id: TaskId) -> Self {
        Self::TaskDeleted(TaskDeleted { task_id })
    }

    /// Returns the wire name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TaskCreated(_) => "task-created",
            Self::TaskUpdated(_) => "task-updated",
            Self::TaskMoved(_) => "task-moved",
            Self::TaskDeleted(_) => "task-deleted",
        }
    }

    /// Returns the task the event concerns.
    #[must_use]
    pub fn task_id(&self) -> TaskId {
        match self {
            Self::TaskCreated(view) | Self::TaskUpdated(view) => view.id,
            Self::TaskMoved(moved) => moved.task_id,
            Self::TaskDeleted(deleted) => deleted.task_id,
        }
    }
}

