//! Task aggregate root and the commands that create and edit it.

use super::{
    ActivityAction, ActivityEntry, ColumnKey, ColumnName, FieldChange, Placement, Position,
    Priority, ProjectId, Subtask, SubtaskId, TaskDomainError, TaskId, UserId,
    subtask::{completion_percentage, normalize_subtask_title},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Longest accepted task title, in characters.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Input for creating a task at the end of a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    project_id: ProjectId,
    title: String,
    column: String,
    reporter: UserId,
    description: Option<String>,
    assignee: Option<UserId>,
    priority: Priority,
    labels: Vec<String>,
}

impl TaskDraft {
    /// Creates a draft with the required fields.
    #[must_use]
    pub fn new(
        project_id: ProjectId,
        title: impl Into<String>,
        column: impl Into<String>,
        reporter: UserId,
    ) -> Self {
        Self {
            project_id,
            title: title.into(),
            column: column.into(),
            reporter,
            description: None,
            assignee: None,
            priority: Priority::default(),
            labels: Vec::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the assignee.
    #[must_use]
    pub const fn with_assignee(mut self, assignee: UserId) -> Self {
        self.assignee = Some(assignee);
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the labels.
    #[must_use]
    pub fn with_labels(mut self, labels: impl IntoIterator<Item = String>) -> Self {
        self.labels = labels.into_iter().collect();
        self
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the creating user.
    #[must_use]
    pub const fn reporter(&self) -> UserId {
        self.reporter
    }
}

/// Partial edit of a task's content fields.
///
/// Placement is never part of an update; use the move operation instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    /// New title.
    pub title: Option<String>,
    /// New description; `Some(None)` clears it.
    pub description: Option<Option<String>>,
    /// New assignee; `Some(None)` unassigns.
    pub assignee: Option<Option<UserId>>,
    /// New priority.
    pub priority: Option<Priority>,
    /// Replacement label set.
    pub labels: Option<Vec<String>>,
}

/// Edit to a single subtask.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtaskUpdate {
    /// New title.
    pub title: Option<String>,
    /// New completion flag.
    pub completed: Option<bool>,
}

/// Outcome of applying a [`TaskUpdate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChanges {
    /// Every field whose value changed.
    pub fields: Vec<FieldChange>,
    /// Set when the update assigned the task to a (different) user.
    pub newly_assigned: Option<UserId>,
}

impl TaskChanges {
    /// Returns `true` when nothing changed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    id: TaskId,
    project_id: ProjectId,
    title: String,
    description: Option<String>,
    column: ColumnName,
    position: Position,
    assignee: Option<UserId>,
    reporter: UserId,
    priority: Priority,
    subtasks: Vec<Subtask>,
    labels: BTreeSet<String>,
    activity_log: Vec<ActivityEntry>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Column label.
    pub column: ColumnName,
    /// Dense rank inside the column.
    pub position: Position,
    /// Optional assignee.
    pub assignee: Option<UserId>,
    /// Reporter.
    pub reporter: UserId,
    /// Priority.
    pub priority: Priority,
    /// Checklist entries in order.
    pub subtasks: Vec<Subtask>,
    /// Label set.
    pub labels: BTreeSet<String>,
    /// Activity log in append order.
    pub activity_log: Vec<ActivityEntry>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest change timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a task from a draft. The task starts at position zero; the
    /// final slot is assigned when it is inserted into its column.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError`] when the title or column is invalid.
    pub fn new(draft: TaskDraft, clock: &impl Clock) -> Result<Self, TaskDomainError> {
        let TaskDraft {
            project_id,
            title,
            column,
            reporter,
            description,
            assignee,
            priority,
            labels,
        } = draft;
        let timestamp = clock.utc();
        Ok(Self {
            id: TaskId::new(),
            project_id,
            title: normalize_title(&title)?,
            description: normalize_description(description),
            column: ColumnName::new(column)?,
            position: Position::ZERO,
            assignee,
            reporter,
            priority,
            subtasks: Vec::new(),
            labels: normalize_labels(labels),
            activity_log: vec![ActivityEntry::new(
                reporter,
                ActivityAction::Created,
                clock,
            )],
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            project_id: data.project_id,
            title: data.title,
            description: data.description,
            column: data.column,
            position: data.position,
            assignee: data.assignee,
            reporter: data.reporter,
            priority: data.priority,
            subtasks: data.subtasks,
            labels: data.labels,
            activity_log: data.activity_log,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the column label.
    #[must_use]
    pub const fn column(&self) -> &ColumnName {
        &self.column
    }

    /// Returns the rank inside the column.
    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    /// Returns the column and rank as one value.
    #[must_use]
    pub fn placement(&self) -> Placement {
        Placement::new(self.column.clone(), self.position)
    }

    /// Returns the position-index key this task belongs to.
    #[must_use]
    pub fn column_key(&self) -> ColumnKey {
        ColumnKey::new(self.project_id, self.column.clone())
    }

    /// Returns the assignee, if any.
    #[must_use]
    pub const fn assignee(&self) -> Option<UserId> {
        self.assignee
    }

    /// Returns the reporter.
    #[must_use]
    pub const fn reporter(&self) -> UserId {
        self.reporter
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the checklist entries in order.
    #[must_use]
    pub fn subtasks(&self) -> &[Subtask] {
        &self.subtasks
    }

    /// Returns the label set.
    #[must_use]
    pub const fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }

    /// Returns the activity log in append order.
    #[must_use]
    pub fn activity_log(&self) -> &[ActivityEntry] {
        &self.activity_log
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest change timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Share of completed subtasks as a rounded percentage.
    ///
    /// Computed on every call; it is never stored.
    #[must_use]
    pub fn subtask_progress(&self) -> u8 {
        completion_percentage(&self.subtasks)
    }

    /// Applies a content update and records one activity entry per changed
    /// field.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError`] when the new title is invalid. Nothing is
    /// modified in that case.
    pub fn apply_update(
        &mut self,
        update: TaskUpdate,
        actor: UserId,
        clock: &impl Clock,
    ) -> Result<TaskChanges, TaskDomainError> {
        let TaskUpdate {
            title,
            description,
            assignee,
            priority,
            labels,
        } = update;
        let title = title.map(|value| normalize_title(&value)).transpose()?;

        let mut changes = TaskChanges::default();
        let mut entries = Vec::new();

        if let Some(title) = title
            && title != self.title
        {
            let change = FieldChange::new("title", Some(self.title.clone()), Some(title.clone()));
            entries.push(ActivityEntry::for_change(
                actor,
                ActivityAction::Updated,
                change.clone(),
                clock,
            ));
            changes.fields.push(change);
            self.title = title;
        }

        if let Some(description) = description.map(normalize_description)
            && description != self.description
        {
            let change =
                FieldChange::new("description", self.description.clone(), description.clone());
            entries.push(ActivityEntry::for_change(
                actor,
                ActivityAction::Updated,
                change.clone(),
                clock,
            ));
            changes.fields.push(change);
            self.description = description;
        }

        if let Some(assignee) = assignee
            && assignee != self.assignee
        {
            let change = FieldChange::new(
                "assignee",
                self.assignee.map(|user| user.to_string()),
                assignee.map(|user| user.to_string()),
            );
            let action = if assignee.is_some() {
                ActivityAction::Assigned
            } else {
                ActivityAction::Unassigned
            };
            entries.push(ActivityEntry::for_change(actor, action, change.clone(), clock));
            changes.fields.push(change);
            changes.newly_assigned = assignee;
            self.assignee = assignee;
        }

        if let Some(priority) = priority
            && priority != self.priority
        {
            let change = FieldChange::new(
                "priority",
                Some(self.priority.as_str().to_owned()),
                Some(priority.as_str().to_owned()),
            );
            entries.push(ActivityEntry::for_change(
                actor,
                ActivityAction::Updated,
                change.clone(),
                clock,
            ));
            changes.fields.push(change);
            self.priority = priority;
        }

        if let Some(labels) = labels.map(normalize_labels)
            && labels != self.labels
        {
            let change = FieldChange::new(
                "labels",
                Some(render_labels(&self.labels)),
                Some(render_labels(&labels)),
            );
            entries.push(ActivityEntry::for_change(
                actor,
                ActivityAction::Updated,
                change.clone(),
                clock,
            ));
            changes.fields.push(change);
            self.labels = labels;
        }

        if !changes.is_empty() {
            self.activity_log.extend(entries);
            self.touch(clock);
        }
        Ok(changes)
    }

    /// Appends a subtask to the checklist.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptySubtaskTitle`] when the title is blank.
    pub fn add_subtask(
        &mut self,
        title: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<SubtaskId, TaskDomainError> {
        let subtask = Subtask::new(title, clock)?;
        let id = subtask.id;
        self.subtasks.push(subtask);
        self.touch(clock);
        Ok(id)
    }

    /// Edits a subtask in place.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::SubtaskNotFound`] for unknown subtasks and
    /// [`TaskDomainError::EmptySubtaskTitle`] for blank titles.
    pub fn update_subtask(
        &mut self,
        subtask_id: SubtaskId,
        update: SubtaskUpdate,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        let title = update.title.map(normalize_subtask_title).transpose()?;
        let task_id = self.id;
        let subtask = self
            .subtasks
            .iter_mut()
            .find(|subtask| subtask.id == subtask_id)
            .ok_or(TaskDomainError::SubtaskNotFound {
                task_id,
                subtask_id,
            })?;
        if let Some(title) = title {
            subtask.title = title;
        }
        if let Some(completed) = update.completed {
            subtask.completed = completed;
        }
        self.touch(clock);
        Ok(())
    }

    /// Removes a subtask from the checklist.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::SubtaskNotFound`] for unknown subtasks.
    pub fn remove_subtask(
        &mut self,
        subtask_id: SubtaskId,
        clock: &impl Clock,
    ) -> Result<Subtask, TaskDomainError> {
        let index = self
            .subtasks
            .iter()
            .position(|subtask| subtask.id == subtask_id)
            .ok_or(TaskDomainError::SubtaskNotFound {
                task_id: self.id,
                subtask_id,
            })?;
        let removed = self.subtasks.remove(index);
        self.touch(clock);
        Ok(removed)
    }

    /// Returns the task relocated to `placement`. Used by stores when they
    /// assign the append slot on insert.
    #[must_use]
    pub(crate) fn placed_at(mut self, placement: Placement) -> Self {
        self.column = placement.column;
        self.position = placement.position;
        self
    }

    /// Moves the task to `placement` as part of a position transaction.
    pub(crate) fn relocate(&mut self, placement: Placement, at: DateTime<Utc>) {
        self.column = placement.column;
        self.position = placement.position;
        self.updated_at = at;
    }

    /// Overwrites the rank while a sibling shift is applied.
    pub(crate) const fn set_rank(&mut self, position: Position) {
        self.position = position;
    }

    /// Appends an activity entry that was persisted separately.
    pub(crate) fn push_activity(&mut self, entry: ActivityEntry) {
        self.activity_log.push(entry);
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}

fn normalize_title(title: &str) -> Result<String, TaskDomainError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TaskDomainError::EmptyTitle);
    }
    let actual = trimmed.chars().count();
    if actual > MAX_TITLE_LENGTH {
        return Err(TaskDomainError::TitleTooLong {
            max: MAX_TITLE_LENGTH,
            actual,
        });
    }
    Ok(trimmed.to_owned())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn normalize_labels(labels: impl IntoIterator<Item = String>) -> BTreeSet<String> {
    labels
        .into_iter()
        .map(|label| label.trim().to_owned())
        .filter(|label| !label.is_empty())
        .collect()
}

fn render_labels(labels: &BTreeSet<String>) -> String {
    labels.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}
