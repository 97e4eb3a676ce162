//! Diesel row models for task persistence.

use super::schema::tasks;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for task records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Owning project.
    pub project_id: uuid::Uuid,
    /// Title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Column label.
    pub column_name: String,
    /// Dense rank inside the column.
    pub position: i32,
    /// Optional assignee.
    pub assignee_id: Option<uuid::Uuid>,
    /// Reporter.
    pub reporter_id: uuid::Uuid,
    /// Priority label.
    pub priority: String,
    /// Subtask checklist JSON array.
    pub subtasks: Value,
    /// Label JSON array.
    pub labels: Value,
    /// Activity log JSON array.
    pub activity_log: Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert model for task records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Owning project.
    pub project_id: uuid::Uuid,
    /// Title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Column label.
    pub column_name: String,
    /// Dense rank inside the column.
    pub position: i32,
    /// Optional assignee.
    pub assignee_id: Option<uuid::Uuid>,
    /// Reporter.
    pub reporter_id: uuid::Uuid,
    /// Priority label.
    pub priority: String,
    /// Subtask checklist JSON array.
    pub subtasks: Value,
    /// Label JSON array.
    pub labels: Value,
    /// Activity log JSON array.
    pub activity_log: Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Content columns written by edits that leave placement alone.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(treat_none_as_null = true)]
pub struct TaskContentChangeset {
    /// Title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Optional assignee.
    pub assignee_id: Option<uuid::Uuid>,
    /// Priority label.
    pub priority: String,
    /// Subtask checklist JSON array.
    pub subtasks: Value,
    /// Label JSON array.
    pub labels: Value,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
