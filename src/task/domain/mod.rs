//! Domain model for Kanban tasks.
//!
//! The task domain covers the task aggregate, its column placement and the
//! events broadcast when a task changes, while keeping all infrastructure
//! concerns outside of the domain boundary.

mod activity;
mod column;
mod error;
mod event;
mod ids;
mod priority;
mod subtask;
mod task;

pub use activity::{ActivityAction, ActivityEntry, FieldChange};
pub use column::{ColumnKey, ColumnName, Placement, Position};
pub use error::TaskDomainError;
pub use event::{BoardEvent, TaskDeleted, TaskMoved, TaskView};
pub use ids::{ProjectId, SubtaskId, TaskId, UserId};
pub use priority::Priority;
pub use subtask::{Subtask, completion_percentage};
pub use task::{
    MAX_TITLE_LENGTH, PersistedTaskData, SubtaskUpdate, Task, TaskChanges, TaskDraft, TaskUpdate,
};
