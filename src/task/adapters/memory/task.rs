//! In-memory task repository.
//!
//! Position transactions run against a working copy of the task map under
//! the write lock; the copy replaces the live map only when the work
//! succeeds, so a failed move leaves every position untouched.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::task::{
    domain::{
        ActivityEntry, ColumnKey, Placement, Position, ProjectId, Task, TaskDomainError, TaskId,
    },
    ordering::PositionShift,
    ports::{PositionTransaction, TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};

/// Thread-safe in-memory task repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    state: Arc<RwLock<InMemoryTaskState>>,
}

#[derive(Debug, Default)]
struct InMemoryTaskState {
    tasks: HashMap<TaskId, Task>,
}

impl InMemoryTaskRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn store_error(err: impl std::fmt::Display) -> TaskRepositoryError {
    TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

fn in_column<'a>(
    tasks: &'a HashMap<TaskId, Task>,
    key: &'a ColumnKey,
) -> impl Iterator<Item = &'a Task> + 'a {
    tasks
        .values()
        .filter(move |task| task.project_id() == key.project_id && *task.column() == key.column)
}

/// Position transaction over a working copy of the task map.
struct InMemoryTransaction<'a> {
    tasks: &'a mut HashMap<TaskId, Task>,
}

impl PositionTransaction for InMemoryTransaction<'_> {
    fn find(&mut self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        Ok(self.tasks.get(&id).cloned())
    }

    fn column_len(&mut self, key: &ColumnKey) -> TaskRepositoryResult<u32> {
        let count = in_column(self.tasks, key).count();
        u32::try_from(count).map_err(TaskRepositoryError::persistence)
    }

    fn max_position(&mut self, key: &ColumnKey) -> TaskRepositoryResult<Option<Position>> {
        Ok(in_column(self.tasks, key).map(Task::position).max())
    }

    fn shift_positions(
        &mut self,
        project_id: ProjectId,
        shift: &PositionShift,
    ) -> TaskRepositoryResult<u64> {
        let mut affected = 0_u64;
        for task in self.tasks.values_mut() {
            if task.project_id() != project_id || !shift.covers(task.column(), task.position()) {
                continue;
            }
            let shifted = shift.apply(task.position()).ok_or_else(|| {
                store_error(format!(
                    "position underflow in column '{}' at {}",
                    shift.column,
                    task.position()
                ))
            })?;
            task.set_rank(shifted);
            affected += 1;
        }
        Ok(affected)
    }

    fn set_position(
        &mut self,
        id: TaskId,
        placement: &Placement,
        updated_at: DateTime<Utc>,
    ) -> TaskRepositoryResult<()> {
        let task = self
            .tasks
            .get_mut(&id)
            .ok_or(TaskRepositoryError::NotFound(id))?;
        task.relocate(placement.clone(), updated_at);
        Ok(())
    }

    fn insert(&mut self, task: &Task) -> TaskRepositoryResult<()> {
        if self.tasks.contains_key(&task.id()) {
            return Err(TaskRepositoryError::DuplicateTask(task.id()));
        }
        self.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    fn delete(&mut self, id: TaskId) -> TaskRepositoryResult<()> {
        self.tasks
            .remove(&id)
            .map(|_| ())
            .ok_or(TaskRepositoryError::NotFound(id))
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        let state = self.state.read().map_err(store_error)?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn list_by_column(&self, key: &ColumnKey) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.state.read().map_err(store_error)?;
        let mut tasks: Vec<Task> = in_column(&state.tasks, key).cloned().collect();
        tasks.sort_by_key(Task::position);
        Ok(tasks)
    }

    async fn list_by_project(&self, project_id: ProjectId) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.state.read().map_err(store_error)?;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| task.project_id() == project_id)
            .cloned()
            .collect();
        tasks.sort_by(|left, right| {
            left.column()
                .cmp(right.column())
                .then(left.position().cmp(&right.position()))
        });
        Ok(tasks)
    }

    async fn max_position(&self, key: &ColumnKey) -> TaskRepositoryResult<Option<Position>> {
        let state = self.state.read().map_err(store_error)?;
        Ok(in_column(&state.tasks, key).map(Task::position).max())
    }

    async fn modify_content<T, F>(&self, id: TaskId, edit: F) -> TaskRepositoryResult<(Task, T)>
    where
        T: Send + 'static,
        F: FnOnce(&mut Task) -> Result<T, TaskDomainError> + Send + 'static,
    {
        let mut state = self.state.write().map_err(store_error)?;
        let stored = state
            .tasks
            .get_mut(&id)
            .ok_or(TaskRepositoryError::NotFound(id))?;
        let placement = stored.placement();
        let mut edited = stored.clone();
        let outcome = edit(&mut edited).map_err(TaskRepositoryError::Rejected)?;
        *stored = edited.placed_at(placement);
        Ok((stored.clone(), outcome))
    }

    async fn append_activity(
        &self,
        id: TaskId,
        entry: &ActivityEntry,
    ) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(store_error)?;
        let task = state
            .tasks
            .get_mut(&id)
            .ok_or(TaskRepositoryError::NotFound(id))?;
        task.push_activity(entry.clone());
        Ok(())
    }

    async fn in_position_transaction<T, F>(
        &self,
        _scope: Vec<ColumnKey>,
        work: F,
    ) -> TaskRepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn PositionTransaction) -> TaskRepositoryResult<T> + Send + 'static,
    {
        // The write lock serialises every transaction, whatever its scope.
        let mut state = self.state.write().map_err(store_error)?;
        let mut working = state.tasks.clone();
        let result = work(&mut InMemoryTransaction {
            tasks: &mut working,
        });
        if result.is_ok() {
            state.tasks = working;
        }
        result
    }
}
