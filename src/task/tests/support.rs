//! Repository wrapper that counts position writes and injects failures.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::task::{
    adapters::memory::InMemoryTaskRepository,
    domain::{
        ActivityEntry, ColumnKey, Placement, Position, ProjectId, Task, TaskDomainError, TaskId,
    },
    ordering::PositionShift,
    ports::{PositionTransaction, TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};

/// In-memory repository that records how many position writes each
/// transaction issued and can fail the final placement write.
#[derive(Debug, Default)]
pub(super) struct InstrumentedRepository {
    inner: InMemoryTaskRepository,
    writes: Arc<AtomicUsize>,
    placement_failure: Mutex<Option<TaskRepositoryError>>,
}

impl InstrumentedRepository {
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// Position writes issued so far (shifts, placements, inserts, deletes).
    pub(super) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Makes the next `set_position` calls fail with `err`.
    pub(super) fn fail_placements_with(&self, err: TaskRepositoryError) {
        *self
            .placement_failure
            .lock()
            .expect("failure slot lock") = Some(err);
    }

    fn placement_failure(&self) -> Option<TaskRepositoryError> {
        self.placement_failure
            .lock()
            .expect("failure slot lock")
            .clone()
    }
}

struct InstrumentedTx<'a> {
    inner: &'a mut dyn PositionTransaction,
    writes: Arc<AtomicUsize>,
    placement_failure: Option<TaskRepositoryError>,
}

impl InstrumentedTx<'_> {
    fn count(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

impl PositionTransaction for InstrumentedTx<'_> {
    fn find(&mut self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        self.inner.find(id)
    }

    fn column_len(&mut self, key: &ColumnKey) -> TaskRepositoryResult<u32> {
        self.inner.column_len(key)
    }

    fn max_position(&mut self, key: &ColumnKey) -> TaskRepositoryResult<Option<Position>> {
        self.inner.max_position(key)
    }

    fn shift_positions(
        &mut self,
        project_id: ProjectId,
        shift: &PositionShift,
    ) -> TaskRepositoryResult<u64> {
        self.count();
        self.inner.shift_positions(project_id, shift)
    }

    fn set_position(
        &mut self,
        id: TaskId,
        placement: &Placement,
        updated_at: DateTime<Utc>,
    ) -> TaskRepositoryResult<()> {
        if let Some(err) = self.placement_failure.clone() {
            return Err(err);
        }
        self.count();
        self.inner.set_position(id, placement, updated_at)
    }

    fn insert(&mut self, task: &Task) -> TaskRepositoryResult<()> {
        self.count();
        self.inner.insert(task)
    }

    fn delete(&mut self, id: TaskId) -> TaskRepositoryResult<()> {
        self.count();
        self.inner.delete(id)
    }
}

#[async_trait]
impl TaskRepository for InstrumentedRepository {
    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        self.inner.find_by_id(id).await
    }

    async fn list_by_column(&self, key: &ColumnKey) -> TaskRepositoryResult<Vec<Task>> {
        self.inner.list_by_column(key).await
    }

    async fn list_by_project(&self, project_id: ProjectId) -> TaskRepositoryResult<Vec<Task>> {
        self.inner.list_by_project(project_id).await
    }

    async fn max_position(&self, key: &ColumnKey) -> TaskRepositoryResult<Option<Position>> {
        self.inner.max_position(key).await
    }

    async fn modify_content<T, F>(&self, id: TaskId, edit: F) -> TaskRepositoryResult<(Task, T)>
    where
        T: Send + 'static,
        F: FnOnce(&mut Task) -> Result<T, TaskDomainError> + Send + 'static,
    {
        self.inner.modify_content(id, edit).await
    }

    async fn append_activity(
        &self,
        id: TaskId,
        entry: &ActivityEntry,
    ) -> TaskRepositoryResult<()> {
        self.inner.append_activity(id, entry).await
    }

    async fn in_position_transaction<T, F>(
        &self,
        scope: Vec<ColumnKey>,
        work: F,
    ) -> TaskRepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn PositionTransaction) -> TaskRepositoryResult<T> + Send + 'static,
    {
        let writes = Arc::clone(&self.writes);
        let placement_failure = self.placement_failure();
        self.inner
            .in_position_transaction(scope, move |tx| {
                let mut instrumented = InstrumentedTx {
                    inner: tx,
                    writes,
                    placement_failure,
                };
                work(&mut instrumented)
            })
            .await
    }
}
