//! Board orchestration: create, edit, move and delete tasks.
//!
//! [`TaskBoardService`] is the only writer of the position index. Position
//! writes run under the in-process [`ColumnLocks`] and inside one store
//! transaction; committed changes are published while the column guards are
//! still held so that subscribers see events in commit order.

use std::sync::Arc;
use std::time::Duration;

use mockable::Clock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{
    column_locks::{ColumnGuard, ColumnLocks},
    error::{TaskBoardError, TaskBoardResult},
};
use crate::task::{
    domain::{
        ActivityAction, ActivityEntry, BoardEvent, ColumnKey, ColumnName, FieldChange, Placement,
        Position, Priority, ProjectId, SubtaskId, SubtaskUpdate, Task, TaskDomainError,
        TaskDraft, TaskId, TaskUpdate, UserId,
    },
    ordering::{MovePlan, plan_move, plan_removal},
    ports::{
        AssignmentNotification, AssignmentNotifier, BoardEventPublisher, PositionTransaction,
        TaskAuthorizer, TaskRepository, TaskRepositoryError, TaskRepositoryResult,
    },
};

/// Attempts made when a task changes column between the unlocked read and
/// the locked read.
const MAX_LOCATE_ATTEMPTS: usize = 3;

/// Bound on waiting for column locks unless configured otherwise.
pub const DEFAULT_MOVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Requested destination of a move, as received from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveTaskRequest {
    column: String,
    position: i64,
}

impl MoveTaskRequest {
    /// Creates a move request. Both values are validated by the service.
    #[must_use]
    pub fn new(column: impl Into<String>, position: i64) -> Self {
        Self {
            column: column.into(),
            position,
        }
    }
}

/// Result of a move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    /// The task as stored after the call.
    pub task: Task,
    /// `false` when the request named the task's current placement.
    pub changed: bool,
}

/// Optional filters for listing a project's tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Only tasks in this column.
    pub column: Option<ColumnName>,
    /// Only tasks with this priority.
    pub priority: Option<Priority>,
    /// Only tasks assigned to this user.
    pub assignee: Option<UserId>,
}

impl TaskFilter {
    /// Returns `true` when `task` passes every set filter.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.column.as_ref().is_none_or(|column| task.column() == column)
            && self.priority.is_none_or(|priority| task.priority() == priority)
            && self
                .assignee
                .is_none_or(|assignee| task.assignee() == Some(assignee))
    }
}

/// External collaborators consumed by the board service.
#[derive(Clone)]
pub struct BoardCollaborators {
    /// Permission checks.
    pub authorizer: Arc<dyn TaskAuthorizer>,
    /// Assignment notice dispatch.
    pub notifier: Arc<dyn AssignmentNotifier>,
    /// Fan-out of committed events.
    pub publisher: Arc<dyn BoardEventPublisher>,
}

/// Task board orchestration service.
pub struct TaskBoardService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    collaborators: BoardCollaborators,
    locks: Arc<ColumnLocks>,
    move_timeout: Duration,
}

impl<R, C> Clone for TaskBoardService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            clock: Arc::clone(&self.clock),
            collaborators: self.collaborators.clone(),
            locks: Arc::clone(&self.locks),
            move_timeout: self.move_timeout,
        }
    }
}

enum MoveAttempt {
    Stale(Task),
    Unchanged(Task),
    Moved { task: Task, from: Placement },
}

enum RemoveAttempt {
    Stale(Task),
    Removed(Task),
}

/// Locked read-plan-write sequence of one move attempt.
struct MoveWork {
    task_id: TaskId,
    source: ColumnKey,
    destination: ColumnKey,
    requested: Position,
    at: chrono::DateTime<chrono::Utc>,
}

impl MoveWork {
    fn run(self, tx: &mut dyn PositionTransaction) -> TaskRepositoryResult<MoveAttempt> {
        let current = tx
            .find(self.task_id)?
            .ok_or(TaskRepositoryError::NotFound(self.task_id))?;
        if current.column_key() != self.source {
            return Ok(MoveAttempt::Stale(current));
        }

        let destination_len = tx.column_len(&self.destination)?;
        let from = current.placement();
        match plan_move(
            &from,
            &self.destination.column,
            self.requested,
            destination_len,
        ) {
            MovePlan::Unchanged => Ok(MoveAttempt::Unchanged(current)),
            MovePlan::Reposition { shifts, target } => {
                for shift in &shifts {
                    tx.shift_positions(self.source.project_id, shift)?;
                }
                tx.set_position(self.task_id, &target, self.at)?;
                let moved = tx
                    .find(self.task_id)?
                    .ok_or(TaskRepositoryError::NotFound(self.task_id))?;
                Ok(MoveAttempt::Moved { task: moved, from })
            }
        }
    }
}

impl<R, C> TaskBoardService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a board service with the default move timeout.
    #[must_use]
    pub fn new(repository: Arc<R>, clock: Arc<C>, collaborators: BoardCollaborators) -> Self {
        Self {
            repository,
            clock,
            collaborators,
            locks: Arc::new(ColumnLocks::new()),
            move_timeout: DEFAULT_MOVE_TIMEOUT,
        }
    }

    /// Sets how long position writes wait for column locks.
    #[must_use]
    pub const fn with_move_timeout(mut self, move_timeout: Duration) -> Self {
        self.move_timeout = move_timeout;
        self
    }

    /// Shares `locks` with other services writing the same store from this
    /// process.
    #[must_use]
    pub fn with_column_locks(mut self, locks: Arc<ColumnLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Returns the underlying repository.
    #[must_use]
    pub const fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Creates a task at the end of its column.
    ///
    /// # Errors
    ///
    /// Returns [`TaskBoardError::InvalidArgument`] for invalid drafts,
    /// [`TaskBoardError::Forbidden`] when the reporter may not use the
    /// project and [`TaskBoardError::Conflict`] when the column lock times
    /// out.
    pub async fn create_task(&self, draft: TaskDraft) -> TaskBoardResult<Task> {
        let reporter = draft.reporter();
        self.ensure_project_access(reporter, draft.project_id())
            .await?;
        let task = Task::new(draft, &*self.clock)?;
        let key = task.column_key();

        let guard = self.lock_columns([key.clone()]).await?;
        let created = self
            .repository
            .in_position_transaction(vec![key.clone()], move |tx| {
                let slot = tx
                    .max_position(&key)?
                    .map_or(Position::ZERO, Position::next);
                let placed = task.placed_at(Placement::new(key.column.clone(), slot));
                tx.insert(&placed)?;
                Ok(placed)
            })
            .await?;
        self.broadcast(created.project_id(), BoardEvent::created(&created));
        drop(guard);

        info!(
            task_id = %created.id(),
            project_id = %created.project_id(),
            column = %created.column(),
            position = %created.position(),
            "task created"
        );
        if let Some(assignee) = created.assignee()
            && assignee != reporter
        {
            self.notify_assignment(&created, assignee, reporter).await;
        }
        Ok(created)
    }

    /// Returns one task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskBoardError::TaskNotFound`] or
    /// [`TaskBoardError::Forbidden`].
    pub async fn get_task(&self, actor: UserId, task_id: TaskId) -> TaskBoardResult<Task> {
        let task = self.load(task_id).await?;
        self.ensure_project_access(actor, task.project_id()).await?;
        Ok(task)
    }

    /// Lists a project's tasks ordered by column, then position.
    ///
    /// # Errors
    ///
    /// Returns [`TaskBoardError::Forbidden`] when the actor may not view the
    /// project.
    pub async fn list_tasks(
        &self,
        actor: UserId,
        project_id: ProjectId,
        filter: &TaskFilter,
    ) -> TaskBoardResult<Vec<Task>> {
        self.ensure_project_access(actor, project_id).await?;
        let tasks = self.repository.list_by_project(project_id).await?;
        Ok(tasks.into_iter().filter(|task| filter.matches(task)).collect())
    }

    /// Returns a task's activity log, newest entry first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskBoardError::TaskNotFound`] or
    /// [`TaskBoardError::Forbidden`].
    pub async fn activity(
        &self,
        actor: UserId,
        task_id: TaskId,
    ) -> TaskBoardResult<Vec<ActivityEntry>> {
        let task = self.get_task(actor, task_id).await?;
        Ok(task.activity_log().iter().rev().cloned().collect())
    }

    /// Edits content fields. Placement is untouched and no column lock is
    /// taken.
    ///
    /// # Errors
    ///
    /// Returns [`TaskBoardError::TaskNotFound`],
    /// [`TaskBoardError::Forbidden`] or
    /// [`TaskBoardError::InvalidArgument`].
    pub async fn update_task(
        &self,
        actor: UserId,
        task_id: TaskId,
        update: TaskUpdate,
    ) -> TaskBoardResult<Task> {
        let current = self.load(task_id).await?;
        self.ensure_can_modify(actor, &current).await?;
        let clock = Arc::clone(&self.clock);
        let (stored, changes) = self
            .repository
            .modify_content(task_id, move |task| {
                task.apply_update(update, actor, &*clock)
            })
            .await?;
        if changes.is_empty() {
            return Ok(stored);
        }

        self.broadcast(stored.project_id(), BoardEvent::updated(&stored));
        debug!(task_id = %task_id, fields = changes.fields.len(), "task updated");
        if let Some(assignee) = changes.newly_assigned
            && assignee != actor
        {
            self.notify_assignment(&stored, assignee, actor).await;
        }
        Ok(stored)
    }

    /// Moves a task to `request.column` at `request.position`.
    ///
    /// Indices past the end of the destination are clamped. Moving a task
    /// onto its current placement writes nothing and publishes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`TaskBoardError::InvalidArgument`] for a blank column or a
    /// negative position, [`TaskBoardError::TaskNotFound`],
    /// [`TaskBoardError::Forbidden`], and [`TaskBoardError::Conflict`] when
    /// locks time out or the store aborts the transaction. No position is
    /// changed on error.
    pub async fn move_task(
        &self,
        actor: UserId,
        task_id: TaskId,
        request: MoveTaskRequest,
    ) -> TaskBoardResult<MoveOutcome> {
        let target_column = ColumnName::new(request.column)?;
        let requested = Position::from_index(request.position)?;
        let mut located = self.load(task_id).await?;
        self.ensure_can_modify(actor, &located).await?;
        let project_id = located.project_id();
        let destination = ColumnKey::new(project_id, target_column);

        for attempt in 1..=MAX_LOCATE_ATTEMPTS {
            let source = located.column_key();
            let guard = self
                .lock_columns([source.clone(), destination.clone()])
                .await?;
            let work = MoveWork {
                task_id,
                source: source.clone(),
                destination: destination.clone(),
                requested,
                at: self.clock.utc(),
            };
            let attempted = self
                .repository
                .in_position_transaction(vec![source, destination.clone()], move |tx| {
                    work.run(tx)
                })
                .await?;

            match attempted {
                MoveAttempt::Stale(current) => {
                    drop(guard);
                    debug!(task_id = %task_id, attempt, "task changed column before lock");
                    located = current;
                }
                MoveAttempt::Unchanged(current) => {
                    drop(guard);
                    debug!(task_id = %task_id, "move targets current placement");
                    return Ok(MoveOutcome {
                        task: current,
                        changed: false,
                    });
                }
                MoveAttempt::Moved { task, from } => {
                    self.broadcast(project_id, BoardEvent::moved(&task));
                    drop(guard);
                    info!(
                        task_id = %task_id,
                        project_id = %project_id,
                        from = %from,
                        to = %task.placement(),
                        "task moved"
                    );
                    let recorded = self.record_move(actor, task, &from).await;
                    return Ok(MoveOutcome {
                        task: recorded,
                        changed: true,
                    });
                }
            }
        }
        Err(TaskBoardError::Conflict(format!(
            "task {task_id} kept changing column while the move waited"
        )))
    }

    /// Deletes a task and closes the gap it leaves in its column.
    ///
    /// # Errors
    ///
    /// Returns [`TaskBoardError::TaskNotFound`],
    /// [`TaskBoardError::Forbidden`] or [`TaskBoardError::Conflict`].
    pub async fn delete_task(&self, actor: UserId, task_id: TaskId) -> TaskBoardResult<()> {
        let mut located = self.load(task_id).await?;
        self.ensure_can_modify(actor, &located).await?;

        for attempt in 1..=MAX_LOCATE_ATTEMPTS {
            let key = located.column_key();
            let guard = self.lock_columns([key.clone()]).await?;
            let expected = key.clone();
            let attempted = self
                .repository
                .in_position_transaction(vec![key], move |tx| {
                    let current = tx
                        .find(task_id)?
                        .ok_or(TaskRepositoryError::NotFound(task_id))?;
                    if current.column_key() != expected {
                        return Ok(RemoveAttempt::Stale(current));
                    }
                    tx.delete(task_id)?;
                    tx.shift_positions(current.project_id(), &plan_removal(&current.placement()))?;
                    Ok(RemoveAttempt::Removed(current))
                })
                .await?;

            match attempted {
                RemoveAttempt::Stale(current) => {
                    drop(guard);
                    debug!(task_id = %task_id, attempt, "task changed column before lock");
                    located = current;
                }
                RemoveAttempt::Removed(removed) => {
                    self.broadcast(removed.project_id(), BoardEvent::deleted(task_id));
                    drop(guard);
                    info!(
                        task_id = %task_id,
                        project_id = %removed.project_id(),
                        from = %removed.placement(),
                        "task deleted"
                    );
                    return Ok(());
                }
            }
        }
        Err(TaskBoardError::Conflict(format!(
            "task {task_id} kept changing column while the delete waited"
        )))
    }

    /// Appends a subtask.
    ///
    /// # Errors
    ///
    /// Returns [`TaskBoardError::InvalidArgument`] for blank titles, plus the
    /// errors of [`Self::update_task`].
    pub async fn add_subtask(
        &self,
        actor: UserId,
        task_id: TaskId,
        title: impl Into<String> + Send,
    ) -> TaskBoardResult<Task> {
        let current = self.load(task_id).await?;
        self.ensure_can_modify(actor, &current).await?;
        let clock = Arc::clone(&self.clock);
        let subtask_title: String = title.into();
        self.store_content(task_id, move |task| task.add_subtask(subtask_title, &*clock))
            .await
    }

    /// Edits a subtask's title or completion flag.
    ///
    /// # Errors
    ///
    /// Returns [`TaskBoardError::SubtaskNotFound`] for unknown subtasks, plus
    /// the errors of [`Self::update_task`].
    pub async fn update_subtask(
        &self,
        actor: UserId,
        task_id: TaskId,
        subtask_id: SubtaskId,
        update: SubtaskUpdate,
    ) -> TaskBoardResult<Task> {
        let current = self.load(task_id).await?;
        self.ensure_can_modify(actor, &current).await?;
        let clock = Arc::clone(&self.clock);
        self.store_content(task_id, move |task| {
            task.update_subtask(subtask_id, update, &*clock)
        })
        .await
    }

    /// Removes a subtask.
    ///
    /// # Errors
    ///
    /// Returns [`TaskBoardError::SubtaskNotFound`] for unknown subtasks, plus
    /// the errors of [`Self::update_task`].
    pub async fn delete_subtask(
        &self,
        actor: UserId,
        task_id: TaskId,
        subtask_id: SubtaskId,
    ) -> TaskBoardResult<Task> {
        let current = self.load(task_id).await?;
        self.ensure_can_modify(actor, &current).await?;
        let clock = Arc::clone(&self.clock);
        self.store_content(task_id, move |task| task.remove_subtask(subtask_id, &*clock))
            .await
    }

    /// Checks that `actor` may view `project_id`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskBoardError::Forbidden`] on denial and
    /// [`TaskBoardError::Authorization`] when the check itself fails.
    pub async fn ensure_project_access(
        &self,
        actor: UserId,
        project_id: ProjectId,
    ) -> TaskBoardResult<()> {
        if self
            .collaborators
            .authorizer
            .can_access_project(actor, project_id)
            .await?
        {
            Ok(())
        } else {
            Err(TaskBoardError::Forbidden)
        }
    }

    async fn ensure_can_modify(&self, actor: UserId, task: &Task) -> TaskBoardResult<()> {
        if self
            .collaborators
            .authorizer
            .can_modify_task(actor, task.id(), task.project_id())
            .await?
        {
            Ok(())
        } else {
            Err(TaskBoardError::Forbidden)
        }
    }

    async fn load(&self, task_id: TaskId) -> TaskBoardResult<Task> {
        self.repository
            .find_by_id(task_id)
            .await?
            .ok_or(TaskBoardError::TaskNotFound(task_id))
    }

    async fn lock_columns(
        &self,
        keys: impl IntoIterator<Item = ColumnKey> + Send,
    ) -> TaskBoardResult<ColumnGuard> {
        let deadline = Instant::now() + self.move_timeout;
        Ok(self.locks.acquire(keys, deadline).await?)
    }

    /// Applies a content edit to the stored task and publishes
    /// `task-updated`.
    async fn store_content<T, F>(&self, task_id: TaskId, edit: F) -> TaskBoardResult<Task>
    where
        T: Send + 'static,
        F: FnOnce(&mut Task) -> Result<T, TaskDomainError> + Send + 'static,
    {
        let (stored, _) = self.repository.modify_content(task_id, edit).await?;
        self.broadcast(stored.project_id(), BoardEvent::updated(&stored));
        Ok(stored)
    }

    async fn record_move(&self, actor: UserId, mut task: Task, from: &Placement) -> Task {
        let change = if from.column == *task.column() {
            FieldChange::new(
                "position",
                Some(from.position.to_string()),
                Some(task.position().to_string()),
            )
        } else {
            FieldChange::new(
                "column",
                Some(from.column.to_string()),
                Some(task.column().to_string()),
            )
        };
        let entry = ActivityEntry::for_change(actor, ActivityAction::Moved, change, &*self.clock);
        match self.repository.append_activity(task.id(), &entry).await {
            Ok(()) => task.push_activity(entry),
            Err(err) => warn!(
                task_id = %task.id(),
                error = %err,
                "failed to record move in activity log"
            ),
        }
        task
    }

    async fn notify_assignment(&self, task: &Task, assignee: UserId, assigned_by: UserId) {
        let notification = AssignmentNotification {
            task_id: task.id(),
            project_id: task.project_id(),
            title: task.title().to_owned(),
            assignee,
            assigned_by,
        };
        if let Err(err) = self.collaborators.notifier.notify(&notification).await {
            warn!(
                task_id = %task.id(),
                assignee = %assignee,
                error = %err,
                "assignment notification failed"
            );
        }
    }

    fn broadcast(&self, project_id: ProjectId, event: BoardEvent) {
        let name = event.name();
        let task_id = event.task_id();
        let report = self.collaborators.publisher.publish(project_id, event);
        debug!(
            event = name,
            task_id = %task_id,
            project_id = %project_id,
            delivered = report.delivered,
            failed = report.failed,
            "board event published"
        );
    }
}
