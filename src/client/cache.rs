//! Client-side board cache with speculative moves.
//!
//! A drag-and-drop is applied locally with [`BoardCache::begin_move`] before
//! the server answers. The pending move is then settled exactly once:
//! [`BoardCache::confirm`] with the server's answer, or
//! [`BoardCache::rollback`] when the request failed. The authoritative
//! `task-moved` broadcast may overtake the response; whichever arrives first
//! reconciles the cache and the other merges as a no-op.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::task::{
    domain::{BoardEvent, ColumnName, Placement, Position, ProjectId, TaskId, TaskView},
    ordering::{MovePlan, plan_move},
};

/// Handle of one speculative move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PendingMoveId(u64);

impl fmt::Display for PendingMoveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pending-move-{}", self.0)
    }
}

/// Lifecycle of a speculative move. A task with no pending move is idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PendingMoveState {
    /// Applied locally, waiting for the server.
    Optimistic,
    /// The server's placement has been merged.
    Confirmed,
    /// The request failed and the prior order was restored.
    RolledBack,
}

/// Errors raised by cache operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The task is not in the cache.
    #[error("task {0} is not on the cached board")]
    UnknownTask(TaskId),
    /// The pending move was already settled or abandoned.
    #[error("{0} is not pending")]
    UnknownPendingMove(PendingMoveId),
    /// Another speculative move of the same task is still unresolved.
    #[error("task {0} already has a move in flight")]
    MoveInFlight(TaskId),
    /// The task belongs to a different project.
    #[error("task {0} belongs to another project")]
    ForeignTask(TaskId),
}

#[derive(Debug, Clone)]
struct PendingMove {
    task_id: TaskId,
    origin: Placement,
    snapshot: Vec<(TaskId, Placement)>,
    generation: u64,
    state: PendingMoveState,
}

/// In-memory copy of one project's board.
#[derive(Debug, Clone)]
pub struct BoardCache {
    project_id: ProjectId,
    tasks: HashMap<TaskId, TaskView>,
    pending: HashMap<PendingMoveId, PendingMove>,
    next_pending: u64,
    generation: u64,
}

fn placement_of(view: &TaskView) -> Placement {
    Placement::new(view.column.clone(), view.position)
}

impl BoardCache {
    /// Creates an empty cache for `project_id`.
    #[must_use]
    pub fn new(project_id: ProjectId) -> Self {
        Self {
            project_id,
            tasks: HashMap::new(),
            pending: HashMap::new(),
            next_pending: 1,
            generation: 0,
        }
    }

    /// Creates a cache from a fetched board listing. Tasks of other projects
    /// are skipped.
    #[must_use]
    pub fn from_tasks(project_id: ProjectId, tasks: impl IntoIterator<Item = TaskView>) -> Self {
        let mut cache = Self::new(project_id);
        cache.tasks = tasks
            .into_iter()
            .filter(|view| view.project == project_id)
            .map(|view| (view.id, view))
            .collect();
        cache
    }

    /// Returns the cached project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns a cached task.
    #[must_use]
    pub fn get(&self, task_id: TaskId) -> Option<&TaskView> {
        self.tasks.get(&task_id)
    }

    /// Returns the task identifiers of `column` in display order.
    #[must_use]
    pub fn column(&self, column: &ColumnName) -> Vec<TaskId> {
        let mut members: Vec<&TaskView> = self
            .tasks
            .values()
            .filter(|view| view.column == *column)
            .collect();
        members.sort_by_key(|view| (view.position, view.id));
        members.into_iter().map(|view| view.id).collect()
    }

    /// Returns the state of a pending move, or `None` once it was settled
    /// through [`Self::confirm`] or [`Self::rollback`], or abandoned.
    #[must_use]
    pub fn pending_state(&self, id: PendingMoveId) -> Option<PendingMoveState> {
        self.pending.get(&id).map(|pending| pending.state)
    }

    /// Applies a move locally and starts tracking it.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::UnknownTask`] when the task is not cached and
    /// [`CacheError::MoveInFlight`] when an earlier move of the task is still
    /// unresolved.
    pub fn begin_move(
        &mut self,
        task_id: TaskId,
        column: ColumnName,
        position: Position,
    ) -> Result<PendingMoveId, CacheError> {
        let origin = self
            .tasks
            .get(&task_id)
            .map(placement_of)
            .ok_or(CacheError::UnknownTask(task_id))?;
        let in_flight = self.pending.values().any(|pending| {
            pending.task_id == task_id && pending.state == PendingMoveState::Optimistic
        });
        if in_flight {
            return Err(CacheError::MoveInFlight(task_id));
        }

        let snapshot = self.snapshot(&[&origin.column, &column]);
        self.relocate(task_id, &column, position);

        let id = PendingMoveId(self.next_pending);
        self.next_pending += 1;
        self.pending.insert(
            id,
            PendingMove {
                task_id,
                origin,
                snapshot,
                generation: self.generation,
                state: PendingMoveState::Optimistic,
            },
        );
        Ok(id)
    }

    /// Merges the server's answer to a pending move and stops tracking it.
    ///
    /// Returns [`PendingMoveState::Confirmed`]. When a `task-moved` broadcast
    /// already reconciled the task, the cache holds state at least as new as
    /// the answer, so nothing is merged.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ForeignTask`] when the answer concerns another
    /// project and [`CacheError::UnknownPendingMove`] for settled or
    /// abandoned moves. Neither case touches the board; later broadcasts
    /// reconcile abandoned moves.
    pub fn confirm(
        &mut self,
        id: PendingMoveId,
        authoritative: &TaskView,
    ) -> Result<PendingMoveState, CacheError> {
        if authoritative.project != self.project_id {
            return Err(CacheError::ForeignTask(authoritative.id));
        }
        let pending = self
            .pending
            .remove(&id)
            .ok_or(CacheError::UnknownPendingMove(id))?;
        if pending.state == PendingMoveState::Optimistic {
            self.merge_placement(authoritative.id, &placement_of(authoritative));
        }
        Ok(PendingMoveState::Confirmed)
    }

    /// Reverts a failed move and stops tracking it.
    ///
    /// Restores the exact prior order when no remote event was merged since
    /// the move began; otherwise moves the task back to its original slot
    /// on top of the newer state. A move the broadcast already confirmed is
    /// left as is and reported as [`PendingMoveState::Confirmed`].
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::UnknownPendingMove`] for settled or abandoned
    /// moves.
    pub fn rollback(&mut self, id: PendingMoveId) -> Result<PendingMoveState, CacheError> {
        let pending = self
            .pending
            .remove(&id)
            .ok_or(CacheError::UnknownPendingMove(id))?;
        if pending.state == PendingMoveState::Confirmed {
            return Ok(PendingMoveState::Confirmed);
        }

        if pending.generation == self.generation {
            for (task_id, placement) in &pending.snapshot {
                if let Some(view) = self.tasks.get_mut(task_id) {
                    view.column = placement.column.clone();
                    view.position = placement.position;
                }
            }
        } else if self.tasks.contains_key(&pending.task_id) {
            self.relocate(
                pending.task_id,
                &pending.origin.column,
                pending.origin.position,
            );
        }
        Ok(PendingMoveState::RolledBack)
    }

    /// Stops tracking a pending move without touching the board, e.g. when
    /// the view that started it goes away. Later broadcasts still reconcile
    /// the task.
    pub fn abandon(&mut self, id: PendingMoveId) -> bool {
        self.pending.remove(&id).is_some()
    }

    /// Merges one broadcast event. Returns `false` when the event was
    /// ignored (other project or unknown task).
    pub fn apply_event(&mut self, event: &BoardEvent) -> bool {
        let applied = match event {
            BoardEvent::TaskCreated(view) => self.upsert(view),
            BoardEvent::TaskUpdated(view) => self.merge_content(view),
            BoardEvent::TaskMoved(moved) => {
                let placement = Placement::new(moved.column.clone(), moved.position);
                let merged = self.merge_placement(moved.task_id, &placement);
                if merged {
                    self.mark_confirmed(moved.task_id);
                }
                merged
            }
            BoardEvent::TaskDeleted(deleted) => self.remove(deleted.task_id),
        };
        if applied {
            self.generation += 1;
        }
        applied
    }

    fn upsert(&mut self, view: &TaskView) -> bool {
        if view.project != self.project_id {
            return false;
        }
        let column = view.column.clone();
        self.tasks.insert(view.id, view.clone());
        self.repack(&column);
        true
    }

    /// Takes content fields from an update. The cached placement is kept
    /// because placements only change through `task-moved`.
    fn merge_content(&mut self, view: &TaskView) -> bool {
        if view.project != self.project_id {
            return false;
        }
        match self.tasks.get_mut(&view.id) {
            Some(cached) => {
                let placement = placement_of(cached);
                *cached = view.clone();
                cached.column = placement.column;
                cached.position = placement.position;
                true
            }
            None => self.upsert(view),
        }
    }

    fn remove(&mut self, task_id: TaskId) -> bool {
        let Some(removed) = self.tasks.remove(&task_id) else {
            return false;
        };
        self.repack(&removed.column);
        true
    }

    fn merge_placement(&mut self, task_id: TaskId, placement: &Placement) -> bool {
        if !self.tasks.contains_key(&task_id) {
            return false;
        }
        self.relocate(task_id, &placement.column, placement.position);
        true
    }

    fn mark_confirmed(&mut self, task_id: TaskId) {
        for pending in self.pending.values_mut() {
            if pending.task_id == task_id && pending.state == PendingMoveState::Optimistic {
                pending.state = PendingMoveState::Confirmed;
            }
        }
    }

    fn snapshot(&self, columns: &[&ColumnName]) -> Vec<(TaskId, Placement)> {
        self.tasks
            .values()
            .filter(|view| columns.contains(&&view.column))
            .map(|view| (view.id, placement_of(view)))
            .collect()
    }

    /// Runs the move algorithm against the cached columns.
    fn relocate(&mut self, task_id: TaskId, column: &ColumnName, requested: Position) {
        let Some(current) = self.tasks.get(&task_id).map(placement_of) else {
            return;
        };
        let occupied = self
            .tasks
            .values()
            .filter(|view| view.column == *column)
            .count();
        let destination_len = u32::try_from(occupied).unwrap_or(u32::MAX);

        let MovePlan::Reposition { shifts, target } =
            plan_move(&current, column, requested, destination_len)
        else {
            return;
        };
        for view in self.tasks.values_mut().filter(|view| view.id != task_id) {
            if let Some(shift) = shifts
                .iter()
                .find(|shift| shift.covers(&view.column, view.position))
                && let Some(shifted) = shift.apply(view.position)
            {
                view.position = shifted;
            }
        }
        if let Some(view) = self.tasks.get_mut(&task_id) {
            view.column = target.column.clone();
            view.position = target.position;
        }
        self.repack(&current.column);
        self.repack(&target.column);
    }

    /// Renumbers a column densely in its current display order.
    fn repack(&mut self, column: &ColumnName) {
        for (rank, task_id) in self.column(column).into_iter().enumerate() {
            if let Some(view) = self.tasks.get_mut(&task_id) {
                view.position = Position::new(u32::try_from(rank).unwrap_or(u32::MAX));
            }
        }
    }
}
