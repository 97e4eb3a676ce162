//! Shared world state for Kanban move BDD scenarios.

use std::collections::HashMap;
use std::sync::Arc;

use mockable::DefaultClock;
use rstest::fixture;
use taskboard::{
    realtime::{ProjectChannels, Subscription},
    task::{
        adapters::memory::{InMemoryProjectMembers, InMemoryTaskRepository, RecordingNotifier},
        domain::{BoardEvent, ColumnName, ProjectId, Task, TaskId, UserId},
        services::{BoardCollaborators, MoveOutcome, TaskBoardError, TaskBoardService, TaskFilter},
    },
};

/// Service type used by the BDD world.
pub type TestBoardService = TaskBoardService<InMemoryTaskRepository, DefaultClock>;

/// Scenario world for move behaviour tests.
pub struct KanbanWorld {
    pub service: TestBoardService,
    pub subscription: Subscription,
    pub project: ProjectId,
    pub user: UserId,
    pub tasks: HashMap<String, TaskId>,
    pub last_move: Option<Result<MoveOutcome, TaskBoardError>>,
    pub events: Vec<Arc<BoardEvent>>,
}

impl KanbanWorld {
    /// Creates a world with an empty board and one subscriber.
    #[must_use]
    pub fn new() -> Self {
        let channels = ProjectChannels::default();
        let project = ProjectId::new();
        let service = TaskBoardService::new(
            Arc::new(InMemoryTaskRepository::new()),
            Arc::new(DefaultClock),
            BoardCollaborators {
                authorizer: Arc::new(InMemoryProjectMembers::open()),
                notifier: Arc::new(RecordingNotifier::new()),
                publisher: Arc::new(channels.clone()),
            },
        );

        Self {
            service,
            subscription: channels.join(project),
            project,
            user: UserId::new(),
            tasks: HashMap::new(),
            last_move: None,
            events: Vec::new(),
        }
    }

    /// Looks up a task created by an earlier step.
    pub fn task_id(&self, title: &str) -> eyre::Result<TaskId> {
        self.tasks
            .get(title)
            .copied()
            .ok_or_else(|| eyre::eyre!("no task titled {title} in scenario world"))
    }

    /// Returns the titles of `column` in position order.
    pub fn column_titles(&self, column: &str) -> eyre::Result<Vec<String>> {
        let filter = TaskFilter {
            column: Some(ColumnName::new(column)?),
            ..TaskFilter::default()
        };
        let tasks = run_async(self.service.list_tasks(self.user, self.project, &filter))?;
        Ok(tasks.iter().map(Task::title).map(str::to_owned).collect())
    }
}

impl Default for KanbanWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> KanbanWorld {
    KanbanWorld::default()
}

/// Splits a comma-separated list of task titles.
pub fn titles(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
