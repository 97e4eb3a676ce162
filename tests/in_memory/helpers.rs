//! Shared test helpers for in-memory board integration tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use eyre::{WrapErr, eyre};
use mockable::DefaultClock;
use rstest::fixture;
use taskboard::{
    realtime::ProjectChannels,
    task::{
        adapters::memory::{InMemoryProjectMembers, InMemoryTaskRepository, RecordingNotifier},
        domain::{ColumnName, ProjectId, Task, TaskDraft, TaskId, UserId},
        ordering::check_dense,
        ports::TaskRepository,
        services::{BoardCollaborators, MoveTaskRequest, TaskBoardService, TaskFilter},
    },
};

/// Service type used by the in-memory integration tests.
pub type TestService = TaskBoardService<InMemoryTaskRepository, DefaultClock>;

/// One project board backed by the in-memory store.
#[derive(Clone)]
pub struct TestBoard {
    pub service: TestService,
    pub repository: Arc<InMemoryTaskRepository>,
    pub channels: ProjectChannels,
    pub project: ProjectId,
    pub user: UserId,
}

impl TestBoard {
    /// Creates an empty board whose users may access every project.
    #[must_use]
    pub fn new(channel_capacity: usize) -> Self {
        let repository = Arc::new(InMemoryTaskRepository::new());
        let channels = ProjectChannels::new(channel_capacity);
        let service = TaskBoardService::new(
            Arc::clone(&repository),
            Arc::new(DefaultClock),
            BoardCollaborators {
                authorizer: Arc::new(InMemoryProjectMembers::open()),
                notifier: Arc::new(RecordingNotifier::new()),
                publisher: Arc::new(channels.clone()),
            },
        );
        Self {
            service,
            repository,
            channels,
            project: ProjectId::new(),
            user: UserId::new(),
        }
    }

    /// Creates a task at the end of `column`.
    ///
    /// # Errors
    ///
    /// Returns an error when the service rejects the task.
    pub async fn create(&self, title: &str, column: &str) -> eyre::Result<Task> {
        self.service
            .create_task(TaskDraft::new(self.project, title, column, self.user))
            .await
            .wrap_err_with(|| format!("create {title} in {column}"))
    }

    /// Creates one task per title in `column`, in order.
    ///
    /// # Errors
    ///
    /// Returns an error when any creation fails.
    pub async fn seed(&self, column: &str, titles: &[&str]) -> eyre::Result<Vec<Task>> {
        let mut created = Vec::with_capacity(titles.len());
        for title in titles {
            created.push(self.create(title, column).await?);
        }
        Ok(created)
    }

    /// Moves a task and returns the stored result.
    ///
    /// # Errors
    ///
    /// Returns an error when the move fails.
    pub async fn move_task(&self, task_id: TaskId, column: &str, position: i64) -> eyre::Result<Task> {
        let outcome = self
            .service
            .move_task(self.user, task_id, MoveTaskRequest::new(column, position))
            .await
            .wrap_err_with(|| format!("move {task_id} to {column}@{position}"))?;
        Ok(outcome.task)
    }

    /// Returns the task ids of `column` in position order.
    ///
    /// # Errors
    ///
    /// Returns an error when listing fails.
    pub async fn order(&self, column: &str) -> eyre::Result<Vec<TaskId>> {
        let filter = TaskFilter {
            column: Some(ColumnName::new(column)?),
            ..TaskFilter::default()
        };
        let tasks = self
            .service
            .list_tasks(self.user, self.project, &filter)
            .await?;
        Ok(tasks.iter().map(Task::id).collect())
    }

    /// Returns every (task, column, position) triple of the project.
    ///
    /// # Errors
    ///
    /// Returns an error when listing fails.
    pub async fn snapshot(&self) -> eyre::Result<BTreeMap<TaskId, (String, u32)>> {
        let tasks = self.repository.list_by_project(self.project).await?;
        Ok(tasks
            .iter()
            .map(|task| {
                (
                    task.id(),
                    (task.column().to_string(), task.position().value()),
                )
            })
            .collect())
    }

    /// Checks that every column of the project is densely packed.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first column that has a gap or a
    /// duplicate.
    pub async fn assert_dense(&self) -> eyre::Result<()> {
        let tasks = self.repository.list_by_project(self.project).await?;
        let mut columns: BTreeMap<&str, Vec<_>> = BTreeMap::new();
        for task in &tasks {
            columns
                .entry(task.column().as_str())
                .or_default()
                .push(task.position());
        }
        for (column, positions) in columns {
            check_dense(positions).map_err(|err| eyre!("column {column} is not dense: {err}"))?;
        }
        Ok(())
    }
}

/// Provides a fresh board for each test.
#[fixture]
pub fn board() -> TestBoard {
    TestBoard::new(ProjectChannels::DEFAULT_CAPACITY)
}
