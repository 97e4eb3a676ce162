//! Shared test helpers for `PostgreSQL` integration tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use eyre::{WrapErr, eyre};
use mockable::DefaultClock;
use taskboard::{
    realtime::ProjectChannels,
    task::{
        adapters::{
            memory::RecordingNotifier,
            postgres::{PostgresProjectMembers, PostgresTaskRepository, TaskPgPool},
        },
        domain::{ColumnName, ProjectId, Task, TaskDraft, TaskId, UserId},
        ordering::check_dense,
        ports::TaskRepository,
        services::{BoardCollaborators, MoveTaskRequest, TaskBoardService, TaskFilter},
    },
};
use uuid::Uuid;

/// Environment variable naming the test server.
pub const TEST_DATABASE_URL_VAR: &str = "TASKBOARD_TEST_DATABASE_URL";

/// SQL to create the board schema.
pub const CREATE_SCHEMA_SQL: &str =
    include_str!("../../migrations/2026-10-01-000000_create_tasks/up.sql");

/// Service type used by the `PostgreSQL` integration tests.
pub type PgService = TaskBoardService<PostgresTaskRepository, DefaultClock>;

/// A migrated schema that is dropped with the value.
pub struct TemporarySchema {
    base_url: String,
    name: String,
}

impl TemporarySchema {
    fn create(base_url: &str) -> eyre::Result<Self> {
        let name = format!("taskboard_test_{}", Uuid::new_v4().simple());
        let mut admin = PgConnection::establish(base_url).wrap_err("connect to test server")?;
        admin.batch_execute(&format!("CREATE SCHEMA \"{name}\""))?;
        let schema = Self {
            base_url: base_url.to_owned(),
            name,
        };
        let mut scoped = PgConnection::establish(&schema.url())?;
        scoped
            .batch_execute(CREATE_SCHEMA_SQL)
            .wrap_err("apply board migration")?;
        Ok(schema)
    }

    /// Returns a connection URL whose search path is this schema.
    #[must_use]
    pub fn url(&self) -> String {
        let separator = if self.base_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{separator}options=-csearch_path%3D{}",
            self.base_url, self.name
        )
    }

    /// Adds `user` to the members of `project`.
    ///
    /// # Errors
    ///
    /// Returns an error when the insert fails.
    pub fn grant(&self, project: ProjectId, user: UserId) -> eyre::Result<()> {
        let mut connection = PgConnection::establish(&self.url())?;
        connection.batch_execute(&format!(
            "INSERT INTO project_members (project_id, user_id) VALUES ('{project}', '{user}')"
        ))?;
        Ok(())
    }
}

impl Drop for TemporarySchema {
    fn drop(&mut self) {
        let dropped = PgConnection::establish(&self.base_url)
            .map_err(|err| err.to_string())
            .and_then(|mut admin| {
                admin
                    .batch_execute(&format!("DROP SCHEMA IF EXISTS \"{}\" CASCADE", self.name))
                    .map_err(|err| err.to_string())
            });
        if let Err(err) = dropped {
            tracing::warn!(schema = %self.name, error = %err, "failed to drop test schema");
        }
    }
}

/// One project board stored in a temporary schema.
pub struct PgBoard {
    pub service: PgService,
    pub repository: Arc<PostgresTaskRepository>,
    pub channels: ProjectChannels,
    pub project: ProjectId,
    pub user: UserId,
    pub schema: TemporarySchema,
}

impl PgBoard {
    /// Connects to the test server, or returns `None` when none is
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns an error when the server is configured but unusable.
    pub async fn connect() -> eyre::Result<Option<Self>> {
        let Ok(base_url) = std::env::var(TEST_DATABASE_URL_VAR) else {
            return Ok(None);
        };
        let board = tokio::task::spawn_blocking(move || Self::build(&base_url)).await??;
        Ok(Some(board))
    }

    fn build(base_url: &str) -> eyre::Result<Self> {
        let schema = TemporarySchema::create(base_url)?;
        let pool: TaskPgPool = Pool::builder()
            .max_size(8)
            .build(ConnectionManager::new(schema.url()))?;
        let project = ProjectId::new();
        let user = UserId::new();
        schema.grant(project, user)?;

        let repository = Arc::new(PostgresTaskRepository::new(pool.clone()));
        let channels = ProjectChannels::default();
        let service = TaskBoardService::new(
            Arc::clone(&repository),
            Arc::new(DefaultClock),
            BoardCollaborators {
                authorizer: Arc::new(PostgresProjectMembers::new(pool)),
                notifier: Arc::new(RecordingNotifier::new()),
                publisher: Arc::new(channels.clone()),
            },
        );
        Ok(Self {
            service,
            repository,
            channels,
            project,
            user,
            schema,
        })
    }

    /// Creates one task per title in `column`, in order.
    ///
    /// # Errors
    ///
    /// Returns an error when any creation fails.
    pub async fn seed(&self, column: &str, titles: &[&str]) -> eyre::Result<Vec<Task>> {
        let mut created = Vec::with_capacity(titles.len());
        for title in titles {
            let draft = TaskDraft::new(self.project, *title, column, self.user);
            created.push(self.service.create_task(draft).await?);
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

    /// Checks that every column of the project is densely packed.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first column with a gap or duplicate.
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
