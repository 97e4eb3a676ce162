//! `PostgreSQL` repository implementation for task board storage.

use super::{
    blocking::{TaskPgPool, run_blocking},
    errors::infrastructure,
    models::{NewTaskRow, TaskContentChangeset, TaskRow},
    schema::tasks,
};
use crate::task::{
    domain::{
        ActivityEntry, ColumnKey, ColumnName, PersistedTaskData, Placement, Position, Priority,
        ProjectId, Task, TaskDomainError, TaskId, UserId,
    },
    ordering::PositionShift,
    ports::{PositionTransaction, TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::max;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::time::Duration;

/// Lock wait applied to position transactions unless configured otherwise.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// `PostgreSQL`-backed task repository.
#[derive(Debug, Clone)]
pub struct PostgresTaskRepository {
    pool: TaskPgPool,
    lock_timeout: Duration,
}

impl PostgresTaskRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self {
            pool,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Sets how long a position transaction waits for row and advisory locks.
    #[must_use]
    pub const fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    async fn run<F, T>(&self, f: F) -> TaskRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> TaskRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        run_blocking(&self.pool, infrastructure, f).await
    }
}

/// Position transaction bound to one open Diesel transaction.
struct PgPositionTransaction<'c> {
    connection: &'c mut PgConnection,
}

impl PositionTransaction for PgPositionTransaction<'_> {
    fn find(&mut self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        find_task(self.connection, id)
    }

    fn column_len(&mut self, key: &ColumnKey) -> TaskRepositoryResult<u32> {
        let count: i64 = tasks::table
            .filter(tasks::project_id.eq(key.project_id.into_inner()))
            .filter(tasks::column_name.eq(key.column.as_str()))
            .count()
            .get_result(self.connection)?;
        u32::try_from(count).map_err(TaskRepositoryError::persistence)
    }

    fn max_position(&mut self, key: &ColumnKey) -> TaskRepositoryResult<Option<Position>> {
        column_max_position(self.connection, key)
    }

    fn shift_positions(
        &mut self,
        project_id: ProjectId,
        shift: &PositionShift,
    ) -> TaskRepositoryResult<u64> {
        let from = to_db_position(shift.from)?;
        let step = shift.delta.as_i32();
        let in_column = tasks::project_id
            .eq(project_id.into_inner())
            .and(tasks::column_name.eq(shift.column.as_str()));

        let affected = match shift.through {
            Some(through) => {
                let upper = to_db_position(through)?;
                diesel::update(
                    tasks::table
                        .filter(in_column)
                        .filter(tasks::position.between(from, upper)),
                )
                .set(tasks::position.eq(tasks::position + step))
                .execute(self.connection)?
            }
            None => diesel::update(tasks::table.filter(in_column).filter(tasks::position.ge(from)))
                .set(tasks::position.eq(tasks::position + step))
                .execute(self.connection)?,
        };
        u64::try_from(affected).map_err(TaskRepositoryError::persistence)
    }

    fn set_position(
        &mut self,
        id: TaskId,
        placement: &Placement,
        updated_at: DateTime<Utc>,
    ) -> TaskRepositoryResult<()> {
        let updated = diesel::update(tasks::table.find(id.into_inner()))
            .set((
                tasks::column_name.eq(placement.column.as_str()),
                tasks::position.eq(to_db_position(placement.position)?),
                tasks::updated_at.eq(updated_at),
            ))
            .execute(self.connection)?;
        if updated == 0 {
            return Err(TaskRepositoryError::NotFound(id));
        }
        Ok(())
    }

    fn insert(&mut self, task: &Task) -> TaskRepositoryResult<()> {
        let task_id = task.id();
        let row = to_new_row(task)?;
        diesel::insert_into(tasks::table)
            .values(&row)
            .execute(self.connection)
            .map_err(|err| match err {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                    if info.constraint_name() == Some("tasks_pkey") =>
                {
                    TaskRepositoryError::DuplicateTask(task_id)
                }
                other => TaskRepositoryError::from(other),
            })?;
        Ok(())
    }

    fn delete(&mut self, id: TaskId) -> TaskRepositoryResult<()> {
        let deleted =
            diesel::delete(tasks::table.find(id.into_inner())).execute(self.connection)?;
        if deleted == 0 {
            return Err(TaskRepositoryError::NotFound(id));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        self.run(move |connection| find_task(connection, id)).await
    }

    async fn list_by_column(&self, key: &ColumnKey) -> TaskRepositoryResult<Vec<Task>> {
        let lookup = key.clone();
        self.run(move |connection| {
            let rows = tasks::table
                .filter(tasks::project_id.eq(lookup.project_id.into_inner()))
                .filter(tasks::column_name.eq(lookup.column.as_str()))
                .order(tasks::position.asc())
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)?;
            rows.into_iter().map(row_to_task).collect()
        })
        .await
    }

    async fn list_by_project(&self, project_id: ProjectId) -> TaskRepositoryResult<Vec<Task>> {
        self.run(move |connection| {
            let rows = tasks::table
                .filter(tasks::project_id.eq(project_id.into_inner()))
                .order((tasks::column_name.asc(), tasks::position.asc()))
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)?;
            rows.into_iter().map(row_to_task).collect()
        })
        .await
    }

    async fn max_position(&self, key: &ColumnKey) -> TaskRepositoryResult<Option<Position>> {
        let lookup = key.clone();
        self.run(move |connection| column_max_position(connection, &lookup))
            .await
    }

    async fn modify_content<T, F>(&self, id: TaskId, edit: F) -> TaskRepositoryResult<(Task, T)>
    where
        T: Send + 'static,
        F: FnOnce(&mut Task) -> Result<T, TaskDomainError> + Send + 'static,
    {
        self.run(move |connection| {
            connection.transaction::<_, TaskRepositoryError, _>(|tx| {
                let row = tasks::table
                    .find(id.into_inner())
                    .select(TaskRow::as_select())
                    .for_update()
                    .first::<TaskRow>(tx)
                    .optional()?
                    .ok_or(TaskRepositoryError::NotFound(id))?;
                let mut task = row_to_task(row)?;
                let logged = task.activity_log().len();
                let outcome = edit(&mut task).map_err(TaskRepositoryError::Rejected)?;

                diesel::update(tasks::table.find(id.into_inner()))
                    .set(&to_content_changeset(&task)?)
                    .execute(tx)?;
                let added: Vec<&ActivityEntry> =
                    task.activity_log().iter().skip(logged).collect();
                append_entries(tx, id, &added)?;
                Ok((task, outcome))
            })
        })
        .await
    }

    async fn append_activity(
        &self,
        id: TaskId,
        entry: &ActivityEntry,
    ) -> TaskRepositoryResult<()> {
        let appended = entry.clone();
        self.run(move |connection| append_entries(connection, id, &[&appended]))
            .await
    }

    async fn in_position_transaction<T, F>(
        &self,
        mut scope: Vec<ColumnKey>,
        work: F,
    ) -> TaskRepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn PositionTransaction) -> TaskRepositoryResult<T> + Send + 'static,
    {
        scope.sort();
        scope.dedup();
        let lock_timeout_ms = self.lock_timeout.as_millis();
        self.run(move |connection| {
            connection.transaction::<T, TaskRepositoryError, _>(|tx| {
                diesel::sql_query(format!("SET LOCAL lock_timeout = '{lock_timeout_ms}ms'"))
                    .execute(tx)?;
                // Keys are sorted so that overlapping scopes never deadlock.
                for key in &scope {
                    diesel::sql_query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
                        .bind::<diesel::sql_types::Text, _>(key.to_string())
                        .execute(tx)?;
                }
                work(&mut PgPositionTransaction { connection: tx })
            })
        })
        .await
    }
}

fn find_task(connection: &mut PgConnection, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
    let row = tasks::table
        .find(id.into_inner())
        .select(TaskRow::as_select())
        .first::<TaskRow>(connection)
        .optional()?;
    row.map(row_to_task).transpose()
}

/// Appends `entries` to the stored activity log without rewriting it.
fn append_entries(
    connection: &mut PgConnection,
    id: TaskId,
    entries: &[&ActivityEntry],
) -> TaskRepositoryResult<()> {
    if entries.is_empty() {
        return Ok(());
    }
    let appended = to_json(entries)?;
    let updated =
        diesel::sql_query("UPDATE tasks SET activity_log = activity_log || $1 WHERE id = $2")
            .bind::<diesel::sql_types::Jsonb, _>(appended)
            .bind::<diesel::sql_types::Uuid, _>(id.into_inner())
            .execute(connection)?;
    if updated == 0 {
        return Err(TaskRepositoryError::NotFound(id));
    }
    Ok(())
}

fn column_max_position(
    connection: &mut PgConnection,
    key: &ColumnKey,
) -> TaskRepositoryResult<Option<Position>> {
    let highest: Option<i32> = tasks::table
        .filter(tasks::project_id.eq(key.project_id.into_inner()))
        .filter(tasks::column_name.eq(key.column.as_str()))
        .select(max(tasks::position))
        .first(connection)?;
    highest.map(from_db_position).transpose()
}

fn to_db_position(position: Position) -> TaskRepositoryResult<i32> {
    i32::try_from(position.value()).map_err(TaskRepositoryError::persistence)
}

fn from_db_position(value: i32) -> TaskRepositoryResult<Position> {
    u32::try_from(value)
        .map(Position::new)
        .map_err(TaskRepositoryError::persistence)
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> TaskRepositoryResult<serde_json::Value> {
    serde_json::to_value(value).map_err(TaskRepositoryError::persistence)
}

fn to_new_row(task: &Task) -> TaskRepositoryResult<NewTaskRow> {
    Ok(NewTaskRow {
        id: task.id().into_inner(),
        project_id: task.project_id().into_inner(),
        title: task.title().to_owned(),
        description: task.description().map(str::to_owned),
        column_name: task.column().as_str().to_owned(),
        position: to_db_position(task.position())?,
        assignee_id: task.assignee().map(UserId::into_inner),
        reporter_id: task.reporter().into_inner(),
        priority: task.priority().as_str().to_owned(),
        subtasks: to_json(task.subtasks())?,
        labels: to_json(task.labels())?,
        activity_log: to_json(task.activity_log())?,
        created_at: task.created_at(),
        updated_at: task.updated_at(),
    })
}

fn to_content_changeset(task: &Task) -> TaskRepositoryResult<TaskContentChangeset> {
    Ok(TaskContentChangeset {
        title: task.title().to_owned(),
        description: task.description().map(str::to_owned),
        assignee_id: task.assignee().map(UserId::into_inner),
        priority: task.priority().as_str().to_owned(),
        subtasks: to_json(task.subtasks())?,
        labels: to_json(task.labels())?,
        updated_at: task.updated_at(),
    })
}

fn row_to_task(row: TaskRow) -> TaskRepositoryResult<Task> {
    let TaskRow {
        id,
        project_id,
        title,
        description,
        column_name,
        position,
        assignee_id,
        reporter_id,
        priority,
        subtasks,
        labels,
        activity_log,
        created_at,
        updated_at,
    } = row;

    let data = PersistedTaskData {
        id: TaskId::from_uuid(id),
        project_id: ProjectId::from_uuid(project_id),
        title,
        description,
        column: ColumnName::new(column_name).map_err(TaskRepositoryError::persistence)?,
        position: from_db_position(position)?,
        assignee: assignee_id.map(UserId::from_uuid),
        reporter: UserId::from_uuid(reporter_id),
        priority: Priority::try_from(priority.as_str())
            .map_err(TaskRepositoryError::persistence)?,
        subtasks: serde_json::from_value(subtasks).map_err(TaskRepositoryError::persistence)?,
        labels: serde_json::from_value(labels).map_err(TaskRepositoryError::persistence)?,
        activity_log: serde_json::from_value(activity_log)
            .map_err(TaskRepositoryError::persistence)?,
        created_at,
        updated_at,
    };
    Ok(Task::from_persisted(data))
}
