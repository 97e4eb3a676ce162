//! Request handlers for task endpoints.

use std::future::Future;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use mockable::Clock;
use serde::{Deserialize, Deserializer};

use super::{AppState, error::ApiError, extract::Actor, response::ApiResponse};
use crate::task::{
    domain::{
        ActivityEntry, ColumnName, Priority, ProjectId, SubtaskId, SubtaskUpdate, TaskDraft,
        TaskId, TaskUpdate, TaskView, UserId,
    },
    ports::TaskRepository,
    services::{MoveTaskRequest, TaskBoardResult, TaskFilter},
};

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Distinguishes an absent field from an explicit `null`.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Body of `POST /api/tasks`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateTaskBody {
    title: String,
    #[serde(default)]
    description: Option<String>,
    project: ProjectId,
    column: String,
    #[serde(default)]
    assignee: Option<UserId>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    labels: Vec<String>,
}

/// Body of `PATCH /api/tasks/{taskId}`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UpdateTaskBody {
    #[serde(default)]
    title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    assignee: Option<Option<UserId>>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    labels: Option<Vec<String>>,
}

/// Body of `PATCH /api/tasks/{taskId}/move`.
#[derive(Debug, Deserialize)]
pub(super) struct MoveTaskBody {
    column: String,
    position: i64,
}

/// Body of `POST /api/tasks/{taskId}/subtasks`.
#[derive(Debug, Deserialize)]
pub(super) struct NewSubtaskBody {
    title: String,
}

/// Body of `PATCH /api/tasks/{taskId}/subtasks/{subtaskId}`.
#[derive(Debug, Deserialize)]
pub(super) struct SubtaskUpdateBody {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    completed: Option<bool>,
}

/// Query of `GET /api/projects/{projectId}/tasks`.
#[derive(Debug, Default, Deserialize)]
pub(super) struct ListTasksQuery {
    #[serde(default)]
    column: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    assignee: Option<UserId>,
}

fn parse_priority(raw: Option<&str>) -> Result<Option<Priority>, ApiError> {
    raw.map(Priority::try_from).transpose().map_err(ApiError::from)
}

impl CreateTaskBody {
    fn into_draft(self, reporter: UserId) -> Result<TaskDraft, ApiError> {
        let priority = parse_priority(self.priority.as_deref())?;
        let mut draft = TaskDraft::new(self.project, self.title, self.column, reporter)
            .with_labels(self.labels);
        if let Some(description) = self.description {
            draft = draft.with_description(description);
        }
        if let Some(assignee) = self.assignee {
            draft = draft.with_assignee(assignee);
        }
        if let Some(level) = priority {
            draft = draft.with_priority(level);
        }
        Ok(draft)
    }
}

impl UpdateTaskBody {
    fn into_update(self) -> Result<TaskUpdate, ApiError> {
        Ok(TaskUpdate {
            title: self.title,
            description: self.description,
            assignee: self.assignee,
            priority: parse_priority(self.priority.as_deref())?,
            labels: self.labels,
        })
    }
}

impl ListTasksQuery {
    fn into_filter(self) -> Result<TaskFilter, ApiError> {
        Ok(TaskFilter {
            column: self.column.map(ColumnName::new).transpose()?,
            priority: parse_priority(self.priority.as_deref())?,
            assignee: self.assignee,
        })
    }
}

/// Runs a mutating service call on its own task.
///
/// A client that hangs up mid-request drops the handler future; the spawned
/// call still runs to completion so a committed change is always broadcast.
async fn detached<T, F>(work: F) -> Result<T, ApiError>
where
    F: Future<Output = TaskBoardResult<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(work)
        .await
        .map_err(|err| ApiError::Internal(format!("request task failed: {err}")))?
        .map_err(ApiError::from)
}

pub(super) async fn create_task<R, C>(
    State(state): State<AppState<R, C>>,
    actor: Actor,
    payload: Result<Json<CreateTaskBody>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<TaskView>>), ApiError>
where
    R: TaskRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    let Json(body) = payload?;
    let draft = body.into_draft(actor.user_id())?;
    let service = state.service.clone();
    let created = detached(async move { service.create_task(draft).await }).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(TaskView::from(&created))),
    ))
}

pub(super) async fn get_task<R, C>(
    State(state): State<AppState<R, C>>,
    actor: Actor,
    task_id: Result<Path<TaskId>, PathRejection>,
) -> ApiResult<TaskView>
where
    R: TaskRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    let Path(id) = task_id?;
    let task = state.service.get_task(actor.user_id(), id).await?;
    Ok(Json(ApiResponse::success(TaskView::from(&task))))
}

pub(super) async fn list_tasks<R, C>(
    State(state): State<AppState<R, C>>,
    actor: Actor,
    project_id: Result<Path<ProjectId>, PathRejection>,
    query: Result<Query<ListTasksQuery>, QueryRejection>,
) -> ApiResult<Vec<TaskView>>
where
    R: TaskRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    let Path(project) = project_id?;
    let Query(params) = query?;
    let filter = params.into_filter()?;
    let tasks = state
        .service
        .list_tasks(actor.user_id(), project, &filter)
        .await?;
    Ok(Json(ApiResponse::success(
        tasks.iter().map(TaskView::from).collect(),
    )))
}

pub(super) async fn update_task<R, C>(
    State(state): State<AppState<R, C>>,
    actor: Actor,
    task_id: Result<Path<TaskId>, PathRejection>,
    payload: Result<Json<UpdateTaskBody>, JsonRejection>,
) -> ApiResult<TaskView>
where
    R: TaskRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    let Path(id) = task_id?;
    let Json(body) = payload?;
    let update = body.into_update()?;
    let service = state.service.clone();
    let user = actor.user_id();
    let task = detached(async move { service.update_task(user, id, update).await }).await?;
    Ok(Json(ApiResponse::success(TaskView::from(&task))))
}

pub(super) async fn move_task<R, C>(
    State(state): State<AppState<R, C>>,
    actor: Actor,
    task_id: Result<Path<TaskId>, PathRejection>,
    payload: Result<Json<MoveTaskBody>, JsonRejection>,
) -> ApiResult<TaskView>
where
    R: TaskRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    let Path(id) = task_id?;
    let Json(body) = payload?;
    let request = MoveTaskRequest::new(body.column, body.position);
    let service = state.service.clone();
    let user = actor.user_id();
    let outcome = detached(async move { service.move_task(user, id, request).await }).await?;
    Ok(Json(ApiResponse::success(TaskView::from(&outcome.task))))
}

pub(super) async fn delete_task<R, C>(
    State(state): State<AppState<R, C>>,
    actor: Actor,
    task_id: Result<Path<TaskId>, PathRejection>,
) -> ApiResult<()>
where
    R: TaskRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    let Path(id) = task_id?;
    let service = state.service.clone();
    let user = actor.user_id();
    detached(async move { service.delete_task(user, id).await }).await?;
    Ok(Json(ApiResponse::success(())))
}

pub(super) async fn activity<R, C>(
    State(state): State<AppState<R, C>>,
    actor: Actor,
    task_id: Result<Path<TaskId>, PathRejection>,
) -> ApiResult<Vec<ActivityEntry>>
where
    R: TaskRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    let Path(id) = task_id?;
    let entries = state.service.activity(actor.user_id(), id).await?;
    Ok(Json(ApiResponse::success(entries)))
}

pub(super) async fn add_subtask<R, C>(
    State(state): State<AppState<R, C>>,
    actor: Actor,
    task_id: Result<Path<TaskId>, PathRejection>,
    payload: Result<Json<NewSubtaskBody>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<TaskView>>), ApiError>
where
    R: TaskRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    let Path(id) = task_id?;
    let Json(body) = payload?;
    let service = state.service.clone();
    let user = actor.user_id();
    let task = detached(async move { service.add_subtask(user, id, body.title).await }).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(TaskView::from(&task))),
    ))
}

pub(super) async fn update_subtask<R, C>(
    State(state): State<AppState<R, C>>,
    actor: Actor,
    ids: Result<Path<(TaskId, SubtaskId)>, PathRejection>,
    payload: Result<Json<SubtaskUpdateBody>, JsonRejection>,
) -> ApiResult<TaskView>
where
    R: TaskRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    let Path((id, subtask_id)) = ids?;
    let Json(body) = payload?;
    let update = SubtaskUpdate {
        title: body.title,
        completed: body.completed,
    };
    let service = state.service.clone();
    let user = actor.user_id();
    let task = detached(async move {
        service
            .update_subtask(user, id, subtask_id, update)
            .await
    })
    .await?;
    Ok(Json(ApiResponse::success(TaskView::from(&task))))
}

pub(super) async fn delete_subtask<R, C>(
    State(state): State<AppState<R, C>>,
    actor: Actor,
    ids: Result<Path<(TaskId, SubtaskId)>, PathRejection>,
) -> ApiResult<TaskView>
where
    R: TaskRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    let Path((id, subtask_id)) = ids?;
    let service = state.service.clone();
    let user = actor.user_id();
    let task =
        detached(async move { service.delete_subtask(user, id, subtask_id).await }).await?;
    Ok(Json(ApiResponse::success(TaskView::from(&task))))
}
