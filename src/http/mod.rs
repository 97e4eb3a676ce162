//! HTTP and websocket surface of the board.
//!
//! Every JSON endpoint answers with an [`ApiResponse`] envelope. Callers
//! identify themselves with the `x-user-id` header (see [`Actor`]).
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | `POST` | `/api/tasks` | create a task |
//! | `GET` | `/api/tasks/{taskId}` | read a task |
//! | `PATCH` | `/api/tasks/{taskId}` | edit content fields |
//! | `DELETE` | `/api/tasks/{taskId}` | delete a task |
//! | `PATCH` | `/api/tasks/{taskId}/move` | move a task |
//! | `GET` | `/api/tasks/{taskId}/activity` | activity log, newest first |
//! | `POST` | `/api/tasks/{taskId}/subtasks` | add a subtask |
//! | `PATCH` | `/api/tasks/{taskId}/subtasks/{subtaskId}` | edit a subtask |
//! | `DELETE` | `/api/tasks/{taskId}/subtasks/{subtaskId}` | remove a subtask |
//! | `GET` | `/api/projects/{projectId}/tasks` | list a board |
//! | `GET` | `/api/projects/{projectId}/events` | websocket event stream |

mod error;
mod extract;
mod response;
mod routes;
mod ws;

use axum::{
    Router,
    routing::{get, patch, post},
};
use mockable::Clock;

pub use error::ApiError;
pub use extract::{Actor, USER_ID_HEADER};
pub use response::ApiResponse;

use crate::{
    realtime::ProjectChannels,
    task::{ports::TaskRepository, services::TaskBoardService},
};

/// Shared handler state.
pub struct AppState<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    service: TaskBoardService<R, C>,
    channels: ProjectChannels,
}

impl<R, C> Clone for AppState<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            channels: self.channels.clone(),
        }
    }
}

impl<R, C> AppState<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    /// Bundles the service and the channel registry it publishes to.
    #[must_use]
    pub const fn new(service: TaskBoardService<R, C>, channels: ProjectChannels) -> Self {
        Self { service, channels }
    }

    /// Returns the board service.
    #[must_use]
    pub const fn service(&self) -> &TaskBoardService<R, C> {
        &self.service
    }

    /// Returns the channel registry.
    #[must_use]
    pub const fn channels(&self) -> &ProjectChannels {
        &self.channels
    }
}

/// Builds the router for all board endpoints.
pub fn router<R, C>(state: AppState<R, C>) -> Router
where
    R: TaskRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    Router::new()
        .route("/api/tasks", post(routes::create_task::<R, C>))
        .route(
            "/api/tasks/{task_id}",
            get(routes::get_task::<R, C>)
                .patch(routes::update_task::<R, C>)
                .delete(routes::delete_task::<R, C>),
        )
        .route("/api/tasks/{task_id}/move", patch(routes::move_task::<R, C>))
        .route(
            "/api/tasks/{task_id}/activity",
            get(routes::activity::<R, C>),
        )
        .route(
            "/api/tasks/{task_id}/subtasks",
            post(routes::add_subtask::<R, C>),
        )
        .route(
            "/api/tasks/{task_id}/subtasks/{subtask_id}",
            patch(routes::update_subtask::<R, C>).delete(routes::delete_subtask::<R, C>),
        )
        .route(
            "/api/projects/{project_id}/tasks",
            get(routes::list_tasks::<R, C>),
        )
        .route(
            "/api/projects/{project_id}/events",
            get(ws::project_events::<R, C>),
        )
        .with_state(state)
}
