//! Websocket endpoint streaming a project's board events.

use axum::{
    extract::{
        Path, State,
        rejection::PathRejection,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use mockable::Clock;
use tracing::{debug, warn};

use super::{AppState, error::ApiError, extract::Actor};
use crate::{
    realtime::Subscription,
    task::{domain::ProjectId, ports::TaskRepository},
};

/// Upgrades to a websocket joined to the project's channel.
///
/// The channel is joined before the handshake completes, so no event
/// committed after the response is missed.
pub(super) async fn project_events<R, C>(
    ws: WebSocketUpgrade,
    State(state): State<AppState<R, C>>,
    actor: Actor,
    project_id: Result<Path<ProjectId>, PathRejection>,
) -> Result<Response, ApiError>
where
    R: TaskRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    let Path(project) = project_id?;
    state
        .service
        .ensure_project_access(actor.user_id(), project)
        .await?;
    let subscription = state.channels.join(project);
    Ok(ws.on_upgrade(move |socket| forward_events(socket, subscription)))
}

async fn forward_events(socket: WebSocket, mut subscription: Subscription) {
    let (mut sender, mut receiver) = socket.split();
    let project_id = subscription.project_id();
    let subscriber = subscription.id();

    loop {
        tokio::select! {
            event = subscription.recv() => {
                // The registry dropped us: either lagging or shutting down.
                let Some(event) = event else { break };
                let text = match serde_json::to_string(event.as_ref()) {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(project_id = %project_id, error = %err, "failed to encode board event");
                        continue;
                    }
                };
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    drop(subscription);
    if let Err(err) = sender.close().await {
        debug!(project_id = %project_id, subscriber = %subscriber, error = %err, "websocket close failed");
    }
    debug!(project_id = %project_id, subscriber = %subscriber, "board stream closed");
}
