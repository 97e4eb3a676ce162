//! Caller identity extraction.

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::Deserialize;
use uuid::Uuid;

use super::error::ApiError;
use crate::task::domain::UserId;

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityQuery {
    user_id: Option<Uuid>,
}

/// The authenticated caller.
///
/// Read from the `x-user-id` header. Browsers cannot set headers on a
/// websocket handshake, so a `userId` query parameter is accepted as a
/// fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor(pub UserId);

impl Actor {
    /// Returns the caller's user id.
    #[must_use]
    pub const fn user_id(self) -> UserId {
        self.0
    }
}

fn from_header(parts: &Parts) -> Option<Result<UserId, ApiError>> {
    let value = parts.headers.get(USER_ID_HEADER)?;
    Some(
        value
            .to_str()
            .ok()
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .map(UserId::from_uuid)
            .ok_or(ApiError::Unauthorized),
    )
}

fn from_query(parts: &Parts) -> Option<UserId> {
    Query::<IdentityQuery>::try_from_uri(&parts.uri)
        .ok()
        .and_then(|Query(query)| query.user_id)
        .map(UserId::from_uuid)
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        from_header(parts).map_or_else(
            || from_query(parts).map(Self).ok_or(ApiError::Unauthorized),
            |found| found.map(Self),
        )
    }
}
