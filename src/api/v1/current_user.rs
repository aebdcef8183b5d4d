//! Acting-user extraction from the `X-User-Id` header.

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::StatusCode;
use axum::http::request::Parts;

use super::{ApiFailure, failure};
use crate::api::AppState;
use crate::books::BookProvider;
use crate::db::{Database, DbError, User, UserRepository};

pub const USER_HEADER: &str = "x-user-id";

/// The user a request acts on behalf of.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

fn header_value(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

async fn load<D: Database>(db: &D, id: &str) -> Result<User, ApiFailure> {
    db.users().get(id).await.map_err(|e| match e {
        DbError::NotFound { .. } => failure(StatusCode::UNAUTHORIZED, "Unknown user."),
        other => super::db_failure(other),
    })
}

impl<D: Database, P: BookProvider> FromRequestParts<AppState<D, P>> for CurrentUser {
    type Rejection = ApiFailure;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<D, P>,
    ) -> Result<Self, Self::Rejection> {
        let id = header_value(parts)
            .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "Missing X-User-Id header."))?;
        load(state.db(), &id).await.map(CurrentUser)
    }
}

/// Anonymous requests yield `None`. An unknown id is still rejected.
impl<D: Database, P: BookProvider> OptionalFromRequestParts<AppState<D, P>> for CurrentUser {
    type Rejection = ApiFailure;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<D, P>,
    ) -> Result<Option<Self>, Self::Rejection> {
        match header_value(parts) {
            Some(id) => load(state.db(), &id).await.map(|u| Some(CurrentUser(u))),
            None => Ok(None),
        }
    }
}
