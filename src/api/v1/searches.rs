//! Search history handler.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;
use utoipa::ToSchema;

use super::{ApiFailure, CurrentUser, ErrorResponse, db_failure};
use crate::api::AppState;
use crate::books::BookProvider;
use crate::db::{Database, PreviousSearch, SearchHistoryRepository};

const RECENT_SEARCHES: usize = 10;

#[derive(Debug, Serialize, ToSchema)]
pub struct PreviousSearchResponse {
    pub id: String,
    /// The term as typed, prefixes included
    #[schema(example = "author:Frank Herbert")]
    pub search_term: String,
    /// The term with `tag:` and `author:` prefixes removed
    #[schema(example = "Frank Herbert")]
    pub search_term_normalised: String,
    #[schema(example = "author")]
    #[serde(rename = "type")]
    pub search_type: Option<String>,
}

impl From<PreviousSearch> for PreviousSearchResponse {
    fn from(s: PreviousSearch) -> Self {
        Self {
            search_term_normalised: normalise_term(&s.search_term),
            id: s.id,
            search_term: s.search_term,
            search_type: s.search_type,
        }
    }
}

pub fn normalise_term(term: &str) -> String {
    term.replace("tag:", "").replace("author:", "")
}

/// The user's most recent searches
#[utoipa::path(
    get,
    path = "/api/v1/searches",
    tag = "searches",
    params(("X-User-Id" = String, Header, description = "Acting user ID")),
    responses(
        (status = 200, description = "Recent searches, newest first", body = Vec<PreviousSearchResponse>),
        (status = 401, description = "Missing or unknown user", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn list_searches<D: Database, P: BookProvider>(
    State(state): State<AppState<D, P>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<PreviousSearchResponse>>, ApiFailure> {
    let searches = state
        .db()
        .searches()
        .recent(&user.id, RECENT_SEARCHES)
        .await
        .map_err(db_failure)?;

    Ok(Json(
        searches
            .into_iter()
            .map(PreviousSearchResponse::from)
            .collect(),
    ))
}
