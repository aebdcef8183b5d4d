//! Dashboard handler.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;
use utoipa::ToSchema;

use super::{
    ActivityResponse, ApiFailure, CurrentUser, ErrorResponse, LibraryEntryResponse,
    action_failure,
};
use crate::actions::{Dashboard, DashboardData, DashboardStats};
use crate::api::AppState;
use crate::books::BookProvider;
use crate::db::{Database, NamedCount};

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStatsResponse {
    #[schema(example = 12)]
    pub books_in_library: usize,
    #[schema(example = 4)]
    pub completed_books: usize,
    #[schema(example = 2)]
    pub reading_books: usize,
    #[schema(example = 6)]
    pub plan_to_read: usize,
}

impl From<DashboardStats> for DashboardStatsResponse {
    fn from(s: DashboardStats) -> Self {
        Self {
            books_in_library: s.books_in_library,
            completed_books: s.completed_books,
            reading_books: s.reading_books,
            plan_to_read: s.plan_to_read,
        }
    }
}

/// A tag or author with how many library books it appears on
#[derive(Debug, Serialize, ToSchema)]
pub struct NamedCountResponse {
    pub id: String,
    #[schema(example = "Science Fiction")]
    pub name: String,
    #[schema(example = 3)]
    pub count: usize,
}

impl From<NamedCount> for NamedCountResponse {
    fn from(n: NamedCount) -> Self {
        Self {
            id: n.id,
            name: n.name,
            count: n.count,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardResponse {
    pub stats: DashboardStatsResponse,
    pub currently_reading: Vec<LibraryEntryResponse>,
    pub tags: Vec<NamedCountResponse>,
    pub authors: Vec<NamedCountResponse>,
    pub activities: Vec<ActivityResponse>,
}

impl From<DashboardData> for DashboardResponse {
    fn from(d: DashboardData) -> Self {
        Self {
            stats: d.stats.into(),
            currently_reading: d
                .currently_reading
                .into_iter()
                .map(LibraryEntryResponse::from)
                .collect(),
            tags: d.tags.into_iter().map(NamedCountResponse::from).collect(),
            authors: d.authors.into_iter().map(NamedCountResponse::from).collect(),
            activities: d
                .activities
                .into_iter()
                .map(ActivityResponse::from)
                .collect(),
        }
    }
}

/// Library overview for the acting user
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    tag = "dashboard",
    params(("X-User-Id" = String, Header, description = "Acting user ID")),
    responses(
        (status = 200, description = "Dashboard", body = DashboardResponse),
        (status = 401, description = "Missing or unknown user", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn get_dashboard<D: Database, P: BookProvider>(
    State(state): State<AppState<D, P>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<DashboardResponse>, ApiFailure> {
    let data = Dashboard::new(state.ctx())
        .handle(&user)
        .await
        .map_err(action_failure)?;

    Ok(Json(data.into()))
}
