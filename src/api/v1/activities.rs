//! Activity feed handler.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use super::{ApiFailure, CurrentUser, ErrorResponse, db_failure};
use crate::api::AppState;
use crate::books::BookProvider;
use crate::db::{Activity, ActivityRepository, Database, PageSort};

pub const ACTIVITIES_PER_PAGE: usize = 10;

#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityResponse {
    #[schema(example = "a1b2c3d4")]
    pub id: String,
    #[schema(example = "book.added")]
    #[serde(rename = "type")]
    pub activity_type: String,
    #[schema(example = "book")]
    pub subject_type: Option<String>,
    pub subject_id: Option<String>,
    #[schema(value_type = Object, example = json!({"book_identifier": "9780441013593", "book_title": "Dune", "status": "Reading"}))]
    pub properties: Value,
    pub created_at: String,
}

impl From<Activity> for ActivityResponse {
    fn from(a: Activity) -> Self {
        Self {
            id: a.id,
            activity_type: a.activity_type.to_string(),
            subject_type: a.subject_type,
            subject_id: a.subject_id,
            properties: a.properties,
            created_at: a.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedActivities {
    pub items: Vec<ActivityResponse>,
    pub total: usize,
    #[schema(example = 1)]
    pub page: usize,
    #[schema(example = 10)]
    pub per_page: usize,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ActivitiesQuery {
    /// One-based page
    #[param(example = 1)]
    pub page: Option<usize>,
}

/// The user's activity feed, newest first
#[utoipa::path(
    get,
    path = "/api/v1/activities",
    tag = "activities",
    params(
        ("X-User-Id" = String, Header, description = "Acting user ID"),
        ActivitiesQuery
    ),
    responses(
        (status = 200, description = "One page of activities", body = PaginatedActivities),
        (status = 401, description = "Missing or unknown user", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn list_activities<D: Database, P: BookProvider>(
    State(state): State<AppState<D, P>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ActivitiesQuery>,
) -> Result<Json<PaginatedActivities>, ApiFailure> {
    let page = query.page.unwrap_or(1).max(1);

    let result = state
        .db()
        .activities()
        .list(&user.id, &PageSort::page(page, ACTIVITIES_PER_PAGE))
        .await
        .map_err(db_failure)?;

    Ok(Json(PaginatedActivities {
        items: result.items.into_iter().map(ActivityResponse::from).collect(),
        total: result.total,
        page,
        per_page: ACTIVITIES_PER_PAGE,
    }))
}
