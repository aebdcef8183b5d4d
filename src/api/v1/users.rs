//! User registration, plan and settings handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::instrument;
use utoipa::ToSchema;

use super::{
    ApiFailure, CurrentUser, ErrorResponse, MessageResponse, action_failure, db_failure, failure,
};
use crate::actions::UpdateUserSettings;
use crate::api::AppState;
use crate::books::BookProvider;
use crate::db::{Database, LibraryRepository, NewUser, User, UserRepository};
use crate::subscription::SubscriptionSummary;

// =============================================================================
// DTOs
// =============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = "a1b2c3d4")]
    pub id: String,
    #[schema(example = "Ada")]
    pub name: String,
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(value_type = Object)]
    pub settings: Map<String, Value>,
    pub subscription: SubscriptionSummary,
    pub created_at: String,
    pub updated_at: String,
}

impl UserResponse {
    fn new(user: User, subscription: SubscriptionSummary) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            settings: user.settings,
            subscription,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    #[schema(example = "Ada")]
    pub name: String,
    #[schema(example = "ada@example.com")]
    pub email: String,
    /// Plan key, defaults to `free`
    #[schema(example = "free")]
    pub plan: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetPlanRequest {
    #[schema(example = "pro")]
    pub plan: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateSettingsRequest {
    #[serde(default)]
    #[schema(value_type = Object, example = json!({"theme": "dark"}))]
    pub settings: Map<String, Value>,
}

fn unknown_plan(plan: &str) -> ApiFailure {
    failure(
        StatusCode::UNPROCESSABLE_ENTITY,
        format!("Unknown plan: {}", plan),
    )
}

async fn user_response<D: Database, P: BookProvider>(
    state: &AppState<D, P>,
    user: User,
) -> Result<UserResponse, ApiFailure> {
    let count = state
        .db()
        .library()
        .count(&user.id)
        .await
        .map_err(db_failure)?;
    let subscription = state.plans().summary(&user, count);
    Ok(UserResponse::new(user, subscription))
}

// =============================================================================
// Handlers
// =============================================================================

/// Register a user
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 422, description = "Invalid input", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_user<D: Database, P: BookProvider>(
    State(state): State<AppState<D, P>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiFailure> {
    if req.name.trim().is_empty() || req.email.trim().is_empty() {
        return Err(failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Name and email are required.",
        ));
    }
    if let Some(plan) = req.plan.as_deref() {
        if state.plans().plan(plan).is_none() {
            return Err(unknown_plan(plan));
        }
    }

    let user = state
        .db()
        .users()
        .create(&NewUser {
            name: req.name.trim().to_string(),
            email: req.email.trim().to_string(),
            plan: req.plan,
        })
        .await
        .map_err(db_failure)?;

    Ok((StatusCode::CREATED, Json(user_response(&state, user).await?)))
}

/// The acting user with their subscription summary
#[utoipa::path(
    get,
    path = "/api/v1/user",
    tag = "users",
    params(("X-User-Id" = String, Header, description = "Acting user ID")),
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing or unknown user", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn get_current_user<D: Database, P: BookProvider>(
    State(state): State<AppState<D, P>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<UserResponse>, ApiFailure> {
    Ok(Json(user_response(&state, user).await?))
}

/// Set the user's plan key
///
/// Stands in for billing: the plan must exist in the plan catalog.
#[utoipa::path(
    put,
    path = "/api/v1/user/plan",
    tag = "users",
    params(("X-User-Id" = String, Header, description = "Acting user ID")),
    request_body = SetPlanRequest,
    responses(
        (status = 200, description = "Plan updated", body = UserResponse),
        (status = 401, description = "Missing or unknown user", body = ErrorResponse),
        (status = 422, description = "Unknown plan", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn set_plan<D: Database, P: BookProvider>(
    State(state): State<AppState<D, P>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<SetPlanRequest>,
) -> Result<Json<UserResponse>, ApiFailure> {
    if state.plans().plan(&req.plan).is_none() {
        return Err(unknown_plan(&req.plan));
    }

    let user = state
        .db()
        .users()
        .set_plan(&user.id, &req.plan)
        .await
        .map_err(db_failure)?;

    Ok(Json(user_response(&state, user).await?))
}

/// Merge settings into the user's stored settings
#[utoipa::path(
    patch,
    path = "/api/v1/user/settings",
    tag = "users",
    params(("X-User-Id" = String, Header, description = "Acting user ID")),
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Settings updated", body = MessageResponse),
        (status = 401, description = "Missing or unknown user", body = ErrorResponse),
        (status = 422, description = "No settings provided", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn update_settings<D: Database, P: BookProvider>(
    State(state): State<AppState<D, P>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<UpdateSettingsRequest>,
) -> Result<Json<MessageResponse>, ApiFailure> {
    UpdateUserSettings::new(state.ctx())
        .handle(&user, req.settings)
        .await
        .map_err(action_failure)?;

    Ok(Json(MessageResponse::ok("User settings updated successfully.")))
}
