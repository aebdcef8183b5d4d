//! V1 API handlers.

mod activities;
mod books;
mod current_user;
mod dashboard;
mod library;
mod searches;
mod users;

#[cfg(test)]
mod test_helpers;

#[cfg(test)]
mod books_test;

pub use activities::*;
pub use books::*;
pub use current_user::*;
pub use dashboard::*;
pub use library::*;
pub use searches::*;
pub use users::*;

use axum::{Json, http::StatusCode};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use crate::actions::ActionError;
use crate::db::DbError;

/// Error response DTO
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always false
    #[schema(example = false)]
    pub success: bool,
    /// Error message
    #[schema(example = "Book not found in your library.")]
    pub message: String,
}

/// Success response for library mutations and settings updates
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = true)]
    pub success: bool,
    #[schema(example = "Book added to your library successfully.")]
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
        }
    }
}

pub type ApiFailure = (StatusCode, Json<ErrorResponse>);

pub fn failure(status: StatusCode, message: impl Into<String>) -> ApiFailure {
    (
        status,
        Json(ErrorResponse {
            success: false,
            message: message.into(),
        }),
    )
}

/// Map a database error to a response.
pub fn db_failure(e: DbError) -> ApiFailure {
    let status = match &e {
        DbError::NotFound { .. } => StatusCode::NOT_FOUND,
        DbError::AlreadyExists { .. } => StatusCode::CONFLICT,
        DbError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %e, "Database failure");
    }
    failure(status, e.to_string())
}

/// Map an action error to a response.
pub fn action_failure(e: ActionError) -> ApiFailure {
    let e = match e {
        ActionError::Db(db) => return db_failure(db),
        other => other,
    };
    let status = match &e {
        ActionError::BookNotFound
        | ActionError::AlreadyInLibrary
        | ActionError::LimitReached { .. } => StatusCode::BAD_REQUEST,
        ActionError::NotInUserLibrary => StatusCode::FORBIDDEN,
        ActionError::NotInLibrary | ActionError::NoData { .. } => StatusCode::NOT_FOUND,
        ActionError::InvalidArgument { .. } | ActionError::NoSettings => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ActionError::Provider(_) | ActionError::Transform(_) => StatusCode::BAD_GATEWAY,
        ActionError::Db(_) | ActionError::Cover(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(error = %e, "Action failed");
    }
    failure(status, e.to_string())
}
