//! Library membership handlers for the acting user.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use super::{
    ApiFailure, BookResponse, CurrentUser, ErrorResponse, MessageResponse, action_failure,
    db_failure, failure,
};
use crate::actions::{ActionError, AddBookToUser, RemoveBookFromUser, UpdateUserBookStatus};
use crate::api::AppState;
use crate::books::BookProvider;
use crate::db::{
    Book, BookRepository, Database, LibraryEntry, LibraryQuery, LibraryRepository, PageSort,
    UserBookStatus,
};

const DEFAULT_LIMIT: usize = 50;

// =============================================================================
// DTOs
// =============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct LibraryEntryResponse {
    pub book: BookResponse,
    /// PlanToRead, Reading, Completed, OnHold or Dropped
    #[schema(example = "Reading")]
    pub status: String,
    pub added_at: String,
    pub updated_at: String,
}

impl From<LibraryEntry> for LibraryEntryResponse {
    fn from(e: LibraryEntry) -> Self {
        Self {
            book: e.book.into(),
            status: e.status.to_string(),
            added_at: e.added_at,
            updated_at: e.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedLibrary {
    pub items: Vec<LibraryEntryResponse>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListLibraryQuery {
    /// Only entries with this reading status
    #[param(example = "Reading")]
    pub status: Option<String>,
    /// Maximum number of items to return
    #[param(example = 20)]
    pub limit: Option<usize>,
    /// Number of items to skip
    #[param(example = 0)]
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddBookRequest {
    /// Identifier of a stored book
    #[schema(example = "9780441013593")]
    pub identifier: String,
    /// Initial reading status, defaults to PlanToRead
    #[schema(example = "Reading")]
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// New reading status, defaults to PlanToRead
    #[schema(example = "Completed")]
    pub status: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusUpdatedResponse {
    #[schema(example = true)]
    pub success: bool,
    #[schema(example = "Book status updated successfully.")]
    pub message: String,
    #[schema(example = "Completed")]
    pub status: String,
}

fn parse_status(raw: Option<&str>) -> Result<Option<UserBookStatus>, ApiFailure> {
    raw.map(|s| s.parse::<UserBookStatus>())
        .transpose()
        .map_err(|e| failure(StatusCode::UNPROCESSABLE_ENTITY, e))
}

async fn find_book<D: Database>(db: &D, identifier: &str) -> Result<Option<Book>, ApiFailure> {
    db.books()
        .find_by_identifier(identifier)
        .await
        .map_err(db_failure)
}

// =============================================================================
// Handlers
// =============================================================================

/// List the books in the user's library
#[utoipa::path(
    get,
    path = "/api/v1/user/books",
    tag = "library",
    params(
        ("X-User-Id" = String, Header, description = "Acting user ID"),
        ListLibraryQuery
    ),
    responses(
        (status = 200, description = "Library entries, newest first", body = PaginatedLibrary),
        (status = 401, description = "Missing or unknown user", body = ErrorResponse),
        (status = 422, description = "Invalid status", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn list_library<D: Database, P: BookProvider>(
    State(state): State<AppState<D, P>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListLibraryQuery>,
) -> Result<Json<PaginatedLibrary>, ApiFailure> {
    let status = parse_status(query.status.as_deref())?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);

    let result = state
        .db()
        .library()
        .list(
            &user.id,
            &LibraryQuery {
                page: PageSort {
                    limit: Some(limit),
                    offset: query.offset,
                    ..PageSort::default()
                },
                status,
            },
        )
        .await
        .map_err(db_failure)?;

    Ok(Json(PaginatedLibrary {
        items: result
            .items
            .into_iter()
            .map(LibraryEntryResponse::from)
            .collect(),
        total: result.total,
        limit,
        offset: result.offset,
    }))
}

/// Add a stored book to the user's library
#[utoipa::path(
    post,
    path = "/api/v1/user/books",
    tag = "library",
    params(("X-User-Id" = String, Header, description = "Acting user ID")),
    request_body = AddBookRequest,
    responses(
        (status = 201, description = "Book added", body = MessageResponse),
        (status = 400, description = "Unknown book, duplicate or plan limit reached", body = ErrorResponse),
        (status = 401, description = "Missing or unknown user", body = ErrorResponse),
        (status = 422, description = "Invalid status", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn add_book<D: Database, P: BookProvider>(
    State(state): State<AppState<D, P>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<AddBookRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiFailure> {
    let status = parse_status(req.status.as_deref())?;
    let book = find_book(state.db(), &req.identifier)
        .await?
        .ok_or_else(|| action_failure(ActionError::BookNotFound))?;

    AddBookToUser::new(state.ctx())
        .handle(&book, &user, status)
        .await
        .map_err(action_failure)?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::ok(
            "Book added to your library successfully.",
        )),
    ))
}

/// Change the reading status of a book in the user's library
#[utoipa::path(
    patch,
    path = "/api/v1/user/books/{identifier}",
    tag = "library",
    params(
        ("X-User-Id" = String, Header, description = "Acting user ID"),
        ("identifier" = String, Path, description = "Book identifier")
    ),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = StatusUpdatedResponse),
        (status = 401, description = "Missing or unknown user", body = ErrorResponse),
        (status = 404, description = "Book not in library", body = ErrorResponse),
        (status = 422, description = "Invalid status", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn update_book_status<D: Database, P: BookProvider>(
    State(state): State<AppState<D, P>>,
    CurrentUser(user): CurrentUser,
    Path(identifier): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<StatusUpdatedResponse>, ApiFailure> {
    let status = parse_status(req.status.as_deref())?.unwrap_or_default();
    let book = find_book(state.db(), &identifier)
        .await?
        .ok_or_else(|| action_failure(ActionError::NotInLibrary))?;

    let status = UpdateUserBookStatus::new(state.ctx())
        .handle(&user, &book, status)
        .await
        .map_err(action_failure)?;

    Ok(Json(StatusUpdatedResponse {
        success: true,
        message: "Book status updated successfully.".to_string(),
        status: status.to_string(),
    }))
}

/// Remove a book from the user's library
#[utoipa::path(
    delete,
    path = "/api/v1/user/books/{identifier}",
    tag = "library",
    params(
        ("X-User-Id" = String, Header, description = "Acting user ID"),
        ("identifier" = String, Path, description = "Book identifier")
    ),
    responses(
        (status = 200, description = "Book removed", body = MessageResponse),
        (status = 401, description = "Missing or unknown user", body = ErrorResponse),
        (status = 403, description = "Book not in library", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn remove_book<D: Database, P: BookProvider>(
    State(state): State<AppState<D, P>>,
    CurrentUser(user): CurrentUser,
    Path(identifier): Path<String>,
) -> Result<Json<MessageResponse>, ApiFailure> {
    let book = find_book(state.db(), &identifier)
        .await?
        .ok_or_else(|| action_failure(ActionError::NotInUserLibrary))?;

    RemoveBookFromUser::new(state.ctx())
        .handle(&book, &user)
        .await
        .map_err(action_failure)?;

    Ok(Json(MessageResponse::ok(
        "Book removed from your library successfully.",
    )))
}
