//! Book search and detail handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use utoipa::{IntoParams, ToSchema};

use super::{ApiFailure, CurrentUser, ErrorResponse, action_failure, db_failure, failure};
use crate::actions::{FetchOrCreateBook, SearchBooksFromApi};
use crate::api::AppState;
use crate::books::{BookProvider, BookRecord, MAX_SEARCH_PAGE, SearchParams};
use crate::db::{
    Author, Book, BookDetails, BookRepository, Cover, Database, IdentifierCode, Publisher,
    SearchHistoryRepository, Tag,
};

// =============================================================================
// DTOs
// =============================================================================

/// Typed identifier such as an ISBN-10
#[derive(Debug, Serialize, ToSchema)]
pub struct CodeResponse {
    #[schema(example = "ISBN_10")]
    #[serde(rename = "type")]
    pub code_type: String,
    #[schema(example = "0441013597")]
    pub identifier: Option<String>,
}

impl From<IdentifierCode> for CodeResponse {
    fn from(c: IdentifierCode) -> Self {
        Self {
            code_type: c.code_type,
            identifier: c.identifier,
        }
    }
}

/// Author, tag or publisher
#[derive(Debug, Serialize, ToSchema)]
pub struct NamedResponse {
    #[schema(example = "a1b2c3d4")]
    pub id: String,
    #[schema(example = "Frank Herbert")]
    pub name: String,
}

impl From<Author> for NamedResponse {
    fn from(a: Author) -> Self {
        Self {
            id: a.id,
            name: a.name,
        }
    }
}

impl From<Tag> for NamedResponse {
    fn from(t: Tag) -> Self {
        Self {
            id: t.id,
            name: t.name,
        }
    }
}

impl From<Publisher> for NamedResponse {
    fn from(p: Publisher) -> Self {
        Self {
            id: p.id,
            name: p.name,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CoverResponse {
    /// Path relative to the covers directory
    #[schema(example = "9780441013593-a1b2c3d4.jpg")]
    pub path: String,
    #[schema(example = "image/jpeg")]
    pub content_type: Option<String>,
    pub source_url: Option<String>,
}

impl From<Cover> for CoverResponse {
    fn from(c: Cover) -> Self {
        Self {
            path: c.path,
            content_type: c.content_type,
            source_url: c.source_url,
        }
    }
}

/// A stored book without relations
#[derive(Debug, Serialize, ToSchema)]
pub struct BookResponse {
    #[schema(example = "a1b2c3d4")]
    pub id: String,
    /// Unique identifier, usually the ISBN-13
    #[schema(example = "9780441013593")]
    pub identifier: String,
    #[schema(example = "Dune")]
    pub title: Option<String>,
    #[schema(example = 412)]
    pub page_count: Option<i64>,
    pub edition: Option<String>,
    pub binding: Option<String>,
    #[schema(example = "en")]
    pub language: Option<String>,
    #[schema(example = "2005-08-02")]
    pub published_date: Option<String>,
    pub description: Option<String>,
    pub description_clean: Option<String>,
    pub codes: Vec<CodeResponse>,
    /// Provider the record was imported from
    #[schema(example = "ISBNdb")]
    pub service: Option<String>,
    /// Average cover colour
    #[schema(example = "#8a6f4c")]
    pub colour: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Book> for BookResponse {
    fn from(b: Book) -> Self {
        Self {
            id: b.id,
            identifier: b.identifier,
            title: b.title,
            page_count: b.page_count,
            edition: b.edition,
            binding: b.binding,
            language: b.language,
            published_date: b.published_date,
            description: b.description,
            description_clean: b.description_clean,
            codes: b.codes.into_iter().map(CodeResponse::from).collect(),
            service: b.service,
            colour: b.colour,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

/// A stored book with authors, tags, publisher and primary cover
#[derive(Debug, Serialize, ToSchema)]
pub struct BookDetailsResponse {
    #[serde(flatten)]
    pub book: BookResponse,
    pub authors: Vec<NamedResponse>,
    pub tags: Vec<NamedResponse>,
    pub publisher: Option<NamedResponse>,
    pub cover: Option<CoverResponse>,
}

impl From<BookDetails> for BookDetailsResponse {
    fn from(d: BookDetails) -> Self {
        Self {
            book: d.book.into(),
            authors: d.authors.into_iter().map(NamedResponse::from).collect(),
            tags: d.tags.into_iter().map(NamedResponse::from).collect(),
            publisher: d.publisher.map(NamedResponse::from),
            cover: d.primary_cover.map(CoverResponse::from),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookLinks {
    /// Stored books link to their page, others to a preview
    #[schema(example = "/books/9780441013593")]
    pub show: String,
}

/// A normalized provider search result
#[derive(Debug, Serialize, ToSchema)]
pub struct SearchBookResponse {
    #[schema(example = "9780441013593")]
    pub identifier: String,
    #[schema(example = "Dune")]
    pub title: Option<String>,
    #[schema(example = json!(["Frank Herbert"]))]
    pub authors: Vec<String>,
    #[schema(example = "Ace")]
    pub publisher: Option<String>,
    pub tags: Vec<String>,
    pub page_count: Option<i64>,
    pub published_date: Option<String>,
    pub description_clean: String,
    pub cover: Option<String>,
    #[schema(example = "ISBNdb")]
    pub service: String,
    pub links: BookLinks,
}

impl SearchBookResponse {
    fn new(record: BookRecord, stored: bool) -> Self {
        let show = if stored {
            format!("/books/{}", record.identifier)
        } else {
            format!("/books/preview/{}", record.identifier)
        };
        let cover = record.preferred_cover().map(str::to_string);

        Self {
            identifier: record.identifier,
            title: record.title,
            authors: record.authors.into_iter().map(|a| a.name).collect(),
            publisher: record.publisher.map(|p| p.name),
            tags: record.tags,
            page_count: record.page_count,
            published_date: record.published_date,
            description_clean: record.description_clean,
            cover,
            service: record.service,
            links: BookLinks { show },
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResponse {
    /// Total matches reported by the provider
    #[schema(example = 120)]
    pub total: u64,
    pub books: Vec<SearchBookResponse>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Free text. `author:` and `tag:` prefixes search by author or subject.
    #[param(example = "author:Frank Herbert")]
    pub q: Option<String>,
    /// Author name
    pub author: Option<String>,
    /// Subject or tag
    pub subject: Option<String>,
    /// One-based result page
    #[param(example = 1)]
    pub page: Option<u32>,
}

/// How a search term was interpreted, as stored in the search history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Query,
    Author,
    Tag,
}

impl SearchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchKind::Query => "query",
            SearchKind::Author => "author",
            SearchKind::Tag => "tag",
        }
    }
}

/// Turn the raw query string into provider search parameters.
///
/// `author:` and `tag:` prefixes on `q` take precedence over the separate
/// `author` and `subject` parameters. Returns the parameters and the kind
/// of the history entry to record, if any term was given.
pub fn parse_search(query: &SearchQuery) -> (SearchParams, Option<(String, SearchKind)>) {
    let non_empty = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let mut params = SearchParams {
        author: non_empty(&query.author),
        subject: non_empty(&query.subject),
        page: query.page.unwrap_or(1).clamp(1, MAX_SEARCH_PAGE),
        ..SearchParams::default()
    };

    let Some(term) = non_empty(&query.q) else {
        let history = params
            .author
            .as_ref()
            .map(|a| (format!("author:{}", a), SearchKind::Author))
            .or_else(|| {
                params
                    .subject
                    .as_ref()
                    .map(|s| (format!("tag:{}", s), SearchKind::Tag))
            });
        return (params, history);
    };

    let kind = if let Some(author) = term.strip_prefix("author:") {
        params.author = Some(author.trim().to_string());
        SearchKind::Author
    } else if let Some(tag) = term.strip_prefix("tag:") {
        params.subject = Some(tag.trim().to_string());
        SearchKind::Tag
    } else {
        params.query = Some(term.clone());
        SearchKind::Query
    };

    (params, Some((term, kind)))
}

// =============================================================================
// Handlers
// =============================================================================

/// Search the configured book provider
///
/// Results are cached and imported in the background. When an acting user is
/// given, the term is recorded in their search history.
#[utoipa::path(
    get,
    path = "/api/v1/books/search",
    tag = "books",
    params(SearchQuery),
    responses(
        (status = 200, description = "Search results", body = SearchResponse),
        (status = 401, description = "Unknown user", body = ErrorResponse),
        (status = 422, description = "No search term", body = ErrorResponse),
        (status = 502, description = "Provider failure", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn search_books<D: Database, P: BookProvider>(
    State(state): State<AppState<D, P>>,
    user: Option<CurrentUser>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiFailure> {
    let (params, history) = parse_search(&query);
    if params.is_empty() {
        return Err(failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            "A search term is required.",
        ));
    }

    if let (Some(CurrentUser(user)), Some((term, kind))) = (&user, &history) {
        let recorded = state
            .db()
            .searches()
            .record(&user.id, term, Some(kind.as_str()))
            .await;
        if let Err(e) = recorded {
            warn!(error = %e, "Failed to record search");
        }
    }

    let results = SearchBooksFromApi::new(state.ctx())
        .handle(&params)
        .await
        .map_err(action_failure)?;

    let identifiers: Vec<String> = results
        .books
        .iter()
        .map(|b| b.identifier.clone())
        .collect();
    let stored = state
        .db()
        .books()
        .existing_identifiers(&identifiers)
        .await
        .map_err(db_failure)?;

    let books = results
        .books
        .into_iter()
        .map(|record| {
            let is_stored = stored.contains(&record.identifier);
            SearchBookResponse::new(record, is_stored)
        })
        .collect();

    Ok(Json(SearchResponse {
        total: results.total,
        books,
    }))
}

/// Get a book, importing it from the provider if it is not stored yet
#[utoipa::path(
    get,
    path = "/api/v1/books/{identifier}",
    tag = "books",
    params(
        ("identifier" = String, Path, description = "Book identifier, usually the ISBN-13")
    ),
    responses(
        (status = 200, description = "Book found", body = BookDetailsResponse),
        (status = 404, description = "No data for identifier", body = ErrorResponse),
        (status = 502, description = "Provider failure", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_book<D: Database, P: BookProvider>(
    State(state): State<AppState<D, P>>,
    Path(identifier): Path<String>,
) -> Result<Json<BookDetailsResponse>, ApiFailure> {
    let details = FetchOrCreateBook::new(state.ctx())
        .handle(&identifier)
        .await
        .map_err(action_failure)?;

    Ok(Json(details.into()))
}
