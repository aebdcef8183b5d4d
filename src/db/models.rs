//! Domain models for the library database.
//!
//! These models are storage-agnostic and represent the core entities
//! used throughout the application.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Query Types for Pagination and Sorting
// =============================================================================

/// Sort order for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Base pagination and sorting options - composed into entity-specific queries.
#[derive(Debug, Clone, Default)]
pub struct PageSort {
    /// Maximum number of items to return.
    pub limit: Option<usize>,
    /// Number of items to skip.
    pub offset: Option<usize>,
    /// Field to sort by (validated per entity type).
    pub sort_by: Option<String>,
    /// Sort order (ascending or descending).
    pub sort_order: Option<SortOrder>,
}

impl PageSort {
    /// One-based page of `per_page` items.
    pub fn page(page: usize, per_page: usize) -> Self {
        Self {
            limit: Some(per_page),
            offset: Some(page.saturating_sub(1).saturating_mul(per_page)),
            ..Self::default()
        }
    }
}

/// Query for a user's library - pagination + status filter.
#[derive(Debug, Clone, Default)]
pub struct LibraryQuery {
    pub page: PageSort,
    /// Only entries with this reading status.
    pub status: Option<UserBookStatus>,
}

/// Result of a paginated list query.
#[derive(Debug, Clone)]
pub struct ListResult<T> {
    /// The items in this page.
    pub items: Vec<T>,
    /// Total count of all matching items (before pagination).
    pub total: usize,
    /// Limit that was applied.
    pub limit: Option<usize>,
    /// Offset that was applied.
    pub offset: usize,
}

/// 8-character hex ID type used for all entities.
pub type Id = String;

// =============================================================================
// Users
// =============================================================================

/// A library owner. Authentication lives outside this service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    pub name: String,
    pub email: String,
    /// Subscription plan key, resolved against the plan catalog.
    pub plan: String,
    pub settings: Map<String, Value>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields required to register a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub plan: Option<String>,
}

// =============================================================================
// Books and their relations
// =============================================================================

/// A typed identifier such as `ISBN_13` or `ISBN_10`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierCode {
    #[serde(rename = "type")]
    pub code_type: String,
    pub identifier: Option<String>,
}

impl IdentifierCode {
    pub fn new(code_type: &str, identifier: Option<String>) -> Self {
        Self {
            code_type: code_type.to_string(),
            identifier,
        }
    }
}

/// A stored book. `identifier` is unique and usually the ISBN-13.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: Id,
    pub identifier: String,
    pub title: Option<String>,
    pub page_count: Option<i64>,
    pub edition: Option<String>,
    pub binding: Option<String>,
    pub language: Option<String>,
    pub published_date: Option<String>,
    pub description: Option<String>,
    pub description_clean: Option<String>,
    #[serde(default)]
    pub codes: Vec<IdentifierCode>,
    /// Provider the record was imported from.
    pub service: Option<String>,
    pub publisher_id: Option<Id>,
    /// Average cover colour as `#rrggbb`, set after the cover import.
    #[serde(default)]
    pub colour: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: Id,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Id,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publisher {
    pub id: Id,
    pub name: String,
}

/// A book together with its loaded relations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDetails {
    pub book: Book,
    pub authors: Vec<Author>,
    pub tags: Vec<Tag>,
    pub publisher: Option<Publisher>,
    pub primary_cover: Option<Cover>,
}

/// Cover image metadata. `user_id == None` marks the book's primary cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cover {
    pub id: Id,
    pub book_id: Id,
    pub user_id: Option<Id>,
    pub path: String,
    pub content_type: Option<String>,
    pub source_url: Option<String>,
    pub created_at: String,
}

// =============================================================================
// Library pivot
// =============================================================================

/// Reading status stored on the `book_user` pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UserBookStatus {
    #[default]
    PlanToRead,
    Reading,
    Completed,
    OnHold,
    Dropped,
}

impl UserBookStatus {
    pub const ALL: [UserBookStatus; 5] = [
        UserBookStatus::PlanToRead,
        UserBookStatus::Reading,
        UserBookStatus::Completed,
        UserBookStatus::OnHold,
        UserBookStatus::Dropped,
    ];
}

impl std::fmt::Display for UserBookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UserBookStatus::PlanToRead => "PlanToRead",
            UserBookStatus::Reading => "Reading",
            UserBookStatus::Completed => "Completed",
            UserBookStatus::OnHold => "OnHold",
            UserBookStatus::Dropped => "Dropped",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for UserBookStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PlanToRead" => Ok(UserBookStatus::PlanToRead),
            "Reading" => Ok(UserBookStatus::Reading),
            "Completed" => Ok(UserBookStatus::Completed),
            "OnHold" => Ok(UserBookStatus::OnHold),
            "Dropped" => Ok(UserBookStatus::Dropped),
            _ => Err(format!("Invalid reading status: {}", s)),
        }
    }
}

/// A book as it sits in a user's library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub book: Book,
    pub status: UserBookStatus,
    pub added_at: String,
    pub updated_at: String,
}

// =============================================================================
// Activity log and search history
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityType {
    #[serde(rename = "book.added")]
    BookAdded,
    #[serde(rename = "book.removed")]
    BookRemoved,
    #[serde(rename = "book.status.updated")]
    BookStatusUpdated,
    #[serde(rename = "user.settings.updated")]
    SettingsUpdated,
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActivityType::BookAdded => "book.added",
            ActivityType::BookRemoved => "book.removed",
            ActivityType::BookStatusUpdated => "book.status.updated",
            ActivityType::SettingsUpdated => "user.settings.updated",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "book.added" => Ok(ActivityType::BookAdded),
            "book.removed" => Ok(ActivityType::BookRemoved),
            "book.status.updated" => Ok(ActivityType::BookStatusUpdated),
            "user.settings.updated" => Ok(ActivityType::SettingsUpdated),
            _ => Err(format!("Invalid activity type: {}", s)),
        }
    }
}

/// An entry in a user's activity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: Id,
    pub user_id: Id,
    pub activity_type: ActivityType,
    pub subject_type: Option<String>,
    pub subject_id: Option<Id>,
    pub properties: Value,
    pub created_at: String,
}

/// Fields for logging a new activity.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: Id,
    pub activity_type: ActivityType,
    pub subject_type: Option<String>,
    pub subject_id: Option<Id>,
    pub properties: Value,
}

/// A search term a user ran against the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviousSearch {
    pub id: Id,
    pub user_id: Id,
    pub search_term: String,
    /// `query`, `author` or `tag`.
    pub search_type: Option<String>,
    pub created_at: String,
}

/// A tag or author name with how often it occurs in a library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedCount {
    pub id: Id,
    pub name: String,
    pub count: usize,
}
