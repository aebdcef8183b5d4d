//! Repository traits for data access abstraction.
//!
//! These traits define the contract for data access, allowing different
//! storage backends to be swapped without changing business logic.

use std::collections::{HashMap, HashSet};
use std::future::Future;

use serde_json::{Map, Value};

use crate::db::{
    DbResult,
    models::{
        Activity, Author, Book, BookDetails, Cover, LibraryEntry, LibraryQuery, ListResult,
        NamedCount, NewActivity, NewUser, PageSort, PreviousSearch, Publisher, Tag, User,
        UserBookStatus,
    },
};

/// Repository for User operations.
pub trait UserRepository {
    /// Register a new user. Email must be unique.
    fn create(&self, user: &NewUser) -> impl Future<Output = DbResult<User>> + Send;

    /// Get a user by ID.
    fn get(&self, id: &str) -> impl Future<Output = DbResult<User>> + Send;

    /// Set the user's subscription plan key.
    fn set_plan(&self, id: &str, plan: &str) -> impl Future<Output = DbResult<User>> + Send;

    /// Replace the user's stored settings object.
    fn update_settings(
        &self,
        id: &str,
        settings: &Map<String, Value>,
    ) -> impl Future<Output = DbResult<User>> + Send;
}

/// Repository for Book rows and their author/tag pivots.
pub trait BookRepository {
    /// Find a book by its unique identifier (usually ISBN-13).
    fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> impl Future<Output = DbResult<Option<Book>>> + Send;

    /// Get a book by ID.
    fn get(&self, id: &str) -> impl Future<Output = DbResult<Book>> + Send;

    /// Get a book with authors, tags, publisher and primary cover loaded.
    fn details(&self, id: &str) -> impl Future<Output = DbResult<BookDetails>> + Send;

    /// Insert a new book. An empty `id` is replaced by a generated one.
    fn create(&self, book: &Book) -> impl Future<Output = DbResult<Book>> + Send;

    /// Overwrite the stored columns of an existing book.
    fn update(&self, book: &Book) -> impl Future<Output = DbResult<Book>> + Send;

    /// Insert (empty `id`) or update a book and replace its author and tag
    /// pivots, all in one transaction.
    fn store(
        &self,
        book: &Book,
        author_ids: &[String],
        tag_ids: &[String],
    ) -> impl Future<Output = DbResult<Book>> + Send;

    /// Record the average colour of the book's primary cover.
    fn set_colour(&self, id: &str, colour: &str) -> impl Future<Output = DbResult<()>> + Send;

    /// Replace the book's authors with the given author IDs.
    fn replace_authors(
        &self,
        book_id: &str,
        author_ids: &[String],
    ) -> impl Future<Output = DbResult<()>> + Send;

    /// Replace the book's tags with the given tag IDs.
    fn replace_tags(
        &self,
        book_id: &str,
        tag_ids: &[String],
    ) -> impl Future<Output = DbResult<()>> + Send;

    /// Which of the given identifiers are already stored.
    fn existing_identifiers(
        &self,
        identifiers: &[String],
    ) -> impl Future<Output = DbResult<HashSet<String>>> + Send;
}

/// Repository for the name-keyed catalog tables (authors, tags, publishers).
pub trait CatalogRepository {
    fn author_first_or_create(&self, name: &str) -> impl Future<Output = DbResult<Author>> + Send;

    fn tag_first_or_create(&self, name: &str) -> impl Future<Output = DbResult<Tag>> + Send;

    fn publisher_first_or_create(
        &self,
        name: &str,
    ) -> impl Future<Output = DbResult<Publisher>> + Send;
}

/// Repository for the `book_user` pivot.
pub trait LibraryRepository {
    /// The user's entry for a book, if it is in their library.
    fn entry(
        &self,
        user_id: &str,
        book_id: &str,
    ) -> impl Future<Output = DbResult<Option<LibraryEntry>>> + Send;

    /// Number of books in the user's library.
    fn count(&self, user_id: &str) -> impl Future<Output = DbResult<usize>> + Send;

    /// Attach a book to the user's library.
    fn attach(
        &self,
        user_id: &str,
        book_id: &str,
        status: UserBookStatus,
    ) -> impl Future<Output = DbResult<()>> + Send;

    /// Detach a book. Returns false when it was not attached.
    fn detach(&self, user_id: &str, book_id: &str) -> impl Future<Output = DbResult<bool>> + Send;

    /// Update the reading status. Returns false when the book is not attached.
    fn set_status(
        &self,
        user_id: &str,
        book_id: &str,
        status: UserBookStatus,
    ) -> impl Future<Output = DbResult<bool>> + Send;

    /// List library entries, newest pivot first unless sorted otherwise.
    fn list(
        &self,
        user_id: &str,
        query: &LibraryQuery,
    ) -> impl Future<Output = DbResult<ListResult<LibraryEntry>>> + Send;

    /// Number of entries per reading status. Missing statuses are absent.
    fn status_counts(
        &self,
        user_id: &str,
    ) -> impl Future<Output = DbResult<HashMap<UserBookStatus, usize>>> + Send;

    /// Most frequent tags across the user's library.
    fn top_tags(
        &self,
        user_id: &str,
        limit: usize,
    ) -> impl Future<Output = DbResult<Vec<NamedCount>>> + Send;

    /// Authors with the most `Completed` books in the user's library.
    fn top_completed_authors(
        &self,
        user_id: &str,
        limit: usize,
    ) -> impl Future<Output = DbResult<Vec<NamedCount>>> + Send;
}

/// Repository for cover metadata rows.
pub trait CoverRepository {
    /// The book's primary cover (`user_id IS NULL`).
    fn primary(&self, book_id: &str) -> impl Future<Output = DbResult<Option<Cover>>> + Send;

    /// Store `cover` as the book's primary cover, removing the previous one.
    /// Returns the new row and the replaced one, if any.
    fn replace_primary(
        &self,
        cover: &Cover,
    ) -> impl Future<Output = DbResult<(Cover, Option<Cover>)>> + Send;

    /// Insert a cover row as-is.
    fn create(&self, cover: &Cover) -> impl Future<Output = DbResult<Cover>> + Send;

    /// Custom covers a user uploaded for a book.
    fn list_for_user(
        &self,
        user_id: &str,
        book_id: &str,
    ) -> impl Future<Output = DbResult<Vec<Cover>>> + Send;

    /// Delete a user's custom covers for a book, returning the deleted rows.
    fn delete_for_user(
        &self,
        user_id: &str,
        book_id: &str,
    ) -> impl Future<Output = DbResult<Vec<Cover>>> + Send;
}

/// Repository for the activity feed.
pub trait ActivityRepository {
    fn log(&self, activity: &NewActivity) -> impl Future<Output = DbResult<Activity>> + Send;

    /// Activities for a user, newest first.
    fn list(
        &self,
        user_id: &str,
        page: &PageSort,
    ) -> impl Future<Output = DbResult<ListResult<Activity>>> + Send;
}

/// Searches kept per user; older entries are dropped on record.
pub const MAX_SEARCH_HISTORY: usize = 50;

/// Repository for previous searches.
pub trait SearchHistoryRepository {
    /// Record a search. A previous identical term for the user is replaced
    /// and only the latest [`MAX_SEARCH_HISTORY`] entries are kept.
    fn record(
        &self,
        user_id: &str,
        search_term: &str,
        search_type: Option<&str>,
    ) -> impl Future<Output = DbResult<PreviousSearch>> + Send;

    /// Most recent searches for a user.
    fn recent(
        &self,
        user_id: &str,
        limit: usize,
    ) -> impl Future<Output = DbResult<Vec<PreviousSearch>>> + Send;
}

/// Combined database interface.
///
/// Repositories are exposed through associated types so callers stay
/// statically dispatched.
pub trait Database: Send + Sync + 'static {
    type Users<'a>: UserRepository + Send + Sync
    where
        Self: 'a;
    type Books<'a>: BookRepository + Send + Sync
    where
        Self: 'a;
    type Catalog<'a>: CatalogRepository + Send + Sync
    where
        Self: 'a;
    type Library<'a>: LibraryRepository + Send + Sync
    where
        Self: 'a;
    type Covers<'a>: CoverRepository + Send + Sync
    where
        Self: 'a;
    type Activities<'a>: ActivityRepository + Send + Sync
    where
        Self: 'a;
    type Searches<'a>: SearchHistoryRepository + Send + Sync
    where
        Self: 'a;

    /// Run pending migrations.
    fn migrate(&self) -> impl Future<Output = DbResult<()>> + Send;

    fn users(&self) -> Self::Users<'_>;

    fn books(&self) -> Self::Books<'_>;

    fn catalog(&self) -> Self::Catalog<'_>;

    fn library(&self) -> Self::Library<'_>;

    fn covers(&self) -> Self::Covers<'_>;

    fn activities(&self) -> Self::Activities<'_>;

    fn searches(&self) -> Self::Searches<'_>;
}
