//! Single-purpose operations behind the HTTP handlers and background jobs.
//!
//! Each action is a small struct borrowing the shared [`ActionContext`] with
//! an async `handle` method.

mod context;
mod cover;
mod dashboard;
mod error;
mod fetch;
mod import;
mod library;
mod search;
mod settings;

#[cfg(test)]
pub(crate) mod test_support;

#[cfg(test)]
mod settings_test;

pub use context::{
    ActionContext, BOOK_TTL, BookCache, LOOKUP_TTL, SEARCH_TTL, book_key, lookup_key, search_key,
};
pub use cover::ImportBookCover;
pub use dashboard::{Dashboard, DashboardData, DashboardStats};
pub use error::{ActionError, ActionResult};
pub use fetch::FetchOrCreateBook;
pub use import::{ImportBookFromData, ImportSource, RelationCache};
pub use library::{AddBookToUser, RemoveBookFromUser, UpdateUserBookStatus};
pub use search::{SearchBooksFromApi, SearchResults};
pub use settings::UpdateUserSettings;
