//! SQLite implementation of the database traits.
//!
//! This module provides a SQLite-backed implementation of the repository
//! traits defined in the parent module.

mod activity;
mod book;
mod catalog;
mod connection;
mod cover;
mod helpers;
mod library;
mod search;
mod user;

#[cfg(test)]
mod library_test;

pub use activity::SqliteActivityRepository;
pub use book::SqliteBookRepository;
pub use catalog::SqliteCatalogRepository;
pub use connection::SqliteDatabase;
pub use cover::SqliteCoverRepository;
pub use library::SqliteLibraryRepository;
pub use search::SqliteSearchHistoryRepository;
pub use user::SqliteUserRepository;
