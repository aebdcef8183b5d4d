//! SQLite database connection and migration management.

use std::path::Path;
use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use super::{
    SqliteActivityRepository, SqliteBookRepository, SqliteCatalogRepository,
    SqliteCoverRepository, SqliteLibraryRepository, SqliteSearchHistoryRepository,
    SqliteUserRepository,
};
use crate::db::{Database, DbError, DbResult};

/// SQLite database implementation.
///
/// Provides access to repositories via associated types, avoiding dynamic dispatch.
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Open (or create) a database file at the given path.
    pub async fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| DbError::Connection {
                message: format!("{}: {}", path.as_ref().display(), e),
            })?;

        Ok(Self { pool })
    }

    /// Create an in-memory database (useful for testing).
    ///
    /// Every pooled connection to `sqlite::memory:` gets its own database, so
    /// the pool holds exactly one connection that never expires.
    pub async fn in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| DbError::Connection {
                message: e.to_string(),
            })?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| DbError::Connection {
                message: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    /// Direct access to the pool for tests and ad-hoc queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl Database for SqliteDatabase {
    type Users<'a> = SqliteUserRepository<'a>;
    type Books<'a> = SqliteBookRepository<'a>;
    type Catalog<'a> = SqliteCatalogRepository<'a>;
    type Library<'a> = SqliteLibraryRepository<'a>;
    type Covers<'a> = SqliteCoverRepository<'a>;
    type Activities<'a> = SqliteActivityRepository<'a>;
    type Searches<'a> = SqliteSearchHistoryRepository<'a>;

    async fn migrate(&self) -> DbResult<()> {
        sqlx::migrate!("./data/sql/sqlite")
            .run(&self.pool)
            .await
            .map_err(|e| DbError::Migration {
                message: e.to_string(),
            })
    }

    fn users(&self) -> Self::Users<'_> {
        SqliteUserRepository { pool: &self.pool }
    }

    fn books(&self) -> Self::Books<'_> {
        SqliteBookRepository { pool: &self.pool }
    }

    fn catalog(&self) -> Self::Catalog<'_> {
        SqliteCatalogRepository { pool: &self.pool }
    }

    fn library(&self) -> Self::Library<'_> {
        SqliteLibraryRepository { pool: &self.pool }
    }

    fn covers(&self) -> Self::Covers<'_> {
        SqliteCoverRepository { pool: &self.pool }
    }

    fn activities(&self) -> Self::Activities<'_> {
        SqliteActivityRepository { pool: &self.pool }
    }

    fn searches(&self) -> Self::Searches<'_> {
        SqliteSearchHistoryRepository { pool: &self.pool }
    }
}
