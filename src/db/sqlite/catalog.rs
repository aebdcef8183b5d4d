//! SQLite CatalogRepository implementation.
//!
//! Authors, tags and publishers are plain `(id, name UNIQUE)` tables, so they
//! share one first-or-create query shape.

use sqlx::{Row, SqlitePool};

use crate::db::utils::generate_entity_id;
use crate::db::{Author, CatalogRepository, DbError, DbResult, Publisher, Tag};

/// SQLx-backed catalog repository.
pub struct SqliteCatalogRepository<'a> {
    pub(crate) pool: &'a SqlitePool,
}

impl<'a> SqliteCatalogRepository<'a> {
    async fn first_or_create(&self, table: &'static str, name: &str) -> DbResult<(String, String)> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DbError::Validation {
                message: format!("{} name must not be empty", table),
            });
        }

        sqlx::query(&format!(
            "INSERT OR IGNORE INTO {} (id, name) VALUES (?, ?)",
            table
        ))
        .bind(generate_entity_id())
        .bind(name)
        .execute(self.pool)
        .await?;

        let row = sqlx::query(&format!("SELECT id, name FROM {} WHERE name = ?", table))
            .bind(name)
            .fetch_one(self.pool)
            .await?;

        Ok((row.get("id"), row.get("name")))
    }
}

impl<'a> CatalogRepository for SqliteCatalogRepository<'a> {
    async fn author_first_or_create(&self, name: &str) -> DbResult<Author> {
        let (id, name) = self.first_or_create("author", name).await?;
        Ok(Author { id, name })
    }

    async fn tag_first_or_create(&self, name: &str) -> DbResult<Tag> {
        let (id, name) = self.first_or_create("tag", name).await?;
        Ok(Tag { id, name })
    }

    async fn publisher_first_or_create(&self, name: &str) -> DbResult<Publisher> {
        let (id, name) = self.first_or_create("publisher", name).await?;
        Ok(Publisher { id, name })
    }
}
