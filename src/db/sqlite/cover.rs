//! SQLite CoverRepository implementation.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::db::utils::{current_timestamp, generate_entity_id};
use crate::db::{Cover, CoverRepository, DbResult};

const COVER_COLUMNS: &str = "id, book_id, user_id, path, content_type, source_url, created_at";

/// SQLx-backed cover repository.
pub struct SqliteCoverRepository<'a> {
    pub(crate) pool: &'a SqlitePool,
}

fn cover_from_row(row: &SqliteRow) -> Cover {
    Cover {
        id: row.get("id"),
        book_id: row.get("book_id"),
        user_id: row.get("user_id"),
        path: row.get("path"),
        content_type: row.get("content_type"),
        source_url: row.get("source_url"),
        created_at: row.get("created_at"),
    }
}

/// Fill in a generated id and timestamp where the caller left them empty.
fn prepared(cover: &Cover) -> Cover {
    Cover {
        id: if cover.id.is_empty() {
            generate_entity_id()
        } else {
            cover.id.clone()
        },
        created_at: if cover.created_at.is_empty() {
            current_timestamp()
        } else {
            cover.created_at.clone()
        },
        ..cover.clone()
    }
}

impl<'a> CoverRepository for SqliteCoverRepository<'a> {
    async fn primary(&self, book_id: &str) -> DbResult<Option<Cover>> {
        let sql = format!(
            "SELECT {} FROM cover WHERE book_id = ? AND user_id IS NULL ORDER BY created_at DESC LIMIT 1",
            COVER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(book_id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.as_ref().map(cover_from_row))
    }

    async fn replace_primary(&self, cover: &Cover) -> DbResult<(Cover, Option<Cover>)> {
        let previous = self.primary(&cover.book_id).await?;
        let cover = Cover {
            user_id: None,
            ..prepared(cover)
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM cover WHERE book_id = ? AND user_id IS NULL")
            .bind(&cover.book_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO cover (id, book_id, user_id, path, content_type, source_url, created_at) VALUES (?, ?, NULL, ?, ?, ?, ?)",
        )
        .bind(&cover.id)
        .bind(&cover.book_id)
        .bind(&cover.path)
        .bind(&cover.content_type)
        .bind(&cover.source_url)
        .bind(&cover.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((cover, previous))
    }

    async fn create(&self, cover: &Cover) -> DbResult<Cover> {
        let cover = prepared(cover);

        sqlx::query(
            "INSERT INTO cover (id, book_id, user_id, path, content_type, source_url, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&cover.id)
        .bind(&cover.book_id)
        .bind(&cover.user_id)
        .bind(&cover.path)
        .bind(&cover.content_type)
        .bind(&cover.source_url)
        .bind(&cover.created_at)
        .execute(self.pool)
        .await?;

        Ok(cover)
    }

    async fn list_for_user(&self, user_id: &str, book_id: &str) -> DbResult<Vec<Cover>> {
        let sql = format!(
            "SELECT {} FROM cover WHERE user_id = ? AND book_id = ? ORDER BY created_at",
            COVER_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(book_id)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.iter().map(cover_from_row).collect())
    }

    async fn delete_for_user(&self, user_id: &str, book_id: &str) -> DbResult<Vec<Cover>> {
        let covers = self.list_for_user(user_id, book_id).await?;

        sqlx::query("DELETE FROM cover WHERE user_id = ? AND book_id = ?")
            .bind(user_id)
            .bind(book_id)
            .execute(self.pool)
            .await?;

        Ok(covers)
    }
}
