//! SQLite SearchHistoryRepository implementation.

use sqlx::{Row, SqlitePool};

use crate::db::utils::{current_timestamp, generate_entity_id};
use crate::db::{DbResult, MAX_SEARCH_HISTORY, PreviousSearch, SearchHistoryRepository};

/// SQLx-backed search history repository.
pub struct SqliteSearchHistoryRepository<'a> {
    pub(crate) pool: &'a SqlitePool,
}

impl<'a> SearchHistoryRepository for SqliteSearchHistoryRepository<'a> {
    async fn record(
        &self,
        user_id: &str,
        search_term: &str,
        search_type: Option<&str>,
    ) -> DbResult<PreviousSearch> {
        let id = generate_entity_id();
        let created_at = current_timestamp();

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM previous_search WHERE user_id = ? AND search_term = ?")
            .bind(user_id)
            .bind(search_term)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO previous_search (id, user_id, search_term, type, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(search_term)
        .bind(search_type)
        .bind(&created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "DELETE FROM previous_search WHERE user_id = ? AND rowid NOT IN ( \
             SELECT rowid FROM previous_search WHERE user_id = ? \
             ORDER BY created_at DESC, rowid DESC LIMIT ?)",
        )
        .bind(user_id)
        .bind(user_id)
        .bind(MAX_SEARCH_HISTORY as i64)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(PreviousSearch {
            id,
            user_id: user_id.to_string(),
            search_term: search_term.to_string(),
            search_type: search_type.map(str::to_string),
            created_at,
        })
    }

    async fn recent(&self, user_id: &str, limit: usize) -> DbResult<Vec<PreviousSearch>> {
        let rows = sqlx::query(
            "SELECT id, user_id, search_term, type, created_at FROM previous_search \
             WHERE user_id = ? ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PreviousSearch {
                id: row.get("id"),
                user_id: row.get("user_id"),
                search_term: row.get("search_term"),
                search_type: row.get("type"),
                created_at: row.get("created_at"),
            })
            .collect())
    }
}
