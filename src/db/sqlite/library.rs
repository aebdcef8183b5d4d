//! SQLite LibraryRepository implementation over the `book_user` pivot.

use std::collections::HashMap;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::helpers::{BOOK_COLUMNS, book_from_row, build_limit_offset_clause, build_order_clause};
use crate::db::utils::current_timestamp;
use crate::db::{
    DbError, DbResult, LibraryEntry, LibraryQuery, LibraryRepository, ListResult, NamedCount,
    SortOrder, UserBookStatus,
};

/// SQLx-backed library repository.
pub struct SqliteLibraryRepository<'a> {
    pub(crate) pool: &'a SqlitePool,
}

fn parse_status(raw: &str) -> DbResult<UserBookStatus> {
    UserBookStatus::from_str(raw).map_err(|message| DbError::InvalidData {
        message,
        help: "Valid statuses: PlanToRead, Reading, Completed, OnHold, Dropped".to_string(),
    })
}

fn entry_from_row(row: &SqliteRow) -> DbResult<LibraryEntry> {
    let status: String = row.get("pivot_status");
    Ok(LibraryEntry {
        book: book_from_row(row)?,
        status: parse_status(&status)?,
        added_at: row.get("pivot_created_at"),
        updated_at: row.get("pivot_updated_at"),
    })
}

fn named_counts(rows: Vec<SqliteRow>) -> Vec<NamedCount> {
    rows.into_iter()
        .map(|row| {
            let count: i64 = row.get("total");
            NamedCount {
                id: row.get("id"),
                name: row.get("name"),
                count: count as usize,
            }
        })
        .collect()
}

impl<'a> LibraryRepository for SqliteLibraryRepository<'a> {
    async fn entry(&self, user_id: &str, book_id: &str) -> DbResult<Option<LibraryEntry>> {
        let sql = format!(
            "SELECT {}, bu.status AS pivot_status, bu.created_at AS pivot_created_at, \
             bu.updated_at AS pivot_updated_at \
             FROM book_user bu JOIN book b ON b.id = bu.book_id \
             WHERE bu.user_id = ? AND bu.book_id = ?",
            BOOK_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(book_id)
            .fetch_optional(self.pool)
            .await?;

        row.as_ref().map(entry_from_row).transpose()
    }

    async fn count(&self, user_id: &str) -> DbResult<usize> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_user WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;
        Ok(total as usize)
    }

    async fn attach(&self, user_id: &str, book_id: &str, status: UserBookStatus) -> DbResult<()> {
        let now = current_timestamp();

        sqlx::query(
            "INSERT INTO book_user (user_id, book_id, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(book_id)
        .bind(status.to_string())
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::Constraint { message } if message.contains("UNIQUE") => {
                DbError::AlreadyExists {
                    entity_type: "LibraryEntry".to_string(),
                    id: format!("{}/{}", user_id, book_id),
                }
            }
            other => other,
        })?;

        Ok(())
    }

    async fn detach(&self, user_id: &str, book_id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM book_user WHERE user_id = ? AND book_id = ?")
            .bind(user_id)
            .bind(book_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_status(
        &self,
        user_id: &str,
        book_id: &str,
        status: UserBookStatus,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE book_user SET status = ?, updated_at = ? WHERE user_id = ? AND book_id = ?",
        )
        .bind(status.to_string())
        .bind(current_timestamp())
        .bind(user_id)
        .bind(book_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, user_id: &str, query: &LibraryQuery) -> DbResult<ListResult<LibraryEntry>> {
        let allowed_fields = ["title", "status", "published_date", "added_at"];

        let mut page = query.page.clone();
        if page.sort_by.is_none() && page.sort_order.is_none() {
            page.sort_order = Some(SortOrder::Desc);
        }
        let order_clause = build_order_clause(&page, &allowed_fields, "bu.created_at");
        let limit_clause = build_limit_offset_clause(&page);

        let status_filter = query.status.map(|s| s.to_string());
        let where_clause = if status_filter.is_some() {
            "WHERE bu.user_id = ? AND bu.status = ?"
        } else {
            "WHERE bu.user_id = ?"
        };

        let sql = format!(
            "SELECT {}, bu.status AS pivot_status, bu.created_at AS pivot_created_at, \
             bu.updated_at AS pivot_updated_at \
             FROM book_user bu JOIN book b ON b.id = bu.book_id \
             {} {}, bu.rowid DESC {}",
            BOOK_COLUMNS, where_clause, order_clause, limit_clause
        );
        let count_sql = format!("SELECT COUNT(*) FROM book_user bu {}", where_clause);

        let mut sql_query = sqlx::query(&sql).bind(user_id);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(user_id);
        if let Some(status) = &status_filter {
            sql_query = sql_query.bind(status);
            count_query = count_query.bind(status);
        }

        let rows = sql_query.fetch_all(self.pool).await?;
        let items = rows
            .iter()
            .map(entry_from_row)
            .collect::<DbResult<Vec<_>>>()?;

        let total = count_query.fetch_one(self.pool).await?;

        Ok(ListResult {
            items,
            total: total as usize,
            limit: page.limit,
            offset: page.offset.unwrap_or(0),
        })
    }

    async fn status_counts(&self, user_id: &str) -> DbResult<HashMap<UserBookStatus, usize>> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS total FROM book_user WHERE user_id = ? GROUP BY status",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        let mut counts = HashMap::new();
        for row in rows {
            let status: String = row.get("status");
            let total: i64 = row.get("total");
            counts.insert(parse_status(&status)?, total as usize);
        }
        Ok(counts)
    }

    async fn top_tags(&self, user_id: &str, limit: usize) -> DbResult<Vec<NamedCount>> {
        let rows = sqlx::query(
            "SELECT t.id, t.name, COUNT(*) AS total FROM book_user bu \
             JOIN book_tag bt ON bt.book_id = bu.book_id \
             JOIN tag t ON t.id = bt.tag_id \
             WHERE bu.user_id = ? \
             GROUP BY t.id, t.name ORDER BY total DESC, t.name ASC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(self.pool)
        .await?;

        Ok(named_counts(rows))
    }

    async fn top_completed_authors(&self, user_id: &str, limit: usize) -> DbResult<Vec<NamedCount>> {
        let rows = sqlx::query(
            "SELECT a.id, a.name, COUNT(*) AS total FROM book_user bu \
             JOIN author_book ab ON ab.book_id = bu.book_id \
             JOIN author a ON a.id = ab.author_id \
             WHERE bu.user_id = ? AND bu.status = ? \
             GROUP BY a.id, a.name ORDER BY total DESC, a.name ASC LIMIT ?",
        )
        .bind(user_id)
        .bind(UserBookStatus::Completed.to_string())
        .bind(limit as i64)
        .fetch_all(self.pool)
        .await?;

        Ok(named_counts(rows))
    }
}
