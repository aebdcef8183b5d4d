//! SQLite ActivityRepository implementation.

use std::str::FromStr;

use sqlx::{Row, SqlitePool};

use super::helpers::build_limit_offset_clause;
use crate::db::utils::{current_timestamp, generate_entity_id};
use crate::db::{
    Activity, ActivityRepository, ActivityType, DbError, DbResult, ListResult, NewActivity,
    PageSort,
};

/// SQLx-backed activity repository.
pub struct SqliteActivityRepository<'a> {
    pub(crate) pool: &'a SqlitePool,
}

impl<'a> ActivityRepository for SqliteActivityRepository<'a> {
    async fn log(&self, activity: &NewActivity) -> DbResult<Activity> {
        let id = generate_entity_id();
        let created_at = current_timestamp();
        let properties =
            serde_json::to_string(&activity.properties).map_err(|e| DbError::Database {
                message: format!("Failed to serialize activity properties: {}", e),
            })?;

        sqlx::query(
            "INSERT INTO activity (id, user_id, type, subject_type, subject_id, properties, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&activity.user_id)
        .bind(activity.activity_type.to_string())
        .bind(&activity.subject_type)
        .bind(&activity.subject_id)
        .bind(&properties)
        .bind(&created_at)
        .execute(self.pool)
        .await?;

        Ok(Activity {
            id,
            user_id: activity.user_id.clone(),
            activity_type: activity.activity_type,
            subject_type: activity.subject_type.clone(),
            subject_id: activity.subject_id.clone(),
            properties: activity.properties.clone(),
            created_at,
        })
    }

    async fn list(&self, user_id: &str, page: &PageSort) -> DbResult<ListResult<Activity>> {
        // Insertion order breaks ties within the same second.
        let sql = format!(
            "SELECT id, user_id, type, subject_type, subject_id, properties, created_at \
             FROM activity WHERE user_id = ? ORDER BY created_at DESC, rowid DESC {}",
            build_limit_offset_clause(page)
        );

        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(self.pool)
            .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let activity_type: String = row.get("type");
            let properties: String = row.get("properties");
            items.push(Activity {
                id: row.get("id"),
                user_id: row.get("user_id"),
                activity_type: ActivityType::from_str(&activity_type).map_err(|message| {
                    DbError::InvalidData {
                        message,
                        help: "Activity rows must use a known activity type".to_string(),
                    }
                })?,
                subject_type: row.get("subject_type"),
                subject_id: row.get("subject_id"),
                properties: serde_json::from_str(&properties).unwrap_or_default(),
                created_at: row.get("created_at"),
            });
        }

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activity WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;

        Ok(ListResult {
            items,
            total: total as usize,
            limit: page.limit,
            offset: page.offset.unwrap_or(0),
        })
    }
}
