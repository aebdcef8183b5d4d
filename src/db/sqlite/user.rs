//! SQLite UserRepository implementation.

use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::db::utils::{current_timestamp, generate_entity_id};
use crate::db::{DbError, DbResult, NewUser, User, UserRepository};

/// SQLx-backed user repository.
pub struct SqliteUserRepository<'a> {
    pub(crate) pool: &'a SqlitePool,
}

fn user_from_row(row: &SqliteRow) -> DbResult<User> {
    let settings_json: String = row.get("settings");
    let settings: Map<String, Value> =
        serde_json::from_str(&settings_json).map_err(|e| DbError::InvalidData {
            message: format!("user.settings is not a JSON object: {}", e),
            help: "Reset the user's settings with an empty object".to_string(),
        })?;

    Ok(User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        plan: row.get("plan"),
        settings,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

impl<'a> UserRepository for SqliteUserRepository<'a> {
    async fn create(&self, user: &NewUser) -> DbResult<User> {
        let id = generate_entity_id();
        let now = current_timestamp();
        let plan = user.plan.clone().unwrap_or_else(|| "free".to_string());

        sqlx::query(
            "INSERT INTO user (id, name, email, plan, settings, created_at, updated_at) VALUES (?, ?, ?, ?, '{}', ?, ?)",
        )
        .bind(&id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&plan)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::Constraint { .. } => DbError::AlreadyExists {
                entity_type: "User".to_string(),
                id: user.email.clone(),
            },
            other => other,
        })?;

        Ok(User {
            id,
            name: user.name.clone(),
            email: user.email.clone(),
            plan,
            settings: Map::new(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    async fn get(&self, id: &str) -> DbResult<User> {
        let row = sqlx::query(
            "SELECT id, name, email, plan, settings, created_at, updated_at FROM user WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        let row = row.ok_or(DbError::NotFound {
            entity_type: "User".to_string(),
            id: id.to_string(),
        })?;

        user_from_row(&row)
    }

    async fn set_plan(&self, id: &str, plan: &str) -> DbResult<User> {
        let result = sqlx::query("UPDATE user SET plan = ?, updated_at = ? WHERE id = ?")
            .bind(plan)
            .bind(current_timestamp())
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound {
                entity_type: "User".to_string(),
                id: id.to_string(),
            });
        }

        self.get(id).await
    }

    async fn update_settings(&self, id: &str, settings: &Map<String, Value>) -> DbResult<User> {
        let settings_json = serde_json::to_string(settings).map_err(|e| DbError::Database {
            message: format!("Failed to serialize settings: {}", e),
        })?;

        let result = sqlx::query("UPDATE user SET settings = ?, updated_at = ? WHERE id = ?")
            .bind(&settings_json)
            .bind(current_timestamp())
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound {
                entity_type: "User".to_string(),
                id: id.to_string(),
            });
        }

        self.get(id).await
    }
}
