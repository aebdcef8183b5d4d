//! Database utility functions.

use sqlx::types::chrono::Utc;
use uuid::Uuid;

/// Generate an 8-character hex ID for database entities
pub fn generate_entity_id() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    uuid[..8].to_string()
}

/// Get current datetime as string in SQLite format
pub fn current_timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
