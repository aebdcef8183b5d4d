//! Merge user settings.

use serde_json::{Map, Value, json};
use tracing::{info, instrument};

use super::context::ActionContext;
use super::error::{ActionError, ActionResult};
use crate::books::BookProvider;
use crate::db::{ActivityRepository, ActivityType, Database, NewActivity, User, UserRepository};

pub struct UpdateUserSettings<'a, D: Database, P: BookProvider> {
    ctx: &'a ActionContext<D, P>,
}

impl<'a, D: Database, P: BookProvider> UpdateUserSettings<'a, D, P> {
    pub fn new(ctx: &'a ActionContext<D, P>) -> Self {
        Self { ctx }
    }

    /// Merge `settings` into the stored settings. Keys not mentioned are kept.
    #[instrument(skip(self, user, settings), fields(user_id = %user.id))]
    pub async fn handle(&self, user: &User, settings: Map<String, Value>) -> ActionResult<User> {
        if settings.is_empty() {
            return Err(ActionError::NoSettings);
        }

        let keys: Vec<String> = settings.keys().cloned().collect();
        let delta = Value::Object(settings_delta(&user.settings, &settings));
        let mut merged = user.settings.clone();
        merged.extend(settings);

        let db = self.ctx.db();
        let updated = db.users().update_settings(&user.id, &merged).await?;

        db.activities()
            .log(&NewActivity {
                user_id: user.id.clone(),
                activity_type: ActivityType::SettingsUpdated,
                subject_type: Some("user".to_string()),
                subject_id: Some(user.id.clone()),
                properties: json!({ "keys": keys }),
            })
            .await?;

        info!(
            target: "analytics",
            event = "settings_updated",
            user_id = %user.id,
            changed = %delta,
        );

        Ok(updated)
    }
}

/// Requested entries whose value differs from the stored one.
pub(crate) fn settings_delta(
    current: &Map<String, Value>,
    requested: &Map<String, Value>,
) -> Map<String, Value> {
    requested
        .iter()
        .filter(|(key, value)| current.get(*key) != Some(*value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
