use serde_json::{Map, Value, json};

use crate::actions::test_support::{StubProvider, create_user, test_context};
use crate::actions::settings::settings_delta;
use crate::actions::{ActionError, UpdateUserSettings};
use crate::db::{ActivityRepository, ActivityType, Database, PageSort, UserRepository};

fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_settings_are_merged() {
    let t = test_context(StubProvider::new()).await;
    let db = t.ctx.db();
    let user = create_user(db, "a@example.com", None).await;
    let action = UpdateUserSettings::new(&t.ctx);

    let user = action
        .handle(&user, object(json!({"theme": "dark", "per_page": 20})))
        .await
        .unwrap();
    let user = action
        .handle(&user, object(json!({"theme": "light"})))
        .await
        .unwrap();

    assert_eq!(user.settings["theme"], "light");
    assert_eq!(user.settings["per_page"], 20);

    let stored = db.users().get(&user.id).await.unwrap();
    assert_eq!(stored.settings, user.settings);

    let activities = db
        .activities()
        .list(&user.id, &PageSort::page(1, 10))
        .await
        .unwrap();
    assert_eq!(activities.total, 2);
    assert_eq!(activities.items[0].activity_type, ActivityType::SettingsUpdated);
    assert_eq!(activities.items[0].properties["keys"], json!(["theme"]));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_empty_settings_are_rejected() {
    let t = test_context(StubProvider::new()).await;
    let user = create_user(t.ctx.db(), "a@example.com", None).await;

    let err = UpdateUserSettings::new(&t.ctx)
        .handle(&user, Map::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ActionError::NoSettings));
    assert_eq!(err.to_string(), "No settings provided.");
}

#[test]
fn test_settings_delta_keeps_only_changed_entries() {
    let current = object(json!({"theme": "dark", "per_page": 20}));
    let requested = object(json!({"theme": "dark", "per_page": 50, "locale": "en"}));

    let delta = settings_delta(&current, &requested);

    assert_eq!(Value::Object(delta), json!({"per_page": 50, "locale": "en"}));
    assert!(settings_delta(&current, &current).is_empty());
}
