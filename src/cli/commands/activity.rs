use crate::cli::api_client::ApiClient;
use crate::cli::error::CliResult;
use crate::cli::utils::render_table;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabled::Tabled;

#[derive(Debug, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub subject_type: Option<String>,
    pub subject_id: Option<String>,
    pub properties: Value,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ActivityListResponse {
    items: Vec<Activity>,
    total: usize,
    page: usize,
    per_page: usize,
}

#[derive(Tabled)]
pub(crate) struct ActivityDisplay {
    #[tabled(rename = "When")]
    pub(crate) created_at: String,
    #[tabled(rename = "Type")]
    pub(crate) activity_type: String,
    #[tabled(rename = "Detail")]
    pub(crate) detail: String,
}

/// One-line summary of an activity's properties.
pub(crate) fn describe(activity: &Activity) -> String {
    let props = &activity.properties;
    let title = props["book_title"]
        .as_str()
        .or_else(|| props["book_identifier"].as_str());

    match (title, props["status"].as_str()) {
        (Some(title), Some(status)) => format!("{} ({})", title, status),
        (Some(title), None) => title.to_string(),
        _ => match props["keys"].as_array() {
            Some(keys) => keys
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            None => "-".to_string(),
        },
    }
}

impl From<&Activity> for ActivityDisplay {
    fn from(activity: &Activity) -> Self {
        Self {
            created_at: activity.created_at.clone(),
            activity_type: activity.activity_type.clone(),
            detail: describe(activity),
        }
    }
}

/// List the user's activity feed, newest first
pub async fn list_activities(
    api_client: &ApiClient,
    page: Option<u32>,
    format: &str,
) -> CliResult<String> {
    let mut request = api_client.get("/api/v1/activities");
    if let Some(p) = page {
        request = request.query(&[("page", p.to_string())]);
    }

    let response: ActivityListResponse = ApiClient::handle_response(request.send().await?).await?;

    match format {
        "json" => Ok(serde_json::to_string_pretty(&response.items)?),
        _ => {
            let rows: Vec<ActivityDisplay> = response.items.iter().map(|a| a.into()).collect();
            Ok(render_table(rows, "No activity yet."))
        }
    }
}
