use crate::cli::api_client::ApiClient;
use crate::cli::commands::activity::{Activity, describe};
use crate::cli::commands::library::LibraryEntry;
use crate::cli::error::CliResult;
use crate::cli::utils::{apply_table_style, truncate_with_ellipsis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardStats {
    pub books_in_library: usize,
    pub completed_books: usize,
    pub reading_books: usize,
    pub plan_to_read: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NamedCount {
    pub id: String,
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub currently_reading: Vec<LibraryEntry>,
    pub tags: Vec<NamedCount>,
    pub authors: Vec<NamedCount>,
    pub activities: Vec<Activity>,
}

fn counts(items: &[NamedCount]) -> String {
    if items.is_empty() {
        return "-".to_string();
    }
    items
        .iter()
        .map(|i| format!("{} ({})", i.name, i.count))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Show the library overview
pub async fn show_dashboard(api_client: &ApiClient, format: &str) -> CliResult<String> {
    let response = api_client.get("/api/v1/dashboard").send().await?;
    let dashboard: Dashboard = ApiClient::handle_response(response).await?;

    match format {
        "json" => Ok(serde_json::to_string_pretty(&dashboard)?),
        _ => Ok(format_dashboard(&dashboard)),
    }
}

pub(crate) fn format_dashboard(dashboard: &Dashboard) -> String {
    use tabled::builder::Builder;

    let stats = &dashboard.stats;
    let reading: Vec<String> = dashboard
        .currently_reading
        .iter()
        .map(|e| truncate_with_ellipsis(e.book.title.as_deref().unwrap_or(&e.book.identifier), 40))
        .collect();
    let recent: Vec<String> = dashboard
        .activities
        .iter()
        .map(|a| format!("{} {}", a.activity_type, describe(a)))
        .collect();

    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    builder.push_record(["Books", &stats.books_in_library.to_string()]);
    builder.push_record(["Reading", &stats.reading_books.to_string()]);
    builder.push_record(["Completed", &stats.completed_books.to_string()]);
    builder.push_record(["Plan to read", &stats.plan_to_read.to_string()]);
    builder.push_record(["Currently reading", &or_dash(reading.join("\n"))]);
    builder.push_record(["Top tags", &counts(&dashboard.tags)]);
    builder.push_record(["Top authors", &counts(&dashboard.authors)]);
    builder.push_record(["Recent activity", &or_dash(recent.join("\n"))]);

    let mut table = builder.build();
    apply_table_style(&mut table);
    table.to_string()
}

fn or_dash(s: String) -> String {
    if s.is_empty() { "-".to_string() } else { s }
}
