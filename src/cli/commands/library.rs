use crate::cli::api_client::ApiClient;
use crate::cli::commands::PageParams;
use crate::cli::error::CliResult;
use crate::cli::utils::{format_optional, render_table, truncate_with_ellipsis};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

#[derive(Debug, Serialize, Deserialize)]
pub struct LibraryBook {
    pub id: String,
    pub identifier: String,
    pub title: Option<String>,
    pub page_count: Option<i64>,
    pub published_date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub book: LibraryBook,
    pub status: String,
    pub added_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct LibraryListResponse {
    items: Vec<LibraryEntry>,
    total: usize,
    limit: usize,
    offset: usize,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    message: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    message: String,
    status: String,
}

#[derive(Debug, Serialize)]
pub struct AddBookRequest {
    pub identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
struct UpdateStatusRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
}

#[derive(Tabled)]
pub(crate) struct LibraryEntryDisplay {
    #[tabled(rename = "Identifier")]
    pub(crate) identifier: String,
    #[tabled(rename = "Title")]
    pub(crate) title: String,
    #[tabled(rename = "Status")]
    pub(crate) status: String,
    #[tabled(rename = "Pages")]
    pub(crate) pages: String,
    #[tabled(rename = "Added")]
    pub(crate) added_at: String,
}

impl From<&LibraryEntry> for LibraryEntryDisplay {
    fn from(entry: &LibraryEntry) -> Self {
        Self {
            identifier: entry.book.identifier.clone(),
            title: truncate_with_ellipsis(entry.book.title.as_deref().unwrap_or("-"), 40),
            status: entry.status.clone(),
            pages: format_optional(entry.book.page_count),
            added_at: entry.added_at.clone(),
        }
    }
}

/// List the books in the user's library
pub async fn list_library(
    api_client: &ApiClient,
    status: Option<&str>,
    page: PageParams,
    format: &str,
) -> CliResult<String> {
    let mut request = api_client.get("/api/v1/user/books");

    if let Some(s) = status {
        request = request.query(&[("status", s)]);
    }
    if let Some(l) = page.limit {
        request = request.query(&[("limit", l.to_string())]);
    }
    if let Some(o) = page.offset {
        request = request.query(&[("offset", o.to_string())]);
    }

    let response: LibraryListResponse = ApiClient::handle_response(request.send().await?).await?;

    match format {
        "json" => Ok(serde_json::to_string_pretty(&response.items)?),
        _ => Ok(format_table(&response.items)),
    }
}

pub(crate) fn format_table(entries: &[LibraryEntry]) -> String {
    let rows: Vec<LibraryEntryDisplay> = entries.iter().map(|e| e.into()).collect();
    render_table(rows, "Your library is empty.")
}

/// Add a stored book to the user's library
pub async fn add_book(api_client: &ApiClient, request: AddBookRequest) -> CliResult<String> {
    let response = api_client
        .post("/api/v1/user/books")
        .json(&request)
        .send()
        .await?;

    let body: MessageResponse = ApiClient::handle_response(response).await?;
    Ok(format!("✓ {} ({})", body.message, request.identifier))
}

/// Change the reading status of a book in the user's library
pub async fn set_status(
    api_client: &ApiClient,
    identifier: &str,
    status: Option<String>,
) -> CliResult<String> {
    let response = api_client
        .patch(&format!("/api/v1/user/books/{}", identifier))
        .json(&UpdateStatusRequest { status })
        .send()
        .await?;

    let body: StatusResponse = ApiClient::handle_response(response).await?;
    Ok(format!("✓ {} ({}: {})", body.message, identifier, body.status))
}

/// Remove a book from the user's library
pub async fn remove_book(api_client: &ApiClient, identifier: &str) -> CliResult<String> {
    let response = api_client
        .delete(&format!("/api/v1/user/books/{}", identifier))
        .send()
        .await?;

    let body: MessageResponse = ApiClient::handle_response(response).await?;
    Ok(format!("✓ {} ({})", body.message, identifier))
}
