use crate::cli::api_client::ApiClient;
use crate::cli::error::CliResult;
use crate::cli::utils::{
    apply_table_style, format_names, format_optional, render_table, truncate_with_ellipsis,
};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

#[derive(Debug, Serialize, Deserialize)]
pub struct BookLinks {
    pub show: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchBook {
    pub identifier: String,
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub page_count: Option<i64>,
    pub published_date: Option<String>,
    pub cover: Option<String>,
    pub service: String,
    pub links: BookLinks,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub total: u64,
    pub books: Vec<SearchBook>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Named {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookDetails {
    pub id: String,
    pub identifier: String,
    pub title: Option<String>,
    pub page_count: Option<i64>,
    pub language: Option<String>,
    pub published_date: Option<String>,
    pub description_clean: Option<String>,
    pub service: Option<String>,
    #[serde(default)]
    pub authors: Vec<Named>,
    #[serde(default)]
    pub tags: Vec<Named>,
    pub publisher: Option<Named>,
}

#[derive(Tabled)]
pub(crate) struct SearchBookDisplay {
    #[tabled(rename = "Identifier")]
    pub(crate) identifier: String,
    #[tabled(rename = "Title")]
    pub(crate) title: String,
    #[tabled(rename = "Authors")]
    pub(crate) authors: String,
    #[tabled(rename = "Published")]
    pub(crate) published: String,
    #[tabled(rename = "Stored")]
    pub(crate) stored: String,
}

impl From<&SearchBook> for SearchBookDisplay {
    fn from(book: &SearchBook) -> Self {
        let stored = !book.links.show.starts_with("/books/preview/");
        Self {
            identifier: book.identifier.clone(),
            title: truncate_with_ellipsis(book.title.as_deref().unwrap_or("-"), 40),
            authors: truncate_with_ellipsis(&format_names(&book.authors), 30),
            published: format_optional(book.published_date.as_deref()),
            stored: if stored { "yes" } else { "no" }.to_string(),
        }
    }
}

/// Search the configured book provider
pub async fn search_books(
    api_client: &ApiClient,
    query: &str,
    page: Option<u32>,
    format: &str,
) -> CliResult<String> {
    let mut request = api_client
        .get("/api/v1/books/search")
        .query(&[("q", query)]);
    if let Some(p) = page {
        request = request.query(&[("page", p.to_string())]);
    }

    let response: SearchResponse = ApiClient::handle_response(request.send().await?).await?;

    match format {
        "json" => Ok(serde_json::to_string_pretty(&response)?),
        _ => Ok(format_search_table(&response)),
    }
}

pub(crate) fn format_search_table(response: &SearchResponse) -> String {
    if response.books.is_empty() {
        return "No books found.".to_string();
    }

    let rows: Vec<SearchBookDisplay> = response.books.iter().map(|b| b.into()).collect();
    format!(
        "{}\nShowing {} of {} results.",
        render_table(rows, "No books found."),
        response.books.len(),
        response.total
    )
}

/// Show one book, importing it on the server if needed
pub async fn show_book(api_client: &ApiClient, identifier: &str, format: &str) -> CliResult<String> {
    let response = api_client
        .get(&format!("/api/v1/books/{}", identifier))
        .send()
        .await?;

    let book: BookDetails = ApiClient::handle_response(response).await?;

    match format {
        "json" => Ok(serde_json::to_string_pretty(&book)?),
        _ => {
            use tabled::builder::Builder;

            let authors: Vec<String> = book.authors.iter().map(|a| a.name.clone()).collect();
            let tags: Vec<String> = book.tags.iter().map(|t| t.name.clone()).collect();

            let mut builder = Builder::default();
            builder.push_record(["Field", "Value"]);
            builder.push_record(["Identifier", &book.identifier]);
            builder.push_record(["Title", book.title.as_deref().unwrap_or("-")]);
            builder.push_record(["Authors", &format_names(&authors)]);
            builder.push_record(["Tags", &format_names(&tags)]);
            builder.push_record([
                "Publisher",
                &format_optional(book.publisher.as_ref().map(|p| p.name.as_str())),
            ]);
            builder.push_record(["Pages", &format_optional(book.page_count)]);
            builder.push_record(["Published", &format_optional(book.published_date.as_deref())]);
            builder.push_record(["Language", &format_optional(book.language.as_deref())]);
            builder.push_record(["Service", &format_optional(book.service.as_deref())]);
            if let Some(description) = &book.description_clean {
                builder.push_record(["Description", &truncate_with_ellipsis(description, 200)]);
            }

            let mut table = builder.build();
            apply_table_style(&mut table);
            Ok(table.to_string())
        }
    }
}
