//! Google Books API client.
//!
//! Volumes are flattened into the shape
//! [`from_google_books`](crate::books::transform::from_google_books) expects.

use reqwest::Client;
use serde_json::{Value, json};
use tracing::instrument;

use super::{
    BookProvider, MAX_ATTEMPTS, ProviderResult, SearchPage, SearchParams, fetch_json,
    found_or_none, page_or_empty,
};
use crate::books::ProviderKind;

const BASE_URL: &str = "https://www.googleapis.com/books/v1";

/// Google caps `maxResults` at 40.
const MAX_PAGE_SIZE: u32 = 40;

pub struct GoogleBooksClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GoogleBooksClient {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self::with_base_url(client, api_key, BASE_URL)
    }

    pub fn with_base_url(client: Client, api_key: Option<String>, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    async fn volumes(&self, params: Vec<(&'static str, String)>) -> ProviderResult<Value> {
        let url = format!("{}/volumes", self.base_url);
        let mut params = params;
        if let Some(key) = &self.api_key {
            params.push(("key", key.clone()));
        }
        fetch_json(&url, MAX_ATTEMPTS, || self.client.get(&url).query(&params)).await
    }

    async fn search_page(&self, params: &SearchParams) -> ProviderResult<SearchPage> {
        let q = [
            params.query.clone(),
            params.author.as_ref().map(|a| format!("inauthor:{}", a)),
            params.subject.as_ref().map(|s| format!("subject:{}", s)),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        let max_results = params.max_results.clamp(1, MAX_PAGE_SIZE);
        let start_index = params.offset(max_results);

        let body = self
            .volumes(vec![
                ("q", q),
                ("maxResults", max_results.to_string()),
                ("startIndex", start_index.to_string()),
            ])
            .await?;

        Ok(SearchPage {
            total: body.get("totalItems").and_then(Value::as_u64).unwrap_or(0),
            items: body
                .get("items")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(flatten_volume).collect())
                .unwrap_or_default(),
        })
    }
}

/// Flatten a `volume` resource into the service-level book shape.
pub fn flatten_volume(volume: &Value) -> Value {
    let info = volume.get("volumeInfo").cloned().unwrap_or(Value::Null);
    let field = |key: &str| info.get(key).cloned().unwrap_or(Value::Null);

    json!({
        "id": volume.get("id").cloned().unwrap_or(Value::Null),
        "title": field("title"),
        "authors": field("authors"),
        "publisher": field("publisher"),
        "date_published": field("publishedDate"),
        "description": field("description"),
        "page_count": field("pageCount"),
        "tags": field("categories"),
        "language": field("language"),
        "codes": field("industryIdentifiers"),
        "cover": info
            .get("imageLinks")
            .and_then(|links| links.get("thumbnail"))
            .cloned()
            .unwrap_or(Value::Null),
    })
}

impl BookProvider for GoogleBooksClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    #[instrument(skip(self))]
    async fn search(&self, params: &SearchParams) -> ProviderResult<SearchPage> {
        if params.is_empty() {
            return Ok(SearchPage::default());
        }
        Ok(page_or_empty(self.kind(), self.search_page(params).await))
    }

    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> ProviderResult<Option<Value>> {
        let body = found_or_none(self.volumes(vec![("q", format!("isbn:{}", id))]).await)?;

        Ok(body.and_then(|b| {
            b.get("items")
                .and_then(Value::as_array)
                .and_then(|items| items.first())
                .map(flatten_volume)
        }))
    }
}
