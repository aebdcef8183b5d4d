//! OpenLibrary API client. No API key is required.

use futures_util::future::join_all;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{
    BookProvider, MAX_ATTEMPTS, ProviderResult, SearchPage, SearchParams, fetch_json,
    found_or_none, page_or_empty,
};
use crate::books::ProviderKind;

const BASE_URL: &str = "https://openlibrary.org";
const COVERS_URL: &str = "https://covers.openlibrary.org";

/// Author keys expanded per edition.
const MAX_AUTHOR_LOOKUPS: usize = 5;

const SEARCH_FIELDS: &[&str] = &[
    "key",
    "title",
    "author_name",
    "isbn",
    "isbn_10",
    "isbn_13",
    "number_of_pages_median",
    "subject",
    "first_publish_year",
    "language",
    "cover_i",
    "publisher",
];

pub struct OpenLibraryClient {
    client: Client,
    base_url: String,
}

impl OpenLibraryClient {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, BASE_URL)
    }

    pub fn with_base_url(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json(&self, path: &str, attempts: u32) -> ProviderResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        fetch_json(&url, attempts, || {
            self.client
                .get(&url)
                .header("Accept", "application/json")
        })
        .await
    }

    async fn search_page(&self, params: &SearchParams) -> ProviderResult<SearchPage> {
        let q = [
            params.query.clone(),
            params.author.as_ref().map(|a| format!("author:\"{}\"", a)),
            params.subject.as_ref().map(|s| format!("subject:\"{}\"", s)),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        let url = format!("{}/search.json", self.base_url);
        let query = [
            ("q", q.trim().to_string()),
            ("page", params.page_number().to_string()),
            ("fields", SEARCH_FIELDS.join(",")),
        ];

        let body = fetch_json(&url, MAX_ATTEMPTS, || {
            self.client
                .get(&url)
                .header("Accept", "application/json")
                .query(&query)
        })
        .await?;

        let mut items = body
            .get("docs")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if params.max_results > 0 {
            items.truncate(params.max_results as usize);
        }

        Ok(SearchPage {
            total: body.get("numFound").and_then(Value::as_u64).unwrap_or(0),
            items,
        })
    }

    /// Resolve `/authors/OL…A` keys to names. Failed lookups are skipped.
    async fn expand_authors(&self, edition: &Value) -> Vec<String> {
        let keys: Vec<String> = edition
            .get("authors")
            .and_then(Value::as_array)
            .map(|refs| {
                refs.iter()
                    .take(MAX_AUTHOR_LOOKUPS)
                    .filter_map(|r| r.get("key").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let lookups = keys.iter().map(|key| async move {
            match self.get_json(&format!("{}.json", key), 2).await {
                Ok(author) => author
                    .get("name")
                    .and_then(Value::as_str)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string),
                Err(e) => {
                    debug!(key, error = %e, "Author lookup failed");
                    None
                }
            }
        });

        join_all(lookups).await.into_iter().flatten().collect()
    }
}

fn covers_url(cover_id: i64, size: &str) -> String {
    format!("{}/b/id/{}-{}.jpg", COVERS_URL, cover_id, size)
}

impl BookProvider for OpenLibraryClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenLibrary
    }

    #[instrument(skip(self))]
    async fn search(&self, params: &SearchParams) -> ProviderResult<SearchPage> {
        if params.is_empty() {
            return Ok(SearchPage::default());
        }
        Ok(page_or_empty(self.kind(), self.search_page(params).await))
    }

    /// `id` is treated as an ISBN.
    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> ProviderResult<Option<Value>> {
        let path = format!("/isbn/{}.json", id.trim());
        let Some(mut edition) = found_or_none(self.get_json(&path, MAX_ATTEMPTS).await)? else {
            return Ok(None);
        };
        if edition.as_object().is_none_or(|o| o.is_empty()) {
            return Ok(None);
        }

        let authors = self.expand_authors(&edition).await;

        let first_cover = edition
            .get("covers")
            .and_then(Value::as_array)
            .and_then(|covers| covers.first())
            .and_then(Value::as_i64);

        if let Some(object) = edition.as_object_mut() {
            if let Some(cover_id) = first_cover {
                object.insert("cover_small".into(), covers_url(cover_id, "S").into());
                object.insert("cover_medium".into(), covers_url(cover_id, "M").into());
                object.insert("cover_large".into(), covers_url(cover_id, "L").into());
            }
            if !authors.is_empty() {
                object.insert("author_expanded".into(), authors.into());
            }
        }

        Ok(Some(edition))
    }
}
