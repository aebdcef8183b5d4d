//! ISBNdb API client.

use reqwest::{Client, Url};
use serde_json::Value;
use tracing::instrument;

use super::{
    BookProvider, MAX_ATTEMPTS, ProviderError, ProviderResult, SearchPage, SearchParams,
    fetch_json, found_or_none, page_or_empty,
};
use crate::books::ProviderKind;

const BASE_URL: &str = "https://api2.isbndb.com";

/// ISBNdb client. Every request carries the API key as `Authorization`.
pub struct IsbndbClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl IsbndbClient {
    pub fn new(client: Client, api_key: String) -> Self {
        Self::with_base_url(client, api_key, BASE_URL)
    }

    pub fn with_base_url(client: Client, api_key: String, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// `{base}/{segments...}` with each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> ProviderResult<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| ProviderError::Decode {
            message: format!("invalid base url {}: {}", self.base_url, e),
        })?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::Decode {
                message: format!("base url {} cannot have a path", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn search_page(&self, params: &SearchParams) -> ProviderResult<SearchPage> {
        let mut query = params.query.clone().unwrap_or_default();
        let mut column = "";
        let mut should_match_all = 0;

        if let Some(author) = params.author.as_deref().filter(|a| !a.is_empty()) {
            column = "author";
            query.push(' ');
            query.push_str(author);
            should_match_all = 1;
        }
        if let Some(subject) = params.subject.as_deref().filter(|s| !s.is_empty()) {
            query.push(' ');
            query.push_str(subject);
            column = "subjects";
        }

        let url = self.url(&["books", query.trim()])?;
        let query_params = [
            ("page", params.page_number().to_string()),
            ("pageSize", params.max_results.to_string()),
            ("column", column.to_string()),
            ("shouldMatchAll", should_match_all.to_string()),
        ];

        let body = fetch_json(url.as_str(), MAX_ATTEMPTS, || {
            self.client
                .get(url.clone())
                .header("Authorization", &self.api_key)
                .query(&query_params)
        })
        .await?;

        Ok(SearchPage {
            total: body.get("total").and_then(Value::as_u64).unwrap_or(0),
            items: body
                .get("books")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
        })
    }
}

impl BookProvider for IsbndbClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Isbndb
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
        let url = self.url(&["book", id])?;
        let body = found_or_none(
            fetch_json(url.as_str(), MAX_ATTEMPTS, || {
                self.client
                    .get(url.clone())
                    .header("Authorization", &self.api_key)
            })
            .await,
        )?;

        Ok(body.and_then(|b| b.get("book").filter(|v| !v.is_null()).cloned()))
    }
}
