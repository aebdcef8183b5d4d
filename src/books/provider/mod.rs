//! HTTP clients for the third-party book metadata providers.
//!
//! Every client implements [`BookProvider`] and returns raw JSON; shaping the
//! payload into a [`BookRecord`](crate::books::BookRecord) is the job of
//! [`transform`](crate::books::transform).

mod error;
mod google;
mod isbndb;
mod open_library;

#[cfg(test)]
mod provider_test;

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

pub use error::{ProviderError, ProviderResult};
pub use google::GoogleBooksClient;
pub use isbndb::IsbndbClient;
pub use open_library::OpenLibraryClient;

use super::ProviderKind;

/// Attempts per request, including the first.
pub(crate) const MAX_ATTEMPTS: u32 = 3;
const RETRY_PAUSE: Duration = Duration::from_millis(200);

/// Highest result page a search may request.
pub const MAX_SEARCH_PAGE: u32 = 1000;

/// Search criteria shared by all providers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub max_results: u32,
    pub page: u32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            query: None,
            author: None,
            subject: None,
            max_results: 30,
            page: 1,
        }
    }
}

impl SearchParams {
    /// Free-text search on the first page.
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    /// True when no criterion has any content.
    pub fn is_empty(&self) -> bool {
        [&self.query, &self.author, &self.subject]
            .iter()
            .all(|v| v.as_deref().is_none_or(|s| s.trim().is_empty()))
    }

    /// The requested page, clamped to `1..=MAX_SEARCH_PAGE`.
    pub fn page_number(&self) -> u32 {
        self.page.clamp(1, MAX_SEARCH_PAGE)
    }

    /// Zero-based index of the first result on this page.
    pub fn offset(&self, page_size: u32) -> u64 {
        u64::from(self.page_number() - 1) * u64::from(page_size)
    }

    /// Same criteria, different page.
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }
}

/// One page of raw provider results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub total: u64,
    pub items: Vec<Value>,
}

/// A source of raw book metadata.
pub trait BookProvider: Send + Sync + 'static {
    fn kind(&self) -> ProviderKind;

    /// Search the provider. Failures degrade to an empty page.
    fn search(&self, params: &SearchParams)
    -> impl Future<Output = ProviderResult<SearchPage>> + Send;

    /// Fetch one book by provider id or ISBN. `None` when the provider has no match.
    fn get(&self, id: &str) -> impl Future<Output = ProviderResult<Option<Value>>> + Send;

    /// Fetch one book by ISBN.
    fn get_by_code(&self, isbn: &str) -> impl Future<Output = ProviderResult<Option<Value>>> + Send {
        self.get(isbn)
    }
}

/// The provider selected at startup.
pub enum AnyProvider {
    Isbndb(IsbndbClient),
    Google(GoogleBooksClient),
    OpenLibrary(OpenLibraryClient),
}

impl AnyProvider {
    /// Build the client for `kind` with the default public endpoints.
    pub fn new(
        kind: ProviderKind,
        client: Client,
        isbndb_key: Option<String>,
        google_key: Option<String>,
    ) -> Self {
        match kind {
            ProviderKind::Isbndb => {
                AnyProvider::Isbndb(IsbndbClient::new(client, isbndb_key.unwrap_or_default()))
            }
            ProviderKind::Google => AnyProvider::Google(GoogleBooksClient::new(client, google_key)),
            ProviderKind::OpenLibrary => AnyProvider::OpenLibrary(OpenLibraryClient::new(client)),
        }
    }
}

impl BookProvider for AnyProvider {
    fn kind(&self) -> ProviderKind {
        match self {
            AnyProvider::Isbndb(p) => p.kind(),
            AnyProvider::Google(p) => p.kind(),
            AnyProvider::OpenLibrary(p) => p.kind(),
        }
    }

    async fn search(&self, params: &SearchParams) -> ProviderResult<SearchPage> {
        match self {
            AnyProvider::Isbndb(p) => p.search(params).await,
            AnyProvider::Google(p) => p.search(params).await,
            AnyProvider::OpenLibrary(p) => p.search(params).await,
        }
    }

    async fn get(&self, id: &str) -> ProviderResult<Option<Value>> {
        match self {
            AnyProvider::Isbndb(p) => p.get(id).await,
            AnyProvider::Google(p) => p.get(id).await,
            AnyProvider::OpenLibrary(p) => p.get(id).await,
        }
    }
}

/// Send a request, retrying transport failures and 5xx responses.
///
/// `build` is called once per attempt since a `RequestBuilder` is consumed
/// by `send`.
pub(crate) async fn send_with_retry<F>(url: &str, attempts: u32, build: F) -> ProviderResult<Response>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 1;
    loop {
        match build().send().await {
            Ok(response) if response.status().is_server_error() && attempt < attempts => {
                debug!(url, attempt, status = %response.status(), "Retrying provider request");
            }
            Ok(response) => return Ok(response),
            Err(e) if attempt < attempts => {
                debug!(url, attempt, error = %e, "Retrying provider request");
            }
            Err(source) => {
                return Err(ProviderError::Http {
                    url: url.to_string(),
                    source,
                });
            }
        }
        attempt += 1;
        tokio::time::sleep(RETRY_PAUSE).await;
    }
}

/// GET a JSON document. Non-2xx responses become [`ProviderError::Status`].
pub(crate) async fn fetch_json<F>(url: &str, attempts: u32, build: F) -> ProviderResult<Value>
where
    F: Fn() -> RequestBuilder,
{
    let response = send_with_retry(url, attempts, build).await?;
    if !response.status().is_success() {
        return Err(ProviderError::Status {
            status: response.status().as_u16(),
            url: url.to_string(),
        });
    }
    response
        .json::<Value>()
        .await
        .map_err(|e| ProviderError::Decode {
            message: e.to_string(),
        })
}

/// Search wrapper: log and return an empty page on any failure.
pub(crate) fn page_or_empty(kind: ProviderKind, result: ProviderResult<SearchPage>) -> SearchPage {
    result.unwrap_or_else(|e| {
        warn!(provider = %kind, error = %e, "Book search failed");
        SearchPage::default()
    })
}

/// Lookup wrapper: a non-2xx status means "no such book".
pub(crate) fn found_or_none(result: ProviderResult<Value>) -> ProviderResult<Option<Value>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ProviderError::Status { status, url }) => {
            debug!(status, url, "Provider has no match");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
