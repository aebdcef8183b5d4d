use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::env;

use crate::api::v1::USER_HEADER;
use crate::cli::error::{CliError, CliResult};

pub const API_URL_ENV: &str = "BOOKBOUND_API_URL";
pub const USER_ENV: &str = "BOOKBOUND_USER";
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// API client for communicating with the bookbound REST API
pub struct ApiClient {
    base_url: String,
    user: Option<String>,
    client: Client,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// Priority for base URL:
    /// 1. Explicit `api_url` parameter
    /// 2. BOOKBOUND_API_URL environment variable
    /// 3. Default: http://localhost:3000
    ///
    /// The acting user follows the same order with BOOKBOUND_USER and no default.
    pub fn new(api_url: Option<String>, user: Option<String>) -> Self {
        let base_url = api_url
            .or_else(|| env::var(API_URL_ENV).ok())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let user = user.or_else(|| env::var(USER_ENV).ok());

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            user,
            client: Client::new(),
        }
    }

    /// Get the base URL being used
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The user ID sent as `X-User-Id`, if any
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    fn with_user(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.user {
            Some(id) => request.header(USER_HEADER, id),
            None => request,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Create a GET request builder
    pub fn get(&self, path: &str) -> RequestBuilder {
        self.with_user(self.client.get(self.url(path)))
    }

    /// Create a POST request builder
    pub fn post(&self, path: &str) -> RequestBuilder {
        self.with_user(self.client.post(self.url(path)))
    }

    /// Create a PATCH request builder
    pub fn patch(&self, path: &str) -> RequestBuilder {
        self.with_user(self.client.patch(self.url(path)))
    }

    /// Create a DELETE request builder
    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.with_user(self.client.delete(self.url(path)))
    }

    /// Handle API response with standardized error handling
    ///
    /// Returns the deserialized response body on success, or a
    /// CliError::ApiError carrying the server's `message` otherwise.
    pub async fn handle_response<T: DeserializeOwned>(response: Response) -> CliResult<T> {
        if response.status().is_success() {
            response
                .json()
                .await
                .map_err(|e| CliError::InvalidResponse {
                    message: e.to_string(),
                })
        } else {
            let status = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ErrorBody>(&error_text)
                .map(|body| body.message)
                .unwrap_or(error_text);
            Err(CliError::ApiError { status, message })
        }
    }
}
