//! Provider client errors.

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ProviderError {
    #[error("Request to {url} failed")]
    #[diagnostic(
        code(bookbound::provider::http),
        help("Check network access to the books provider and its API key.")
    )]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Provider returned status {status} for {url}")]
    #[diagnostic(code(bookbound::provider::status))]
    Status { status: u16, url: String },

    #[error("Could not decode provider response: {message}")]
    #[diagnostic(code(bookbound::provider::decode))]
    Decode { message: String },
}

pub type ProviderResult<T> = Result<T, ProviderError>;
