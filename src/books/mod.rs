//! Book metadata ingestion: the canonical record, per-provider
//! normalization and the provider HTTP clients.

pub mod provider;
pub mod record;
pub mod transform;


pub use provider::{
    AnyProvider, BookProvider, MAX_SEARCH_PAGE, ProviderError, ProviderResult, SearchPage,
    SearchParams,
};
pub use record::{BookRecord, NamedRef};
pub use transform::{TransformError, transform};

use serde::{Deserialize, Serialize};

/// Which third-party metadata source is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Isbndb,
    Google,
    OpenLibrary,
}

impl ProviderKind {
    /// Service name stored on imported books.
    pub fn service_name(&self) -> &'static str {
        match self {
            ProviderKind::Isbndb => "ISBNdb",
            ProviderKind::Google => "GoogleBooks",
            ProviderKind::OpenLibrary => "OpenLibrary",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProviderKind::Isbndb => "isbndb",
            ProviderKind::Google => "google",
            ProviderKind::OpenLibrary => "openlibrary",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "isbndb" => Ok(ProviderKind::Isbndb),
            "google" => Ok(ProviderKind::Google),
            "openlibrary" => Ok(ProviderKind::OpenLibrary),
            _ => Err(format!(
                "unknown books provider '{}' (expected isbndb, google or openlibrary)",
                s
            )),
        }
    }
}
