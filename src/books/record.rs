//! Canonical book record produced by every provider.

use serde::{Deserialize, Serialize};

use crate::db::IdentifierCode;

/// A named relation (author or publisher) as delivered by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub name: String,
    #[serde(default)]
    pub uuid: Option<String>,
}

impl NamedRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid: None,
        }
    }
}

/// Provider-independent book metadata.
///
/// `identifier` is never empty for records produced by
/// [`transform`](crate::books::transform::transform).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    /// Provider-side id, if the provider exposes one.
    pub id: Option<String>,
    pub identifier: String,
    #[serde(default)]
    pub codes: Vec<IdentifierCode>,
    pub title: Option<String>,
    #[serde(rename = "pageCount")]
    pub page_count: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub publisher: Option<NamedRef>,
    pub description: Option<String>,
    #[serde(default)]
    pub description_clean: String,
    #[serde(default)]
    pub authors: Vec<NamedRef>,
    pub edition: Option<String>,
    pub binding: Option<String>,
    pub language: Option<String>,
    pub published_date: Option<String>,
    pub cover: Option<String>,
    pub cover_large: Option<String>,
    pub service: String,
}

impl BookRecord {
    /// The best cover URL to import: large first.
    pub fn preferred_cover(&self) -> Option<&str> {
        self.cover_large
            .as_deref()
            .or(self.cover.as_deref())
            .filter(|url| !url.is_empty())
    }
}
