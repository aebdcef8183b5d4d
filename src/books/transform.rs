//! Normalization of provider payloads into [`BookRecord`]s.
//!
//! Each provider delivers a differently shaped JSON document. The functions
//! here pick identifiers, clean descriptions and normalize subjects so the
//! rest of the pipeline only ever sees one shape.

use std::collections::HashSet;
use std::sync::LazyLock;

use miette::Diagnostic;
use regex::Regex;
use reqwest::Url;
use serde_json::Value;
use thiserror::Error;

use super::ProviderKind;
use super::record::{BookRecord, NamedRef};
use crate::db::IdentifierCode;

static SUBJECT_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*(?:,|&|/)\s*").expect("valid subject split regex"));
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid html tag regex"));

/// Open Library cover CDN, sized `-M` / `-L`.
const OPEN_LIBRARY_COVER_URL: &str = "https://covers.openlibrary.org/b/id";

#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("{message}")]
    #[diagnostic(code(bookbound::books::missing_identifier))]
    MissingIdentifier { message: String },
}

impl TransformError {
    fn missing(message: &str) -> Self {
        TransformError::MissingIdentifier {
            message: message.to_string(),
        }
    }
}

/// Normalize a raw payload from the given provider.
pub fn transform(kind: ProviderKind, data: &Value) -> Result<BookRecord, TransformError> {
    match kind {
        ProviderKind::Isbndb => from_isbndb(data),
        ProviderKind::Google => from_google_books(data),
        ProviderKind::OpenLibrary => from_open_library(data),
    }
}

pub fn from_isbndb(data: &Value) -> Result<BookRecord, TransformError> {
    let identifier = coalesce(data, &["isbn13", "isbn", "isbn10"])
        .filter(|id| !id.is_empty())
        .ok_or_else(|| TransformError::missing("ISBNdb payload missing identifier."))?;

    let (description, description_clean) =
        clean_description(coalesce(data, &["overview", "synopsis", "description"]));

    Ok(BookRecord {
        id: text_field(data, "id"),
        identifier,
        codes: vec![
            IdentifierCode::new("ISBN_13", text_field(data, "isbn13")),
            IdentifierCode::new("ISBN_10", coalesce(data, &["isbn", "isbn10"])),
        ],
        title: text_field(data, "title"),
        page_count: int_field(data, "pages"),
        tags: normalize_subjects(&string_list(field(data, "subjects"))),
        publisher: non_empty(text_field(data, "publisher")).map(NamedRef::new),
        description,
        description_clean,
        authors: map_authors(field(data, "authors")),
        edition: text_field(data, "edition"),
        binding: text_field(data, "binding"),
        language: text_field(data, "language"),
        published_date: text_field(data, "date_published"),
        cover: text_field(data, "image"),
        cover_large: text_field(data, "image_original"),
        service: ProviderKind::Isbndb.service_name().to_string(),
    })
}

pub fn from_google_books(data: &Value) -> Result<BookRecord, TransformError> {
    let fallback = coalesce(data, &["identifier", "isbn13", "isbn", "id"]);
    let raw_codes = field(data, "codes")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let identifier = pick_identifier_from_codes(&raw_codes, fallback)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| TransformError::missing("GoogleBooks payload missing codes/identifier."))?;

    let (description, description_clean) =
        clean_description(coalesce(data, &["description_clean", "description"]));

    let cover = non_empty(text_field(data, "cover")).map(|url| replace_query_param(&url, "edge", "none"));
    let cover_large = cover
        .as_deref()
        .map(|url| replace_query_param(url, "zoom", "0"));

    let codes = if raw_codes.is_empty() {
        vec![
            IdentifierCode::new("ISBN_13", text_field(data, "isbn13")),
            IdentifierCode::new("ISBN_10", text_field(data, "isbn")),
        ]
    } else {
        raw_codes
            .iter()
            .map(|code| {
                IdentifierCode::new(
                    &text_field(code, "type").unwrap_or_default(),
                    coalesce(code, &["identifier", "value"]),
                )
            })
            .collect()
    };

    Ok(BookRecord {
        id: text_field(data, "id"),
        identifier,
        codes,
        title: text_field(data, "title"),
        page_count: int_field(data, "page_count"),
        tags: normalize_subjects(&string_list(field(data, "tags"))),
        publisher: non_empty(text_field(data, "publisher")).map(NamedRef::new),
        description,
        description_clean,
        authors: map_authors(field(data, "authors")),
        edition: text_field(data, "edition"),
        binding: text_field(data, "binding"),
        language: text_field(data, "language"),
        published_date: text_field(data, "date_published"),
        cover,
        cover_large,
        service: ProviderKind::Google.service_name().to_string(),
    })
}

pub fn from_open_library(data: &Value) -> Result<BookRecord, TransformError> {
    let isbn13s = string_list(field(data, "isbn_13"));
    let isbn10s = string_list(field(data, "isbn_10"));
    let isbns = string_list(field(data, "isbn"));

    let identifier = isbn13s
        .first()
        .or(isbn10s.first())
        .or(isbns.first())
        .cloned()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            TransformError::missing(
                "OpenLibrary payload missing identifier (isbn_13/isbn_10/isbn).",
            )
        })?;

    // Editions carry `subjects` (strings or {name}); search docs carry `subject`.
    let raw_subjects = match field(data, "subjects").filter(|v| !is_empty(v)) {
        Some(subjects) => string_list(Some(subjects)),
        None => string_list(field(data, "subject")),
    };

    let authors = map_authors(field(data, "author_expanded").or(field(data, "author_name")));

    let raw_description = field(data, "description").and_then(|d| match d {
        Value::Object(_) => text_field(d, "value"),
        other => text(other),
    });
    let (description, description_clean) = clean_description(raw_description);

    let page_count =
        int_field(data, "number_of_pages").or_else(|| int_field(data, "number_of_pages_median"));

    let publisher = match field(data, "publishers").filter(|v| !is_empty(v)) {
        Some(publishers) => string_list(Some(publishers)).into_iter().next(),
        None => string_list(field(data, "publisher")).into_iter().next(),
    }
    .and_then(|name| non_empty(Some(name)))
    .map(NamedRef::new);

    let language = match field(data, "language").and_then(Value::as_array) {
        Some(languages) if !languages.is_empty() => languages.first().and_then(text),
        _ => field(data, "languages")
            .and_then(|l| l.get(0))
            .and_then(|l| text_field(l, "key"))
            .map(|key| key.rsplit('/').next().unwrap_or_default().to_string()),
    };

    let published_date =
        text_field(data, "publish_date").or_else(|| text_field(data, "first_publish_year"));

    let mut cover = non_empty(text_field(data, "cover"));
    let mut cover_large = non_empty(text_field(data, "cover_large"));
    if cover.is_none() || cover_large.is_none() {
        let cover_id = int_field(data, "cover_i")
            .filter(|id| *id != 0)
            .or_else(|| {
                field(data, "covers")
                    .and_then(Value::as_array)
                    .and_then(|covers| covers.first())
                    .and_then(as_int)
            })
            .filter(|id| *id != 0);

        if let Some(cover_id) = cover_id {
            if cover.is_none() {
                cover = Some(format!("{}/{}-M.jpg", OPEN_LIBRARY_COVER_URL, cover_id));
            }
            if cover_large.is_none() {
                cover_large = Some(format!("{}/{}-L.jpg", OPEN_LIBRARY_COVER_URL, cover_id));
            }
        }
    }

    Ok(BookRecord {
        id: coalesce(data, &["id", "key"]),
        identifier,
        codes: vec![
            IdentifierCode::new("ISBN_13", isbn13s.first().cloned()),
            IdentifierCode::new("ISBN_10", isbn10s.first().cloned()),
        ],
        title: text_field(data, "title"),
        page_count,
        tags: normalize_subjects(&raw_subjects),
        publisher,
        description,
        description_clean,
        authors,
        edition: text_field(data, "edition"),
        binding: coalesce(data, &["physical_format", "binding"]),
        language,
        published_date,
        cover,
        cover_large,
        service: ProviderKind::OpenLibrary.service_name().to_string(),
    })
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Turn raw provider subjects into display tags.
///
/// `"Fiction -- Fantasy"` keeps only `"Fiction"`, `"science_fiction"` becomes
/// `"Science Fiction"`, and `"Fiction/Adventure"` yields both halves.
pub fn normalize_subjects(raw: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();

    raw.iter()
        .flat_map(|subject| {
            let before = subject.split("--").next().unwrap_or_default();
            let base = before.trim().replace('_', " ");
            SUBJECT_SPLIT_RE
                .split(&base)
                .map(|part| headline(&part.trim().to_lowercase()))
                .collect::<Vec<_>>()
        })
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

/// Author entries are strings or `{name}` objects. Blank names become `Unknown`.
pub fn map_authors(raw: Option<&Value>) -> Vec<NamedRef> {
    let entries = match raw {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other.clone()],
    };

    entries
        .iter()
        .map(|entry| {
            let name = match entry {
                Value::Object(_) => text_field(entry, "name"),
                other => text(other),
            };
            NamedRef::new(non_empty(name).unwrap_or_else(|| "Unknown".to_string()))
        })
        .collect()
}

/// Returns the raw description and a plain-text version of it.
pub fn clean_description(description: Option<String>) -> (Option<String>, String) {
    let Some(raw) = description else {
        return (None, String::new());
    };

    let decoded = html_escape::decode_html_entities(&raw);
    let stripped = TAG_RE.replace_all(&decoded, "");
    let clean = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    (Some(raw), clean)
}

/// Pick ISBN-13, then ISBN-10, then any code with a value, else `fallback`.
fn pick_identifier_from_codes(codes: &[Value], fallback: Option<String>) -> Option<String> {
    let normalized: Vec<(String, String)> = codes
        .iter()
        .filter_map(|code| {
            let value = non_empty(coalesce(code, &["identifier", "value"]))?;
            let code_type = text_field(code, "type").unwrap_or_default().to_uppercase();
            Some((code_type, value))
        })
        .collect();

    for wanted in ["ISBN_13", "ISBN_10"] {
        if let Some((_, value)) = normalized.iter().find(|(t, _)| t == wanted) {
            return Some(value.clone());
        }
    }

    normalized
        .into_iter()
        .next()
        .map(|(_, value)| value)
        .or(fallback)
}

/// Replace one query parameter if it is present. Anything unparseable is
/// returned unchanged.
fn replace_query_param(url: &str, key: &str, value: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };

    let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
    if !pairs.iter().any(|(k, _)| k == key) {
        return url.to_string();
    }

    parsed.query_pairs_mut().clear().extend_pairs(pairs.iter().map(|(k, v)| {
        if k == key {
            (k.as_str(), value)
        } else {
            (k.as_str(), v.as_str())
        }
    }));

    parsed.to_string()
}

/// Capitalise every word; `-` and `_` also separate words.
fn headline(s: &str) -> String {
    s.split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// =============================================================================
// JSON access
// =============================================================================

fn field<'a>(data: &'a Value, key: &str) -> Option<&'a Value> {
    data.get(key).filter(|v| !v.is_null())
}

/// Scalar as string. Arrays, objects and null yield `None`.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text_field(data: &Value, key: &str) -> Option<String> {
    field(data, key).and_then(text)
}

/// First present key, as text.
fn coalesce(data: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| field(data, key))
        .and_then(text)
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn int_field(data: &Value, key: &str) -> Option<i64> {
    field(data, key).and_then(as_int)
}

/// A scalar or a list of scalars / `{name}` objects, flattened to strings.
fn string_list(value: Option<&Value>) -> Vec<String> {
    let item = |v: &Value| match v {
        Value::Object(_) => text_field(v, "name"),
        other => text(other),
    };
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(item).collect(),
        Some(other) => item(other).into_iter().collect(),
        None => Vec::new(),
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(b) => !b,
        Value::Number(_) => false,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}
