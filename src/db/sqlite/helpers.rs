//! Shared helper functions for SQLite repositories.

use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::db::{Book, DbError, DbResult, IdentifierCode, PageSort, SortOrder};

/// Columns selected whenever a full `book` row is loaded.
pub const BOOK_COLUMNS: &str = "b.id, b.identifier, b.title, b.page_count, b.edition, b.binding, \
     b.language, b.published_date, b.description, b.description_clean, b.codes, b.service, \
     b.publisher_id, b.colour, b.created_at, b.updated_at";

/// Validate and map a sort field to the actual column name.
/// Returns None for invalid fields (falls back to default).
pub fn validate_sort_field(field: &str, allowed: &[&str]) -> Option<&'static str> {
    if !allowed.contains(&field) {
        return None;
    }
    match field {
        "title" => Some("b.title"),
        "identifier" => Some("b.identifier"),
        "published_date" => Some("b.published_date"),
        "status" => Some("bu.status"),
        "added_at" => Some("bu.created_at"),
        "created_at" => Some("created_at"),
        "updated_at" => Some("updated_at"),
        _ => None,
    }
}

/// Build ORDER BY clause from PageSort parameters.
pub fn build_order_clause(page: &PageSort, allowed_fields: &[&str], default_field: &str) -> String {
    let sort_field = page
        .sort_by
        .as_deref()
        .and_then(|f| validate_sort_field(f, allowed_fields))
        .unwrap_or(default_field);

    let order = match page.sort_order.unwrap_or(SortOrder::Asc) {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };

    format!("ORDER BY {} {}", sort_field, order)
}

/// Build LIMIT/OFFSET clause from PageSort parameters.
/// SQL requires LIMIT when using OFFSET. If offset is provided without limit,
/// we use LIMIT -1 (SQLite's "no limit" value).
pub fn build_limit_offset_clause(page: &PageSort) -> String {
    let mut clause = String::new();

    // SQLite integers are i64
    let offset = page.offset.filter(|o| *o > 0).map(|o| o.min(i64::MAX as usize));

    if let Some(limit) = page.limit {
        clause.push_str(&format!(" LIMIT {}", limit.min(i64::MAX as usize)));
    } else if offset.is_some() {
        clause.push_str(" LIMIT -1");
    }

    if let Some(offset) = offset {
        clause.push_str(&format!(" OFFSET {}", offset));
    }

    clause
}

/// `?, ?, ?` for an `IN (...)` list of `n` values.
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Map a row selected with [`BOOK_COLUMNS`] into a [`Book`].
pub fn book_from_row(row: &SqliteRow) -> DbResult<Book> {
    let codes_json: String = row.get("codes");
    let codes: Vec<IdentifierCode> =
        serde_json::from_str(&codes_json).map_err(|e| DbError::InvalidData {
            message: format!("book.codes is not valid JSON: {}", e),
            help: "Re-import the book to rebuild its identifier codes".to_string(),
        })?;

    Ok(Book {
        id: row.get("id"),
        identifier: row.get("identifier"),
        title: row.get("title"),
        page_count: row.get("page_count"),
        edition: row.get("edition"),
        binding: row.get("binding"),
        language: row.get("language"),
        published_date: row.get("published_date"),
        description: row.get("description"),
        description_clean: row.get("description_clean"),
        codes,
        service: row.get("service"),
        publisher_id: row.get("publisher_id"),
        colour: row.get("colour"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
