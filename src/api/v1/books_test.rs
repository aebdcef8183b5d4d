//! Integration tests for book search and detail endpoints.

use axum::http::StatusCode;
use tower::ServiceExt;

use super::test_helpers::{get, json_body, test_app};
use super::{SearchKind, SearchQuery, parse_search};
use crate::actions::test_support::{StubProvider, create_book, create_user, isbndb_book};
use crate::books::MAX_SEARCH_PAGE;
use crate::db::{Database, SearchHistoryRepository};

fn query(q: Option<&str>, author: Option<&str>, subject: Option<&str>) -> SearchQuery {
    SearchQuery {
        q: q.map(str::to_string),
        author: author.map(str::to_string),
        subject: subject.map(str::to_string),
        page: None,
    }
}

// =============================================================================
// Query parsing
// =============================================================================

#[test]
fn parse_plain_query() {
    let (params, history) = parse_search(&query(Some(" dune "), None, None));
    assert_eq!(params.query.as_deref(), Some("dune"));
    assert_eq!(params.page, 1);
    assert_eq!(history, Some(("dune".to_string(), SearchKind::Query)));
}

#[test]
fn parse_author_prefix() {
    let (params, history) = parse_search(&query(Some("author:Frank Herbert"), None, None));
    assert_eq!(params.query, None);
    assert_eq!(params.author.as_deref(), Some("Frank Herbert"));
    assert_eq!(
        history,
        Some(("author:Frank Herbert".to_string(), SearchKind::Author))
    );
}

#[test]
fn parse_tag_prefix() {
    let (params, history) = parse_search(&query(Some("tag:Science Fiction"), None, None));
    assert_eq!(params.subject.as_deref(), Some("Science Fiction"));
    assert_eq!(history.map(|(_, kind)| kind), Some(SearchKind::Tag));
}

#[test]
fn parse_without_q_uses_separate_params() {
    let (params, history) = parse_search(&query(None, Some("Jane Austen"), None));
    assert_eq!(params.author.as_deref(), Some("Jane Austen"));
    assert_eq!(
        history,
        Some(("author:Jane Austen".to_string(), SearchKind::Author))
    );

    let (params, history) = parse_search(&query(Some("  "), None, None));
    assert!(params.is_empty());
    assert_eq!(history, None);
}

#[test]
fn parse_clamps_page() {
    let cases = [
        (None, 1),
        (Some(0), 1),
        (Some(7), 7),
        (Some(MAX_SEARCH_PAGE), MAX_SEARCH_PAGE),
        (Some(200_000_000), MAX_SEARCH_PAGE),
        (Some(u32::MAX), MAX_SEARCH_PAGE),
    ];

    for (page, expected) in cases {
        let (params, _) = parse_search(&SearchQuery {
            page,
            ..query(Some("dune"), None, None)
        });
        assert_eq!(params.page, expected, "page {:?}", page);
    }
}

// =============================================================================
// GET /api/v1/books/search
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn search_without_term_is_rejected() {
    let t = test_app(StubProvider::new()).await;

    let response = t.app.clone().oneshot(get("/api/v1/books/search", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        json_body(response).await["message"],
        "A search term is required."
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn search_links_stored_books_to_their_page() {
    let provider = StubProvider::new().with_page(
        1,
        42,
        vec![
            isbndb_book("9780441013593", "Dune"),
            isbndb_book("9780441172719", "Dune Messiah"),
        ],
    );
    let t = test_app(provider).await;
    create_book(t.db(), "9780441013593", "Dune").await;

    let response = t
        .app
        .clone()
        .oneshot(get("/api/v1/books/search?q=dune", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["total"], 42);
    let books = body["books"].as_array().expect("Expected books array");
    assert_eq!(books.len(), 2);
    assert_eq!(books[0]["identifier"], "9780441013593");
    assert_eq!(books[0]["links"]["show"], "/books/9780441013593");
    assert_eq!(books[0]["authors"][0], "Frank Herbert");
    assert_eq!(books[1]["links"]["show"], "/books/preview/9780441172719");
}

#[tokio::test(flavor = "multi_thread")]
async fn search_with_oversized_page_is_clamped() {
    let t = test_app(StubProvider::new()).await;

    let response = t
        .app
        .clone()
        .oneshot(get("/api/v1/books/search?q=dune&page=200000000", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["total"], 0);
    let searches = t.ctx.provider().searches();
    assert_eq!(searches.len(), 1);
    assert_eq!(searches[0].page, MAX_SEARCH_PAGE);
}

#[tokio::test(flavor = "multi_thread")]
async fn search_records_history_for_known_user() {
    let provider =
        StubProvider::new().with_page(1, 1, vec![isbndb_book("9780441013593", "Dune")]);
    let t = test_app(provider).await;
    let user = create_user(t.db(), "a@example.com", None).await;

    let response = t
        .app
        .clone()
        .oneshot(get(
            "/api/v1/books/search?q=author:Frank%20Herbert",
            Some(&user.id),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let searches = t.ctx.provider().searches();
    assert_eq!(searches.len(), 1);
    assert_eq!(searches[0].author.as_deref(), Some("Frank Herbert"));
    assert_eq!(searches[0].query, None);

    let history = t.db().searches().recent(&user.id, 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].search_term, "author:Frank Herbert");
    assert_eq!(history[0].search_type.as_deref(), Some("author"));
}

#[tokio::test(flavor = "multi_thread")]
async fn anonymous_search_records_nothing() {
    let provider =
        StubProvider::new().with_page(1, 1, vec![isbndb_book("9780441013593", "Dune")]);
    let t = test_app(provider).await;
    let user = create_user(t.db(), "a@example.com", None).await;

    let response = t
        .app
        .clone()
        .oneshot(get("/api/v1/books/search?q=dune", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert!(t.db().searches().recent(&user.id, 10).await.unwrap().is_empty());
}

// =============================================================================
// GET /api/v1/books/{identifier}
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn get_stored_book() {
    let t = test_app(StubProvider::new()).await;
    create_book(t.db(), "9780441013593", "Dune").await;

    let response = t
        .app
        .clone()
        .oneshot(get("/api/v1/books/9780441013593", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["identifier"], "9780441013593");
    assert_eq!(body["title"], "Dune");
    assert_eq!(body["authors"].as_array().unwrap().len(), 0);
    assert_eq!(t.ctx.provider().get_calls(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn get_unknown_book_imports_from_provider() {
    let provider =
        StubProvider::new().with_book("9780441013593", isbndb_book("9780441013593", "Dune"));
    let t = test_app(provider).await;

    let response = t
        .app
        .clone()
        .oneshot(get("/api/v1/books/9780441013593", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["title"], "Dune");
    assert_eq!(body["authors"][0]["name"], "Frank Herbert");
    assert_eq!(body["publisher"]["name"], "Ace");
    assert_eq!(body["service"], "ISBNdb");
    assert_eq!(t.ctx.provider().get_calls(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn get_book_without_provider_data_is_not_found() {
    let t = test_app(StubProvider::new()).await;

    let response = t
        .app
        .clone()
        .oneshot(get("/api/v1/books/9780000000000", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(response).await["message"],
        "No data found for identifier: 9780000000000"
    );
}
