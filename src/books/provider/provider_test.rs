//! Tests for the provider clients against a local stub server.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::books::provider::{
    BookProvider, GoogleBooksClient, IsbndbClient, MAX_SEARCH_PAGE, OpenLibraryClient,
    SearchParams,
};

fn init_crypto() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

fn http_client() -> reqwest::Client {
    init_crypto();
    reqwest::Client::new()
}

/// Serve `app` on an ephemeral port and return its base URL.
async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub server");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

type Hits = Arc<AtomicUsize>;

// =============================================================================
// ISBNdb
// =============================================================================

async fn isbndb_search(
    State(hits): State<Hits>,
    Path(query): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Json<Value> {
    hits.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "total": 42,
        "books": [{
            "isbn13": "9780747532743",
            "echo": {
                "query": query,
                "params": params,
                "auth": headers.get("authorization").and_then(|h| h.to_str().ok()),
            }
        }]
    }))
}

async fn isbndb_book(Path(id): Path<String>) -> Result<Json<Value>, StatusCode> {
    if id == "9780747532743" {
        Ok(Json(json!({ "book": { "isbn13": id, "title": "Stone" } })))
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

async fn isbndb_stub() -> (String, Hits) {
    let hits = Hits::default();
    let app = Router::new()
        .route("/books/{query}", get(isbndb_search))
        .route("/book/{id}", get(isbndb_book))
        .with_state(hits.clone());
    (serve(app).await, hits)
}

#[tokio::test(flavor = "multi_thread")]
async fn isbndb_search_sends_key_and_author_column() {
    let (base, _) = isbndb_stub().await;
    let client = IsbndbClient::with_base_url(http_client(), "secret-key".to_string(), &base);

    let page = client
        .search(&SearchParams {
            query: Some("harry".to_string()),
            author: Some("rowling".to_string()),
            page: 2,
            max_results: 20,
            ..SearchParams::default()
        })
        .await
        .unwrap();

    assert_eq!(page.total, 42);
    let echo = &page.items[0]["echo"];
    assert_eq!(echo["query"], "harry rowling");
    assert_eq!(echo["params"]["column"], "author");
    assert_eq!(echo["params"]["shouldMatchAll"], "1");
    assert_eq!(echo["params"]["page"], "2");
    assert_eq!(echo["params"]["pageSize"], "20");
    assert_eq!(echo["auth"], "secret-key");
}

#[tokio::test(flavor = "multi_thread")]
async fn isbndb_subject_search_uses_subjects_column() {
    let (base, _) = isbndb_stub().await;
    let client = IsbndbClient::with_base_url(http_client(), "k".to_string(), &base);

    let page = client
        .search(&SearchParams {
            subject: Some("fantasy".to_string()),
            ..SearchParams::default()
        })
        .await
        .unwrap();

    let echo = &page.items[0]["echo"];
    assert_eq!(echo["query"], "fantasy");
    assert_eq!(echo["params"]["column"], "subjects");
    assert_eq!(echo["params"]["shouldMatchAll"], "0");
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_search_makes_no_request() {
    let (base, hits) = isbndb_stub().await;
    let client = IsbndbClient::with_base_url(http_client(), "k".to_string(), &base);

    let page = client
        .search(&SearchParams {
            query: Some("   ".to_string()),
            ..SearchParams::default()
        })
        .await
        .unwrap();

    assert_eq!(page.total, 0);
    assert!(page.items.is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn isbndb_get_unwraps_book_and_maps_404_to_none() {
    let (base, _) = isbndb_stub().await;
    let client = IsbndbClient::with_base_url(http_client(), "k".to_string(), &base);

    let book = client.get("9780747532743").await.unwrap().unwrap();
    assert_eq!(book["title"], "Stone");

    assert!(client.get("0000000000").await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_search_degrades_to_empty_page_after_retries() {
    let hits = Hits::default();
    let counter = hits.clone();
    let app = Router::new().route(
        "/books/{query}",
        get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }),
    );
    let base = serve(app).await;
    let client = IsbndbClient::with_base_url(http_client(), "k".to_string(), &base);

    let page = client.search(&SearchParams::query("dune")).await.unwrap();

    assert!(page.items.is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_provider_degrades_to_empty_page() {
    // Nothing listens on the discard port.
    let client =
        IsbndbClient::with_base_url(http_client(), "k".to_string(), "http://127.0.0.1:9");

    let page = client.search(&SearchParams::query("dune")).await.unwrap();
    assert!(page.items.is_empty());

    assert!(client.get("9780441013593").await.is_err());
}

// =============================================================================
// Google Books
// =============================================================================

fn volume() -> Value {
    json!({
        "id": "zyTCAlFPjgYC",
        "volumeInfo": {
            "title": "The Google Story",
            "authors": ["David A. Vise"],
            "publisher": "Random House",
            "publishedDate": "2005-11-15",
            "pageCount": 207,
            "categories": ["Business & Economics"],
            "language": "en",
            "industryIdentifiers": [{ "type": "ISBN_13", "identifier": "9780553804577" }],
            "imageLinks": { "thumbnail": "http://books.google.com/books/content?id=zyTCAlFPjgYC&zoom=1&edge=curl" }
        }
    })
}

async fn google_volumes(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let q = params.get("q").cloned().unwrap_or_default();
    if q == "isbn:0000000000" {
        return Json(json!({ "totalItems": 0 }));
    }
    Json(json!({
        "totalItems": 1,
        "items": [volume()],
        "echo": params,
    }))
}

#[tokio::test(flavor = "multi_thread")]
async fn google_search_flattens_volumes() {
    let app = Router::new().route("/volumes", get(google_volumes));
    let base = serve(app).await;
    let client = GoogleBooksClient::with_base_url(http_client(), None, &base);

    let page = client
        .search(&SearchParams {
            query: Some("google".to_string()),
            author: Some("vise".to_string()),
            ..SearchParams::default()
        })
        .await
        .unwrap();

    assert_eq!(page.total, 1);
    let item = &page.items[0];
    assert_eq!(item["id"], "zyTCAlFPjgYC");
    assert_eq!(item["date_published"], "2005-11-15");
    assert_eq!(item["page_count"], 207);
    assert_eq!(item["tags"][0], "Business & Economics");
    assert_eq!(item["codes"][0]["identifier"], "9780553804577");
    assert!(item["cover"].as_str().unwrap().contains("edge=curl"));
}

#[tokio::test(flavor = "multi_thread")]
async fn google_search_sends_paging_and_key() {
    let echoed = Arc::new(std::sync::Mutex::new(HashMap::new()));
    let sink = echoed.clone();
    let app = Router::new().route(
        "/volumes",
        get(move |Query(params): Query<HashMap<String, String>>| {
            let sink = sink.clone();
            async move {
                *sink.lock().unwrap() = params;
                Json(json!({ "totalItems": 0 }))
            }
        }),
    );
    let base = serve(app).await;
    let client =
        GoogleBooksClient::with_base_url(http_client(), Some("gkey".to_string()), &base);

    client
        .search(&SearchParams {
            query: Some("dune".to_string()),
            subject: Some("fiction".to_string()),
            max_results: 20,
            page: 3,
            ..SearchParams::default()
        })
        .await
        .unwrap();

    let params = echoed.lock().unwrap().clone();
    assert_eq!(params["q"], "dune subject:fiction");
    assert_eq!(params["maxResults"], "20");
    assert_eq!(params["startIndex"], "40");
    assert_eq!(params["key"], "gkey");
}

/// Run a Google search against a stub and return the query it received.
async fn google_search_params(params: SearchParams) -> HashMap<String, String> {
    let echoed = Arc::new(std::sync::Mutex::new(HashMap::new()));
    let sink = echoed.clone();
    let app = Router::new().route(
        "/volumes",
        get(move |Query(params): Query<HashMap<String, String>>| {
            let sink = sink.clone();
            async move {
                *sink.lock().unwrap() = params;
                Json(json!({ "totalItems": 0 }))
            }
        }),
    );
    let base = serve(app).await;
    let client = GoogleBooksClient::with_base_url(http_client(), None, &base);

    client.search(&params).await.unwrap();
    let received = echoed.lock().unwrap().clone();
    received
}

#[tokio::test(flavor = "multi_thread")]
async fn google_start_index_is_clamped_at_page_edges() {
    let cases = [
        (0, "0"),
        (1, "0"),
        (2, "20"),
        (200_000_000, "19980"),
        (u32::MAX, "19980"),
    ];

    for (page, expected) in cases {
        let params = google_search_params(SearchParams {
            query: Some("dune".to_string()),
            max_results: 20,
            page,
            ..SearchParams::default()
        })
        .await;
        assert_eq!(params["startIndex"], expected, "page {}", page);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn google_huge_page_against_unreachable_host_is_empty() {
    let client = GoogleBooksClient::with_base_url(http_client(), None, "http://127.0.0.1:9");

    let page = client
        .search(&SearchParams {
            page: 200_000_000,
            ..SearchParams::query("dune")
        })
        .await
        .unwrap();

    assert_eq!(page.total, 0);
    assert!(page.items.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn isbndb_page_is_clamped() {
    let (base, _) = isbndb_stub().await;
    let client = IsbndbClient::with_base_url(http_client(), "k".to_string(), &base);

    for (page, expected) in [(0, "1".to_string()), (u32::MAX, MAX_SEARCH_PAGE.to_string())] {
        let result = client
            .search(&SearchParams {
                page,
                ..SearchParams::query("dune")
            })
            .await
            .unwrap();
        assert_eq!(result.items[0]["echo"]["params"]["page"], expected);
    }
}

#[test]
fn search_params_offsets_never_overflow() {
    let cases: [(u32, u32, u32, u64); 5] = [
        (0, 30, 1, 0),
        (1, 30, 1, 0),
        (3, 30, 3, 60),
        (MAX_SEARCH_PAGE, 40, MAX_SEARCH_PAGE, 39_960),
        (u32::MAX, u32::MAX, MAX_SEARCH_PAGE, 999 * u64::from(u32::MAX)),
    ];

    for (page, size, number, offset) in cases {
        let params = SearchParams {
            page,
            ..SearchParams::query("dune")
        };
        assert_eq!(params.page_number(), number, "page {}", page);
        assert_eq!(params.offset(size), offset, "page {} size {}", page, size);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn google_get_returns_first_volume_or_none() {
    let app = Router::new().route("/volumes", get(google_volumes));
    let base = serve(app).await;
    let client = GoogleBooksClient::with_base_url(http_client(), None, &base);

    let book = client.get("9780553804577").await.unwrap().unwrap();
    assert_eq!(book["title"], "The Google Story");

    assert!(client.get("0000000000").await.unwrap().is_none());
}

// =============================================================================
// OpenLibrary
// =============================================================================

async fn ol_edition(Path(file): Path<String>) -> Result<Json<Value>, StatusCode> {
    match file.as_str() {
        "9780441013593.json" => Ok(Json(json!({
            "key": "/books/OL7353617M",
            "isbn_13": ["9780441013593"],
            "authors": [{ "key": "/authors/OL79034A" }, { "key": "/authors/OLMISSINGA" }],
            "covers": [11481354]
        }))),
        "empty.json" => Ok(Json(json!({}))),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn ol_author(Path(file): Path<String>) -> Result<Json<Value>, StatusCode> {
    if file == "OL79034A.json" {
        Ok(Json(json!({ "name": "Frank Herbert" })))
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

async fn ol_search(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let docs: Vec<Value> = (0..5)
        .map(|i| json!({ "key": format!("/works/OL{}W", i), "isbn": [format!("97800000000{:02}", i)] }))
        .collect();
    Json(json!({ "numFound": 250, "docs": docs, "echo": params }))
}

async fn open_library_stub() -> String {
    let app = Router::new()
        .route("/isbn/{file}", get(ol_edition))
        .route("/authors/{file}", get(ol_author))
        .route("/search.json", get(ol_search));
    serve(app).await
}

#[tokio::test(flavor = "multi_thread")]
async fn open_library_get_expands_authors_and_covers() {
    let base = open_library_stub().await;
    let client = OpenLibraryClient::with_base_url(http_client(), &base);

    let edition = client.get("9780441013593").await.unwrap().unwrap();

    assert_eq!(edition["author_expanded"], json!(["Frank Herbert"]));
    assert_eq!(
        edition["cover_large"],
        "https://covers.openlibrary.org/b/id/11481354-L.jpg"
    );
    assert_eq!(
        edition["cover_small"],
        "https://covers.openlibrary.org/b/id/11481354-S.jpg"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn open_library_get_missing_or_empty_is_none() {
    let base = open_library_stub().await;
    let client = OpenLibraryClient::with_base_url(http_client(), &base);

    assert!(client.get("0000000000").await.unwrap().is_none());
    assert!(client.get("empty").await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn open_library_search_truncates_docs() {
    let base = open_library_stub().await;
    let client = OpenLibraryClient::with_base_url(http_client(), &base);

    let page = client
        .search(&SearchParams {
            query: Some("dune".to_string()),
            author: Some("Frank Herbert".to_string()),
            max_results: 3,
            ..SearchParams::default()
        })
        .await
        .unwrap();

    assert_eq!(page.total, 250);
    assert_eq!(page.items.len(), 3);
}
