//! Shared fixtures for action, job and handler tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use super::ActionContext;
use crate::books::{BookProvider, ProviderKind, ProviderResult, SearchPage, SearchParams};
use crate::covers::FsCoverStore;
use crate::db::{
    Book, BookRepository, Database, NewUser, SqliteDatabase, User, UserRepository,
};
use crate::jobs::{JobQueue, JobReceiver};

pub(crate) fn init_crypto() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Serve `app` on an ephemeral port and return its base URL.
pub(crate) async fn serve(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub server");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Provider returning canned ISBNdb-shaped payloads.
#[derive(Default)]
pub(crate) struct StubProvider {
    pages: HashMap<u32, SearchPage>,
    books: HashMap<String, Value>,
    searches: Mutex<Vec<SearchParams>>,
    gets: AtomicUsize,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: u32, total: u64, items: Vec<Value>) -> Self {
        self.pages.insert(page, SearchPage { total, items });
        self
    }

    pub fn with_book(mut self, id: &str, data: Value) -> Self {
        self.books.insert(id.to_string(), data);
        self
    }

    pub fn searches(&self) -> Vec<SearchParams> {
        self.searches.lock().unwrap().clone()
    }

    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

impl BookProvider for StubProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Isbndb
    }

    async fn search(&self, params: &SearchParams) -> ProviderResult<SearchPage> {
        self.searches.lock().unwrap().push(params.clone());
        Ok(self.pages.get(&params.page).cloned().unwrap_or_default())
    }

    async fn get(&self, id: &str) -> ProviderResult<Option<Value>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.books.get(id).cloned())
    }
}

/// An ISBNdb book payload.
pub(crate) fn isbndb_book(isbn13: &str, title: &str) -> Value {
    json!({
        "isbn13": isbn13,
        "isbn": format!("{}X", &isbn13[3..12]),
        "title": title,
        "authors": ["Frank Herbert"],
        "publisher": "Ace",
        "subjects": ["Fiction/Science Fiction"],
        "pages": 412,
        "synopsis": "<p>Desert &amp; spice</p>",
        "image": format!("https://images.test/{}.jpg", isbn13),
    })
}

pub(crate) struct TestContext {
    pub ctx: ActionContext<SqliteDatabase, StubProvider>,
    pub jobs: JobReceiver,
    pub covers_dir: tempfile::TempDir,
}

pub(crate) async fn test_context(provider: StubProvider) -> TestContext {
    init_crypto();
    let db = SqliteDatabase::in_memory().await.unwrap();
    db.migrate().await.unwrap();

    let covers_dir = tempfile::tempdir().unwrap();
    let (queue, jobs) = JobQueue::new();
    let ctx = ActionContext::new(db, provider, queue, reqwest::Client::new())
        .with_cover_store(Arc::new(FsCoverStore::new(covers_dir.path())));

    TestContext {
        ctx,
        jobs,
        covers_dir,
    }
}

pub(crate) async fn create_user<D: Database>(db: &D, email: &str, plan: Option<&str>) -> User {
    db.users()
        .create(&NewUser {
            name: "Reader".to_string(),
            email: email.to_string(),
            plan: plan.map(str::to_string),
        })
        .await
        .unwrap()
}

pub(crate) async fn create_book<D: Database>(db: &D, identifier: &str, title: &str) -> Book {
    db.books()
        .create(&Book {
            id: String::new(),
            identifier: identifier.to_string(),
            title: Some(title.to_string()),
            page_count: None,
            edition: None,
            binding: None,
            language: None,
            published_date: None,
            description: None,
            description_clean: None,
            codes: vec![],
            service: Some("ISBNdb".to_string()),
            publisher_id: None,
            colour: None,
            created_at: String::new(),
            updated_at: String::new(),
        })
        .await
        .unwrap()
}
