//! Shared dependencies handed to every action.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use sha2::{Digest, Sha256};

use super::search::SearchResults;
use crate::books::{BookProvider, BookRecord, SearchParams};
use crate::cache::TtlCache;
use crate::covers::{CoverStore, FsCoverStore};
use crate::db::Database;
use crate::jobs::JobQueue;
use crate::paths::get_covers_dir;
use crate::subscription::PlanCatalog;

/// Search results keep a transformed record around for a later import.
pub const BOOK_TTL: Duration = Duration::from_secs(5 * 60);
/// Provider lookups by identifier, including misses.
pub const LOOKUP_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const SEARCH_TTL: Duration = Duration::from_secs(60 * 60);

pub fn book_key(identifier: &str) -> String {
    format!("book:{}", identifier)
}

pub fn lookup_key(identifier: &str) -> String {
    format!("books:id:{}", identifier)
}

/// `books:search:{sha256(query|author|subject|max|page)}`
pub fn search_key(params: &SearchParams) -> String {
    let mut hasher = Sha256::new();
    hasher.update(
        format!(
            "{}|{}|{}|{}|{}",
            params.query.as_deref().unwrap_or_default(),
            params.author.as_deref().unwrap_or_default(),
            params.subject.as_deref().unwrap_or_default(),
            params.max_results,
            params.page
        )
        .as_bytes(),
    );
    let digest: String = hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();
    format!("books:search:{}", digest)
}

/// The caches the ingestion pipeline reads and writes.
#[derive(Debug, Clone, Default)]
pub struct BookCache {
    /// `book:{identifier}`
    pub records: TtlCache<BookRecord>,
    /// `books:id:{identifier}`
    pub lookups: TtlCache<Option<BookRecord>>,
    /// `books:search:{hash}`
    pub searches: TtlCache<SearchResults>,
}

/// Dependencies shared by actions, handlers and the job worker.
///
/// Cheap to clone: every field is reference counted.
pub struct ActionContext<D: Database, P: BookProvider> {
    pub db: Arc<D>,
    pub provider: Arc<P>,
    pub cache: BookCache,
    pub jobs: JobQueue,
    pub plans: Arc<PlanCatalog>,
    pub covers: Arc<dyn CoverStore>,
    pub http: Client,
}

impl<D: Database, P: BookProvider> Clone for ActionContext<D, P> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            provider: Arc::clone(&self.provider),
            cache: self.cache.clone(),
            jobs: self.jobs.clone(),
            plans: Arc::clone(&self.plans),
            covers: Arc::clone(&self.covers),
            http: self.http.clone(),
        }
    }
}

impl<D: Database, P: BookProvider> ActionContext<D, P> {
    /// Context with the default plans and filesystem covers under the XDG
    /// data directory.
    pub fn new(db: D, provider: P, jobs: JobQueue, http: Client) -> Self {
        Self {
            db: Arc::new(db),
            provider: Arc::new(provider),
            cache: BookCache::default(),
            jobs,
            plans: Arc::new(PlanCatalog::default()),
            covers: Arc::new(FsCoverStore::new(get_covers_dir())),
            http,
        }
    }

    pub fn with_plans(mut self, plans: PlanCatalog) -> Self {
        self.plans = Arc::new(plans);
        self
    }

    pub fn with_cover_store(mut self, covers: Arc<dyn CoverStore>) -> Self {
        self.covers = covers;
        self
    }

    pub fn db(&self) -> &D {
        &self.db
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}
