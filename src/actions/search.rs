//! Provider search with caching and background import.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::context::{ActionContext, BOOK_TTL, SEARCH_TTL, book_key, search_key};
use super::error::ActionResult;
use crate::books::{BookProvider, BookRecord, SearchParams, transform};
use crate::db::Database;
use crate::jobs::Job;

/// Transformed search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub total: u64,
    pub books: Vec<BookRecord>,
}

pub struct SearchBooksFromApi<'a, D: Database, P: BookProvider> {
    ctx: &'a ActionContext<D, P>,
}

impl<'a, D: Database, P: BookProvider> SearchBooksFromApi<'a, D, P> {
    pub fn new(ctx: &'a ActionContext<D, P>) -> Self {
        Self { ctx }
    }

    /// Results come from the search cache when possible. Empty results are
    /// never kept.
    #[instrument(skip(self))]
    pub async fn handle(&self, params: &SearchParams) -> ActionResult<SearchResults> {
        let key = search_key(params);
        let results = self
            .ctx
            .cache
            .searches
            .remember(&key, SEARCH_TTL, || self.fetch(params))
            .await?;

        if results.total == 0 {
            self.ctx.cache.searches.forget(&key);
        }

        Ok(results)
    }

    async fn fetch(&self, params: &SearchParams) -> ActionResult<SearchResults> {
        let provider = self.ctx.provider();
        let kind = provider.kind();
        let page = provider.search(params).await?;

        let books: Vec<BookRecord> = page
            .items
            .iter()
            .filter_map(|item| match transform(kind, item) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(provider = %kind, error = %e, "Skipping search result");
                    None
                }
            })
            .collect();

        for record in &books {
            self.ctx
                .cache
                .records
                .put(book_key(&record.identifier), record.clone(), BOOK_TTL);
        }

        if !books.is_empty() {
            self.ctx.jobs.dispatch(Job::Chain(vec![
                Job::ImportBooks(books.clone()),
                Job::ImportAdditionalBooks {
                    query: params.query.clone(),
                    author: params.author.clone(),
                    subject: params.subject.clone(),
                },
            ]));
        }

        debug!(total = page.total, transformed = books.len(), "Search fetched");

        Ok(SearchResults {
            total: page.total,
            books,
        })
    }
}
