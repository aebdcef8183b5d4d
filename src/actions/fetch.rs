//! Load a stored book, importing it first when needed.

use tracing::instrument;

use super::context::ActionContext;
use super::error::ActionResult;
use super::import::{ImportBookFromData, ImportSource, RelationCache};
use crate::books::BookProvider;
use crate::db::{BookDetails, BookRepository, Database};

pub struct FetchOrCreateBook<'a, D: Database, P: BookProvider> {
    ctx: &'a ActionContext<D, P>,
}

impl<'a, D: Database, P: BookProvider> FetchOrCreateBook<'a, D, P> {
    pub fn new(ctx: &'a ActionContext<D, P>) -> Self {
        Self { ctx }
    }

    /// The book with authors, tags, publisher and primary cover loaded.
    #[instrument(skip(self))]
    pub async fn handle(&self, identifier: &str) -> ActionResult<BookDetails> {
        let books = self.ctx.db().books();

        let book = match books.find_by_identifier(identifier).await? {
            Some(book) => book,
            None => {
                ImportBookFromData::new(self.ctx)
                    .handle(
                        ImportSource::Identifier(identifier.to_string()),
                        false,
                        &mut RelationCache::default(),
                    )
                    .await?
            }
        };

        Ok(books.details(&book.id).await?)
    }
}
