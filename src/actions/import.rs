//! Persist a book from provider data.

use std::collections::HashMap;

use tracing::{debug, info, instrument};

use super::context::{ActionContext, LOOKUP_TTL, book_key, lookup_key};
use super::error::{ActionError, ActionResult};
use crate::books::transform::normalize_subjects;
use crate::books::{BookProvider, BookRecord, transform};
use crate::db::{
    Book, BookRepository, CatalogRepository, Database, DbError, DbResult, Id,
};
use crate::jobs::Job;

/// What to import: an identifier to look up, or an already transformed record.
#[derive(Debug, Clone)]
pub enum ImportSource {
    Identifier(String),
    Record(Box<BookRecord>),
}

impl ImportSource {
    fn identifier(&self) -> &str {
        match self {
            ImportSource::Identifier(id) => id,
            ImportSource::Record(record) => &record.identifier,
        }
    }
}

impl From<BookRecord> for ImportSource {
    fn from(record: BookRecord) -> Self {
        ImportSource::Record(Box::new(record))
    }
}

/// Name → id maps reused across a batch of imports.
#[derive(Debug, Default)]
pub struct RelationCache {
    authors: HashMap<String, Id>,
    tags: HashMap<String, Id>,
    publishers: HashMap<String, Id>,
}

impl RelationCache {
    pub fn author(&self, name: &str) -> Option<&str> {
        self.authors.get(name).map(String::as_str)
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }

    pub fn publisher(&self, name: &str) -> Option<&str> {
        self.publishers.get(name).map(String::as_str)
    }

    async fn author_id<C: CatalogRepository>(&mut self, catalog: &C, name: &str) -> DbResult<Id> {
        if let Some(id) = self.authors.get(name) {
            return Ok(id.clone());
        }
        let author = catalog.author_first_or_create(name).await?;
        self.authors.insert(name.to_string(), author.id.clone());
        Ok(author.id)
    }

    async fn tag_id<C: CatalogRepository>(&mut self, catalog: &C, name: &str) -> DbResult<Id> {
        if let Some(id) = self.tags.get(name) {
            return Ok(id.clone());
        }
        let tag = catalog.tag_first_or_create(name).await?;
        self.tags.insert(name.to_string(), tag.id.clone());
        Ok(tag.id)
    }

    async fn publisher_id<C: CatalogRepository>(
        &mut self,
        catalog: &C,
        name: &str,
    ) -> DbResult<Id> {
        if let Some(id) = self.publishers.get(name) {
            return Ok(id.clone());
        }
        let publisher = catalog.publisher_first_or_create(name).await?;
        self.publishers
            .insert(name.to_string(), publisher.id.clone());
        Ok(publisher.id)
    }
}

pub struct ImportBookFromData<'a, D: Database, P: BookProvider> {
    ctx: &'a ActionContext<D, P>,
}

impl<'a, D: Database, P: BookProvider> ImportBookFromData<'a, D, P> {
    pub fn new(ctx: &'a ActionContext<D, P>) -> Self {
        Self { ctx }
    }

    /// Store the book and queue its cover.
    ///
    /// An already stored book is returned untouched unless `force` is set.
    #[instrument(skip(self, source, relations), fields(identifier = source.identifier()))]
    pub async fn handle(
        &self,
        source: ImportSource,
        force: bool,
        relations: &mut RelationCache,
    ) -> ActionResult<Book> {
        let identifier = source.identifier().trim().to_string();
        if identifier.is_empty() {
            return Err(ActionError::InvalidArgument {
                message: "A book identifier is required to import a book.".to_string(),
            });
        }

        let existing = self.ctx.db().books().find_by_identifier(&identifier).await?;
        if let Some(book) = &existing {
            if !force {
                debug!("Book already stored");
                return Ok(book.clone());
            }
        }

        let record = match source {
            ImportSource::Record(record) => *record,
            ImportSource::Identifier(_) => self
                .lookup(&identifier)
                .await?
                .ok_or_else(|| ActionError::NoData {
                    identifier: identifier.clone(),
                })?,
        };

        let book = match self.persist(&record, existing, relations).await {
            Err(ActionError::Db(DbError::AlreadyExists { .. })) if !force => {
                // Stored concurrently by another import.
                self.ctx
                    .db()
                    .books()
                    .find_by_identifier(&identifier)
                    .await?
                    .ok_or(ActionError::NoData { identifier })?
            }
            other => other?,
        };

        if let Some(url) = record.preferred_cover() {
            self.ctx.jobs.dispatch(Job::ImportCover {
                book_id: book.id.clone(),
                url: url.to_string(),
            });
        }

        info!(book_id = %book.id, "Book imported");
        Ok(book)
    }

    /// Search-cached record first, then a week-long cached provider lookup.
    async fn lookup(&self, identifier: &str) -> ActionResult<Option<BookRecord>> {
        if let Some(record) = self.ctx.cache.records.pull(&book_key(identifier)) {
            return Ok(Some(record));
        }

        let provider = self.ctx.provider();
        self.ctx
            .cache
            .lookups
            .remember(&lookup_key(identifier), LOOKUP_TTL, || async {
                let raw = provider.get(identifier).await?;
                raw.map(|data| transform(provider.kind(), &data))
                    .transpose()
                    .map_err(ActionError::from)
            })
            .await
    }

    async fn persist(
        &self,
        record: &BookRecord,
        existing: Option<Book>,
        relations: &mut RelationCache,
    ) -> ActionResult<Book> {
        let db = self.ctx.db();
        let catalog = db.catalog();
        let books = db.books();

        let publisher_id = match record
            .publisher
            .as_ref()
            .map(|p| p.name.trim())
            .filter(|name| !name.is_empty())
        {
            Some(name) => Some(relations.publisher_id(&catalog, name).await?),
            None => None,
        };

        let mut author_ids: Vec<Id> = Vec::new();
        for author in &record.authors {
            let name = author.name.trim();
            if name.is_empty() {
                continue;
            }
            let id = relations.author_id(&catalog, name).await?;
            if !author_ids.contains(&id) {
                author_ids.push(id);
            }
        }

        let mut tag_ids: Vec<Id> = Vec::new();
        for name in normalize_subjects(&record.tags) {
            let id = relations.tag_id(&catalog, &name).await?;
            if !tag_ids.contains(&id) {
                tag_ids.push(id);
            }
        }

        let (id, colour, created_at, updated_at) = existing
            .map(|b| (b.id, b.colour, b.created_at, b.updated_at))
            .unwrap_or_default();

        let book = Book {
            id,
            identifier: record.identifier.trim().to_string(),
            title: record.title.clone(),
            page_count: record.page_count,
            edition: record.edition.clone(),
            binding: record.binding.clone(),
            language: record.language.clone(),
            published_date: record.published_date.clone(),
            description: record.description.clone(),
            description_clean: Some(record.description_clean.clone()).filter(|d| !d.is_empty()),
            codes: record.codes.clone(),
            service: Some(record.service.clone()),
            publisher_id,
            colour,
            created_at,
            updated_at,
        };

        let book = books.store(&book, &author_ids, &tag_ids).await?;

        Ok(book)
    }
}
