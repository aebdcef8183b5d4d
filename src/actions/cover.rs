//! Download a book's primary cover.

use tracing::{error, info, instrument, warn};

use super::context::ActionContext;
use super::error::ActionResult;
use crate::books::{BookProvider, ProviderError};
use crate::covers::average_colour;
use crate::db::{Book, BookRepository, Cover, CoverRepository, Database};

pub struct ImportBookCover<'a, D: Database, P: BookProvider> {
    ctx: &'a ActionContext<D, P>,
}

impl<'a, D: Database, P: BookProvider> ImportBookCover<'a, D, P> {
    pub fn new(ctx: &'a ActionContext<D, P>) -> Self {
        Self { ctx }
    }

    /// Store the image at `url` as the book's primary cover.
    ///
    /// Failures are logged and swallowed. Returns the new cover row on success.
    #[instrument(skip(self, book), fields(book = %book.identifier))]
    pub async fn handle(&self, book: &Book, url: Option<&str>) -> Option<Cover> {
        let url = url.map(str::trim).filter(|u| !u.is_empty())?;

        match self.import(book, url).await {
            Ok(cover) => {
                info!(path = %cover.path, "Cover imported");
                Some(cover)
            }
            Err(e) => {
                error!(
                    book = %book.identifier,
                    error = %e,
                    "Failed to fetch cover image for book"
                );
                None
            }
        }
    }

    async fn import(&self, book: &Book, url: &str) -> ActionResult<Cover> {
        let http_error = |source| ProviderError::Http {
            url: url.to_string(),
            source,
        };

        let response = self.ctx.http.get(url).send().await.map_err(http_error)?;
        if !response.status().is_success() {
            return Err(ProviderError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            }
            .into());
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(http_error)?;

        let stored = self
            .ctx
            .covers
            .store(&book.identifier, url, content_type, &bytes)?;

        let (cover, previous) = self
            .ctx
            .db()
            .covers()
            .replace_primary(&Cover {
                id: String::new(),
                book_id: book.id.clone(),
                user_id: None,
                path: stored.path,
                content_type: Some(stored.content_type),
                source_url: Some(url.to_string()),
                created_at: String::new(),
            })
            .await?;

        if let Some(previous) = previous.filter(|p| p.path != cover.path) {
            if let Err(e) = self.ctx.covers.delete(&previous.path) {
                warn!(path = %previous.path, error = %e, "Failed to delete replaced cover file");
            }
        }

        self.update_colour(book, bytes.to_vec()).await;

        Ok(cover)
    }

    /// Store the cover's average colour on the book. Failures are logged only.
    async fn update_colour(&self, book: &Book, bytes: Vec<u8>) {
        let colour = match tokio::task::spawn_blocking(move || average_colour(&bytes)).await {
            Ok(Some(colour)) => colour,
            Ok(None) => {
                warn!("Cover image could not be decoded for its colour");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Cover colour task failed");
                return;
            }
        };

        if let Err(e) = self.ctx.db().books().set_colour(&book.id, &colour).await {
            warn!(error = %e, "Failed to store cover colour");
        }
    }
}
