//! Library membership and reading status.

use serde_json::json;
use tracing::{info, instrument, warn};

use super::context::ActionContext;
use super::error::{ActionError, ActionResult};
use crate::books::BookProvider;
use crate::db::{
    ActivityRepository, ActivityType, Book, CoverRepository, Database, DbError, LibraryRepository,
    NewActivity, User, UserBookStatus,
};

fn book_activity(
    user: &User,
    book: &Book,
    activity_type: ActivityType,
    properties: serde_json::Value,
) -> NewActivity {
    NewActivity {
        user_id: user.id.clone(),
        activity_type,
        subject_type: Some("book".to_string()),
        subject_id: Some(book.id.clone()),
        properties,
    }
}

pub struct AddBookToUser<'a, D: Database, P: BookProvider> {
    ctx: &'a ActionContext<D, P>,
}

impl<'a, D: Database, P: BookProvider> AddBookToUser<'a, D, P> {
    pub fn new(ctx: &'a ActionContext<D, P>) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, book, user), fields(user_id = %user.id, book = %book.identifier))]
    pub async fn handle(
        &self,
        book: &Book,
        user: &User,
        status: Option<UserBookStatus>,
    ) -> ActionResult<()> {
        let status = status.unwrap_or_default();
        let db = self.ctx.db();
        let library = db.library();

        if library.entry(&user.id, &book.id).await?.is_some() {
            return Err(ActionError::AlreadyInLibrary);
        }

        let count = library.count(&user.id).await?;
        if !self.ctx.plans.can_add_book(user, count) {
            return Err(ActionError::LimitReached {
                max_books: self.ctx.plans.limits_for(user).max_books,
            });
        }

        library
            .attach(&user.id, &book.id, status)
            .await
            .map_err(|e| match e {
                DbError::AlreadyExists { .. } => ActionError::AlreadyInLibrary,
                other => other.into(),
            })?;

        db.activities()
            .log(&book_activity(
                user,
                book,
                ActivityType::BookAdded,
                json!({
                    "book_identifier": book.identifier,
                    "book_title": book.title,
                    "status": status.to_string(),
                }),
            ))
            .await?;

        info!(
            target: "analytics",
            event = "book_added",
            user_id = %user.id,
            book_identifier = %book.identifier,
            status = %status,
        );

        Ok(())
    }
}

pub struct RemoveBookFromUser<'a, D: Database, P: BookProvider> {
    ctx: &'a ActionContext<D, P>,
}

impl<'a, D: Database, P: BookProvider> RemoveBookFromUser<'a, D, P> {
    pub fn new(ctx: &'a ActionContext<D, P>) -> Self {
        Self { ctx }
    }

    /// Detach the book and drop the user's custom covers for it.
    #[instrument(skip(self, book, user), fields(user_id = %user.id, book = %book.identifier))]
    pub async fn handle(&self, book: &Book, user: &User) -> ActionResult<()> {
        let db = self.ctx.db();
        let library = db.library();

        if library.entry(&user.id, &book.id).await?.is_none() {
            return Err(ActionError::NotInUserLibrary);
        }

        for cover in db.covers().delete_for_user(&user.id, &book.id).await? {
            if let Err(e) = self.ctx.covers.delete(&cover.path) {
                warn!(path = %cover.path, error = %e, "Failed to delete custom cover file");
            }
        }

        library.detach(&user.id, &book.id).await?;

        db.activities()
            .log(&book_activity(
                user,
                book,
                ActivityType::BookRemoved,
                json!({
                    "book_identifier": book.identifier,
                    "book_title": book.title,
                }),
            ))
            .await?;

        info!(
            target: "analytics",
            event = "book_removed",
            user_id = %user.id,
            book_identifier = %book.identifier,
        );

        Ok(())
    }
}

pub struct UpdateUserBookStatus<'a, D: Database, P: BookProvider> {
    ctx: &'a ActionContext<D, P>,
}

impl<'a, D: Database, P: BookProvider> UpdateUserBookStatus<'a, D, P> {
    pub fn new(ctx: &'a ActionContext<D, P>) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, book, user), fields(user_id = %user.id, book = %book.identifier))]
    pub async fn handle(
        &self,
        user: &User,
        book: &Book,
        status: UserBookStatus,
    ) -> ActionResult<UserBookStatus> {
        let db = self.ctx.db();

        if !db.library().set_status(&user.id, &book.id, status).await? {
            return Err(ActionError::NotInLibrary);
        }

        db.activities()
            .log(&book_activity(
                user,
                book,
                ActivityType::BookStatusUpdated,
                json!({
                    "book_identifier": book.identifier,
                    "book_title": book.title,
                    "status": status.to_string(),
                }),
            ))
            .await?;

        info!(
            target: "analytics",
            event = "book_status_updated",
            user_id = %user.id,
            book_identifier = %book.identifier,
            status = %status,
        );

        Ok(status)
    }
}
