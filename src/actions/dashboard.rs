//! Library overview for the dashboard.

use serde::Serialize;
use tracing::instrument;

use super::context::ActionContext;
use super::error::ActionResult;
use crate::books::BookProvider;
use crate::db::{
    Activity, ActivityRepository, Database, LibraryEntry, LibraryQuery, LibraryRepository,
    NamedCount, PageSort, User, UserBookStatus,
};

const CURRENTLY_READING: usize = 4;
const TOP_TAGS: usize = 10;
const TOP_AUTHORS: usize = 5;
const RECENT_ACTIVITIES: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub books_in_library: usize,
    pub completed_books: usize,
    pub reading_books: usize,
    pub plan_to_read: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardData {
    pub stats: DashboardStats,
    pub currently_reading: Vec<LibraryEntry>,
    pub tags: Vec<NamedCount>,
    pub authors: Vec<NamedCount>,
    pub activities: Vec<Activity>,
}

pub struct Dashboard<'a, D: Database, P: BookProvider> {
    ctx: &'a ActionContext<D, P>,
}

impl<'a, D: Database, P: BookProvider> Dashboard<'a, D, P> {
    pub fn new(ctx: &'a ActionContext<D, P>) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn handle(&self, user: &User) -> ActionResult<DashboardData> {
        let db = self.ctx.db();
        let library = db.library();

        let counts = library.status_counts(&user.id).await?;
        let count_of = |status| counts.get(&status).copied().unwrap_or(0);
        let stats = DashboardStats {
            books_in_library: counts.values().sum(),
            completed_books: count_of(UserBookStatus::Completed),
            reading_books: count_of(UserBookStatus::Reading),
            plan_to_read: count_of(UserBookStatus::PlanToRead),
        };

        let currently_reading = library
            .list(
                &user.id,
                &LibraryQuery {
                    page: PageSort {
                        limit: Some(CURRENTLY_READING),
                        ..PageSort::default()
                    },
                    status: Some(UserBookStatus::Reading),
                },
            )
            .await?
            .items;

        let tags = library.top_tags(&user.id, TOP_TAGS).await?;
        let authors = library
            .top_completed_authors(&user.id, TOP_AUTHORS)
            .await?;
        let activities = db
            .activities()
            .list(&user.id, &PageSort::page(1, RECENT_ACTIVITIES))
            .await?
            .items;

        Ok(DashboardData {
            stats,
            currently_reading,
            tags,
            authors,
            activities,
        })
    }
}
