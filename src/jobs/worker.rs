//! Background job execution.

use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use super::{Job, JobReceiver};
use crate::actions::{
    ActionContext, ActionError, ActionResult, ImportBookCover, ImportBookFromData, ImportSource,
    RelationCache,
};
use crate::books::{BookProvider, SearchParams, transform};
use crate::db::{BookRepository, Database};

const DEFAULT_MAX_ATTEMPTS: u32 = 1;
const DEFAULT_ADDITIONAL_PAGES: u32 = 2;

/// Drains the job channel until it closes or the token is cancelled.
pub struct JobWorker<D: Database, P: BookProvider> {
    ctx: ActionContext<D, P>,
    rx: JobReceiver,
    cancel: CancellationToken,
    max_attempts: u32,
    additional_pages: u32,
}

impl<D: Database, P: BookProvider> JobWorker<D, P> {
    pub fn new(ctx: ActionContext<D, P>, rx: JobReceiver, cancel: CancellationToken) -> Self {
        Self {
            ctx,
            rx,
            cancel,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            additional_pages: DEFAULT_ADDITIONAL_PAGES,
        }
    }

    /// Tries per job, including the first. At least one.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Last result page fetched by additional-book imports.
    pub fn with_additional_pages(mut self, additional_pages: u32) -> Self {
        self.additional_pages = additional_pages;
        self
    }

    pub async fn run(mut self) {
        info!("Job worker started");
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Job worker cancelled");
                    break;
                }
                job = self.rx.recv() => match job {
                    Some(job) => self.process(job).await,
                    None => {
                        info!("Job queue closed");
                        break;
                    }
                },
            }
        }
    }

    /// Run a job to completion. Chain members run in order and a failed
    /// member stops the rest of the chain.
    pub async fn process(&self, job: Job) {
        let steps = job.flatten();
        let total = steps.len();

        for (index, step) in steps.into_iter().enumerate() {
            if !self.run_with_retries(&step).await {
                if index + 1 < total {
                    warn!(skipped = total - index - 1, "Chain stopped after failed job");
                }
                return;
            }
        }
    }

    async fn run_with_retries(&self, job: &Job) -> bool {
        for attempt in 1..=self.max_attempts {
            match self.execute(job).await {
                Ok(()) => return true,
                Err(e) if attempt < self.max_attempts => {
                    warn!(job = job.name(), attempt, error = %e, "Job failed, retrying");
                }
                Err(e) => {
                    error!(job = job.name(), attempt, error = %e, "Job failed");
                }
            }
        }
        false
    }

    async fn execute(&self, job: &Job) -> ActionResult<()> {
        match job {
            Job::ImportBooks(records) => {
                self.import_records(records.iter().cloned().map(ImportSource::from))
                    .await;
                Ok(())
            }
            Job::ImportAdditionalBooks {
                query,
                author,
                subject,
            } => {
                self.import_additional(SearchParams {
                    query: query.clone(),
                    author: author.clone(),
                    subject: subject.clone(),
                    ..SearchParams::default()
                })
                .await
            }
            Job::ImportCover { book_id, url } => {
                let book = self.ctx.db().books().get(book_id).await?;
                ImportBookCover::new(&self.ctx)
                    .handle(&book, Some(url))
                    .await;
                Ok(())
            }
            Job::Chain(jobs) => Err(ActionError::InvalidArgument {
                message: format!("nested chain of {} jobs was not flattened", jobs.len()),
            }),
        }
    }

    /// Import every source with one relation cache. Failures are logged per record.
    async fn import_records(&self, sources: impl Iterator<Item = ImportSource>) -> usize {
        let import = ImportBookFromData::new(&self.ctx);
        let mut relations = RelationCache::default();
        let mut imported = 0;

        for source in sources {
            match import.handle(source, false, &mut relations).await {
                Ok(_) => imported += 1,
                Err(e) => error!(error = %e, "Failed to import book"),
            }
        }

        imported
    }

    #[instrument(skip(self))]
    async fn import_additional(&self, params: SearchParams) -> ActionResult<()> {
        let provider = self.ctx.provider();
        let kind = provider.kind();

        for page in 2..=self.additional_pages {
            let results = provider.search(&params.with_page(page)).await?;
            if results.items.is_empty() {
                break;
            }

            let records = results.items.iter().filter_map(|item| match transform(kind, item) {
                Ok(record) => Some(ImportSource::from(record)),
                Err(e) => {
                    warn!(error = %e, "Skipping additional search result");
                    None
                }
            });
            let imported = self.import_records(records).await;
            info!(page, imported, "Imported additional search page");
        }

        Ok(())
    }
}
