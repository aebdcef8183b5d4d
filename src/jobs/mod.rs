//! In-process background jobs.
//!
//! Jobs are sent over an unbounded channel and consumed by a single
//! [`JobWorker`] task. Dispatching never blocks and never fails the caller.

mod worker;

#[cfg(test)]
mod worker_test;

use tokio::sync::mpsc;
use tracing::{debug, warn};

pub use worker::JobWorker;

use crate::books::BookRecord;

/// Work that runs after the request that produced it has returned.
#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    /// Import search results, sharing relation lookups across the batch.
    ImportBooks(Vec<BookRecord>),
    /// Import further result pages of a search.
    ImportAdditionalBooks {
        query: Option<String>,
        author: Option<String>,
        subject: Option<String>,
    },
    /// Download and store a book's primary cover.
    ImportCover { book_id: String, url: String },
    /// Run members in order. A failed member stops the chain.
    Chain(Vec<Job>),
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Job::ImportBooks(_) => "import_books",
            Job::ImportAdditionalBooks { .. } => "import_additional_books",
            Job::ImportCover { .. } => "import_cover",
            Job::Chain(_) => "chain",
        }
    }

    /// Chains expanded into the sequence of jobs they run.
    pub fn flatten(self) -> Vec<Job> {
        match self {
            Job::Chain(jobs) => jobs.into_iter().flat_map(Job::flatten).collect(),
            job => vec![job],
        }
    }
}

pub type JobReceiver = mpsc::UnboundedReceiver<Job>;

/// Sending half of the job channel.
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<Job>,
}

impl JobQueue {
    /// A queue and the receiver a [`JobWorker`] drains.
    pub fn new() -> (Self, JobReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn dispatch(&self, job: Job) {
        let name = job.name();
        match self.tx.send(job) {
            Ok(()) => debug!(job = name, "Job dispatched"),
            Err(_) => warn!(job = name, "Job worker is gone; dropping job"),
        }
    }
}
