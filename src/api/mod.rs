//! HTTP server: configuration, router and lifecycle.

mod handlers;
pub mod routes;
mod state;
pub mod v1;

#[cfg(test)]
mod mod_test;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use state::AppState;

use crate::actions::ActionContext;
use crate::books::BookProvider;
use crate::covers::FsCoverStore;
use crate::db::Database;
use crate::jobs::{JobQueue, JobWorker};
use crate::paths::get_covers_dir;
use crate::subscription::PlanCatalog;

pub const COVERS_DIR_ENV: &str = "BOOKBOUND_COVERS_DIR";

#[derive(Error, Diagnostic, Debug)]
pub enum ApiError {
    #[error("Failed to bind {addr}: {source}")]
    #[diagnostic(
        code(bookbound::api::bind),
        help("Is another process listening on this port?")
    )]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    #[diagnostic(code(bookbound::api::serve))]
    Serve(#[from] std::io::Error),

    #[error("Failed to build HTTP client: {0}")]
    #[diagnostic(code(bookbound::api::http_client))]
    HttpClient(#[from] reqwest::Error),
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host address to bind to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// 0 logs at debug, anything higher at trace. `RUST_LOG` wins.
    pub verbosity: u8,
    /// Serve Scalar docs at `/docs`
    pub enable_docs: bool,
    /// Where imported cover images are written
    pub covers_dir: PathBuf,
    pub plans: PlanCatalog,
    /// Tries per background job, including the first
    pub job_attempts: u32,
    /// Last search page fetched by the additional-books job
    pub additional_pages: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            verbosity: 0,
            enable_docs: true,
            covers_dir: get_covers_dir(),
            plans: PlanCatalog::default(),
            job_attempts: 1,
            additional_pages: 2,
        }
    }
}

impl Config {
    /// Defaults, with the covers directory taken from `BOOKBOUND_COVERS_DIR`
    /// when set.
    pub fn new() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var(COVERS_DIR_ENV) {
            config.covers_dir = PathBuf::from(dir);
        }
        config
    }

    pub fn with_covers_dir(mut self, covers_dir: PathBuf) -> Self {
        self.covers_dir = covers_dir;
        self
    }

    pub fn with_plans(mut self, plans: PlanCatalog) -> Self {
        self.plans = plans;
        self
    }
}

fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "bookbound=debug,tower_http=debug",
        _ => "bookbound=trace,tower_http=trace",
    }
}

/// Initialize tracing subscriber with env filter
fn init_tracing(verbosity: u8) {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(verbosity).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

async fn shutdown_signal(cancel: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown requested");
        }
        _ = cancel.cancelled() => {}
    }
}

/// Run the API server and the background job worker until Ctrl-C.
pub async fn run<D: Database, P: BookProvider>(
    config: Config,
    db: D,
    provider: P,
) -> Result<(), ApiError> {
    init_tracing(config.verbosity);

    let http = reqwest::Client::builder()
        .user_agent(concat!("bookbound/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let (jobs, rx) = JobQueue::new();
    let ctx = ActionContext::new(db, provider, jobs, http)
        .with_plans(config.plans.clone())
        .with_cover_store(Arc::new(FsCoverStore::new(config.covers_dir.clone())));

    let cancel = CancellationToken::new();
    let worker = JobWorker::new(ctx.clone(), rx, cancel.clone())
        .with_max_attempts(config.job_attempts)
        .with_additional_pages(config.additional_pages);
    let worker_handle = tokio::spawn(worker.run());

    let app = routes::create_router(AppState::new(ctx), config.enable_docs)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ApiError::Bind { addr, source })?;
    info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    cancel.cancel();
    if let Err(e) = worker_handle.await {
        warn!(error = %e, "Job worker did not stop cleanly");
    }

    Ok(())
}
