//! Bookbound API server binary.
//!
//! This binary picks the concrete database and book provider and hands both
//! to the API server. The API layer stays generic over storage and provider.

use std::net::IpAddr;
use std::path::PathBuf;

use bookbound::api::{self, ApiError, Config};
use bookbound::books::{AnyProvider, ProviderKind};
use bookbound::db::{Database, DbError, SqliteDatabase};
use bookbound::paths::{get_covers_dir, get_db_path};
use bookbound::subscription::{PlanCatalog, PlanError};
use clap::Parser;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
enum BinaryError {
    #[error("Database error: {0}")]
    #[diagnostic(code(bookbound::binary::database))]
    Database(#[from] DbError),

    #[error("Failed to create data directory: {0}")]
    #[diagnostic(code(bookbound::binary::io))]
    Io(#[from] std::io::Error),

    #[error("API server error: {0}")]
    #[diagnostic(code(bookbound::binary::api))]
    Api(#[from] ApiError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Plan(#[from] PlanError),

    #[error("Failed to build HTTP client: {0}")]
    #[diagnostic(code(bookbound::binary::provider))]
    Provider(#[from] reqwest::Error),
}

#[derive(Parser)]
#[command(name = "bookbound-api")]
#[command(author, version, about = "Bookbound API server", long_about = None)]
struct Cli {
    /// Host address to bind to
    #[arg(long, env = "BOOKBOUND_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "BOOKBOUND_PORT", default_value = "3000")]
    port: u16,

    /// Database file path (defaults to ~/.local/share/bookbound/bookbound.db)
    #[arg(long, env = "BOOKBOUND_DB")]
    db: Option<PathBuf>,

    /// Book provider used for search and import (isbndb, google, openlibrary)
    #[arg(long, env = "BOOKS_API", default_value = "isbndb")]
    books_api: ProviderKind,

    #[arg(long, env = "ISBNDB_KEY", hide_env_values = true)]
    isbndb_key: Option<String>,

    #[arg(long, env = "GOOGLE_BOOKS_KEY", hide_env_values = true)]
    google_books_key: Option<String>,

    /// Directory for imported cover images (defaults to ~/.local/share/bookbound/covers)
    #[arg(long, env = "BOOKBOUND_COVERS_DIR")]
    covers_dir: Option<PathBuf>,

    /// YAML file with plan limits, merged over the built-in plans
    #[arg(long, env = "BOOKBOUND_PLANS")]
    plans: Option<PathBuf>,

    /// Increase log verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Do not serve API docs at /docs
    #[arg(long)]
    no_docs: bool,

    /// Tries per background job, including the first
    #[arg(long, default_value = "1")]
    job_attempts: u32,

    /// Last search page fetched when pre-importing related books
    #[arg(long, default_value = "2")]
    additional_pages: u32,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let _ = rustls::crypto::ring::default_provider().install_default();
    serve(Cli::parse()).await?;
    Ok(())
}

async fn serve(cli: Cli) -> Result<(), BinaryError> {
    let db_path = cli.db.unwrap_or_else(get_db_path);

    println!("Opening database at {:?}", db_path);

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db = SqliteDatabase::open(&db_path).await?;

    db.migrate().await?;
    println!("Database migrations complete");

    let plans = match cli.plans {
        Some(path) => PlanCatalog::load(&path)?,
        None => PlanCatalog::default(),
    };

    let http = reqwest::Client::builder()
        .user_agent(concat!("bookbound/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let provider = AnyProvider::new(cli.books_api, http, cli.isbndb_key, cli.google_books_key);
    println!("Using {} book provider", cli.books_api);

    let config = Config {
        host: cli.host,
        port: cli.port,
        verbosity: cli.verbose,
        enable_docs: !cli.no_docs,
        covers_dir: cli.covers_dir.unwrap_or_else(get_covers_dir),
        plans,
        job_attempts: cli.job_attempts.max(1),
        additional_pages: cli.additional_pages,
    };

    api::run(config, db, provider).await?;

    Ok(())
}
