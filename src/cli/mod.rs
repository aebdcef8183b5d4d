pub mod api_client;
mod commands;
pub mod error;
pub mod utils;


use clap::{Parser, Subcommand};

use crate::cli::commands::PageParams;
use crate::cli::error::CliResult;

#[derive(Parser)]
#[command(name = "bookbound")]
#[command(author, version, about = "Bookbound reading library CLI", long_about = None)]
pub struct Cli {
    /// Override the API URL (default: BOOKBOUND_API_URL env or http://localhost:3000)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Acting user ID sent as X-User-Id (default: BOOKBOUND_USER env)
    #[arg(long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the configured book provider
    Search {
        /// Free text, or `author:NAME` / `tag:SUBJECT`
        query: String,
        /// Result page
        #[arg(long)]
        page: Option<u32>,
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Book commands
    Book {
        #[command(subcommand)]
        command: BookCommands,
    },
    /// Library commands for the acting user
    Library {
        #[command(subcommand)]
        command: LibraryCommands,
    },
    /// Activity feed commands
    Activity {
        #[command(subcommand)]
        command: ActivityCommands,
    },
    /// Show the library overview
    Dashboard {
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },
}

#[derive(Subcommand)]
enum BookCommands {
    /// Show a book, importing it on the server if needed
    Show {
        /// Book identifier (ISBN-13)
        identifier: String,
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },
}

#[derive(Subcommand)]
enum LibraryCommands {
    /// List books in your library
    List {
        /// Only this reading status (PlanToRead, Reading, Completed, OnHold, Dropped)
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        offset: Option<u32>,
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Add a stored book to your library
    Add {
        /// Book identifier (ISBN-13)
        identifier: String,
        /// Initial reading status
        #[arg(long)]
        status: Option<String>,
    },
    /// Remove a book from your library
    Remove {
        /// Book identifier (ISBN-13)
        identifier: String,
    },
    /// Change a book's reading status (defaults to PlanToRead)
    Status {
        /// Book identifier (ISBN-13)
        identifier: String,
        /// New reading status
        status: Option<String>,
    },
}

#[derive(Subcommand)]
enum ActivityCommands {
    /// List your activity feed, newest first
    List {
        /// Page of 10 activities
        #[arg(long)]
        page: Option<u32>,
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },
}

/// Parse arguments, run the command and print its output.
pub async fn run() -> miette::Result<()> {
    let cli = Cli::parse();
    let api_client = api_client::ApiClient::new(cli.api_url, cli.user);

    let result: CliResult<String> = match cli.command {
        Some(Commands::Search {
            query,
            page,
            format,
        }) => commands::book::search_books(&api_client, &query, page, &format).await,
        Some(Commands::Book { command }) => match command {
            BookCommands::Show { identifier, format } => {
                commands::book::show_book(&api_client, &identifier, &format).await
            }
        },
        Some(Commands::Library { command }) => match command {
            LibraryCommands::List {
                status,
                limit,
                offset,
                format,
            } => {
                commands::library::list_library(
                    &api_client,
                    status.as_deref(),
                    PageParams { limit, offset },
                    &format,
                )
                .await
            }
            LibraryCommands::Add { identifier, status } => {
                commands::library::add_book(
                    &api_client,
                    commands::library::AddBookRequest { identifier, status },
                )
                .await
            }
            LibraryCommands::Remove { identifier } => {
                commands::library::remove_book(&api_client, &identifier).await
            }
            LibraryCommands::Status { identifier, status } => {
                commands::library::set_status(&api_client, &identifier, status).await
            }
        },
        Some(Commands::Activity { command }) => match command {
            ActivityCommands::List { page, format } => {
                commands::activity::list_activities(&api_client, page, &format).await
            }
        },
        Some(Commands::Dashboard { format }) => {
            commands::dashboard::show_dashboard(&api_client, &format).await
        }
        None => {
            // Show help when no command provided
            let _ = Cli::parse_from(["bookbound", "--help"]);
            return Ok(());
        }
    };

    println!("{}", result?);
    Ok(())
}
