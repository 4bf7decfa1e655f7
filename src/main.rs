mod api;
mod catalog;
mod cli;
mod config;
mod db;
mod ingest;
mod search;
mod server;
mod thumbs;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "memex", version, about = "Local memory index for your files")]
struct Cli {
    /// Config file path (default: ~/.memex/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve,
    /// Register a directory as a source
    AddSource {
        /// Directory to catalog
        path: String,
        /// Source type (only "local" is currently supported)
        #[arg(long, default_value = "local")]
        source_type: String,
        /// Register without running the initial scan
        #[arg(long)]
        no_scan: bool,
    },
    /// Remove a source and everything cataloged from it
    RemoveSource {
        path: String,
        /// Also delete the source's files from disk
        #[arg(long)]
        delete_files: bool,
    },
    /// Rescan one source, or every source when no path is given
    Scan { path: Option<String> },
    /// Search the catalog
    Search {
        /// Text to search for
        query: Option<String>,
        /// Require this tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Exclude this tag (repeatable)
        #[arg(long = "exclude")]
        exclude: Vec<String>,
        /// Restrict to one kind (image, video, audio, document, code, other)
        #[arg(long = "type")]
        kind: Option<String>,
        /// Sort order (relevance, date_newest, date_oldest, name_asc,
        /// name_desc, size_asc, size_desc)
        #[arg(long)]
        sort: Option<String>,
        /// Maximum results to print
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show catalog statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = match &cli.config {
        Some(path) => config::MemexConfig::load_from(path)?,
        None => config::MemexConfig::load()?,
    };

    // Initialize tracing with the configured log level, RUST_LOG winning
    // when set. Log to stderr so stdout stays clean for command output.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.server.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => {
            server::serve(config).await?;
        }
        Command::AddSource {
            path,
            source_type,
            no_scan,
        } => {
            cli::source::add_source(&config, &path, &source_type, no_scan)?;
        }
        Command::RemoveSource { path, delete_files } => {
            cli::source::remove_source(&config, &path, delete_files)?;
        }
        Command::Scan { path } => {
            cli::scan::scan(&config, path.as_deref())?;
        }
        Command::Search {
            query,
            tags,
            exclude,
            kind,
            sort,
            limit,
        } => {
            let options = cli::search::SearchOptions {
                query,
                tags,
                exclude,
                kind,
                sort,
                limit,
            };
            cli::search::search(&config, options)?;
        }
        Command::Stats => {
            cli::stats::stats(&config)?;
        }
    }

    Ok(())
}
