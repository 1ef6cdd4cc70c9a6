//! shelf - package catalog browser
//!
//! Thin command-line front end over `shelf_core`: repository management,
//! catalog queries, and a headless run of the featured package cards.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use shelf_core::catalog::RepositoryManager;

mod catalog_cli;
mod featured_cli;

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "shelf",
    about = "Browse packages across configured repositories",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Set log level
    #[clap(long, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Use this directory instead of the platform config directory
    #[clap(long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage package repositories
    Repo {
        #[clap(subcommand)]
        command: catalog_cli::RepoCommand,
    },

    /// Show the newest record and all versions of a package
    Show {
        /// Package identifier
        identifier: String,

        /// Output as JSON
        #[clap(long)]
        json: bool,

        /// Drop cached feed documents before loading
        #[clap(long)]
        refresh: bool,
    },

    /// Search packages by identifier, name, author or description
    Search {
        /// Search query (lists everything when omitted)
        query: Option<String>,

        /// Output results as JSON
        #[clap(long)]
        json: bool,

        /// Drop cached feed documents before loading
        #[clap(long)]
        refresh: bool,
    },

    /// Build featured package cards and print their state
    Featured {
        /// Featured section document (YAML)
        file: PathBuf,

        /// Purchase ledger (defaults to purchases.yaml in the config directory)
        #[clap(long)]
        purchases: Option<PathBuf>,

        /// Render separators for the dark appearance
        #[clap(long)]
        dark: bool,

        /// Output as JSON
        #[clap(long)]
        json: bool,
    },
}

fn initialize_tracing(log_level: &LogLevel) {
    // RUST_LOG wins over --log-level when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_filter_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_manager(config_dir: Option<PathBuf>) -> Result<RepositoryManager> {
    match config_dir {
        Some(dir) => RepositoryManager::load_from_dir(dir),
        None => RepositoryManager::load(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(&cli.log_level);

    let manager = load_manager(cli.config_dir)?;
    tracing::debug!("Using config directory {}", manager.config_dir().display());

    match cli.command {
        Command::Repo { command } => catalog_cli::execute_repo_command(manager, command),
        Command::Show {
            identifier,
            json,
            refresh,
        } => catalog_cli::execute_show(&manager, &identifier, json, refresh).await,
        Command::Search {
            query,
            json,
            refresh,
        } => catalog_cli::execute_search(&manager, query.as_deref(), json, refresh).await,
        Command::Featured {
            file,
            purchases,
            dark,
            json,
        } => featured_cli::execute_featured(&manager, &file, purchases, dark, json).await,
    }
}
