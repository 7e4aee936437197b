//! Ledgercache - personal finance tracker client that keeps a local backup
//! of the backend and replays it when the backend comes back empty.

mod commands;
mod output;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ledgercache_core::models::TransactionType;
use ledgercache_core::Config;

/// Rolling log file written by `watch`
const LOG_FILE_PREFIX: &str = "ledgercache.log";

#[derive(Debug, Parser)]
#[command(
    name = "ledgercache",
    version,
    about = "Personal finance tracker with a local backup cache"
)]
struct Cli {
    /// Backend base URL (overrides the config file)
    #[arg(long, global = true, env = "LEDGERCACHE_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in and back up your data
    Login {
        username: Option<String>,
    },
    /// Create an account
    Register {
        username: String,
        email: String,
    },
    /// Forget the saved session
    Logout,
    /// List your transactions
    Transactions {
        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show income, expense and balance
    Summary,
    /// Record a transaction
    Add {
        /// INCOME or EXPENSE
        kind: TransactionType,
        amount: f64,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        /// ISO-8601 timestamp, defaults to now
        #[arg(long)]
        date: Option<String>,
    },
    /// Change a transaction; omitted fields keep their value
    Edit {
        id: i64,
        #[arg(long)]
        kind: Option<TransactionType>,
        #[arg(long)]
        amount: Option<f64>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    /// Delete a transaction
    Delete {
        id: i64,
    },
    /// Show or update your profile
    Profile {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Prompt for a new password
        #[arg(long)]
        password: bool,
    },
    /// Copy backend data into the local backup
    Backup,
    /// Replay the local backup into the backend
    Restore,
    /// Show connectivity and backup state
    Status,
    /// Delete the local backup
    ClearCache,
    /// Restore once, then back up periodically until Ctrl-C
    Watch,
}

/// Initialize the tracing subscriber for logging.
///
/// Stderr always gets the env-filtered output; with `log_dir` set a daily
/// rolling file is written as well. Keep the returned guard alive until exit.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = Config::load().context("Failed to load config")?;

    let log_dir: Option<PathBuf> = match cli.command {
        Command::Watch => {
            let dir = config.cache_dir()?;
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            Some(dir)
        }
        _ => None,
    };
    let _guard = init_tracing(log_dir.as_deref());
    info!(command = ?cli.command, "Ledgercache starting");

    let mut app = commands::App::new(config, cli.api_url.as_deref())?;
    app.run(cli.command).await
}
