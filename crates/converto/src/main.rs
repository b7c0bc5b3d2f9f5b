//! Converto - file conversion, compression and background removal.
//!
//! Main entry point for the Converto CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{auth, compress, config, convert, merge, remove_bg, status, tasks};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Converto - convert, compress and clean up files through the Converto backend
#[derive(Parser)]
#[command(name = "converto")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Backend API URL (default: from config, else http://localhost:8000/api)
    #[arg(long, global = true, env = "CONVERTO_BACKEND_URL")]
    pub backend: Option<String>,

    /// Session token for backend calls
    #[arg(long, global = true, env = "CONVERTO_ACCESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and out
    Auth(auth::AuthArgs),

    /// Convert files to another format
    Convert(convert::ConvertArgs),

    /// Compress images, audio or video
    Compress(compress::CompressArgs),

    /// Remove the background from images
    RemoveBg(remove_bg::RemoveBgArgs),

    /// Merge local files and zip archives into one zip
    Merge(merge::MergeArgs),

    /// Show your processing history
    Tasks(tasks::TasksArgs),

    /// Check the backend
    Status(status::StatusArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = converto_config::load_config(None)?;
    let _log_guard = init_tracing(cli.verbose, &loaded.config.effective_logging());

    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }

    let backend_url = cli
        .backend
        .unwrap_or_else(|| loaded.config.effective_backend().base_url);

    let ctx = commands::Context {
        config: loaded.config,
        backend_url,
        token: cli.token.filter(|t| !t.is_empty()),
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Auth(args) => auth::run(args, &ctx).await,
        Commands::Convert(args) => convert::run(args, &ctx).await,
        Commands::Compress(args) => compress::run(args, &ctx).await,
        Commands::RemoveBg(args) => remove_bg::run(args, &ctx).await,
        Commands::Merge(args) => merge::run(args, &ctx).await,
        Commands::Tasks(args) => tasks::run(args, &ctx).await,
        Commands::Status(args) => status::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}

/// Console (human-readable) plus an optional daily JSON file.
///
/// The returned guard flushes the file writer on drop.
fn init_tracing(
    verbose: bool,
    logging: &converto_config::LoggingConfig,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::prelude::*;

    let filter = if verbose {
        "converto=debug,converto_client=debug,converto_oauth=debug,converto_archive=debug,converto_config=debug,info"
    } else {
        "converto=warn,converto_client=warn,converto_oauth=warn,converto_archive=warn,warn"
    };
    let console = tracing_subscriber::fmt::layer()
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .with_filter(tracing_subscriber::EnvFilter::new(filter));

    let log_dir = logging
        .dir
        .clone()
        .or_else(converto_config::log_dir)
        .filter(|_| logging.file);

    let Some(log_dir) = log_dir else {
        tracing_subscriber::registry().with(console).init();
        return None;
    };

    let file_appender = match tracing_appender::rolling::RollingFileAppender::builder()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix("converto.log")
        .build(&log_dir)
    {
        Ok(appender) => appender,
        Err(e) => {
            tracing_subscriber::registry().with(console).init();
            tracing::warn!(dir = %log_dir.display(), error = %e, "File logging disabled");
            return None;
        }
    };
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(console)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "converto=debug,converto_client=debug,converto_oauth=debug,converto_archive=debug,converto_config=debug,info",
                )),
        )
        .init();
    Some(guard)
}
