//! Overmark CLI - stage images, stamp them with a logo, expire the results.
//!
//! Uploads land in a staged directory; `process` watermarks everything staged
//! into a processed directory; a retention sweep deletes files from both once
//! they are older than the configured window.
//!
//! # Usage
//!
//! ```bash
//! # Stage some photos
//! overmark stage beach.jpg IMG_0042.heic
//!
//! # Watermark everything staged
//! overmark process --format jsonl
//!
//! # Keep expiring old files until Ctrl-C
//! overmark daemon
//!
//! # View configuration
//! overmark config show
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;

/// Overmark - stage images, stamp them with a logo, expire the results.
#[derive(Parser, Debug)]
#[command(name = "overmark")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(short, long, global = true, env = "OVERMARK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy local image files into the staged store
    Stage(cli::stage::StageArgs),

    /// List files in the staged and processed stores
    List(cli::list::ListArgs),

    /// Watermark every staged file
    Process(cli::process::ProcessArgs),

    /// Copy a stored file out to a local path
    Fetch(cli::files::FetchArgs),

    /// Delete a stored file
    Delete(cli::files::DeleteArgs),

    /// Run one retention pass
    Sweep(cli::retention::SweepArgs),

    /// Run the retention sweeper until interrupted
    Daemon(cli::retention::DaemonArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli::config_path(cli.config.as_deref());

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match cli::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) if cli.config.is_none() => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `overmark config path`."
            );
            overmark_core::Config::default()
        }
        Err(e) => return Err(e),
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Overmark v{}", overmark_core::VERSION);

    // Dispatch to the appropriate command handler
    match cli.command {
        Commands::Stage(args) => cli::stage::execute(args, &config).await,
        Commands::List(args) => cli::list::execute(args, &config).await,
        Commands::Process(args) => cli::process::execute(args, config).await,
        Commands::Fetch(args) => cli::files::fetch(args, &config).await,
        Commands::Delete(args) => cli::files::delete(args, &config).await,
        Commands::Sweep(args) => cli::retention::sweep(args, &config).await,
        Commands::Daemon(args) => cli::retention::daemon(args, &config).await,
        Commands::Config(args) => cli::config::execute(args, &config, &config_path).await,
    }
}
