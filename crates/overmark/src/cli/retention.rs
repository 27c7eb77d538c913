//! The `overmark sweep` and `overmark daemon` commands.

use clap::Args;
use overmark_core::{Config, RetentionSweeper};

use super::open_stores;

/// Arguments for the `sweep` command.
#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Override the retention window, in seconds
    #[arg(long)]
    pub ttl: Option<u64>,
}

/// Arguments for the `daemon` command.
#[derive(Args, Debug)]
pub struct DaemonArgs {
    /// Override the time between sweeps, in seconds
    #[arg(long)]
    pub interval: Option<u64>,
}

fn sweeper(config: &Config, ttl: Option<u64>, interval: Option<u64>) -> anyhow::Result<RetentionSweeper> {
    let (staged, processed) = open_stores(config)?;
    let mut config = config.clone();
    if let Some(ttl) = ttl {
        config.retention.ttl_secs = ttl;
    }
    if let Some(interval) = interval {
        config.retention.sweep_interval_secs = interval;
    }
    if config.retention.ttl_secs == 0 || config.retention.sweep_interval_secs == 0 {
        anyhow::bail!("Retention window and sweep interval must be greater than 0");
    }
    Ok(RetentionSweeper::from_config(&config, staged, processed))
}

/// Execute the sweep command: one pass, report on stdout.
pub async fn sweep(args: SweepArgs, config: &Config) -> anyhow::Result<()> {
    let sweeper = sweeper(config, args.ttl, None)?;
    let report = tokio::task::spawn_blocking(move || sweeper.sweep()).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Execute the daemon command: sweep on a timer until Ctrl-C.
pub async fn daemon(args: DaemonArgs, config: &Config) -> anyhow::Result<()> {
    let sweeper = sweeper(config, None, args.interval)?;
    tracing::info!(
        "Retention daemon running (ttl {:?}, every {:?}); press Ctrl-C to stop",
        sweeper.ttl(),
        sweeper.interval()
    );
    let handle = sweeper.spawn();

    tokio::signal::ctrl_c().await?;
    tracing::info!("Stopping retention daemon");
    handle.shutdown().await;
    Ok(())
}
