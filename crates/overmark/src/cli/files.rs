//! The `overmark fetch` and `overmark delete` commands.

use anyhow::Context;
use clap::Args;
use overmark_core::Config;
use std::path::PathBuf;

use super::{expand, open_stores};

/// Arguments for the `fetch` command.
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Stored file name, e.g. watermarked_beach.jpg
    pub name: String,

    /// Fetch from the staged store instead of the processed one
    #[arg(long)]
    pub staged: bool,

    /// Where to write the file
    #[arg(short, long)]
    pub out: PathBuf,
}

/// Arguments for the `delete` command.
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Stored file name
    pub name: String,

    /// Delete from the staged store instead of the processed one
    #[arg(long)]
    pub staged: bool,
}

/// Execute the fetch command.
pub async fn fetch(args: FetchArgs, config: &Config) -> anyhow::Result<()> {
    let (staged, processed) = open_stores(config)?;
    let bytes = if args.staged {
        staged.read(&args.name)
    } else {
        processed.read(&args.name)
    }
    .with_context(|| format!("Cannot fetch {}", args.name))?;

    let out = expand(&args.out);
    std::fs::write(&out, &bytes).with_context(|| format!("Failed to write {}", out.display()))?;
    tracing::info!("Wrote {} ({} bytes) to {:?}", args.name, bytes.len(), out);
    Ok(())
}

/// Execute the delete command.
pub async fn delete(args: DeleteArgs, config: &Config) -> anyhow::Result<()> {
    let (staged, processed) = open_stores(config)?;
    if args.staged {
        staged.delete(&args.name)
    } else {
        processed.delete(&args.name)
    }
    .with_context(|| format!("Cannot delete {}", args.name))?;

    println!("{}", args.name);
    Ok(())
}
