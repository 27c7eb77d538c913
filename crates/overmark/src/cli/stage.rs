//! The `overmark stage` command.

use anyhow::Context;
use clap::Args;
use overmark_core::{Config, StagedStore, StoredFile};
use std::path::{Path, PathBuf};

use super::open_stores;

/// Arguments for the `stage` command.
#[derive(Args, Debug)]
pub struct StageArgs {
    /// Image files to stage (stored under their file names)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Execute the stage command.
pub async fn execute(args: StageArgs, config: &Config) -> anyhow::Result<()> {
    let (staged, _) = open_stores(config)?;
    for path in &args.files {
        let stored = stage_file(&staged, path)?;
        println!("{}", stored.name);
    }
    tracing::info!("Staged {} file(s)", args.files.len());
    Ok(())
}

fn stage_file(staged: &StagedStore, path: &Path) -> anyhow::Result<StoredFile> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Not a file name: {}", path.display()))?;
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let stored = staged
        .put(name, &bytes)
        .with_context(|| format!("Failed to stage {}", path.display()))?;
    tracing::debug!("Staged {:?} as {}", path, stored.name);
    Ok(stored)
}
