//! Command handlers and the helpers they share.

pub mod config;
pub mod files;
pub mod list;
pub mod process;
pub mod retention;
pub mod stage;

use anyhow::Context;
use clap::ValueEnum;
use overmark_core::{Config, ProcessedStore, ReportFormat, StagedStore};
use std::path::{Path, PathBuf};

/// Report format on the command line.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum FormatArg {
    /// One JSON document
    #[default]
    Json,
    /// One JSON object per line
    Jsonl,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => ReportFormat::Json,
            FormatArg::Jsonl => ReportFormat::JsonLines,
        }
    }
}

/// The config file in effect: `--config` (with `~` expanded) or the default.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => expand(path),
        None => Config::default_path(),
    }
}

/// Load `--config` strictly, or the default location leniently.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    match explicit {
        Some(path) => {
            let path = expand(path);
            Config::load_from(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))
        }
        None => Ok(Config::load()?),
    }
}

/// Open both stores, creating their directories if needed.
///
/// Commands that only move files around use this instead of the full
/// service so they work before a logo is configured.
pub fn open_stores(config: &Config) -> anyhow::Result<(StagedStore, ProcessedStore)> {
    let extensions = &config.storage.allowed_extensions;
    let staged = StagedStore::new(config.staged_dir(), extensions);
    let processed = ProcessedStore::new(config.processed_dir(), extensions);
    staged.ensure_dir()?;
    processed.ensure_dir()?;
    Ok((staged, processed))
}

pub(crate) fn expand(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&path_str).into_owned())
}

#[cfg(test)]
pub(crate) fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.storage.staged_dir = root.join("uploads");
    config.storage.processed_dir = root.join("watermarked");
    config.watermark.logo_path = root.join("logo.png");
    config
}
