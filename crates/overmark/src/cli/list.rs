//! The `overmark list` command.

use clap::Args;
use overmark_core::store::{FileStore, StoreKind};
use overmark_core::{Config, OutputWriter};
use serde::Serialize;
use std::io::BufWriter;
use std::time::UNIX_EPOCH;

use super::{open_stores, FormatArg};

/// Arguments for the `list` command.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only list the staged store
    #[arg(long, conflicts_with = "processed")]
    pub staged: bool,

    /// Only list the processed store
    #[arg(long)]
    pub processed: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: FormatArg,
}

/// One row of a listing.
#[derive(Debug, Serialize)]
pub struct ListingRecord {
    pub store: &'static str,
    pub name: String,
    pub size: u64,
    /// Modification time, seconds since the Unix epoch
    pub modified: u64,
}

/// Execute the list command.
pub async fn execute(args: ListArgs, config: &Config) -> anyhow::Result<()> {
    let (staged, processed) = open_stores(config)?;

    let mut records = Vec::new();
    if !args.processed {
        records.extend(listing(&staged)?);
    }
    if !args.staged {
        records.extend(listing(&processed)?);
    }

    let stdout = std::io::stdout().lock();
    let mut writer = OutputWriter::new(BufWriter::new(stdout), args.format.into(), true);
    writer.write_all(&records)?;
    writer.flush()?;
    Ok(())
}

/// Sorted listing of one store.
fn listing<K: StoreKind>(store: &FileStore<K>) -> anyhow::Result<Vec<ListingRecord>> {
    let mut records: Vec<ListingRecord> = store
        .list()?
        .into_iter()
        .map(|file| ListingRecord {
            store: store.label(),
            modified: file
                .modified
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            name: file.name,
            size: file.size,
        })
        .collect();
    records.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::test_config;

    #[test]
    fn listing_is_sorted_and_labelled() {
        let dir = tempfile::tempdir().unwrap();
        let (staged, processed) = open_stores(&test_config(dir.path())).unwrap();
        staged.put("b.png", b"22").unwrap();
        staged.put("a.jpg", b"1").unwrap();
        std::fs::write(processed.path("watermarked_c.jpg"), b"333").unwrap();

        let rows = listing(&staged).unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["a.jpg", "b.png"]);
        assert_eq!(rows[0].store, "staged");
        assert_eq!(rows[1].size, 2);

        let rows = listing(&processed).unwrap();
        assert_eq!(rows[0].store, "processed");
        assert!(rows[0].modified > 0);
    }
}
