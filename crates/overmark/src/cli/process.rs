//! The `overmark process` command.

use clap::Args;
use overmark_core::{BatchItem, Config, Overmark, OutputWriter};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use super::{expand, FormatArg};

/// Arguments for the `process` command.
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Report file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: FormatArg,
}

/// Execute the process command.
///
/// Items finished before a failure are still reported before the error is
/// returned.
pub async fn execute(args: ProcessArgs, config: Config) -> anyhow::Result<()> {
    let overmark = Overmark::new(config)?;

    let (items, failure) = match overmark.run_batch_async().await {
        Ok(items) => (items, None),
        Err(overmark_core::OvermarkError::Batch(failure)) => {
            (failure.completed.clone(), Some(failure))
        }
        Err(e) => return Err(e.into()),
    };

    match &args.output {
        Some(path) => {
            let path = expand(path);
            let file = File::create(&path)?;
            write_report(BufWriter::new(file), &args, &items)?;
            tracing::info!("Report written to {:?}", path);
        }
        None => write_report(std::io::stdout().lock(), &args, &items)?,
    }

    match failure {
        Some(failure) => {
            tracing::error!(
                "Batch stopped at {} after {} file(s)",
                failure.file,
                failure.completed.len()
            );
            Err(failure.into())
        }
        None => Ok(()),
    }
}

fn write_report<W: Write>(out: W, args: &ProcessArgs, items: &[BatchItem]) -> anyhow::Result<()> {
    let mut writer = OutputWriter::new(out, args.format.into(), true);
    writer.write_all(items)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::test_config;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png(w: u32, h: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::new_rgb8(w, h)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn setup(root: &std::path::Path) -> Config {
        RgbaImage::from_pixel(20, 10, Rgba([255, 255, 255, 255]))
            .save(root.join("logo.png"))
            .unwrap();
        test_config(root)
    }

    #[tokio::test]
    async fn writes_jsonl_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());
        let staged = dir.path().join("uploads");
        std::fs::create_dir_all(&staged).unwrap();
        std::fs::write(staged.join("one.png"), png(50, 50)).unwrap();
        std::fs::write(staged.join("two.png"), png(60, 40)).unwrap();

        let report = dir.path().join("report.jsonl");
        let args = ProcessArgs {
            output: Some(report.clone()),
            format: FormatArg::Jsonl,
        };
        execute(args, config).await.unwrap();

        let text = std::fs::read_to_string(report).unwrap();
        let items: Vec<BatchItem> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].filename, "watermarked_one.png");
        assert_eq!(items[1].download_path, "/download/watermarked_two.png");
    }

    #[tokio::test]
    async fn failure_still_reports_completed_items() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());
        let staged = dir.path().join("uploads");
        std::fs::create_dir_all(&staged).unwrap();
        std::fs::write(staged.join("a.png"), png(30, 30)).unwrap();
        std::fs::write(staged.join("b.jpg"), b"not an image").unwrap();

        let report = dir.path().join("report.json");
        let args = ProcessArgs {
            output: Some(report.clone()),
            format: FormatArg::Json,
        };
        let err = execute(args, config).await.unwrap_err();
        assert!(err.to_string().contains("b.jpg"));

        let items: Vec<BatchItem> =
            serde_json::from_str(&std::fs::read_to_string(report).unwrap()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].filename, "watermarked_a.png");
    }
}
