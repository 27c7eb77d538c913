//! Overmark Core - Embeddable image watermarking library.
//!
//! Overmark stamps a logo onto uploaded photos. Uploads are staged in one
//! directory, a batch run watermarks everything staged into a second
//! directory, and a background sweeper evicts files from both after a
//! retention window.
//!
//! # Architecture
//!
//! ```text
//! stage_upload → [staged dir] → run_batch: Decode → Composite → Encode → [processed dir]
//!                      ↑                                                        ↑
//!                      └──────────────── RetentionSweeper ──────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use overmark_core::{Config, Overmark};
//!
//! #[tokio::main]
//! async fn main() -> overmark_core::Result<()> {
//!     let overmark = Overmark::new(Config::load()?)?;
//!     let _sweeper = overmark.spawn_sweeper();
//!
//!     overmark.stage_upload("beach.jpg", &std::fs::read("beach.jpg")?)?;
//!     for item in overmark.run_batch_async().await? {
//!         println!("{}", item.download_path);
//!     }
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod retention;
pub mod store;
pub mod types;

use std::sync::Arc;

// Re-exports for convenient access
pub use config::Config;
pub use error::{
    BatchFailure, ConfigError, ErrorKind, OvermarkError, PipelineError, PipelineResult, Result,
    StoreError,
};
pub use output::{OutputWriter, ReportFormat};
pub use pipeline::{
    AssetDecoder, BatchProcessor, CodecEncoder, Compositor, ImageDecoder, ImageEncoder,
    WatermarkSpec,
};
pub use retention::{RetentionSweeper, SweeperHandle, SweeperState};
pub use store::{FileStore, ProcessedStore, StagedStore};
pub use types::{BatchItem, ImageAsset, SourceFormat, StoredFile, SweepReport};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Overmark service - the main entry point.
///
/// Built once from a [`Config`]; every operation works against the two store
/// directories, which are the only persisted state.
pub struct Overmark {
    config: Config,
    staged: StagedStore,
    processed: ProcessedStore,
    processor: Arc<BatchProcessor>,
}

impl Overmark {
    /// Create the stores and load the logo named in `config`.
    pub fn new(config: Config) -> Result<Self> {
        let compositor = Compositor::new(WatermarkSpec::from_config(&config))?;
        Self::from_parts(config, compositor, Arc::new(CodecEncoder))
    }

    /// Create an instance from the config at the default location.
    pub fn with_defaults() -> Result<Self> {
        Self::new(Config::load()?)
    }

    /// Assemble from an explicit compositor and encoder.
    pub fn from_parts(
        config: Config,
        compositor: Compositor,
        encoder: Arc<dyn ImageEncoder>,
    ) -> Result<Self> {
        let decoder = Arc::new(ImageDecoder::new(config.limits.clone()));
        Self::from_codecs(config, compositor, decoder, encoder)
    }

    /// Assemble from an explicit compositor, decoder and encoder.
    pub fn from_codecs(
        config: Config,
        compositor: Compositor,
        decoder: Arc<dyn AssetDecoder>,
        encoder: Arc<dyn ImageEncoder>,
    ) -> Result<Self> {
        config.validate()?;
        tracing::debug!("Initializing Overmark v{}", VERSION);

        let extensions = &config.storage.allowed_extensions;
        let staged = StagedStore::new(config.staged_dir(), extensions);
        let processed = ProcessedStore::new(config.processed_dir(), extensions);
        staged.ensure_dir()?;
        processed.ensure_dir()?;

        let processor = BatchProcessor::new(&config, compositor, staged.clone(), processed.clone())
            .with_decoder(decoder)
            .with_encoder(encoder);

        Ok(Self {
            config,
            staged,
            processed,
            processor: Arc::new(processor),
        })
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn staged(&self) -> &StagedStore {
        &self.staged
    }

    pub fn processed(&self) -> &ProcessedStore {
        &self.processed
    }

    /// Stage an upload under `filename`, replacing any file of that name.
    ///
    /// Names outside the recognized extensions are rejected with
    /// [`StoreError::UnsupportedType`], names with a path separator with
    /// [`StoreError::InvalidName`].
    pub fn stage_upload(&self, filename: &str, bytes: &[u8]) -> std::result::Result<StoredFile, StoreError> {
        let stored = self.staged.put(filename, bytes)?;
        tracing::info!("Staged {} ({} bytes)", stored.name, stored.size);
        Ok(stored)
    }

    /// Names in the staged store, sorted.
    pub fn list_staged(&self) -> std::result::Result<Vec<String>, StoreError> {
        Ok(sorted(self.staged.names()?))
    }

    /// Names in the processed store, sorted.
    pub fn list_processed(&self) -> std::result::Result<Vec<String>, StoreError> {
        Ok(sorted(self.processed.names()?))
    }

    /// Watermark everything currently staged. Stops at the first failure.
    pub fn run_batch(&self) -> std::result::Result<Vec<BatchItem>, BatchFailure> {
        self.processor.process_all()
    }

    /// [`Self::run_batch`] on the blocking pool.
    pub async fn run_batch_async(&self) -> Result<Vec<BatchItem>> {
        let processor = Arc::clone(&self.processor);
        let items = tokio::task::spawn_blocking(move || processor.process_all())
            .await
            .map_err(|e| OvermarkError::Io(std::io::Error::other(e)))??;
        Ok(items)
    }

    pub fn fetch_processed(&self, name: &str) -> std::result::Result<Vec<u8>, StoreError> {
        self.processed.read(name)
    }

    pub fn fetch_staged(&self, name: &str) -> std::result::Result<Vec<u8>, StoreError> {
        self.staged.read(name)
    }

    pub fn delete_processed(&self, name: &str) -> std::result::Result<(), StoreError> {
        self.processed.delete(name)
    }

    pub fn delete_staged(&self, name: &str) -> std::result::Result<(), StoreError> {
        self.staged.delete(name)
    }

    /// A sweeper over this instance's stores with the configured window.
    pub fn sweeper(&self) -> RetentionSweeper {
        RetentionSweeper::from_config(&self.config, self.staged.clone(), self.processed.clone())
    }

    /// Run one retention pass now.
    pub fn sweep(&self) -> SweepReport {
        self.sweeper().sweep()
    }

    /// Start the background retention loop. Must be called inside a tokio runtime.
    pub fn spawn_sweeper(&self) -> SweeperHandle {
        let sweeper = self.sweeper();
        tracing::info!(
            "Retention sweeper started (ttl {:?}, every {:?})",
            sweeper.ttl(),
            sweeper.interval()
        );
        sweeper.spawn()
    }
}

fn sorted(mut names: Vec<String>) -> Vec<String> {
    names.sort();
    names
}
