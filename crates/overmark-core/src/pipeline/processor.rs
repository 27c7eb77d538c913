//! Batch orchestration: staged file → decode → composite → encode → processed.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{Config, EncodeConfig};
use crate::error::{BatchFailure, PipelineError, StoreError};
use crate::store::{ProcessedStore, StagedStore};
use crate::types::{BatchItem, StoredFile};

use super::decode::{AssetDecoder, ImageDecoder};
use super::dispatch::{choose_output, encode_with_fallback, restore_color_mode};
use super::encode::{CodecEncoder, ImageEncoder};
use super::watermark::Compositor;

/// Watermarks every staged file into the processed store.
pub struct BatchProcessor {
    decoder: Arc<dyn AssetDecoder>,
    compositor: Compositor,
    encoder: Arc<dyn ImageEncoder>,
    encode: EncodeConfig,
    staged: StagedStore,
    processed: ProcessedStore,
    download_prefix: String,
}

impl BatchProcessor {
    /// Create a processor with the production codecs.
    pub fn new(
        config: &Config,
        compositor: Compositor,
        staged: StagedStore,
        processed: ProcessedStore,
    ) -> Self {
        Self {
            decoder: Arc::new(ImageDecoder::new(config.limits.clone())),
            compositor,
            encoder: Arc::new(CodecEncoder),
            encode: config.encode.clone(),
            staged,
            processed,
            download_prefix: config.storage.download_prefix.clone(),
        }
    }

    /// Swap the decoder, e.g. for one with different codec support.
    pub fn with_decoder(mut self, decoder: Arc<dyn AssetDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Swap the encoder, e.g. for one with different codec support.
    pub fn with_encoder(mut self, encoder: Arc<dyn ImageEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    /// Process every file staged at call time.
    ///
    /// Files are taken in name order. The first failure stops the batch:
    /// outputs already written stay, their originals stay removed, and the
    /// failure carries the items completed so far.
    pub fn process_all(&self) -> Result<Vec<BatchItem>, BatchFailure> {
        let start = std::time::Instant::now();
        let mut snapshot = self.staged.list().map_err(|e| BatchFailure {
            file: self.staged.root().display().to_string(),
            completed: Vec::new(),
            source: store_to_pipeline(e, self.staged.root()),
        })?;
        snapshot.sort_by(|a, b| a.name.cmp(&b.name));

        if snapshot.is_empty() {
            tracing::info!("No staged files to process");
            return Ok(Vec::new());
        }
        tracing::info!("Processing {} staged file(s)", snapshot.len());

        let mut completed = Vec::with_capacity(snapshot.len());
        // Output name -> staged name that produced it
        let mut outputs: HashMap<String, String> = HashMap::new();
        for file in &snapshot {
            match self.process_one(file) {
                Ok(item) => {
                    if let Some(earlier) = outputs.insert(item.filename.clone(), file.name.clone()) {
                        tracing::warn!(
                            "{} overwrote {} written earlier in this batch from {}",
                            file.name,
                            item.filename,
                            earlier
                        );
                    }
                    completed.push(item);
                }
                Err(source) => {
                    tracing::error!("Error processing {}: {}", file.name, source);
                    return Err(BatchFailure {
                        file: file.name.clone(),
                        completed,
                        source,
                    });
                }
            }
        }

        tracing::info!(
            "Processed {} file(s) in {:?}",
            completed.len(),
            start.elapsed()
        );
        Ok(completed)
    }

    /// Watermark a single staged file and remove the original on success.
    pub fn process_one(&self, file: &StoredFile) -> Result<BatchItem, PipelineError> {
        let start = std::time::Instant::now();
        tracing::debug!("Processing: {:?}", file.path);

        let decoded = self.decoder.decode(&file.path)?;
        let decode_time = start.elapsed();
        tracing::trace!("  Decode: {:?}", decode_time);

        let plan = choose_output(&decoded.format);
        let composite_start = std::time::Instant::now();
        let composited = restore_color_mode(self.compositor.composite(decoded));
        tracing::trace!("  Composite: {:?}", composite_start.elapsed());

        let encode_start = std::time::Instant::now();
        let output = encode_with_fallback(
            self.encoder.as_ref(),
            &composited,
            plan,
            &self.encode,
            self.processed.root(),
            &file.name,
        )?;
        tracing::trace!("  Encode: {:?}", encode_start.elapsed());

        match self.staged.delete(&file.name) {
            Ok(()) => {}
            Err(StoreError::NotFound(_)) => {
                tracing::warn!("Staged original {} was already removed", file.name);
            }
            Err(e) => return Err(store_to_pipeline(e, &file.path)),
        }

        tracing::debug!(
            "Processed {} to {} in {:?}",
            file.name,
            output.filename,
            start.elapsed()
        );
        Ok(BatchItem {
            download_path: format!("{}{}", self.download_prefix, output.filename),
            filename: output.filename,
        })
    }
}

fn store_to_pipeline(err: StoreError, path: &std::path::Path) -> PipelineError {
    match err {
        StoreError::NotFound(_) => PipelineError::NotFound(path.to_path_buf()),
        StoreError::UnsupportedType(name) | StoreError::InvalidName(name) => {
            PipelineError::UnsupportedFormat {
                path: path.to_path_buf(),
                format: name,
            }
        }
        StoreError::Io { source, .. } => PipelineError::Io {
            path: path.to_path_buf(),
            source,
        },
    }
}
