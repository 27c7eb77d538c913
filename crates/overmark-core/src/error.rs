//! Error types for the Overmark watermarking pipeline.
//!
//! Errors are organized by stage to provide clear, actionable error messages
//! that include relevant context (file paths, stage names, specific issues).

use std::path::PathBuf;
use thiserror::Error;

use crate::types::BatchItem;

/// Top-level error type for Overmark operations.
#[derive(Error, Debug)]
pub enum OvermarkError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Staged/processed store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A batch stopped at its first failing file
    #[error(transparent)]
    Batch(#[from] BatchFailure),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Not a JPEG, PNG or HEIC/HEIF image
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// Pixel data could not be parsed
    #[error("Corrupt input {path}: {message}")]
    CorruptInput { path: PathBuf, message: String },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// The encoder rejected the image or could not write it
    #[error("Encode to {format} failed for {path}: {message}")]
    EncodeFailure {
        path: PathBuf,
        format: String,
        message: String,
    },

    /// The watermark logo could not be loaded
    #[error("Cannot load logo {path}: {message}")]
    Logo { path: PathBuf, message: String },

    /// File not found
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Disk error while reading or writing
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Coarse classification of failures, independent of the stage that raised them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedFormat,
    CorruptInput,
    EncodeFailure,
    NotFound,
    IoFailure,
}

impl PipelineError {
    /// Classify this error.
    ///
    /// Size and dimension limit violations count as corrupt input: both reject
    /// the file before any output is produced. A broken logo is an I/O-class
    /// failure of the process setup, not of the image being processed.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            Self::CorruptInput { .. } | Self::FileTooLarge { .. } | Self::ImageTooLarge { .. } => {
                ErrorKind::CorruptInput
            }
            Self::EncodeFailure { .. } => ErrorKind::EncodeFailure,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Logo { .. } | Self::Io { .. } => ErrorKind::IoFailure,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path)
        } else {
            Self::Io { path, source }
        }
    }
}

/// Errors from the staged and processed file stores.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Missing file, unrecognized extension, or a name that is not a plain file name
    #[error("File not found: {0}")]
    NotFound(String),

    /// Extension outside the recognized set (uploads only)
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    /// Upload name with a path separator, or `.`/`..`
    #[error("Invalid file name: {0:?}")]
    InvalidName(String),

    /// Disk error while reading, writing, or deleting
    #[error("IO error on {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::UnsupportedType(_) | Self::InvalidName(_) => ErrorKind::UnsupportedFormat,
            Self::Io { .. } => ErrorKind::IoFailure,
        }
    }

    pub(crate) fn io(name: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(name.to_string())
        } else {
            Self::Io {
                name: name.to_string(),
                source,
            }
        }
    }
}

/// A batch that stopped at its first failing file.
///
/// Files processed before the failure keep their outputs, and their staged
/// originals stay removed. `completed` lists them.
#[derive(Error, Debug)]
#[error("Processing stopped at {file}: {source}")]
pub struct BatchFailure {
    /// Staged file name that failed
    pub file: String,
    /// Items finished before the failure
    pub completed: Vec<BatchItem>,
    /// What went wrong with `file`
    #[source]
    pub source: PipelineError,
}

impl BatchFailure {
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

/// Convenience type alias for Overmark results.
pub type Result<T> = std::result::Result<T, OvermarkError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_not_found_maps_to_not_found() {
        let err = PipelineError::io(
            "missing.jpg",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = StoreError::io(
            "missing.jpg",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, StoreError::NotFound(ref n) if n == "missing.jpg"));
    }

    #[test]
    fn test_limit_errors_are_corrupt_input() {
        let err = PipelineError::ImageTooLarge {
            path: PathBuf::from("huge.png"),
            width: 50_000,
            height: 10,
            max_dim: 20_000,
        };
        assert_eq!(err.kind(), ErrorKind::CorruptInput);
    }

    #[test]
    fn test_batch_failure_names_file() {
        let failure = BatchFailure {
            file: "bad.jpg".to_string(),
            completed: vec![],
            source: PipelineError::CorruptInput {
                path: PathBuf::from("/staged/bad.jpg"),
                message: "truncated".to_string(),
            },
        };
        let msg = failure.to_string();
        assert!(msg.contains("bad.jpg"));
        assert!(msg.contains("truncated"));
        assert_eq!(failure.kind(), ErrorKind::CorruptInput);
    }
}
