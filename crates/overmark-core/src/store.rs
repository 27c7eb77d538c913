//! Flat-directory file stores for staged uploads and watermarked outputs.
//!
//! The directory listing is the catalog: there is no index and no lock. Each
//! mutation touches a single file and relies on the filesystem making that
//! operation atomic. A file that disappears between a listing and a later
//! access is reported as [`StoreError::NotFound`].

use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::StoreError;
use crate::types::StoredFile;

/// Marker for the role a store plays; only used for typing and log labels.
pub trait StoreKind: Send + Sync + 'static {
    const LABEL: &'static str;
}

/// Uploaded, not yet processed.
#[derive(Debug, Clone, Copy)]
pub struct Staged;

/// Watermarked outputs.
#[derive(Debug, Clone, Copy)]
pub struct Processed;

impl StoreKind for Staged {
    const LABEL: &'static str = "staged";
}

impl StoreKind for Processed {
    const LABEL: &'static str = "processed";
}

/// A directory of image files keyed by file name.
#[derive(Debug, Clone)]
pub struct FileStore<K: StoreKind> {
    root: PathBuf,
    extensions: Vec<String>,
    _kind: PhantomData<K>,
}

pub type StagedStore = FileStore<Staged>;
pub type ProcessedStore = FileStore<Processed>;

impl<K: StoreKind> FileStore<K> {
    /// Create a store over `root`, recognizing the given extensions
    /// (case-insensitive, without the dot).
    pub fn new(root: impl Into<PathBuf>, extensions: &[String]) -> Self {
        Self {
            root: root.into(),
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
            _kind: PhantomData,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn label(&self) -> &'static str {
        K::LABEL
    }

    /// Create the root directory if it is missing.
    pub fn ensure_dir(&self) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.root).map_err(|e| StoreError::Io {
            name: self.root.display().to_string(),
            source: e,
        })
    }

    /// Location of `name` in this store. No I/O.
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Whether `name` has one of the recognized extensions.
    pub fn is_recognized(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext_lower = ext.to_lowercase();
                self.extensions.iter().any(|e| *e == ext_lower)
            })
            .unwrap_or(false)
    }

    /// All files with recognized extensions, in no particular order.
    ///
    /// Entries that vanish while listing are skipped.
    pub fn list(&self) -> Result<Vec<StoredFile>, StoreError> {
        if !self.root.is_dir() {
            return Err(StoreError::NotFound(self.root.display().to_string()));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if !self.is_recognized(name) {
                continue;
            }
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            let Ok(modified) = meta.modified() else {
                continue;
            };
            files.push(StoredFile {
                name: name.to_string(),
                path: entry.path().to_path_buf(),
                modified,
                size: meta.len(),
            });
        }
        Ok(files)
    }

    /// Names of all listed files.
    pub fn names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.list()?.into_iter().map(|f| f.name).collect())
    }

    /// Remove `name`. Reports `NotFound` for missing files, unrecognized
    /// extensions, and names that are not plain file names.
    pub fn delete(&self, name: &str) -> Result<(), StoreError> {
        let path = self.checked_path(name)?;
        std::fs::remove_file(&path).map_err(|e| StoreError::io(name, e))?;
        tracing::debug!("Deleted {} file: {}", K::LABEL, name);
        Ok(())
    }

    /// Contents of `name`, with the same `NotFound` rules as [`Self::delete`].
    pub fn read(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.checked_path(name)?;
        std::fs::read(&path).map_err(|e| StoreError::io(name, e))
    }

    /// Listing entry for `name`.
    pub fn stat(&self, name: &str) -> Result<StoredFile, StoreError> {
        let path = self.checked_path(name)?;
        let meta = std::fs::metadata(&path).map_err(|e| StoreError::io(name, e))?;
        if !meta.is_file() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        let modified = meta.modified().map_err(|e| StoreError::io(name, e))?;
        Ok(StoredFile {
            name: name.to_string(),
            path,
            modified,
            size: meta.len(),
        })
    }

    fn checked_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        if !is_plain_file_name(name) || !self.is_recognized(name) {
            return Err(StoreError::NotFound(name.to_string()));
        }
        Ok(self.path(name))
    }
}

impl FileStore<Staged> {
    /// Store an upload. A file with the same name is replaced.
    ///
    /// The bytes land in a temp file that is renamed over the target, so
    /// concurrent readers see either the old or the new file, never a mix.
    /// Two uploads racing on one name still resolve last-writer-wins.
    pub fn put(&self, name: &str, bytes: &[u8]) -> Result<StoredFile, StoreError> {
        if !is_plain_file_name(name) {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        if !self.is_recognized(name) {
            return Err(StoreError::UnsupportedType(name.to_string()));
        }

        let path = self.path(name);
        if path.exists() {
            tracing::debug!("Overwriting staged file: {}", name);
        }

        let mut tmp = tempfile::Builder::new()
            .prefix(".upload-")
            .suffix(".partial")
            .tempfile_in(&self.root)
            .map_err(|e| StoreError::io(name, e))?;
        tmp.write_all(bytes).map_err(|e| StoreError::io(name, e))?;
        set_shared_mode(tmp.as_file()).map_err(|e| StoreError::io(name, e))?;
        tmp.persist(&path)
            .map_err(|e| StoreError::io(name, e.error))?;

        tracing::debug!("Staged file: {} ({} bytes)", name, bytes.len());
        self.stat(name)
    }
}

/// Open up a temp file (created 0600) to the usual 0644 before it is renamed
/// into a store, so other local users and services can read it.
pub(crate) fn set_shared_mode(file: &std::fs::File) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o644))?;
    }
    #[cfg(not(unix))]
    let _ = file;
    Ok(())
}

/// A single path component that is not `.` or `..`.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
        && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name)
}
