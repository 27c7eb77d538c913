//! Input validation and format sniffing before decode.

use std::io::Read;
use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::PipelineError;
use crate::types::SourceFormat;

/// ISO-BMFF brands that identify a HEIC/HEIF still image.
const HEIF_BRANDS: [&[u8; 4]; 8] = [
    b"heic", b"heix", b"heim", b"heis", b"hevc", b"hevx", b"mif1", b"msf1",
];

/// Validates files before decode and works out which codec should read them.
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Perform quick validation before full decode.
    ///
    /// Checks the file exists and is within the size limit, then classifies it.
    /// Content wins over the extension; the extension is only consulted when
    /// the header matches no supported signature. A file whose header is
    /// unrecognized but whose extension is supported is handed to that
    /// extension's decoder, which then reports it as corrupt.
    pub fn validate(&self, path: &Path) -> Result<SourceFormat, PipelineError> {
        let metadata = std::fs::metadata(path).map_err(|e| PipelineError::io(path, e))?;

        let max_bytes = self.limits.max_file_size_mb * 1024 * 1024;
        if metadata.len() > max_bytes {
            return Err(PipelineError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: metadata.len() / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        let mut file = std::fs::File::open(path).map_err(|e| PipelineError::io(path, e))?;
        let mut header = [0u8; 12];
        let bytes_read = read_header(&mut file, &mut header).map_err(|e| PipelineError::io(path, e))?;

        if let Some(format) = sniff_format(&header, bytes_read) {
            return Ok(format);
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("unknown");
        SourceFormat::from_extension(ext).ok_or_else(|| PipelineError::UnsupportedFormat {
            path: path.to_path_buf(),
            format: ext.to_string(),
        })
    }
}

/// Fill as much of `header` as the file allows.
fn read_header(file: &mut std::fs::File, header: &mut [u8; 12]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < header.len() {
        match file.read(&mut header[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

/// Classify a file by its leading bytes.
pub fn sniff_format(header: &[u8], bytes_read: usize) -> Option<SourceFormat> {
    let header = &header[..bytes_read.min(header.len())];

    // JPEG: FF D8 FF
    if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(SourceFormat::Jpeg);
    }

    // PNG: 89 50 4E 47
    if header.starts_with(&[0x89, b'P', b'N', b'G']) {
        return Some(SourceFormat::Png);
    }

    // HEIC/HEIF: ftyp box at offset 4, major brand at offset 8
    if header.len() >= 12 && &header[4..8] == b"ftyp" {
        let brand = &header[8..12];
        if HEIF_BRANDS.iter().any(|b| &b[..] == brand) {
            return Some(SourceFormat::Heic);
        }
        return Some(SourceFormat::Other(
            String::from_utf8_lossy(brand).trim().to_string(),
        ));
    }

    None
}
