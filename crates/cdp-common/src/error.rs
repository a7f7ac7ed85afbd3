//! Error types shared across CDP crates

use thiserror::Error;

/// Result type alias for common CDP operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// Error type for shared utilities (checksums, layout, manifests)
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checksum mismatch for {file}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("Checksum manifest has no entry for {0}")]
    ManifestEntryMissing(String),

    #[error("Invalid checksum manifest at line {line}: {reason}")]
    InvalidManifest { line: usize, reason: String },

    #[error("Unknown collection '{0}' (expected one of: artists, labels, masters, releases)")]
    UnknownCollection(String),
}
