//! Error types for the CDP CLI
//!
//! This module provides user-friendly error types with clear, actionable messages
//! that help users understand what went wrong and how to fix it.

use cdp_common::types::Collection;
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Comprehensive error type for CLI operations
///
/// All errors are designed to be user-facing with clear messages and suggestions.
#[derive(Error, Debug)]
pub enum CliError {
    /// Archive or manifest download failed
    #[error("Download failed: {0}. Check the release version and the --base-url setting.")]
    Download(String),

    /// Downloaded file checksum verification failed
    #[error("Checksum verification failed for '{file}': expected '{expected}', got '{actual}'. The file may be corrupted. Run 'cdp fetch --force' to re-download.")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    /// The release has no local checksum manifest to verify against
    #[error("Checksum manifest not found at '{0}'. Run 'cdp fetch' to download it first.")]
    ManifestMissing(String),

    /// One or more local archives did not match the manifest
    #[error("{failed} of {checked} archives failed verification. Run 'cdp fetch --force' to re-download them.")]
    VerificationFailed { failed: usize, checked: usize },

    /// A collection did not import to completion
    #[error("{collection} import did not complete: {reason}. Re-run 'cdp import' to resume from the last committed checkpoint.")]
    ImportFailed {
        collection: Collection,
        reason: String,
    },

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("Network request failed: {0}. Check your internet connection and the --base-url setting.")]
    Http(#[from] reqwest::Error),

    /// Checksum, manifest, or layout error from the shared utilities
    #[error(transparent)]
    Common(#[from] cdp_common::CommonError),

    /// Pipeline rejected the run parameters or failed outside a collection
    #[error(transparent)]
    Pipeline(#[from] cdp_pipeline::PipelineError),

    /// Document store could not be opened or migrated
    #[error(transparent)]
    Store(#[from] cdp_store::StoreError),

    /// Generic anyhow error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Create a download error
    pub fn download(msg: impl Into<String>) -> Self {
        Self::Download(msg.into())
    }
}
