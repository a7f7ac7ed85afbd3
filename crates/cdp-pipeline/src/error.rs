//! Error types for the dump processing pipeline

use cdp_common::types::Collection;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors produced while decoding an archive into records.
///
/// All variants are fatal for the collection being decoded; the stream cannot
/// be resumed past a decode failure.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed archive content: {0}")]
    Malformed(String),

    #[error("Archive ended inside an open <{tag}> element")]
    Truncated { tag: String },

    #[error("Unexpected content after the closing root element")]
    OutsideRoot,
}

/// Errors that terminate a collection or an entire run
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Archive not found: {}. Run 'cdp fetch' to download it first", .path.display())]
    ArchiveMissing { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode {collection} archive: {source}")]
    Decode {
        collection: Collection,
        #[source]
        source: DecodeError,
    },

    #[error(
        "Error budget exhausted: {invalid} invalid records exceed the limit of {limit} \
         (last committed checkpoint: {checkpoint})"
    )]
    BudgetExceeded {
        invalid: u64,
        limit: u64,
        checkpoint: u64,
    },

    #[error("Chunk handler failed: {0}")]
    Handler(#[source] anyhow::Error),

    #[error(
        "Checkpoint at {} is unreadable: {reason}. Pass --restart to reimport from the beginning",
        .path.display()
    )]
    Checkpoint { path: PathBuf, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
