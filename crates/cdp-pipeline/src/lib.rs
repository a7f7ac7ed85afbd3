//! CDP Pipeline Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! The dump processing pipeline: streaming decode of compressed XML catalog
//! archives into records, fixed-size ordered chunking, sequential delivery to
//! a caller-supplied handler, durable per-collection checkpoints for
//! crash/resume, and a run-wide invalid-record budget.
//!
//! # Overview
//!
//! - [`decoder::DumpReader`]: lazy, bounded-memory record stream over a
//!   gzipped XML archive, restartable from a record offset
//! - [`chunker::Chunker`]: groups the record stream into ordered chunks
//! - [`checkpoint::CheckpointStore`]: atomic per-collection progress markers
//! - [`budget::ErrorBudget`]: additive invalid-record counter with a ceiling
//! - [`orchestrator::Orchestrator`]: drives a run across collections,
//!   feeding chunks to a [`handler::ChunkHandler`]
//!
//! Delivery is at-least-once: a crash mid-chunk replays that whole chunk on
//! the next run, so handlers must be idempotent (upsert-by-identifier).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cdp_common::{layout::DumpLayout, types::Collection};
//! use cdp_pipeline::{ChunkHandler, Orchestrator, RunOptions};
//!
//! # async fn example(handler: Arc<dyn ChunkHandler>) -> anyhow::Result<()> {
//! let layout = DumpLayout::new("./data", "20240101");
//! let options = RunOptions::new(layout, vec![Collection::Artists]);
//! let report = Orchestrator::new(options, handler)?.run().await;
//! println!("processed {} records", report.total_processed());
//! # Ok(())
//! # }
//! ```

pub mod budget;
pub mod checkpoint;
pub mod chunker;
pub mod decoder;
pub mod error;
pub mod handler;
pub mod orchestrator;
pub mod progress;
pub mod record;

// Re-export commonly used types
pub use budget::ErrorBudget;
pub use checkpoint::{Checkpoint, CheckpointStore};
pub use chunker::{Chunk, Chunker};
pub use decoder::DumpReader;
pub use error::{DecodeError, PipelineError, Result};
pub use handler::{ChunkHandler, InvalidRow};
pub use orchestrator::{
    Orchestrator, RunOptions, RunReport, RunResult, RunStatus, DEFAULT_CHUNK_SIZE,
    DEFAULT_MAX_ERRORS,
};
pub use progress::{NoopProgress, ProgressObserver};
pub use record::Record;
