//! The chunk handler contract between the pipeline and its consumer

use crate::chunker::Chunk;
use async_trait::async_trait;
use cdp_common::types::Collection;
use serde::{Deserialize, Serialize};

/// A record the handler could not validate or persist.
///
/// Carried as data rather than as an error: invalid rows are expected in
/// dirty dumps and only become fatal through the run's error budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidRow {
    /// Global index of the record within its collection stream
    pub index: u64,
    /// Record identifier when one could be extracted
    pub id: Option<String>,
    /// JSON rendering of the offending record, for diagnostics
    pub raw_json: String,
    /// Human-readable failure reason
    pub reason: String,
}

/// Consumes one chunk at a time: validate, transform, persist.
///
/// The orchestrator awaits each call to completion before committing the
/// chunk's checkpoint, and never has two chunks of one collection in flight.
/// Returning `Err` aborts the entire run without advancing the checkpoint.
///
/// Implementations must be idempotent under replay (upsert by identifier):
/// a crash between the handler call and the checkpoint write causes the same
/// chunk to be delivered again on the next run.
#[async_trait]
pub trait ChunkHandler: Send + Sync {
    async fn process_chunk(
        &self,
        chunk: Chunk,
        collection: Collection,
    ) -> anyhow::Result<Vec<InvalidRow>>;
}
