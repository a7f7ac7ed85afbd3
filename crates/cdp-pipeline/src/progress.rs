//! Progress notifications for UIs and logging
//!
//! The pipeline reports progress through this trait so the core stays free
//! of terminal concerns; the CLI plugs in an indicatif-backed observer.
//! Observers are advisory: a missing or inert observer never affects run
//! correctness.

use crate::orchestrator::RunStatus;
use cdp_common::types::Collection;

/// Receives run progress events. All methods default to no-ops so observers
/// implement only what they display.
pub trait ProgressObserver: Send + Sync {
    /// A collection's import is starting, resuming after `resumed_from`
    /// already-committed records.
    fn collection_started(&self, _collection: Collection, _resumed_from: u64) {}

    /// A chunk was committed; `processed` is the collection's new checkpoint
    /// value. `total` is the known record count when available (streams of
    /// unknown length pass `None`).
    fn chunk_committed(&self, _collection: Collection, _processed: u64, _total: Option<u64>) {}

    /// A collection finished (successfully or not) with `processed` records
    /// handled during this run.
    fn collection_finished(&self, _collection: Collection, _status: RunStatus, _processed: u64) {}
}

/// Observer that ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {}
