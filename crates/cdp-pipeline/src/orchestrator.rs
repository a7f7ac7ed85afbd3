//! The run orchestrator: decode, chunk, deliver, checkpoint, account
//!
//! Collections are processed sequentially. Within one collection, decoding
//! runs on a blocking task feeding a bounded channel of depth 1, so the next
//! chunk is parsed while the handler works on the current one but never more
//! than one chunk is buffered. The handler call for a chunk completes before
//! its checkpoint is written; a crash mid-handler therefore replays the whole
//! chunk on the next run, and a crash after the checkpoint write never does.

use crate::budget::ErrorBudget;
use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::chunker::{Chunk, Chunker};
use crate::decoder::DumpReader;
use crate::error::{DecodeError, PipelineError};
use crate::handler::{ChunkHandler, InvalidRow};
use crate::progress::{NoopProgress, ProgressObserver};
use cdp_common::layout::DumpLayout;
use cdp_common::types::Collection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Records per chunk when the caller does not choose one
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Invalid records tolerated per run when the caller does not choose a limit
pub const DEFAULT_MAX_ERRORS: u64 = 100;

/// Parameters of one import run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub layout: DumpLayout,
    pub collections: Vec<Collection>,
    pub chunk_size: usize,
    pub max_errors: u64,
    /// Ignore stored checkpoints and reimport every collection from zero
    pub restart: bool,
    /// Stop the whole run at the first failing collection instead of
    /// continuing with its siblings
    pub bail: bool,
}

impl RunOptions {
    pub fn new(layout: DumpLayout, collections: Vec<Collection>) -> Self {
        Self {
            layout,
            collections,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_errors: DEFAULT_MAX_ERRORS,
            restart: false,
            bail: false,
        }
    }

    fn validate(&self) -> Result<(), PipelineError> {
        if self.chunk_size == 0 {
            return Err(PipelineError::Config(
                "chunk size must be at least 1".to_string(),
            ));
        }
        if self.collections.is_empty() {
            return Err(PipelineError::Config(
                "no collections selected".to_string(),
            ));
        }
        Ok(())
    }
}

/// Terminal state of one collection's import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    Completed,
    AbortedByBudget,
    AbortedByError,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::AbortedByBudget => write!(f, "aborted-by-budget"),
            RunStatus::AbortedByError => write!(f, "aborted-by-error"),
        }
    }
}

/// Outcome of one collection within a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Records delivered to the handler during this run (committed or not)
    pub records_processed: u64,
    /// Invalid-row reports collected from the handler
    pub invalid: Vec<InvalidRow>,
    /// Committed global record count; the safe resume point
    pub checkpoint: u64,
    pub status: RunStatus,
    /// Diagnostic for aborted statuses
    pub error: Option<String>,
}

impl RunResult {
    fn started_at(checkpoint: u64) -> Self {
        Self {
            records_processed: 0,
            invalid: Vec::new(),
            checkpoint,
            status: RunStatus::Completed,
            error: None,
        }
    }

    fn failed(err: &PipelineError) -> Self {
        Self {
            records_processed: 0,
            invalid: Vec::new(),
            checkpoint: 0,
            status: RunStatus::AbortedByError,
            error: Some(err.to_string()),
        }
    }
}

/// Aggregate outcome of a whole run, one entry per collection that was
/// attempted. Collections skipped after a run-fatal abort are absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub collections: BTreeMap<Collection, RunResult>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.collections
            .values()
            .all(|r| r.status == RunStatus::Completed)
    }

    pub fn total_processed(&self) -> u64 {
        self.collections.values().map(|r| r.records_processed).sum()
    }

    pub fn total_invalid(&self) -> u64 {
        self.collections
            .values()
            .map(|r| r.invalid.len() as u64)
            .sum()
    }

    /// First collection that did not complete, if any
    pub fn first_failure(&self) -> Option<(Collection, &RunResult)> {
        self.collections
            .iter()
            .find(|(_, r)| r.status != RunStatus::Completed)
            .map(|(c, r)| (*c, r))
    }
}

/// Whether the run may move on to the next collection
enum RunControl {
    Continue,
    Stop,
}

/// Drives one import run: for each collection, resume or restart the
/// decoder, feed chunks to the handler, commit checkpoints, and enforce the
/// shared error budget.
pub struct Orchestrator {
    options: RunOptions,
    checkpoints: CheckpointStore,
    handler: Arc<dyn ChunkHandler>,
    observer: Arc<dyn ProgressObserver>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("options", &self.options)
            .field("checkpoints", &self.checkpoints)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Rejects invalid options (zero chunk size, empty collection set)
    /// before any I/O happens.
    pub fn new(options: RunOptions, handler: Arc<dyn ChunkHandler>) -> Result<Self, PipelineError> {
        options.validate()?;
        let checkpoints = CheckpointStore::new(options.layout.clone());
        Ok(Self {
            options,
            checkpoints,
            handler,
            observer: Arc::new(NoopProgress),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Process every requested collection sequentially.
    ///
    /// Failures are captured per collection in the report. An exhausted
    /// error budget or a fatal handler error stops the run; archive and
    /// decode failures stop only their own collection unless `bail` is set.
    pub async fn run(&self) -> RunReport {
        info!(
            version = self.options.layout.version(),
            collections = ?self.options.collections,
            chunk_size = self.options.chunk_size,
            max_errors = self.options.max_errors,
            restart = self.options.restart,
            "Starting import run"
        );

        let mut budget = ErrorBudget::new(self.options.max_errors);
        let mut collections = BTreeMap::new();

        for &collection in &self.options.collections {
            let (result, control) = self.process_collection(collection, &mut budget).await;
            let stop = matches!(control, RunControl::Stop);
            collections.insert(collection, result);
            if stop {
                warn!(collection = %collection, "Run aborted; remaining collections skipped");
                break;
            }
        }

        RunReport { collections }
    }

    async fn process_collection(
        &self,
        collection: Collection,
        budget: &mut ErrorBudget,
    ) -> (RunResult, RunControl) {
        let start = if self.options.restart {
            0
        } else {
            match self.checkpoints.load(collection) {
                Ok(checkpoint) => checkpoint.map(|c| c.processed).unwrap_or(0),
                Err(err) => {
                    error!(collection = %collection, error = %err, "Cannot read checkpoint");
                    return (RunResult::failed(&err), self.control_for(&err));
                },
            }
        };

        let mut result = RunResult::started_at(start);
        match self.drive(collection, start, budget, &mut result).await {
            Ok(()) => {
                info!(
                    collection = %collection,
                    processed = result.records_processed,
                    invalid = result.invalid.len(),
                    checkpoint = result.checkpoint,
                    "Collection import completed"
                );
                result.status = RunStatus::Completed;
                self.observer
                    .collection_finished(collection, result.status, result.records_processed);
                (result, RunControl::Continue)
            },
            Err(err) => {
                error!(collection = %collection, error = %err, "Collection import aborted");
                result.status = match err {
                    PipelineError::BudgetExceeded { .. } => RunStatus::AbortedByBudget,
                    _ => RunStatus::AbortedByError,
                };
                result.error = Some(err.to_string());
                self.observer
                    .collection_finished(collection, result.status, result.records_processed);
                (result, self.control_for(&err))
            },
        }
    }

    /// Budget exhaustion and handler failures are fatal for the whole run;
    /// archive, decode, and checkpoint problems stay local to their
    /// collection unless `bail` is set.
    fn control_for(&self, err: &PipelineError) -> RunControl {
        match err {
            PipelineError::BudgetExceeded { .. } | PipelineError::Handler(_) => RunControl::Stop,
            _ if self.options.bail => RunControl::Stop,
            _ => RunControl::Continue,
        }
    }

    async fn drive(
        &self,
        collection: Collection,
        start: u64,
        budget: &mut ErrorBudget,
        result: &mut RunResult,
    ) -> Result<(), PipelineError> {
        let archive = self.options.layout.archive_path(collection);
        if !archive.exists() {
            return Err(PipelineError::ArchiveMissing { path: archive });
        }

        info!(
            collection = %collection,
            archive = %archive.display(),
            resumed_from = start,
            "Importing collection"
        );
        self.observer.collection_started(collection, start);

        let (tx, mut rx) = mpsc::channel(1);
        let chunk_size = self.options.chunk_size;
        let producer =
            tokio::task::spawn_blocking(move || decode_chunks(archive, start, chunk_size, tx));

        let outcome = loop {
            let Some(item) = rx.recv().await else {
                break Ok(());
            };
            let chunk: Chunk = match item {
                Ok(chunk) => chunk,
                Err(DecodeError::Io(err)) => break Err(PipelineError::Io(err)),
                Err(err) => {
                    break Err(PipelineError::Decode {
                        collection,
                        source: err,
                    })
                },
            };

            let len = chunk.len() as u64;
            debug!(
                collection = %collection,
                start_index = chunk.start_index,
                len,
                "Chunk decoded"
            );

            let reports = match self.handler.process_chunk(chunk, collection).await {
                Ok(reports) => reports,
                Err(err) => break Err(PipelineError::Handler(err)),
            };
            result.records_processed += len;

            let reported = reports.len();
            let total_invalid = budget.record(&reports);
            result.invalid.extend(reports);
            if reported > 0 {
                warn!(
                    collection = %collection,
                    invalid = reported,
                    total_invalid,
                    "Handler reported invalid records"
                );
            }

            // Budget is checked before the checkpoint advances: a chunk that
            // blows the budget is never committed, so the stored checkpoint
            // still names the last fully good boundary.
            if budget.exceeded() {
                break Err(PipelineError::BudgetExceeded {
                    invalid: budget.seen(),
                    limit: budget.limit(),
                    checkpoint: result.checkpoint,
                });
            }

            let next = Checkpoint::new(
                collection,
                self.options.layout.version(),
                result.checkpoint + len,
            );
            if let Err(err) = self.checkpoints.save(&next) {
                break Err(err);
            }
            result.checkpoint += len;
            self.observer
                .chunk_committed(collection, result.checkpoint, None);
        };

        // Dropping the receiver unblocks a producer waiting to send; it then
        // exits on its own.
        drop(rx);
        if let Err(err) = producer.await {
            error!(collection = %collection, error = %err, "Decode task did not shut down cleanly");
        }
        outcome
    }
}

/// Blocking-side half of the two-stage pipeline: decode and chunk, pushing
/// into the bounded channel until the stream ends, a decode error is sent,
/// or the consumer hangs up.
fn decode_chunks(
    path: PathBuf,
    skip: u64,
    chunk_size: usize,
    tx: mpsc::Sender<Result<Chunk, DecodeError>>,
) {
    let chunker = match open_chunker(&path, skip, chunk_size) {
        Ok(chunker) => chunker,
        Err(err) => {
            let _ = tx.blocking_send(Err(err));
            return;
        },
    };

    for item in chunker {
        let failed = item.is_err();
        if tx.blocking_send(item).is_err() {
            return;
        }
        if failed {
            return;
        }
    }
}

fn open_chunker(
    path: &Path,
    skip: u64,
    chunk_size: usize,
) -> Result<Chunker<DumpReader>, DecodeError> {
    let mut reader = DumpReader::open(path)?;
    if skip > 0 {
        debug!(skip, "Skipping already-committed records");
        reader.skip_records(skip)?;
    }
    Ok(Chunker::new(reader, chunk_size, skip))
}
