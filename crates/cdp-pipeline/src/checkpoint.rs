//! Durable per-collection import progress markers
//!
//! One small JSON file per (collection, version) under the release's data
//! directory records how many leading records have been fully committed.
//! Writes go through a temp file and an atomic rename so a crash can never
//! leave a half-written checkpoint; the worst case after a crash is a stale
//! value, which the at-least-once contract absorbs by replaying one chunk.

use crate::error::PipelineError;
use cdp_common::layout::DumpLayout;
use cdp_common::types::Collection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use tracing::debug;

/// Committed progress for one collection of one dump release
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub collection: Collection,
    pub version: String,
    /// Count of leading records fully committed; the next run resumes here
    pub processed: u64,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(collection: Collection, version: impl Into<String>, processed: u64) -> Self {
        Self {
            collection,
            version: version.into(),
            processed,
            updated_at: Utc::now(),
        }
    }
}

/// Loads and persists checkpoints under a dump layout.
///
/// The orchestrator is the sole writer; concurrent runs against the same data
/// directory are not supported.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    layout: DumpLayout,
}

impl CheckpointStore {
    pub fn new(layout: DumpLayout) -> Self {
        Self { layout }
    }

    /// Read the stored checkpoint, `None` when no run has committed yet.
    ///
    /// A file that exists but cannot be parsed is an error rather than a
    /// silent restart: reimporting from zero behind the operator's back is
    /// worse than asking for an explicit `--restart`.
    pub fn load(&self, collection: Collection) -> Result<Option<Checkpoint>, PipelineError> {
        let path = self.layout.checkpoint_path(collection);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_str(&text) {
            Ok(checkpoint) => Ok(Some(checkpoint)),
            Err(err) => Err(PipelineError::Checkpoint {
                path,
                reason: err.to_string(),
            }),
        }
    }

    /// Persist a checkpoint atomically (write temp file, then rename)
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), PipelineError> {
        let path = self.layout.checkpoint_path(checkpoint.collection);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(checkpoint)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;

        debug!(
            collection = %checkpoint.collection,
            processed = checkpoint.processed,
            "Checkpoint persisted"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn store(dir: &std::path::Path) -> CheckpointStore {
        CheckpointStore::new(DumpLayout::new(dir, "20240101"))
    }

    #[test]
    fn test_load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store(dir.path()).load(Collection::Artists).unwrap().is_none());
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let checkpoint = Checkpoint::new(Collection::Artists, "20240101", 2000);
        store.save(&checkpoint).unwrap();

        let loaded = store.load(Collection::Artists).unwrap().unwrap();
        assert_eq!(loaded.processed, 2000);
        assert_eq!(loaded.collection, Collection::Artists);
        assert_eq!(loaded.version, "20240101");

        // Each collection has its own file
        assert!(store.load(Collection::Labels).unwrap().is_none());
    }

    #[test]
    fn test_save_overwrites_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        store
            .save(&Checkpoint::new(Collection::Masters, "20240101", 1000))
            .unwrap();
        store
            .save(&Checkpoint::new(Collection::Masters, "20240101", 2000))
            .unwrap();

        let loaded = store.load(Collection::Masters).unwrap().unwrap();
        assert_eq!(loaded.processed, 2000);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("20240101"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_corrupt_checkpoint_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let path = DumpLayout::new(dir.path(), "20240101").checkpoint_path(Collection::Artists);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        let err = store.load(Collection::Artists).unwrap_err();
        assert!(matches!(err, PipelineError::Checkpoint { .. }));
    }
}
