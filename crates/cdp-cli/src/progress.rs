//! Progress bar utilities for CLI operations
//!
//! Provides progress indicators for downloads and imports. [`ImportProgress`]
//! adapts pipeline progress notifications onto an indicatif spinner plus one
//! status line per finished collection.

use cdp_common::types::Collection;
use cdp_pipeline::{ProgressObserver, RunStatus};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// Create a progress bar for archive downloads
pub fn download_bar(size: u64, message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new(size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .expect("Invalid progress bar template")
            .progress_chars("#>-"),
    );
    pb.set_message(message.into());
    pb
}

/// Create a running-count spinner for imports of unknown total length
pub fn record_spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg} ({human_pos} records)")
            .expect("Invalid spinner template"),
    );
    pb.set_message(message.into());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Format bytes into human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Terminal progress for import runs.
///
/// One spinner tracks the collection currently importing; each finished
/// collection becomes a status line, so the scrollback doubles as a summary.
#[derive(Default)]
pub struct ImportProgress {
    active: Mutex<Option<ProgressBar>>,
}

impl ImportProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_active(&self, f: impl FnOnce(&mut Option<ProgressBar>)) {
        // A poisoned lock only costs display updates
        if let Ok(mut active) = self.active.lock() {
            f(&mut active);
        }
    }
}

impl ProgressObserver for ImportProgress {
    fn collection_started(&self, collection: Collection, resumed_from: u64) {
        let message = if resumed_from > 0 {
            format!("Importing {collection}, resuming at record {resumed_from}")
        } else {
            format!("Importing {collection}")
        };
        let pb = record_spinner(message);
        pb.set_position(resumed_from);
        self.with_active(|active| *active = Some(pb));
    }

    fn chunk_committed(&self, _collection: Collection, processed: u64, _total: Option<u64>) {
        self.with_active(|active| {
            if let Some(pb) = active.as_ref() {
                pb.set_position(processed);
            }
        });
    }

    fn collection_finished(&self, collection: Collection, status: RunStatus, processed: u64) {
        self.with_active(|active| {
            if let Some(pb) = active.take() {
                pb.finish_and_clear();
            }
        });
        match status {
            RunStatus::Completed => {
                println!("{} {}: {} records", "✓".green(), collection, processed);
            },
            _ => {
                println!(
                    "{} {}: {} after {} records",
                    "✗".red(),
                    collection,
                    status,
                    processed
                );
            },
        }
    }
}
