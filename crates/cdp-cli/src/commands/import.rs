//! Import command - stream dump archives into the document database
//!
//! Wires the document store into the pipeline orchestrator and renders the
//! run as terminal output: a live per-collection spinner while importing, a
//! sample of invalid records afterwards, and a closing summary line. Exits
//! non-zero when any collection did not complete.

use crate::error::{CliError, Result};
use crate::progress::ImportProgress;
use cdp_common::layout::DumpLayout;
use cdp_common::types::Collection;
use cdp_pipeline::{Orchestrator, RunOptions, RunReport};
use cdp_store::{DocumentStore, StoreOptions};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

/// How many invalid records to print per collection
const INVALID_SAMPLE: usize = 3;

/// Parameters for one import run
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub layout: DumpLayout,
    pub collections: Vec<Collection>,
    pub database: PathBuf,
    pub chunk_size: usize,
    pub max_errors: u64,
    /// Ignore stored checkpoints and reimport from the beginning
    pub restart: bool,
    /// Stop the whole run at the first invalid record or failed collection
    pub bail: bool,
    /// Validate records against their collection schema
    pub validate: bool,
    /// Keep full image metadata in documents
    pub include_images: bool,
}

/// Execute the import command
pub async fn run(options: ImportOptions) -> Result<()> {
    println!(
        "{} Importing dump release {} into {}",
        "→".cyan(),
        options.layout.version().bold(),
        options.database.display()
    );

    let store = Arc::new(
        DocumentStore::open(
            &options.database,
            StoreOptions {
                validate: options.validate,
                bail: options.bail,
                include_images: options.include_images,
            },
        )
        .await?,
    );

    let run_options = RunOptions {
        layout: options.layout,
        collections: options.collections,
        chunk_size: options.chunk_size,
        max_errors: options.max_errors,
        restart: options.restart,
        bail: options.bail,
    };

    let report = Orchestrator::new(run_options, store)?
        .with_observer(Arc::new(ImportProgress::new()))
        .run()
        .await;

    print_summary(&report);

    match report.first_failure() {
        None => Ok(()),
        Some((collection, result)) => Err(CliError::ImportFailed {
            collection,
            reason: result
                .error
                .clone()
                .unwrap_or_else(|| result.status.to_string()),
        }),
    }
}

/// Print invalid-record samples and the closing totals line
fn print_summary(report: &RunReport) {
    for (collection, result) in &report.collections {
        if result.invalid.is_empty() {
            continue;
        }
        println!(
            "{} {}: {} invalid records",
            "!".yellow(),
            collection,
            result.invalid.len()
        );
        for row in result.invalid.iter().take(INVALID_SAMPLE) {
            let id = row.id.as_deref().unwrap_or("?");
            println!("    record {} (id {}): {}", row.index, id, row.reason);
        }
        if result.invalid.len() > INVALID_SAMPLE {
            println!("    ... and {} more", result.invalid.len() - INVALID_SAMPLE);
        }
    }

    println!();
    println!(
        "Summary: {} records imported, {} invalid",
        report.total_processed(),
        report.total_invalid()
    );
}
