//! CDP CLI Library
//!
//! Command-line interface for working with catalog dump releases.
//!
//! # Overview
//!
//! The CDP CLI takes a dump release from the upstream mirror to a local
//! queryable document database in three stages:
//!
//! - **Fetch**: download dump archives and the checksum manifest (`cdp fetch`)
//! - **Verify**: recompute archive checksums against the manifest (`cdp verify`)
//! - **Import**: stream archives into the document database (`cdp import`)
//!
//! Imports checkpoint after every committed chunk, so an interrupted
//! `cdp import` resumes where it stopped when re-run.

pub mod client;
pub mod commands;
pub mod error;
pub mod progress;

// Re-export commonly used types
pub use client::DumpClient;
pub use error::{CliError, Result};

use cdp_common::types::Collection;
use cdp_pipeline::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_ERRORS};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CDP - Catalog dump fetch, verify, and import tool
#[derive(Parser, Debug)]
#[command(name = "cdp")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Local directory holding dump releases
    #[arg(long, env = "CDP_DATA_DIR", default_value = "./data", global = true)]
    pub data_dir: PathBuf,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download dump archives and the checksum manifest for a release
    Fetch {
        /// Release version, e.g. 20240101
        version: String,

        /// Collections to fetch
        #[arg(long, value_delimiter = ',', default_values_t = Collection::ALL)]
        collections: Vec<Collection>,

        /// Base URL of the dump mirror
        #[arg(
            long,
            env = "CDP_BASE_URL",
            default_value = "https://data.cdp-tools.org/dumps"
        )]
        base_url: String,

        /// Re-download archives that already exist locally
        #[arg(short, long)]
        force: bool,

        /// Skip checksum verification against the release manifest
        #[arg(long)]
        no_verify: bool,
    },

    /// Verify local archives against the release checksum manifest
    Verify {
        /// Release version, e.g. 20240101
        version: String,

        /// Collections to verify
        #[arg(long, value_delimiter = ',', default_values_t = Collection::ALL)]
        collections: Vec<Collection>,
    },

    /// Import dump archives into the local document database
    Import {
        /// Release version, e.g. 20240101
        version: String,

        /// Collections to import, in order
        #[arg(long, value_delimiter = ',', default_values_t = Collection::ALL)]
        collections: Vec<Collection>,

        /// Records per chunk
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// Invalid records tolerated across the whole run
        #[arg(long, default_value_t = DEFAULT_MAX_ERRORS)]
        max_errors: u64,

        /// Ignore stored checkpoints and reimport from the beginning
        #[arg(long)]
        restart: bool,

        /// Stop the whole run at the first invalid record or failed collection
        #[arg(long)]
        bail: bool,

        /// Skip schema validation of records
        #[arg(long)]
        no_validate: bool,

        /// Keep full image metadata instead of collapsing it to a count
        #[arg(long)]
        include_images: bool,

        /// Document database path (defaults to <data-dir>/catalog.db)
        #[arg(long)]
        database: Option<PathBuf>,
    },
}
