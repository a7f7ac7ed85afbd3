//! CDP Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the CDP project.
//!
//! # Overview
//!
//! This crate provides common functionality used across all CDP workspace members:
//!
//! - **Error Handling**: Custom error types and result types
//! - **Checksums**: Archive integrity verification and manifest parsing
//! - **Layout**: Canonical on-disk paths for dump files and checkpoints
//! - **Types**: Shared domain types (collections)
//!
//! # Example
//!
//! ```no_run
//! use cdp_common::{Result, layout::DumpLayout, types::Collection};
//! use cdp_common::checksum::compute_file_checksum;
//!
//! fn archive_digest(layout: &DumpLayout) -> Result<String> {
//!     compute_file_checksum(layout.archive_path(Collection::Artists))
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod layout;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{CommonError, Result};
