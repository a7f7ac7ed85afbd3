//! CDP Store Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! The reference chunk handler for catalog imports: JSON Schema validation
//! compiled once per run, record-to-document flattening, and a SQLite
//! document store with upsert-by-identifier semantics so replaying a chunk
//! after a crash is harmless.
//!
//! # Overview
//!
//! - [`validate::ValidatorRegistry`]: embedded per-collection schemas,
//!   compiled once and shared across every chunk
//! - [`document`]: flattens a record tree into a JSON document
//! - [`store::DocumentStore`]: SQLite store implementing
//!   [`cdp_pipeline::ChunkHandler`] with one transaction per chunk

pub mod document;
pub mod error;
pub mod store;
pub mod validate;

// Re-export commonly used types
pub use document::{record_to_document, DocumentOptions};
pub use error::{Result, StoreError};
pub use store::{DocumentStore, StoreOptions};
pub use validate::ValidatorRegistry;
