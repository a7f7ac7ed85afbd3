//! CLI command implementations

pub mod fetch;
pub mod import;
pub mod verify;
