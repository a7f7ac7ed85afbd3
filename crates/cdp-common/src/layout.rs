//! Canonical on-disk layout for dump data
//!
//! Every artifact belonging to one dump release lives under
//! `<data-dir>/<version>/`:
//!
//! ```text
//! data/
//!   20240101/
//!     artists-20240101.xml.gz
//!     artists.checkpoint.json
//!     CHECKSUMS.sha256
//! ```
//!
//! All path derivation goes through [`DumpLayout`] so the fetch, verify, and
//! import commands agree on file locations.

use crate::error::Result;
use crate::types::Collection;
use std::path::{Path, PathBuf};

/// File name of the per-release checksum manifest
pub const MANIFEST_FILE_NAME: &str = "CHECKSUMS.sha256";

/// Paths for one dump release under a local data directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpLayout {
    data_dir: PathBuf,
    version: String,
}

impl DumpLayout {
    pub fn new(data_dir: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            version: version.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Directory holding every artifact of this release
    pub fn version_dir(&self) -> PathBuf {
        self.data_dir.join(&self.version)
    }

    /// Archive file name as published upstream, e.g. `artists-20240101.xml.gz`
    pub fn archive_file_name(&self, collection: Collection) -> String {
        format!("{}-{}.xml.gz", collection, self.version)
    }

    /// Local path of a collection archive
    pub fn archive_path(&self, collection: Collection) -> PathBuf {
        self.version_dir().join(self.archive_file_name(collection))
    }

    /// Local path of a collection's import checkpoint
    pub fn checkpoint_path(&self, collection: Collection) -> PathBuf {
        self.version_dir()
            .join(format!("{collection}.checkpoint.json"))
    }

    /// Local path of the release checksum manifest
    pub fn manifest_path(&self) -> PathBuf {
        self.version_dir().join(MANIFEST_FILE_NAME)
    }

    /// Create the version directory if it does not exist yet
    pub fn ensure_version_dir(&self) -> Result<PathBuf> {
        let dir = self.version_dir();
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}
