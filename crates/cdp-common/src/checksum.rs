//! Checksum utilities for archive verification
//!
//! Dump releases publish a `CHECKSUMS.sha256` manifest in `sha256sum` format
//! (one `<hex digest>  <file name>` line per file). This module computes
//! SHA-256 digests of local files and parses/queries those manifests.

use crate::error::{CommonError, Result};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// Compute the SHA-256 checksum of a file
pub fn compute_file_checksum(path: impl AsRef<Path>) -> Result<String> {
    let mut file = std::fs::File::open(path)?;
    compute_checksum(&mut file)
}

/// Compute the SHA-256 checksum of any readable source
pub fn compute_checksum<R: Read>(reader: &mut R) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Verify the checksum of a file against an expected digest
pub fn verify_file_checksum(path: impl AsRef<Path>, expected: &str) -> Result<bool> {
    let path = path.as_ref();
    let actual = compute_file_checksum(path)?;
    if actual.eq_ignore_ascii_case(expected) {
        Ok(true)
    } else {
        Err(CommonError::ChecksumMismatch {
            file: path.display().to_string(),
            expected: expected.to_string(),
            actual,
        })
    }
}

/// A parsed `sha256sum`-format checksum manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumManifest {
    entries: BTreeMap<String, String>,
}

impl ChecksumManifest {
    /// Parse manifest text.
    ///
    /// Blank lines and `#` comments are skipped. A `*` prefix on the file
    /// name (sha256sum binary mode) is stripped.
    pub fn parse(text: &str) -> Result<Self> {
        let mut entries = BTreeMap::new();

        for (idx, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (digest, name) = line.split_once(char::is_whitespace).ok_or_else(|| {
                CommonError::InvalidManifest {
                    line: idx + 1,
                    reason: format!("expected '<digest> <file>', got '{raw_line}'"),
                }
            })?;

            if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(CommonError::InvalidManifest {
                    line: idx + 1,
                    reason: format!("'{digest}' is not a SHA-256 digest"),
                });
            }

            let name = name.trim_start().trim_start_matches('*');
            entries.insert(name.to_string(), digest.to_lowercase());
        }

        Ok(Self { entries })
    }

    /// Load and parse a manifest file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Expected digest for a file, if the manifest lists it
    pub fn expected(&self, file_name: &str) -> Option<&str> {
        self.entries.get(file_name).map(String::as_str)
    }

    /// Expected digest for a file, erroring when the manifest omits it
    pub fn require(&self, file_name: &str) -> Result<&str> {
        self.expected(file_name)
            .ok_or_else(|| CommonError::ManifestEntryMissing(file_name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_compute_checksum_sha256() {
        let data = b"hello world";
        let mut cursor = Cursor::new(data);
        let checksum = compute_checksum(&mut cursor).unwrap();
        assert_eq!(checksum, "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9");
    }

    #[test]
    fn test_verify_file_checksum_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"hello world").unwrap();

        assert!(verify_file_checksum(
            &path,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        )
        .unwrap());

        let err = verify_file_checksum(&path, &"0".repeat(64)).unwrap_err();
        assert!(matches!(err, CommonError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_manifest_parse() {
        let text = "\
# release 20240101
b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9  artists-20240101.xml.gz
309ecc489c12d6eb4cc40f50c902f2b4d0ed77ee511a7c7a9bcd3ca86d4cd86e *labels-20240101.xml.gz

";
        let manifest = ChecksumManifest::parse(text).unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(
            manifest.expected("artists-20240101.xml.gz").unwrap(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(
            manifest.expected("labels-20240101.xml.gz").unwrap(),
            "309ecc489c12d6eb4cc40f50c902f2b4d0ed77ee511a7c7a9bcd3ca86d4cd86e"
        );
        assert!(manifest.expected("masters-20240101.xml.gz").is_none());
        assert!(manifest.require("masters-20240101.xml.gz").is_err());
    }

    #[test]
    fn test_manifest_rejects_bad_digest() {
        let err = ChecksumManifest::parse("nothex  file.xml.gz").unwrap_err();
        assert!(matches!(err, CommonError::InvalidManifest { line: 1, .. }));
    }
}
