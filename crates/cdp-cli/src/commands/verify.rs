//! Verify command - check local archives against the checksum manifest
//!
//! Recomputes the SHA-256 digest of each local archive and compares it with
//! the release manifest downloaded by `cdp fetch`. Every archive is checked
//! even after a failure, so one run reports all problems at once.

use crate::error::{CliError, Result};
use cdp_common::checksum::{compute_file_checksum, ChecksumManifest};
use cdp_common::layout::DumpLayout;
use cdp_common::types::Collection;
use colored::Colorize;

/// Parameters for one verify run
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    pub layout: DumpLayout,
    pub collections: Vec<Collection>,
}

/// Execute the verify command
pub async fn run(options: VerifyOptions) -> Result<()> {
    let layout = &options.layout;

    println!(
        "{} Verifying dump release {}",
        "→".cyan(),
        layout.version().bold()
    );

    let manifest_path = layout.manifest_path();
    if !manifest_path.exists() {
        return Err(CliError::ManifestMissing(
            manifest_path.display().to_string(),
        ));
    }
    let manifest = ChecksumManifest::load(&manifest_path)?;

    let mut failed = 0usize;

    for collection in &options.collections {
        let collection = *collection;
        let file_name = layout.archive_file_name(collection);
        let path = layout.archive_path(collection);

        if !path.exists() {
            println!("{} {}: file missing", "✗".red(), file_name);
            failed += 1;
            continue;
        }

        let expected = match manifest.expected(&file_name) {
            Some(digest) => digest,
            None => {
                println!("{} {}: no manifest entry", "✗".red(), file_name);
                failed += 1;
                continue;
            },
        };

        let actual = compute_file_checksum(&path)?;
        if actual.eq_ignore_ascii_case(expected) {
            println!("{} {}", "✓".green(), file_name);
        } else {
            println!(
                "{} {}: checksum mismatch (expected {expected}, got {actual})",
                "✗".red(),
                file_name
            );
            failed += 1;
        }
    }

    if failed > 0 {
        return Err(CliError::VerificationFailed {
            failed,
            checked: options.collections.len(),
        });
    }

    println!();
    println!(
        "{} {} archives verified",
        "✓".green(),
        options.collections.len()
    );

    Ok(())
}
