//! Fetch command - download dump archives for a release
//!
//! Downloads the checksum manifest and one archive per requested collection
//! into the local data directory. Archives already on disk are verified
//! against the manifest and skipped when they match; stale or missing files
//! are (re-)downloaded.

use crate::client::DumpClient;
use crate::error::{CliError, Result};
use crate::progress::format_bytes;
use cdp_common::checksum::{verify_file_checksum, ChecksumManifest};
use cdp_common::layout::DumpLayout;
use cdp_common::types::Collection;
use cdp_common::CommonError;
use colored::Colorize;
use tracing::{info, warn};

/// Parameters for one fetch run
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub layout: DumpLayout,
    pub base_url: String,
    pub collections: Vec<Collection>,
    /// Re-download archives that already exist locally
    pub force: bool,
    /// Verify downloads against the release checksum manifest
    pub verify: bool,
}

/// Execute the fetch command
pub async fn run(options: FetchOptions) -> Result<()> {
    let layout = &options.layout;

    println!(
        "{} Fetching dump release {} from {}",
        "→".cyan(),
        layout.version().bold(),
        options.base_url
    );

    layout.ensure_version_dir()?;
    let client = DumpClient::new(&options.base_url)?;

    // The manifest is fetched first so cached archives can be checked
    // without touching the network again
    let manifest = match client.download_manifest(layout.version()).await {
        Ok(text) => {
            std::fs::write(layout.manifest_path(), &text)?;
            Some(ChecksumManifest::parse(&text)?)
        },
        Err(err) if !options.verify => {
            warn!(error = %err, "Checksum manifest unavailable, continuing unverified");
            println!(
                "{} checksum manifest unavailable, continuing unverified",
                "!".yellow()
            );
            None
        },
        Err(err) => return Err(err),
    };

    let mut downloaded = 0usize;
    let mut cached = 0usize;

    for collection in &options.collections {
        let collection = *collection;
        let file_name = layout.archive_file_name(collection);
        let target = layout.archive_path(collection);

        // Resolve the manifest entry up front: an unlisted archive fails
        // before any bytes are transferred
        let digest = expected_digest(manifest.as_ref(), &file_name, options.verify)?;

        if target.exists() && !options.force {
            match digest {
                Some(digest) => match verify_file_checksum(&target, digest) {
                    Ok(_) => {
                        println!("{} {} (cached)", "✓".green(), file_name);
                        cached += 1;
                        continue;
                    },
                    Err(CommonError::ChecksumMismatch { .. }) => {
                        println!("{} {} is stale, re-downloading", "!".yellow(), file_name);
                    },
                    Err(err) => return Err(err.into()),
                },
                None => {
                    println!("{} {} (cached)", "✓".green(), file_name);
                    cached += 1;
                    continue;
                },
            }
        }

        let bytes = client
            .download_archive(layout.version(), &file_name, &target)
            .await?;

        if let Some(digest) = digest {
            match verify_file_checksum(&target, digest) {
                Ok(_) => {},
                Err(CommonError::ChecksumMismatch {
                    file,
                    expected,
                    actual,
                }) => {
                    return Err(CliError::ChecksumMismatch {
                        file,
                        expected,
                        actual,
                    });
                },
                Err(err) => return Err(err.into()),
            }
        }

        info!(collection = %collection, bytes, "Archive downloaded");
        println!("{} {} ({})", "✓".green(), file_name, format_bytes(bytes));
        downloaded += 1;
    }

    println!();
    println!(
        "{} Fetched {} archives ({} downloaded, {} cached)",
        "✓".green(),
        options.collections.len(),
        downloaded,
        cached
    );

    Ok(())
}

/// Digest the file must match, or `None` when verification is off
fn expected_digest<'a>(
    manifest: Option<&'a ChecksumManifest>,
    file_name: &str,
    verify: bool,
) -> Result<Option<&'a str>> {
    if !verify {
        return Ok(None);
    }
    match manifest {
        Some(manifest) => Ok(Some(manifest.require(file_name)?)),
        None => Ok(None),
    }
}
