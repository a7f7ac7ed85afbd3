//! HTTP client for dump release mirrors
//!
//! Dump releases are published under `<base-url>/<version>/<file>`. This
//! client downloads the checksum manifest as text and streams archives to
//! disk chunk by chunk, so multi-gigabyte files are never buffered in memory.

use crate::error::{CliError, Result};
use crate::progress;
use cdp_common::layout::MANIFEST_FILE_NAME;
use futures::StreamExt;
use reqwest::Client;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// HTTP client bound to one dump mirror
pub struct DumpClient {
    client: Client,
    base_url: String,
}

impl DumpClient {
    /// Create a new client for the given mirror base URL
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        // Connect timeout only; an overall timeout would kill archive
        // downloads that legitimately run for hours
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CliError::download(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, version: &str, file_name: &str) -> String {
        format!("{}/{}/{}", self.base_url, version, file_name)
    }

    /// Download the checksum manifest of a release as raw text
    pub async fn download_manifest(&self, version: &str) -> Result<String> {
        let url = self.url_for(version, MANIFEST_FILE_NAME);
        debug!(url = %url, "Downloading checksum manifest");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(CliError::download(format!(
                "'{url}' returned HTTP {}",
                response.status()
            )));
        }

        Ok(response.text().await?)
    }

    /// Stream one archive to `dest`, returning the number of bytes written
    pub async fn download_archive(
        &self,
        version: &str,
        file_name: &str,
        dest: &Path,
    ) -> Result<u64> {
        let url = self.url_for(version, file_name);
        debug!(url = %url, dest = %dest.display(), "Downloading archive");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(CliError::download(format!(
                "'{url}' returned HTTP {}",
                response.status()
            )));
        }

        let total_size = response.content_length().unwrap_or(0);
        let pb = progress::download_bar(total_size, format!("Downloading {file_name}"));

        let mut file = std::fs::File::create(dest)?;
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)?;
            downloaded += chunk.len() as u64;
            pb.set_position(downloaded);
        }
        file.flush()?;

        pb.finish_and_clear();
        Ok(downloaded)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_normalized() {
        let client = DumpClient::new("http://mirror.test/dumps/").unwrap();
        assert_eq!(
            client.url_for("20240101", "artists-20240101.xml.gz"),
            "http://mirror.test/dumps/20240101/artists-20240101.xml.gz"
        );
    }
}
