//! SHA-256 verification of downloaded server archives.
//!
//! MongoDB publishes a `<archive-url>.sha256` file next to every archive. Its
//! content is `"<hex digest>  <file name>"`, or occasionally just the digest.

use crate::core::LauncherError;
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

/// Computes and checks SHA-256 digests of downloaded files.
pub struct ChecksumVerifier;

impl ChecksumVerifier {
    /// Lowercase hex SHA-256 of a file, streamed in chunks.
    pub async fn compute_sha256(file_path: &Path) -> Result<String> {
        debug!("Computing SHA256 checksum for: {}", file_path.display());

        let mut file = tokio::fs::File::open(file_path)
            .await
            .with_context(|| format!("Failed to open file: {}", file_path.display()))?;

        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; 64 * 1024];
        loop {
            let read = file.read(&mut buffer).await?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }

        Ok(hex::encode(hasher.finalize()))
    }

    /// Check a file against an expected digest (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`LauncherError::ChecksumMismatch`] when the digests differ.
    pub async fn verify_checksum(file_path: &Path, expected: &str) -> Result<()> {
        let actual = Self::compute_sha256(file_path).await?;

        if !actual.eq_ignore_ascii_case(expected.trim()) {
            return Err(LauncherError::ChecksumMismatch {
                file: file_path.file_name().map_or_else(
                    || file_path.display().to_string(),
                    |n| n.to_string_lossy().into_owned(),
                ),
                expected: expected.trim().to_lowercase(),
                actual,
            }
            .into());
        }

        debug!("Checksum verification successful for {}", file_path.display());
        Ok(())
    }

    /// Extract the digest from the content of a `.sha256` file.
    #[must_use]
    pub fn parse_checksum_file(content: &str) -> Option<String> {
        let digest = content.split_whitespace().next()?;
        (digest.len() == 64 && digest.chars().all(|c| c.is_ascii_hexdigit()))
            .then(|| digest.to_lowercase())
    }

    /// Fetch the published digest for an archive.
    ///
    /// Returns `Ok(None)` when no checksum is published (non-2xx response or
    /// unparseable content).
    pub async fn fetch_expected_checksum(
        client: &reqwest::Client,
        archive_url: &str,
    ) -> Result<Option<String>> {
        let checksum_url = format!("{archive_url}.sha256");
        debug!("Fetching checksum from: {}", checksum_url);

        let response = client
            .get(&checksum_url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch checksum file: {checksum_url}"))?;

        if !response.status().is_success() {
            warn!("No checksum published at {} (HTTP {})", checksum_url, response.status());
            return Ok(None);
        }

        let content = response.text().await.context("Failed to read checksum file content")?;
        let parsed = Self::parse_checksum_file(&content);
        if parsed.is_none() {
            warn!("Unrecognised checksum file format at {}", checksum_url);
        }
        Ok(parsed)
    }

    /// Verify a downloaded archive against its published checksum.
    ///
    /// Returns whether verification actually took place.
    pub async fn verify_from_release(
        client: &reqwest::Client,
        file_path: &Path,
        archive_url: &str,
    ) -> Result<bool> {
        if let Some(expected) = Self::fetch_expected_checksum(client, archive_url).await? {
            Self::verify_checksum(file_path, &expected).await?;
            Ok(true)
        } else {
            warn!("No checksum available for {}, skipping verification", archive_url);
            Ok(false)
        }
    }
}
