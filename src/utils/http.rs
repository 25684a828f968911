//! HTTP utilities for provisioning downloads.
//!
//! One client serves the pinned runtime archives and the companion tool:
//! explicit user agent, bounded connect/transfer timeouts, bounded
//! retry-with-backoff for transient failures, and traversal-safe zip
//! extraction.

use std::path::Path;
use std::time::Duration;

use crate::cli::output::OutputManager;
use crate::error::{FsResultExt, ProvisionError, Result};

/// User agent sent with every provisioning download.
const USER_AGENT: &str = concat!("topology_checker_release/", env!("CARGO_PKG_VERSION"));

/// Connection establishment budget per attempt.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Whole-transfer budget per attempt; the runtime archives run to a few
/// hundred MB.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Backoff never sleeps longer than this between attempts.
const MAX_BACKOFF_SECONDS: u64 = 60;

/// Environment variable overriding the retry count for fetches.
pub const FETCH_RETRIES_VAR: &str = "TOPOLOGY_RELEASE_FETCH_RETRIES";

/// Retry count for fetches: `TOPOLOGY_RELEASE_FETCH_RETRIES`, clamped to
/// [0, 10], defaulting to 3.
pub fn fetch_retries() -> u32 {
    parse_retries(std::env::var(FETCH_RETRIES_VAR).ok().as_deref())
}

fn parse_retries(value: Option<&str>) -> u32 {
    value
        .and_then(|s| s.parse::<u32>().ok())
        .map(|v| v.min(10))
        .unwrap_or(3)
}

/// Last path segment of a URL, for progress messages and log lines.
pub fn file_name_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| url.to_string())
}

/// HTTP client used for all provisioning downloads.
#[derive(Debug, Clone)]
pub struct FetchClient {
    client: reqwest::Client,
}

impl FetchClient {
    /// Client with certificate verification disabled.
    ///
    /// The pinned archive hosts serve through certificate chains that fail
    /// stock validation, and the downloads carry no other authentication;
    /// this constructor exists solely for them and nothing else in the crate
    /// performs network IO.
    pub fn insecure() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(DOWNLOAD_TIMEOUT)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(ProvisionError::Request)?;
        Ok(Self { client })
    }

    /// Downloads a URL into memory, enforcing a success status.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        log::info!("downloading {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ProvisionError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProvisionError::Status {
                url: url.to_string(),
                status,
            }
            .into());
        }

        let bytes = response.bytes().await.map_err(ProvisionError::Request)?;
        log::info!("downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }

    /// [`FetchClient::download`] with exponential backoff on transient
    /// failures (1s, 2s, 4s, ... capped).
    ///
    /// Only transport errors and server-side statuses are retried; a 4xx or
    /// a corrupt payload fails immediately.
    pub async fn download_with_retry(
        &self,
        url: &str,
        output: &OutputManager,
    ) -> Result<Vec<u8>> {
        let max_retries = fetch_retries();
        let mut attempts = 0u32;

        loop {
            match self.download(url).await {
                Ok(data) => {
                    if attempts > 0 {
                        output.success(&format!(
                            "download of {} succeeded after {} retry(ies)",
                            file_name_of(url),
                            attempts
                        ));
                    }
                    return Ok(data);
                }
                Err(e) if e.is_transient() && attempts < max_retries => {
                    attempts += 1;
                    let wait_seconds =
                        2u64.saturating_pow(attempts - 1).min(MAX_BACKOFF_SECONDS);
                    output.warn(&format!(
                        "download of {} failed (attempt {}/{}): {}",
                        file_name_of(url),
                        attempts,
                        max_retries + 1,
                        e
                    ));
                    output.indent(&format!("retrying in {}s", wait_seconds));
                    tokio::time::sleep(Duration::from_secs(wait_seconds)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Extracts a zip archive from memory into a destination directory.
///
/// Creates parent directories as needed and handles both file and directory
/// entries. Entries with `..` or absolute paths are rejected before any path
/// is formed, so a hostile archive cannot write outside `dest`.
pub async fn extract_zip(data: &[u8], dest: &Path) -> Result<()> {
    use async_zip::base::read::mem::ZipFileReader;
    use futures_lite::io::AsyncReadExt as _;

    let reader = ZipFileReader::new(data.to_vec())
        .await
        .map_err(|e| ProvisionError::BadArchive {
            reason: format!("cannot read zip: {}", e),
        })?;

    let entries = reader.file().entries().len();
    log::info!("extracting {} entries into {}", entries, dest.display());

    for i in 0..entries {
        let entry =
            reader
                .file()
                .entries()
                .get(i)
                .ok_or_else(|| ProvisionError::BadArchive {
                    reason: format!("entry {} missing from central directory", i),
                })?;

        let filename = entry
            .filename()
            .as_str()
            .map_err(|e| ProvisionError::BadArchive {
                reason: format!("entry {} has an invalid name: {}", i, e),
            })?;

        if filename.contains("..") || filename.starts_with('/') || filename.starts_with('\\') {
            return Err(ProvisionError::BadArchive {
                reason: format!("entry escapes the extraction root: {}", filename),
            }
            .into());
        }

        let is_dir = entry.dir().map_err(|e| ProvisionError::BadArchive {
            reason: format!("cannot classify entry {}: {}", filename, e),
        })?;
        if is_dir {
            let dir_path = dest.join(filename);
            tokio::fs::create_dir_all(&dir_path)
                .await
                .fs_context("creating directory", &dir_path)?;
            continue;
        }

        let file_path = dest.join(filename);
        if let Some(parent) = file_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .fs_context("creating directory", parent)?;
        }

        let mut entry_reader =
            reader
                .reader_with_entry(i)
                .await
                .map_err(|e| ProvisionError::BadArchive {
                    reason: format!("cannot open entry {}: {}", filename, e),
                })?;
        let mut content = Vec::new();
        entry_reader
            .read_to_end(&mut content)
            .await
            .map_err(|e| ProvisionError::BadArchive {
                reason: format!("cannot decompress {}: {}", filename, e),
            })?;

        tokio::fs::write(&file_path, content)
            .await
            .fs_context("writing file", &file_path)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn zip_with_entries(entries: &[(&str, Option<&[u8]>)]) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        let mut writer = zip::ZipWriter::new(&mut cursor);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        for (name, body) in entries {
            match body {
                Some(bytes) => {
                    writer.start_file(*name, options).expect("start file");
                    writer.write_all(bytes).expect("write body");
                }
                None => {
                    writer.add_directory(*name, options).expect("add dir");
                }
            }
        }
        writer.finish().expect("finish zip");
        cursor.into_inner()
    }

    #[tokio::test]
    async fn extract_zip_reproduces_nested_layout() {
        let data = zip_with_entries(&[
            ("bin/", None),
            ("bin/gdal.dll", Some(b"dll bytes")),
            ("bin/gdal/apps/ogrinfo.exe", Some(b"exe bytes")),
        ]);

        let dir = tempfile::tempdir().expect("tempdir");
        extract_zip(&data, dir.path()).await.expect("extract");

        assert_eq!(
            tokio::fs::read(dir.path().join("bin/gdal.dll"))
                .await
                .expect("read dll"),
            b"dll bytes"
        );
        assert_eq!(
            tokio::fs::read(dir.path().join("bin/gdal/apps/ogrinfo.exe"))
                .await
                .expect("read exe"),
            b"exe bytes"
        );
    }

    #[tokio::test]
    async fn extract_zip_rejects_traversal_entries() {
        let data = zip_with_entries(&[("../evil.txt", Some(b"outside"))]);

        let dir = tempfile::tempdir().expect("tempdir");
        let err = extract_zip(&data, dir.path())
            .await
            .expect_err("traversal must be rejected");
        assert!(err.to_string().contains("escapes"));
        assert!(!dir.path().join("../evil.txt").exists());
    }

    #[tokio::test]
    async fn extract_zip_rejects_garbage() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(extract_zip(b"not a zip at all", dir.path()).await.is_err());
    }

    #[test]
    fn retry_count_clamps_and_defaults() {
        assert_eq!(parse_retries(None), 3);
        assert_eq!(parse_retries(Some("not a number")), 3);
        assert_eq!(parse_retries(Some("0")), 0);
        assert_eq!(parse_retries(Some("7")), 7);
        assert_eq!(parse_retries(Some("500")), 10);
    }

    #[test]
    fn file_name_of_takes_the_last_segment() {
        assert_eq!(
            file_name_of("https://download.gisinternals.com/sdk/downloads/release.zip"),
            "release.zip"
        );
        assert_eq!(file_name_of("not a url"), "not a url");
    }
}
