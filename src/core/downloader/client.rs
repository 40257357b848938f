use std::path::Path;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use crate::core::error::{InstallerError, InstallerResult};
use crate::core::progress::{Phase, Reporter};

/// Bytes written (and reported) per step.
pub const DOWNLOAD_CHUNK_SIZE: usize = 32 * 1024;

/// Where download percentages are reported.
#[derive(Debug, Clone, Copy)]
pub struct ProgressScope<'a> {
    pub artifact: &'a str,
    pub label: &'a str,
}

/// Streams one URL to one file without buffering the payload.
#[derive(Clone)]
pub struct Downloader {
    client: Client,
    reporter: Reporter,
}

impl Downloader {
    pub fn new(client: Client, reporter: Reporter) -> Self {
        Self { client, reporter }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    /// Download `url` to `dest`, returning the number of bytes written.
    ///
    /// Creates parent directories as needed and truncates any existing file.
    /// When `scope` is set, 0 is reported once the response is accepted. If the
    /// server declares a length a percentage follows every chunk, otherwise a
    /// single 100 marks the end. On failure the partial file is left behind.
    #[instrument(skip(self, scope))]
    pub async fn download_file(
        &self,
        url: &str,
        dest: &Path,
        scope: Option<ProgressScope<'_>>,
    ) -> InstallerResult<u64> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| InstallerError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(InstallerError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total_bytes = response.content_length().filter(|len| *len > 0);
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| InstallerError::Io {
                path: dest.to_path_buf(),
                source: e,
            })?;

        if let Some(scope) = scope {
            self.reporter
                .progress(scope.artifact, scope.label, 0.0, Phase::Downloading);
        }

        let mut stream = response.bytes_stream();
        let mut downloaded = 0_u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for piece in chunk.chunks(DOWNLOAD_CHUNK_SIZE) {
                file.write_all(piece).await.map_err(|e| InstallerError::Io {
                    path: dest.to_path_buf(),
                    source: e,
                })?;
                downloaded += piece.len() as u64;

                if let (Some(scope), Some(total)) = (scope, total_bytes) {
                    let percent = (downloaded.saturating_mul(100) / total).min(100);
                    self.reporter
                        .progress(scope.artifact, scope.label, percent as f64, Phase::Downloading);
                }
            }
        }

        file.flush().await.map_err(|e| InstallerError::Io {
            path: dest.to_path_buf(),
            source: e,
        })?;

        // Without a length only the phase boundaries are reported.
        if let (Some(scope), None) = (scope, total_bytes) {
            self.reporter
                .progress(scope.artifact, scope.label, 100.0, Phase::Downloading);
        }

        debug!("Downloaded: {} -> {:?} ({} bytes)", url, dest, downloaded);
        Ok(downloaded)
    }
}
