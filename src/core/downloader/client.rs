use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::fetcher::{ArtifactFetcher, ProgressFn};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::build_http_client_with_redirects;

/// Streams HTTP(S) bodies to disk with the shared launcher client.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(max_redirects: usize) -> LauncherResult<Self> {
        Ok(Self {
            client: build_http_client_with_redirects(max_redirects)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn transfer(
        &self,
        url: &str,
        dest: &Path,
        on_progress: Option<ProgressFn<'_>>,
    ) -> LauncherResult<()> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_redirect() {
                LauncherError::TooManyRedirects {
                    url: url.to_string(),
                }
            } else {
                LauncherError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total_bytes = response.content_length();
        let mut written: u64 = 0;

        // Scoped so the handle is closed before the caller renames the file.
        {
            let mut file = tokio::fs::File::create(dest)
                .await
                .map_err(LauncherError::io(dest))?;
            let mut body = response.bytes_stream();

            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                file.write_all(&chunk)
                    .await
                    .map_err(LauncherError::io(dest))?;
                written += chunk.len() as u64;
                if let Some(report) = on_progress {
                    report(written, total_bytes);
                }
            }

            file.flush().await.map_err(LauncherError::io(dest))?;
        }

        debug!(url = %url, path = %dest.display(), bytes = written, "Transfer finished");
        Ok(())
    }
}

#[async_trait]
impl ArtifactFetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        timeout: Duration,
        on_progress: Option<ProgressFn<'_>>,
    ) -> LauncherResult<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(LauncherError::io(parent))?;
        }

        match tokio::time::timeout(timeout, self.transfer(url, dest, on_progress)).await {
            Ok(result) => result,
            Err(_) => Err(LauncherError::Timeout {
                url: url.to_string(),
                seconds: timeout.as_secs(),
            }),
        }
    }
}
