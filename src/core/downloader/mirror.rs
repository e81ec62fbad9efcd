use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::fetcher::{ArtifactFetcher, ProgressFn};
use crate::core::error::{LauncherError, LauncherResult};

/// Serves artifacts from a local mirror directory instead of the network.
///
/// `https://host/a/b.jar` maps to `<root>/host/a/b.jar`; `file://` URLs are
/// read directly.
pub struct MirrorFetcher {
    root: PathBuf,
}

impl MirrorFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn source_path(&self, url: &str) -> LauncherResult<PathBuf> {
        if let Some(path) = url.strip_prefix("file://") {
            return Ok(PathBuf::from(path));
        }

        let rest = url
            .split_once("://")
            .map(|(_, rest)| rest)
            .ok_or_else(|| LauncherError::Other(format!("Unsupported URL: {}", url)))?;
        let rest = rest.split(['?', '#']).next().unwrap_or(rest);

        let mut path = self.root.clone();
        for segment in rest.split('/').filter(|s| !s.is_empty()) {
            if segment == ".." {
                return Err(LauncherError::Other(format!(
                    "Refusing to escape mirror root: {}",
                    url
                )));
            }
            path.push(segment);
        }
        Ok(path)
    }
}

#[async_trait]
impl ArtifactFetcher for MirrorFetcher {
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        timeout: Duration,
        on_progress: Option<ProgressFn<'_>>,
    ) -> LauncherResult<()> {
        let source = self.source_path(url)?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(LauncherError::io(parent))?;
        }

        let copied = match tokio::time::timeout(timeout, tokio::fs::copy(&source, dest)).await {
            Ok(result) => result.map_err(LauncherError::io(&source))?,
            Err(_) => {
                return Err(LauncherError::Timeout {
                    url: url.to_string(),
                    seconds: timeout.as_secs(),
                })
            }
        };

        if let Some(report) = on_progress {
            report(copied, Some(copied));
        }

        debug!(url = %url, source = %source.display(), "Served from mirror");
        Ok(())
    }
}
