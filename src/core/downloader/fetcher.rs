use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::core::error::LauncherResult;

/// Progress hook: bytes written so far, and the total when the source
/// advertises one.
pub type ProgressFn<'a> = &'a (dyn Fn(u64, Option<u64>) + Send + Sync);

/// Performs one transfer of `url` into `dest`.
///
/// Implementations write exactly to `dest` (the caller picks the staging
/// path), create parent directories as needed, and fail when `timeout`
/// elapses. Retries and verification belong to the caller.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        timeout: Duration,
        on_progress: Option<ProgressFn<'_>>,
    ) -> LauncherResult<()>;
}
