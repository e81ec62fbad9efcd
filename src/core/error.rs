use std::path::PathBuf;
use thiserror::Error;

use crate::core::install::InstallStage;

/// Central error type for the installer backend.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Too many redirects while fetching {url}")]
    TooManyRedirects { url: String },

    #[error("Transfer of {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    // ── Integrity ───────────────────────────────────────
    #[error("Digest mismatch for {path:?}: expected {expected}, got {actual}")]
    DigestMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Could not move {staged:?} to {dest:?} after {attempts} attempts")]
    CommitFailed {
        staged: PathBuf,
        dest: PathBuf,
        attempts: u32,
    },

    // ── Maven ───────────────────────────────────────────
    #[error("Invalid Maven coordinate: {0}")]
    InvalidMavenCoordinate(String),

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Instance ────────────────────────────────────────
    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    #[error("Invalid instance id: {0:?}")]
    InvalidInstanceId(String),

    #[error("Another install is already running for {0:?}")]
    InstallInProgress(PathBuf),

    // ── Install stages ──────────────────────────────────
    #[error("Resolution failed: {0}")]
    Resolution(String),

    #[error("Failed to acquire {} artifact(s): {}", failed.len(), failed.join(", "))]
    Acquire { failed: Vec<String> },

    #[error("Apply failed: {0}")]
    Apply(String),

    #[error("Commit failed: {0}")]
    Commit(String),

    // ── Loader ──────────────────────────────────────────
    #[error("Loader error: {0}")]
    Loader(String),

    #[error("Loader API unreachable: {0}")]
    LoaderApi(String),

    #[error("Process execution failed: {0}")]
    Process(String),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl LauncherError {
    /// Install stage this error terminates, if it is a stage-level failure.
    pub fn stage(&self) -> Option<InstallStage> {
        match self {
            LauncherError::Resolution(_) => Some(InstallStage::Resolve),
            LauncherError::Acquire { .. } => Some(InstallStage::Acquire),
            LauncherError::Apply(_) | LauncherError::Process(_) | LauncherError::Zip(_) => {
                Some(InstallStage::Apply)
            }
            LauncherError::Commit(_) => Some(InstallStage::Commit),
            _ => None,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| LauncherError::Io { path, source }
    }
}

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

// ── Serialization for a UI layer ────────────────────────
// Front-ends only need the message, not the structure.
impl serde::Serialize for LauncherError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_errors_map_to_their_stage() {
        assert_eq!(
            LauncherError::Resolution("unknown".into()).stage(),
            Some(InstallStage::Resolve)
        );
        assert_eq!(
            LauncherError::Acquire {
                failed: vec!["client.jar".into()]
            }
            .stage(),
            Some(InstallStage::Acquire)
        );
        assert_eq!(
            LauncherError::Process("exit 1".into()).stage(),
            Some(InstallStage::Apply)
        );
        assert_eq!(
            LauncherError::Commit("corrupt".into()).stage(),
            Some(InstallStage::Commit)
        );
        assert_eq!(LauncherError::Other("x".into()).stage(), None);
    }

    #[test]
    fn acquire_message_lists_failed_artifacts() {
        let err = LauncherError::Acquire {
            failed: vec!["a.jar".into(), "b.jar".into()],
        };
        assert_eq!(err.to_string(), "Failed to acquire 2 artifact(s): a.jar, b.jar");
    }

    #[test]
    fn serializes_as_display_string() {
        let err = LauncherError::InstanceNotFound("pack".into());
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"Instance not found: pack\"");
    }
}
