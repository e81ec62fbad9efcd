use std::ffi::OsString;
use std::path::PathBuf;

use serde::Serialize;

/// One artifact transfer: where it comes from, where it lands, and how to
/// check it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadTask {
    pub url: String,
    pub destination: PathBuf,
    /// Logical name used in logs and failure reports.
    pub name: String,
    /// Expected hex digest (MD5, SHA-1 or SHA-256, inferred from length).
    pub digest: Option<String>,
    pub size: Option<u64>,
    /// Higher runs first; ties keep insertion order.
    pub priority: i32,
}

impl DownloadTask {
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        let destination = destination.into();
        let name = destination
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            url: url.into(),
            destination,
            name,
            digest: None,
            size: None,
            priority: 0,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_digest(mut self, digest: Option<String>) -> Self {
        self.digest = digest.filter(|d| !d.trim().is_empty());
        self
    }

    pub fn with_size(mut self, size: Option<u64>) -> Self {
        self.size = size;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Where the transfer writes before the atomic commit: `<dest>.tmp`.
    pub fn staging_path(&self) -> PathBuf {
        let mut name = self
            .destination
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| OsString::from("download"));
        name.push(".tmp");
        self.destination.with_file_name(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TaskState {
    pub fn is_finished(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}

/// Why a task ended up `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network error, timeout, HTTP status or redirect loop.
    Transfer,
    /// Bytes arrived but the digest did not match.
    Integrity,
    /// Transfer succeeded but the staged file could not be moved into place.
    /// The staged file is kept for inspection.
    Commit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl TaskFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Result of processing one claimed task, recorded back into the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed { attempts: u32, cached: bool },
    Failed { attempts: u32, failure: TaskFailure },
}

/// Read-only view of a queued task, handed to callbacks and UIs.
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub task: DownloadTask,
    pub state: TaskState,
    /// 0–100.
    pub progress: u8,
    /// Transfer attempts made (0 for a cache hit).
    pub attempts: u32,
    pub cached: bool,
    pub failure: Option<TaskFailure>,
}

/// Percentage of `done` over `total`, clamped to 100. Unknown or zero
/// totals report 0.
pub fn percent(done: u64, total: Option<u64>) -> u8 {
    match total {
        Some(total) if total > 0 => (done.saturating_mul(100) / total).min(100) as u8,
        _ => 0,
    }
}
