mod client;
mod fetcher;
mod manager;
mod mirror;
mod queue;
mod task;

pub use client::HttpFetcher;
pub use fetcher::{ArtifactFetcher, ProgressFn};
pub use manager::{DownloadConfig, DownloadCounters, DownloadManager, DrainCallback, TaskCallback};
pub use mirror::MirrorFetcher;
pub use queue::{ClaimedTask, DownloadQueue};
pub use task::{
    percent, DownloadTask, FailureKind, TaskFailure, TaskOutcome, TaskReport, TaskState,
};
