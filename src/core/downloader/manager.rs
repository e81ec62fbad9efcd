// ─── Download Manager ───
// Priority queue + symmetric worker pool. Each worker claims one task under
// the queue lock, transfers it to a staging path, verifies it and commits it
// with an atomic rename. Outcomes are recorded as data, never as panics or
// errors crossing task boundaries.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::fetcher::ArtifactFetcher;
use super::queue::{ClaimedTask, DownloadQueue};
use super::task::{
    percent, DownloadTask, FailureKind, TaskFailure, TaskOutcome, TaskReport, TaskState,
};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::integrity;

pub type TaskCallback = Arc<dyn Fn(&TaskReport) + Send + Sync>;
pub type DrainCallback = Arc<dyn Fn() + Send + Sync>;

/// Tunables for one manager. Transfer retries and commit retries are
/// separate budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub max_workers: usize,
    /// Re-transfers after the first attempt.
    pub max_retries: u32,
    pub timeout_secs: u64,
    /// Rename attempts when promoting the staged file.
    pub commit_attempts: u32,
    pub commit_backoff_ms: u64,
    pub inter_task_pause_ms: u64,
    pub retry_backoff_ms: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            max_retries: 3,
            timeout_secs: 30,
            commit_attempts: 3,
            commit_backoff_ms: 100,
            inter_task_pause_ms: 50,
            retry_backoff_ms: 250,
        }
    }
}

impl DownloadConfig {
    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Aggregate counters for one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DownloadCounters {
    pub completed: usize,
    pub failed: usize,
    pub commit_failed: usize,
    pub total: usize,
    pub percent: u8,
}

#[derive(Default)]
struct Callbacks {
    on_task_complete: Option<TaskCallback>,
    on_task_failed: Option<TaskCallback>,
    on_all_complete: Option<DrainCallback>,
}

struct Shared {
    queue: Mutex<DownloadQueue>,
    fetcher: Arc<dyn ArtifactFetcher>,
    config: RwLock<DownloadConfig>,
    callbacks: RwLock<Callbacks>,
    /// Guards the running flag together with the idle signal.
    running: Mutex<bool>,
    stop_requested: AtomicBool,
    active_workers: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    commit_failed: AtomicUsize,
    transfer_attempts: AtomicUsize,
    idle: watch::Sender<bool>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns one task queue, its counters and its worker pool. Independent
/// managers share nothing.
pub struct DownloadManager {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl DownloadManager {
    pub fn new(fetcher: Arc<dyn ArtifactFetcher>, config: DownloadConfig) -> Self {
        let (idle, _) = watch::channel(true);
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(DownloadQueue::new()),
                fetcher,
                config: RwLock::new(config),
                callbacks: RwLock::new(Callbacks::default()),
                running: Mutex::new(false),
                stop_requested: AtomicBool::new(false),
                active_workers: AtomicUsize::new(0),
                completed: AtomicUsize::new(0),
                failed: AtomicUsize::new(0),
                commit_failed: AtomicUsize::new(0),
                transfer_attempts: AtomicUsize::new(0),
                idle,
            }),
            workers: Mutex::new(Vec::new()),
        }
    }

    // ── Queue ───────────────────────────────────────────

    pub fn enqueue(&self, task: DownloadTask) {
        lock(&self.shared.queue).push(task);
    }

    pub fn enqueue_all(&self, tasks: impl IntoIterator<Item = DownloadTask>) {
        let mut queue = lock(&self.shared.queue);
        for task in tasks {
            queue.push(task);
        }
    }

    /// Forget every task. Ignored while workers are running.
    pub fn clear(&self) {
        let running = lock(&self.shared.running);
        if *running {
            warn!("Refusing to clear the download queue while workers are running");
            return;
        }
        lock(&self.shared.queue).clear();
    }

    pub fn tasks(&self) -> Vec<TaskReport> {
        lock(&self.shared.queue).snapshot()
    }

    // ── Configuration ───────────────────────────────────

    pub fn config(&self) -> DownloadConfig {
        self.shared
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Takes effect on the next `start`.
    pub fn set_config(&self, config: DownloadConfig) {
        *self
            .shared
            .config
            .write()
            .unwrap_or_else(PoisonError::into_inner) = config;
    }

    pub fn set_task_complete_callback(&self, callback: impl Fn(&TaskReport) + Send + Sync + 'static) {
        self.callbacks_mut().on_task_complete = Some(Arc::new(callback));
    }

    pub fn set_task_failed_callback(&self, callback: impl Fn(&TaskReport) + Send + Sync + 'static) {
        self.callbacks_mut().on_task_failed = Some(Arc::new(callback));
    }

    pub fn set_all_complete_callback(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.callbacks_mut().on_all_complete = Some(Arc::new(callback));
    }

    fn callbacks_mut(&self) -> std::sync::RwLockWriteGuard<'_, Callbacks> {
        self.shared
            .callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ── Lifecycle ───────────────────────────────────────

    /// Spawn `max_workers` workers on the current Tokio runtime.
    ///
    /// No-op (with a warning) while a previous run is still active. Tasks
    /// finished by an earlier run are pruned and the counters restart at zero.
    pub fn start(&self, max_workers: usize) {
        let workers = max_workers.max(1);
        {
            let mut running = lock(&self.shared.running);
            if *running {
                warn!("Download manager already running, ignoring start");
                return;
            }
            *running = true;

            let mut queue = lock(&self.shared.queue);
            queue.prune_finished();

            self.shared.completed.store(0, Ordering::SeqCst);
            self.shared.failed.store(0, Ordering::SeqCst);
            self.shared.commit_failed.store(0, Ordering::SeqCst);
            self.shared.stop_requested.store(false, Ordering::SeqCst);
            self.shared.active_workers.store(workers, Ordering::SeqCst);
            self.shared.idle.send_replace(false);

            info!(tasks = queue.len(), workers, "Starting download workers");
        }

        let mut handles = lock(&self.workers);
        handles.retain(|handle| !handle.is_finished());
        for worker_id in 0..workers {
            let shared = Arc::clone(&self.shared);
            handles.push(tokio::spawn(run_worker(shared, worker_id)));
        }
    }

    /// Ask workers to exit after their current transfer and wait for them.
    /// Safe to call repeatedly.
    pub async fn stop(&self) {
        self.shared.stop_requested.store(true, Ordering::SeqCst);
        let handles: Vec<_> = lock(&self.workers).drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Download worker terminated abnormally");
            }
        }
    }

    /// Resolve once no worker remains active.
    pub async fn wait_for_completion(&self) {
        let mut idle = self.shared.idle.subscribe();
        // The sender lives in `shared`, which outlives this borrow.
        let _ = idle.wait_for(|idle| *idle).await;
    }

    pub fn is_running(&self) -> bool {
        *lock(&self.shared.running)
    }

    // ── Counters ────────────────────────────────────────

    pub fn completed_count(&self) -> usize {
        self.shared.completed.load(Ordering::SeqCst)
    }

    pub fn failed_count(&self) -> usize {
        self.shared.failed.load(Ordering::SeqCst)
    }

    /// Failures where the transfer succeeded but the rename did not.
    /// Also included in `failed_count`.
    pub fn commit_failed_count(&self) -> usize {
        self.shared.commit_failed.load(Ordering::SeqCst)
    }

    pub fn total_count(&self) -> usize {
        lock(&self.shared.queue).len()
    }

    /// Transfers started since the manager was created, retries included.
    pub fn transfer_attempts(&self) -> usize {
        self.shared.transfer_attempts.load(Ordering::SeqCst)
    }

    /// `completed * 100 / total`, or 0 for an empty queue.
    pub fn progress(&self) -> u8 {
        aggregate_percent(self.completed_count(), self.total_count())
    }

    pub fn counters(&self) -> DownloadCounters {
        let total = self.total_count();
        let completed = self.completed_count();
        DownloadCounters {
            completed,
            failed: self.failed_count(),
            commit_failed: self.commit_failed_count(),
            total,
            percent: aggregate_percent(completed, total),
        }
    }

    // ── Single file ─────────────────────────────────────

    /// Run one task through the same transfer/verify/commit path, outside
    /// the queue.
    pub async fn download_file(
        &self,
        url: &str,
        dest: &Path,
        digest: Option<&str>,
    ) -> LauncherResult<()> {
        let task = DownloadTask::new(url, dest).with_digest(digest.map(str::to_string));
        let config = self.config();
        let progress = AtomicU8::new(0);

        match process_task(&self.shared, &config, &task, &progress).await {
            TaskOutcome::Completed { .. } => Ok(()),
            TaskOutcome::Failed { failure, .. } => Err(LauncherError::Acquire {
                failed: vec![format!("{}: {}", task.name, failure.message)],
            }),
        }
    }
}

impl Drop for DownloadManager {
    fn drop(&mut self) {
        self.shared.stop_requested.store(true, Ordering::SeqCst);
    }
}

fn aggregate_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    (completed.saturating_mul(100) / total).min(100) as u8
}

// ── Worker ──────────────────────────────────────────────

async fn run_worker(shared: Arc<Shared>, worker_id: usize) {
    let config = shared
        .config
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    let pause = Duration::from_millis(config.inter_task_pause_ms);
    debug!(worker_id, "Download worker started");

    loop {
        if shared.stop_requested.load(Ordering::SeqCst) {
            debug!(worker_id, "Stop requested, worker exiting");
            break;
        }

        let claimed = lock(&shared.queue).claim();
        let Some(ClaimedTask {
            index,
            task,
            progress,
        }) = claimed
        else {
            break;
        };

        let outcome = process_task(&shared, &config, &task, &progress).await;
        let report = lock(&shared.queue).finish(index, outcome);
        record(&shared, &report);

        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    finish_worker(&shared, worker_id);
}

fn record(shared: &Shared, report: &TaskReport) {
    let callbacks = shared
        .callbacks
        .read()
        .unwrap_or_else(PoisonError::into_inner);

    match report.state {
        TaskState::Completed => {
            shared.completed.fetch_add(1, Ordering::SeqCst);
            if let Some(callback) = &callbacks.on_task_complete {
                callback(report);
            }
        }
        TaskState::Failed => {
            shared.failed.fetch_add(1, Ordering::SeqCst);
            if report
                .failure
                .as_ref()
                .is_some_and(|f| f.kind == FailureKind::Commit)
            {
                shared.commit_failed.fetch_add(1, Ordering::SeqCst);
            }
            if let Some(callback) = &callbacks.on_task_failed {
                callback(report);
            }
        }
        TaskState::Pending | TaskState::InProgress => {}
    }
}

fn finish_worker(shared: &Shared, worker_id: usize) {
    if shared.active_workers.fetch_sub(1, Ordering::SeqCst) != 1 {
        debug!(worker_id, "Download worker exited");
        return;
    }

    info!(
        completed = shared.completed.load(Ordering::SeqCst),
        failed = shared.failed.load(Ordering::SeqCst),
        "All download workers drained"
    );

    let on_all_complete = shared
        .callbacks
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .on_all_complete
        .clone();
    if let Some(callback) = on_all_complete {
        callback();
    }

    let mut running = lock(&shared.running);
    *running = false;
    shared.idle.send_replace(true);
}

async fn process_task(
    shared: &Shared,
    config: &DownloadConfig,
    task: &DownloadTask,
    progress: &AtomicU8,
) -> TaskOutcome {
    let digest = task.digest.as_deref();

    if digest.is_some() && task.destination.exists() {
        if let Ok(true) = integrity::verify(&task.destination, digest).await {
            debug!(name = %task.name, "Destination already verified, skipping transfer");
            progress.store(100, Ordering::Relaxed);
            return TaskOutcome::Completed {
                attempts: 0,
                cached: true,
            };
        }
    }

    let staging = task.staging_path();
    let total_attempts = config.max_retries.saturating_add(1);
    let mut last_failure = TaskFailure::new(FailureKind::Transfer, "no transfer attempted");

    for attempt in 1..=total_attempts {
        shared.transfer_attempts.fetch_add(1, Ordering::SeqCst);
        progress.store(0, Ordering::Relaxed);
        let on_progress = |done: u64, total: Option<u64>| {
            progress.store(percent(done, total.or(task.size)), Ordering::Relaxed);
        };

        let fetched = shared
            .fetcher
            .fetch(&task.url, &staging, config.timeout(), Some(&on_progress))
            .await;

        let failure = match fetched {
            Ok(()) => match integrity::check(&staging, digest).await {
                Ok(()) => return commit(config, task, &staging, attempt).await,
                Err(e) => TaskFailure::new(FailureKind::Integrity, e.to_string()),
            },
            Err(e) => TaskFailure::new(FailureKind::Transfer, e.to_string()),
        };

        warn!(
            name = %task.name,
            url = %task.url,
            attempt,
            kind = ?failure.kind,
            error = %failure.message,
            "Download attempt failed"
        );
        let _ = tokio::fs::remove_file(&staging).await;
        last_failure = failure;

        if attempt < total_attempts && config.retry_backoff_ms > 0 {
            tokio::time::sleep(Duration::from_millis(
                config.retry_backoff_ms * u64::from(attempt),
            ))
            .await;
        }
    }

    TaskOutcome::Failed {
        attempts: total_attempts,
        failure: last_failure,
    }
}

/// Promote the staged file. Exhausting the attempts keeps the staged bytes.
async fn commit(
    config: &DownloadConfig,
    task: &DownloadTask,
    staging: &Path,
    transfer_attempts: u32,
) -> TaskOutcome {
    let attempts = config.commit_attempts.max(1);

    for attempt in 1..=attempts {
        match tokio::fs::rename(staging, &task.destination).await {
            Ok(()) => {
                debug!(name = %task.name, path = %task.destination.display(), "Committed");
                return TaskOutcome::Completed {
                    attempts: transfer_attempts,
                    cached: false,
                };
            }
            Err(e) => {
                warn!(name = %task.name, attempt, error = %e, "Rename into place failed");
                if attempt < attempts {
                    tokio::time::sleep(Duration::from_millis(
                        config.commit_backoff_ms * u64::from(attempt),
                    ))
                    .await;
                }
            }
        }
    }

    let err = LauncherError::CommitFailed {
        staged: staging.to_path_buf(),
        dest: task.destination.clone(),
        attempts,
    };
    error!(name = %task.name, error = %err, "Giving up on commit");
    TaskOutcome::Failed {
        attempts: transfer_attempts,
        failure: TaskFailure::new(FailureKind::Commit, err.to_string()),
    }
}
