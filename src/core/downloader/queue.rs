use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use super::task::{DownloadTask, TaskFailure, TaskOutcome, TaskReport, TaskState};

struct Slot {
    task: DownloadTask,
    state: TaskState,
    progress: Arc<AtomicU8>,
    attempts: u32,
    cached: bool,
    failure: Option<TaskFailure>,
    seq: u64,
}

impl Slot {
    fn report(&self) -> TaskReport {
        TaskReport {
            task: self.task.clone(),
            state: self.state,
            progress: self.progress.load(Ordering::Relaxed),
            attempts: self.attempts,
            cached: self.cached,
            failure: self.failure.clone(),
        }
    }
}

/// Heap key: highest priority first, then lowest insertion sequence.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct ClaimKey {
    priority: i32,
    seq: Reverse<u64>,
    index: usize,
}

/// A task handed to exactly one worker.
#[derive(Debug)]
pub struct ClaimedTask {
    pub index: usize,
    pub task: DownloadTask,
    /// Shared with the queue so snapshots see live per-task progress.
    pub progress: Arc<AtomicU8>,
}

/// Ordered task collection. Not synchronized itself; the manager keeps it
/// behind a single mutex so claim-and-mark is one step.
#[derive(Default)]
pub struct DownloadQueue {
    slots: Vec<Slot>,
    pending: BinaryHeap<ClaimKey>,
    next_seq: u64,
}

impl DownloadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: DownloadTask) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let index = self.slots.len();

        self.pending.push(ClaimKey {
            priority: task.priority,
            seq: Reverse(seq),
            index,
        });
        self.slots.push(Slot {
            task,
            state: TaskState::Pending,
            progress: Arc::new(AtomicU8::new(0)),
            attempts: 0,
            cached: false,
            failure: None,
            seq,
        });
    }

    /// Take the best pending task and mark it in progress.
    pub fn claim(&mut self) -> Option<ClaimedTask> {
        while let Some(key) = self.pending.pop() {
            let slot = &mut self.slots[key.index];
            if slot.state != TaskState::Pending {
                continue;
            }
            slot.state = TaskState::InProgress;
            return Some(ClaimedTask {
                index: key.index,
                task: slot.task.clone(),
                progress: Arc::clone(&slot.progress),
            });
        }
        None
    }

    /// Record the worker's outcome for a claimed task.
    pub fn finish(&mut self, index: usize, outcome: TaskOutcome) -> TaskReport {
        let slot = &mut self.slots[index];
        match outcome {
            TaskOutcome::Completed { attempts, cached } => {
                slot.state = TaskState::Completed;
                slot.attempts = attempts;
                slot.cached = cached;
                slot.failure = None;
                slot.progress.store(100, Ordering::Relaxed);
            }
            TaskOutcome::Failed { attempts, failure } => {
                slot.state = TaskState::Failed;
                slot.attempts = attempts;
                slot.failure = Some(failure);
            }
        }
        slot.report()
    }

    /// Drop tasks finished in an earlier run and rebuild the claim heap.
    pub fn prune_finished(&mut self) {
        self.slots.retain(|slot| !slot.state.is_finished());
        self.pending = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.state == TaskState::Pending)
            .map(|(index, slot)| ClaimKey {
                priority: slot.task.priority,
                seq: Reverse(slot.seq),
                index,
            })
            .collect();
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.state == TaskState::Pending)
            .count()
    }

    pub fn snapshot(&self) -> Vec<TaskReport> {
        self.slots.iter().map(Slot::report).collect()
    }
}
