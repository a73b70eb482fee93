//! Shared scheduler context.
//!
//! Every mutation of the wait set or the ready queue, and every snapshot, goes through the single
//! lock held here. Producer, ticker, aging, consumer and reporter threads share one
//! `Arc<SchedulerContext>` instead of reaching for global queues.

use crate::error::SchedError;
use crate::process::{Pid, Process};
use crate::scheduler::tiered_queue::TieredQueue;
use crate::scheduler::SchedulerState;
use crate::snapshot::Snapshot;
use parking_lot::Mutex;
use std::time::Instant;

#[derive(Debug, Default)]
pub struct SchedulerContext {
    state: Mutex<SchedulerState>,
}

impl SchedulerContext {
    /// Wrap `ready` and an empty wait set behind one lock.
    ///
    /// # Arguments
    /// * `ready` - ready queue, usually built with [`TieredQueue::with_config`]
    pub fn new(ready: TieredQueue) -> Self {
        Self {
            state: Mutex::new(SchedulerState::new(ready)),
        }
    }

    /// Admit runnable work into the ready queue (top tier when `is_foreground`).
    pub fn admit(&self, process: Process, is_foreground: bool) {
        self.state.lock().admit(process, is_foreground);
    }

    /// Park delayed work in the wait set until its wake deadline.
    pub fn admit_to_wait_set(&self, process: Process) {
        self.state.lock().admit_to_wait_set(process);
    }

    /// Take the next process from the ready queue.
    ///
    /// # Errors
    /// `SchedError::EmptyQueue` when no tier holds a process.
    pub fn remove(&self) -> Result<Process, SchedError> {
        self.state.lock().remove()
    }

    /// Run one rebalance pass over the ready queue.
    ///
    /// Admit and remove already rebalance on their own; this is for callers that promoted work
    /// and want the overflow settled before the next admit or remove.
    pub fn rebalance(&self) {
        self.state.lock().ready.rebalance();
    }

    /// Run one aging step. Returns the promoted pid, if any.
    pub fn promote(&self) -> Option<Pid> {
        self.state.lock().ready.promote()
    }

    /// Move every process due at `now` from the wait set into the ready queue atomically.
    ///
    /// # Returns
    /// Number of processes moved.
    pub fn tick(&self, now: Instant) -> usize {
        self.state.lock().tick(now)
    }

    /// Owned copy of both structures, taken under the lock.
    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.lock();
        Snapshot::capture(&state, Instant::now())
    }

    /// Run a read-only closure against the locked state.
    pub fn inspect<R>(&self, f: impl FnOnce(&SchedulerState) -> R) -> R {
        f(&self.state.lock())
    }
}
