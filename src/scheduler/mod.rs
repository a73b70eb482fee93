//! Scheduler structures: the tiered ready queue, the wait set and the tick that links them.

pub mod tiered_queue;
pub mod wait_set;

use crate::error::SchedError;
use crate::process::Process;
use log::debug;
use std::time::Instant;
use tiered_queue::TieredQueue;
use wait_set::WaitSet;

/// Both scheduler structures, mutated together.
///
/// `SchedulerState` is never shared directly: `SchedulerContext` keeps it behind one lock so a
/// tick can move a process out of the wait set and into the ready queue in one step.
#[derive(Debug, Clone, Default)]
pub struct SchedulerState {
    pub ready: TieredQueue,
    pub waiting: WaitSet,
}

impl SchedulerState {
    pub fn new(ready: TieredQueue) -> Self {
        Self {
            ready,
            waiting: WaitSet::new(),
        }
    }

    /// Move every process whose wake deadline is at or before `now` into the ready queue.
    ///
    /// Processes leave the wait set in deadline order and are admitted by class (foreground at
    /// the top tier, background at tier 0). The scan stops at the first future deadline.
    /// Returns how many processes were moved.
    pub fn tick(&mut self, now: Instant) -> usize {
        let mut moved = 0;
        while let Some(process) = self.waiting.pop_due(now) {
            let is_foreground = process.class.is_foreground();
            self.ready.admit(process, is_foreground);
            moved += 1;
        }
        if moved > 0 {
            debug!(
                "tick woke {} process(es), {} still sleeping",
                moved,
                self.waiting.len()
            );
        }
        moved
    }

    pub fn admit(&mut self, process: Process, is_foreground: bool) {
        self.ready.admit(process, is_foreground);
    }

    pub fn admit_to_wait_set(&mut self, process: Process) {
        self.waiting.admit(process);
    }

    pub fn remove(&mut self) -> Result<Process, SchedError> {
        self.ready.remove()
    }
}
