//! Process record shared by the wait set, the tiered ready queue and their consumers.

use crate::class::ProcessClass;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

static PID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Process identifier. Allocated from a process-wide counter and never reused.
pub type Pid = u64;

/// Passive description of one simulated unit of work.
///
/// A [`Process`] lives in exactly one of the wait set or the ready queue at a time, or is owned by
/// whichever consumer removed it. The queues never touch `remaining_time`; only consumers do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process {
    pub id: Pid,
    pub class: ProcessClass,
    /// Earliest instant at which the process may leave the wait set.
    pub wake_deadline: Instant,
    /// Simulated execution time still owed to the process.
    pub remaining_time: Duration,
    /// Set by the aging pass; informational only.
    pub promoted: bool,
}

impl Process {
    /// Create a runnable process with a fresh id. Its wake deadline is "now".
    pub fn new(class: ProcessClass, remaining_time: Duration) -> Process {
        Process::sleeping_until(class, remaining_time, Instant::now())
    }

    /// Create a process that should sleep in the wait set until `wake_deadline`.
    pub fn sleeping_until(
        class: ProcessClass,
        remaining_time: Duration,
        wake_deadline: Instant,
    ) -> Process {
        Process {
            id: PID_COUNTER.fetch_add(1, Ordering::Relaxed),
            class,
            wake_deadline,
            remaining_time,
            promoted: false,
        }
    }

    /// Charge `quantum` of execution to the process.
    ///
    /// Returns `true` once no execution time remains.
    pub fn run_for(&mut self, quantum: Duration) -> bool {
        self.remaining_time = self.remaining_time.saturating_sub(quantum);
        self.remaining_time.is_zero()
    }
}
