//! Read-only snapshots of the scheduler structures.
//!
//! A [`Snapshot`] is an owned copy taken under the scheduler lock, so the reporter never sees a
//! half-finished rebalance or a process in transit between the wait set and the ready queue. It
//! serialises to JSON for machine consumers and renders as the classic `DQ` / `WQ` text report.

use crate::class::{ClassTable, ProcessClass};
use crate::process::Pid;
use crate::scheduler::SchedulerState;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
fn whole_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// One queued process as seen by the reporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadyEntry {
    pub pid: Pid,
    pub class: ProcessClass,
    pub promoted: bool,
}

/// One sleeping process as seen by the reporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaitingEntry {
    pub pid: Pid,
    pub class: ProcessClass,
    pub remaining_ms: u64,
    /// Milliseconds until the process becomes due (0 when already due).
    pub wakes_in_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Ready tiers, lowest priority first.
    pub tiers: Vec<Vec<ReadyEntry>>,
    /// Wait set in deadline order.
    pub waiting: Vec<WaitingEntry>,
    pub threshold: usize,
    pub promote_cursor: usize,
    /// Ready processes per class.
    pub ready_by_class: ClassTable<usize>,
}

impl Snapshot {
    /// Copy the observable state of `state`. Deadlines are expressed relative to `now`.
    pub fn capture(state: &SchedulerState, now: Instant) -> Self {
        let mut ready_by_class = ClassTable::from_fn(|_| 0usize);
        let tiers: Vec<Vec<ReadyEntry>> = state
            .ready
            .tiers()
            .iter()
            .map(|tier| {
                tier.iter()
                    .map(|p| {
                        ready_by_class[p.class] += 1;
                        ReadyEntry {
                            pid: p.id,
                            class: p.class,
                            promoted: p.promoted,
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        let waiting: Vec<WaitingEntry> = state
            .waiting
            .iter()
            .map(|p| WaitingEntry {
                pid: p.id,
                class: p.class,
                remaining_ms: whole_millis(p.remaining_time),
                wakes_in_ms: whole_millis(p.wake_deadline.saturating_duration_since(now)),
            })
            .collect();

        Snapshot {
            tiers,
            waiting,
            threshold: state.ready.threshold(),
            promote_cursor: state.ready.promote_cursor(),
            ready_by_class,
        }
    }

    pub fn ready_len(&self) -> usize {
        self.tiers.iter().map(Vec::len).sum()
    }

    /// Every process id held by either structure.
    pub fn pids(&self) -> Vec<Pid> {
        self.tiers
            .iter()
            .flatten()
            .map(|e| e.pid)
            .chain(self.waiting.iter().map(|e| e.pid))
            .collect()
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "---------------------------")?;
        let top = self.tiers.len().saturating_sub(1);
        for (index, tier) in self.tiers.iter().enumerate() {
            write!(f, "DQ[{index}]:")?;
            if tier.is_empty() {
                write!(f, " []")?;
            }
            for entry in tier {
                write!(f, " [{}{}", entry.pid, entry.class.tag())?;
                if entry.promoted {
                    write!(f, "*")?;
                }
                write!(f, "]")?;
            }
            match index {
                0 if top == 0 => writeln!(f, " (bottom/top)")?,
                0 => writeln!(f, " (bottom)")?,
                i if i == top => writeln!(f, " (top)")?,
                _ => writeln!(f)?,
            }
        }
        writeln!(f, "---------------------------")?;
        write!(f, "WQ:")?;
        if self.waiting.is_empty() {
            write!(f, " []")?;
        }
        for entry in &self.waiting {
            write!(
                f,
                " [{}{}:{}]",
                entry.pid,
                entry.class.tag(),
                entry.remaining_ms
            )?;
        }
        writeln!(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::Process;

    #[test]
    fn capture_copies_tiers_and_wait_set_in_order() {
        let now = Instant::now();
        let mut state = SchedulerState::default();
        let fg = Process::new(ProcessClass::Foreground, Duration::from_millis(40));
        let sleeper = Process::sleeping_until(
            ProcessClass::Background,
            Duration::from_millis(1500),
            now + Duration::from_secs(2),
        );
        let (fg_id, sleeper_id) = (fg.id, sleeper.id);
        state.admit(fg, true);
        state.admit_to_wait_set(sleeper);

        let snapshot = Snapshot::capture(&state, now);
        assert_eq!(snapshot.tiers.len(), 2);
        assert!(snapshot.tiers[0].is_empty());
        assert_eq!(snapshot.tiers[1][0].pid, fg_id);
        assert_eq!(snapshot.ready_by_class[ProcessClass::Foreground], 1);
        assert_eq!(snapshot.ready_by_class[ProcessClass::Background], 0);
        assert_eq!(snapshot.waiting[0].pid, sleeper_id);
        assert_eq!(snapshot.waiting[0].remaining_ms, 1500);
        assert_eq!(snapshot.waiting[0].wakes_in_ms, 2000);
        assert_eq!(snapshot.pids(), vec![fg_id, sleeper_id]);
    }

    #[test]
    fn huge_remaining_time_saturates_instead_of_wrapping() {
        let now = Instant::now();
        let mut state = SchedulerState::default();
        state.admit_to_wait_set(Process::sleeping_until(
            ProcessClass::Background,
            Duration::MAX,
            now,
        ));

        let snapshot = Snapshot::capture(&state, now);
        assert_eq!(snapshot.waiting[0].remaining_ms, u64::MAX);
        assert_eq!(snapshot.waiting[0].wakes_in_ms, 0);
        assert_eq!(whole_millis(Duration::from_micros(2_999)), 2);
    }

    #[test]
    fn renders_dq_and_wq_lines() {
        let now = Instant::now();
        let mut state = SchedulerState::default();
        let first = Process::new(ProcessClass::Background, Duration::from_millis(10));
        let second = Process::new(ProcessClass::Background, Duration::from_millis(10));
        let (first_id, second_id) = (first.id, second.id);
        state.admit(first, false);
        state.admit(second, false);
        state.ready.promote();

        let text = Snapshot::capture(&state, now).to_string();
        assert!(text.contains(&format!("DQ[0]: [{second_id}B] (bottom)")));
        assert!(text.contains(&format!("DQ[1]: [{first_id}B*] (top)")));
        assert!(text.contains("WQ: []"));
    }

    #[test]
    fn serialises_to_json() {
        let snapshot = Snapshot::capture(&SchedulerState::default(), Instant::now());
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"tiers\":[[],[]]"));
        assert!(json.contains("\"threshold\":5"));
    }
}
