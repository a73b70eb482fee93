//! Deadline-ordered holding area for sleeping processes.

use crate::process::Process;
use std::collections::VecDeque;
use std::time::Instant;

/// Processes waiting for their `wake_deadline`, kept sorted by ascending deadline.
///
/// Processes with equal deadlines keep their insertion order, so a burst admitted with the same
/// deadline wakes up first-in first-out.
#[derive(Debug, Clone, Default)]
pub struct WaitSet {
    entries: VecDeque<Process>,
}

impl WaitSet {
    /// Empty wait set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `process` behind every entry whose deadline is not later than its own.
    ///
    /// Deadlines already in the past are accepted; the next tick picks them up.
    pub fn admit(&mut self, process: Process) {
        let deadline = process.wake_deadline;
        let position = self
            .entries
            .partition_point(|queued| queued.wake_deadline <= deadline);
        self.entries.insert(position, process);
    }

    /// Pop the earliest sleeper if its deadline is at or before `now`.
    ///
    /// # Arguments
    /// * `now` - instant the deadlines are compared against
    ///
    /// # Returns
    /// The head process when it is due, `None` when the set is empty or the head is still
    /// sleeping. Entries behind a sleeping head are never inspected.
    pub fn pop_due(&mut self, now: Instant) -> Option<Process> {
        match self.entries.front() {
            Some(head) if head.wake_deadline <= now => self.entries.pop_front(),
            _ => None,
        }
    }

    /// Deadline of the earliest sleeper.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.front().map(|p| p.wake_deadline)
    }

    /// Sleepers in deadline order.
    pub fn iter(&self) -> impl Iterator<Item = &Process> {
        self.entries.iter()
    }

    /// Number of sleeping processes, due or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing is sleeping.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ProcessClass;
    use std::time::Duration;

    fn sleeper(base: Instant, offset_ms: u64) -> Process {
        Process::sleeping_until(
            ProcessClass::Background,
            Duration::from_millis(5),
            base + Duration::from_millis(offset_ms),
        )
    }

    #[test]
    fn keeps_deadlines_non_decreasing() {
        let base = Instant::now();
        let mut set = WaitSet::new();
        for offset in [30, 10, 50, 20, 40, 10] {
            set.admit(sleeper(base, offset));
        }
        let deadlines: Vec<Instant> = set.iter().map(|p| p.wake_deadline).collect();
        assert!(deadlines.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(set.next_deadline(), Some(base + Duration::from_millis(10)));
    }

    #[test]
    fn equal_deadlines_keep_insertion_order() {
        let base = Instant::now();
        let mut set = WaitSet::new();
        let first = sleeper(base, 10);
        let second = sleeper(base, 10);
        let (first_id, second_id) = (first.id, second.id);
        set.admit(second);
        set.admit(first);
        let ids: Vec<_> = set.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![second_id, first_id]);
    }

    #[test]
    fn pop_due_stops_at_first_future_deadline() {
        let base = Instant::now();
        let mut set = WaitSet::new();
        set.admit(sleeper(base, 0));
        set.admit(sleeper(base, 1_000));

        assert!(set.pop_due(base).is_some());
        assert!(set.pop_due(base).is_none());
        assert_eq!(set.len(), 1);
    }
}
