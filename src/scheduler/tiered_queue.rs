//! Dynamic Tiered Ready Queue
//!
//! The ready structure is a stack of FIFO tiers. Tier 0 is the background (lowest priority) tier
//! and every index above it is progressively higher priority. Work moves between tiers in two
//! independent ways:
//!
//! 1. **Rebalance (split)**: after every admission and removal, any tier holding more than
//!    `threshold` processes gives the back half of its entries to the tier above, growing a new
//!    top tier when needed.
//! 2. **Promote (aging)**: a caller-driven cursor walks the tiers round-robin and moves the head
//!    of the tier it points at one tier up, so long-resident work drifts upward even when no tier
//!    is overloaded.
//!
//! Removal scans from tier 0 upward and returns the head of the first non-empty tier. Priority is
//! therefore expressed through *where* a process lands, not through removal order.

use crate::error::SchedError;
use crate::process::{Pid, Process};
use log::{debug, trace};
use std::collections::VecDeque;

/// One priority level of the ready structure.
pub type Tier = VecDeque<Process>;

/// Self-rebalancing multi-level ready queue.
#[derive(Debug, Clone)]
pub struct TieredQueue {
    /// Index 0 is the lowest-priority tier. Never empty.
    tiers: Vec<Tier>,
    /// A tier longer than this is split during rebalance. Always >= 1.
    threshold: usize,
    /// Aging cursor. Survives between calls and is reduced modulo the tier count on each use.
    promote_cursor: usize,
}

impl TieredQueue {
    pub const DEFAULT_THRESHOLD: usize = 5;
    /// One background tier and one foreground tier.
    pub const DEFAULT_INITIAL_TIERS: usize = 2;

    /// Queue with the default threshold and two initial tiers.
    pub fn new() -> Self {
        Self {
            tiers: vec![Tier::new(); Self::DEFAULT_INITIAL_TIERS],
            threshold: Self::DEFAULT_THRESHOLD,
            promote_cursor: 0,
        }
    }

    /// Build a queue with an explicit split threshold and starting tier count.
    ///
    /// # Errors
    /// `SchedError::InvalidConfig` when `threshold` is zero (a tier of length 1 would split into
    /// an empty move and grow tiers forever) or when `initial_tiers` is zero.
    pub fn with_config(threshold: usize, initial_tiers: usize) -> Result<Self, SchedError> {
        if threshold == 0 {
            return Err(SchedError::InvalidConfig(
                "tier threshold must be at least 1".to_string(),
            ));
        }
        if initial_tiers == 0 {
            return Err(SchedError::InvalidConfig(
                "ready queue needs at least one tier".to_string(),
            ));
        }
        Ok(Self {
            tiers: vec![Tier::new(); initial_tiers],
            threshold,
            promote_cursor: 0,
        })
    }

    /// Admit a process at the top tier (foreground) or at tier 0 (background), then rebalance.
    pub fn admit(&mut self, process: Process, is_foreground: bool) {
        let target = if is_foreground { self.tiers.len() - 1 } else { 0 };
        trace!("admit pid {} into tier {}", process.id, target);
        self.tiers[target].push_back(process);
        self.rebalance();
    }

    /// Remove the head of the first non-empty tier, scanning from tier 0 upward.
    ///
    /// The queue is rebalanced after the pop. If that leaves the source tier empty while other
    /// tiers remain, the tier is deleted and every tier above it shifts down by one.
    ///
    /// # Errors
    /// `SchedError::EmptyQueue` when every tier is empty. The queue is left untouched.
    pub fn remove(&mut self) -> Result<Process, SchedError> {
        let index = self
            .tiers
            .iter()
            .position(|tier| !tier.is_empty())
            .ok_or(SchedError::EmptyQueue)?;
        let process = self.tiers[index]
            .pop_front()
            .ok_or(SchedError::EmptyQueue)?;

        // Every tier below `index` is empty, so rebalance cannot refill it.
        self.rebalance();
        if self.tiers[index].is_empty() && self.tiers.len() > 1 {
            self.delete_tier(index);
            if self.promote_cursor >= self.tiers.len() {
                self.promote_cursor = 0;
            }
        }
        Ok(process)
    }

    /// Single ascending split pass.
    ///
    /// A tier over `threshold` keeps its first `len - len / 2` entries and hands the back
    /// `len / 2` to the tail of the tier above (a new top tier is appended when the overflowing
    /// tier is the topmost one). A tier that received overflow during this pass is left for the
    /// next pass, so one call moves each batch of overflow at most one tier up. Rebalance never
    /// deletes tiers.
    pub fn rebalance(&mut self) {
        let mut received_overflow = false;
        let mut index = 0;
        while index < self.tiers.len() {
            let len = self.tiers[index].len();
            if len > self.threshold && !received_overflow {
                let cut = len / 2;
                let moved = self.tiers[index].split_off(len - cut);
                if index + 1 == self.tiers.len() {
                    self.tiers.push(Tier::new());
                    debug!("tier {} overflowed, appended tier {}", index, index + 1);
                }
                trace!(
                    "split tier {} ({} entries): moved {} to tier {}",
                    index,
                    len,
                    cut,
                    index + 1
                );
                self.tiers[index + 1].extend(moved);
                received_overflow = true;
            } else {
                received_overflow = false;
            }
            index += 1;
        }
    }

    /// Aging step: move the head of the tier under the cursor one tier up.
    ///
    /// The destination is `cursor + 1`, or the same tier when the cursor sits on the top tier
    /// (the process goes back to its tail). If the source tier empties and other tiers remain it
    /// is deleted and the cursor restarts at 0; otherwise the cursor advances by one. An empty
    /// tier under the cursor only advances the cursor.
    ///
    /// Returns the id of the promoted process, if any moved.
    pub fn promote(&mut self) -> Option<Pid> {
        let count = self.tiers.len();
        if count == 0 {
            return None;
        }
        let cursor = self.promote_cursor % count;

        let Some(mut process) = self.tiers[cursor].pop_front() else {
            self.promote_cursor = (cursor + 1) % count;
            return None;
        };
        process.promoted = true;
        let pid = process.id;
        let destination = (cursor + 1).min(count - 1);
        trace!("promote pid {} from tier {} to tier {}", pid, cursor, destination);
        self.tiers[destination].push_back(process);

        if self.tiers[cursor].is_empty() && count > 1 {
            self.delete_tier(cursor);
            self.promote_cursor = 0;
        } else {
            self.promote_cursor = (cursor + 1) % count;
        }
        Some(pid)
    }

    fn delete_tier(&mut self, index: usize) {
        self.tiers.remove(index);
        debug!("deleted empty tier {}, {} tiers remain", index, self.tiers.len());
    }

    /// Read-only view of every tier, lowest priority first.
    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Number of tiers currently present.
    ///
    /// # Returns
    /// Always at least 1, since the last tier is never deleted.
    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }

    /// Total number of queued processes across all tiers.
    pub fn len(&self) -> usize {
        self.tiers.iter().map(Tier::len).sum()
    }

    /// `true` when no tier holds a process. Empty tiers may still exist.
    pub fn is_empty(&self) -> bool {
        self.tiers.iter().all(Tier::is_empty)
    }

    /// Split threshold this queue was built with.
    ///
    /// # Returns
    /// Maximum tier length tolerated by a rebalance pass before the back half moves up.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Tier the next [`TieredQueue::promote`] call will look at.
    ///
    /// # Returns
    /// Raw cursor value. It can exceed the current tier count after tiers were deleted;
    /// `promote` reduces it modulo the tier count before use.
    pub fn promote_cursor(&self) -> usize {
        self.promote_cursor
    }

    /// Process ids per tier, lowest priority first.
    pub fn tier_pids(&self) -> Vec<Vec<Pid>> {
        self.tiers
            .iter()
            .map(|tier| tier.iter().map(|p| p.id).collect())
            .collect()
    }
}

impl Default for TieredQueue {
    fn default() -> Self {
        Self::new()
    }
}
