//! # Min-ordered timer heap.
//!
//! A [`BinaryHeap`] of [`TimerEntry`]s inverted so the root is the task
//! with the earliest next-fire instant. Ties break by insertion sequence,
//! keeping same-instant tasks in schedule order.
//!
//! ## Drift policy
//! Periodic tasks reinsert at `prior scheduled instant + period`, not at
//! `now + period`, so handler run time does not skew the cadence. When a
//! fire is late by a full period or more, the task skips the missed
//! periods and resumes at `now + period` — late loops never produce a
//! burst of catch-up fires.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tokio::time::Instant;
use tracing::trace;

use super::task::{ScheduledTask, TaskAction};

/// Heap entry: fire instant, tie-break sequence, and the task itself.
pub(crate) struct TimerEntry {
    pub(crate) fire_at: Instant,
    seq: u64,
    pub(crate) task: ScheduledTask,
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at && self.seq == other.seq
    }
}

impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    // Inverted: BinaryHeap is a max-heap, the root must be the earliest.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .fire_at
            .cmp(&self.fire_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// The heap proper. Callers guard it with a lock; cancellation flags are
/// observed lazily at pop time.
pub(crate) struct TimerHeap {
    heap: BinaryHeap<TimerEntry>,
    seq: u64,
}

impl TimerHeap {
    pub(crate) fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            seq: 0,
        }
    }

    pub(crate) fn insert(&mut self, fire_at: Instant, task: ScheduledTask) {
        let seq = self.seq;
        self.seq += 1;
        self.heap.push(TimerEntry { fire_at, seq, task });
    }

    /// Earliest next-fire instant among non-cancelled tasks. Cancelled
    /// entries found at the root are discarded on the way.
    pub(crate) fn next_fire(&mut self) -> Option<Instant> {
        while let Some(entry) = self.heap.peek() {
            if entry.task.is_live() {
                return Some(entry.fire_at);
            }
            self.heap.pop();
        }
        None
    }

    /// Pops every task with `fire_at <= now`, reinserting periodic ones
    /// per the drift policy. Returns the actions to run, in fire order,
    /// paired with the popped task for one-shot bookkeeping.
    pub(crate) fn pop_due(&mut self, now: Instant) -> Vec<DueTask> {
        let mut due = Vec::new();
        loop {
            match self.heap.peek() {
                Some(entry) if entry.fire_at <= now => {}
                _ => break,
            }
            let Some(entry) = self.heap.pop() else {
                break;
            };
            if !entry.task.is_live() {
                continue;
            }
            match entry.task.period {
                Some(period) => {
                    let Some(action) = entry.task.action.repeat() else {
                        continue;
                    };
                    due.push(DueTask {
                        id: entry.task.id,
                        one_shot: false,
                        action,
                    });
                    let mut next = entry.fire_at + period;
                    if next <= now {
                        trace!(task_id = entry.task.id, "periodic task fell behind; skipping missed periods");
                        next = now + period;
                    }
                    self.insert(next, entry.task);
                }
                None => {
                    due.push(DueTask {
                        id: entry.task.id,
                        one_shot: true,
                        action: entry.task.action,
                    });
                }
            }
        }
        due
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }
}

impl ScheduledTask {
    fn is_live(&self) -> bool {
        !self.cancelled.load(std::sync::atomic::Ordering::Acquire)
    }
}

/// A task due for invocation this loop turn.
pub(crate) struct DueTask {
    pub(crate) id: u64,
    pub(crate) one_shot: bool,
    pub(crate) action: TaskAction,
}
