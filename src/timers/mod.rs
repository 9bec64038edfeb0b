//! # Scheduled tasks: heap, cancel index, id allocation.
//!
//! [`Timers`] owns the [`TimerHeap`] behind a mutex plus a concurrent
//! side-index from task id to cancel flag, so `cancel_task` works from any
//! thread in O(1) without contending the heap lock. Cancellation is lazy:
//! the flag is set immediately, the heap entry is discarded when it next
//! surfaces.
//!
//! ## Rules
//! - A cancel observed before `pop_due` suppresses the fire; a cancel
//!   racing `pop_due` may still see the action invoked once.
//! - One-shot tasks leave the index when they fire; cancelling an
//!   already-fired one-shot returns `false`.
//! - `count()` is the number of scheduled, not-yet-fired, not-cancelled
//!   tasks — the `timer_count` of the queue-sizes snapshot.

mod heap;
mod task;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::events::Envelope;
use crate::ids::{IdAllocator, TaskId};

use heap::TimerHeap;

pub(crate) use heap::DueTask;
pub(crate) use task::TaskAction;

/// Thread-safe scheduling surface over the timer heap.
pub(crate) struct Timers {
    heap: Mutex<TimerHeap>,
    index: DashMap<TaskId, Arc<AtomicBool>>,
    ids: IdAllocator,
}

impl Timers {
    pub(crate) fn new() -> Self {
        Self {
            heap: Mutex::new(TimerHeap::new()),
            index: DashMap::new(),
            ids: IdAllocator::new(),
        }
    }

    /// Schedules a one-shot callable after `delay`. Zero delay fires on
    /// the next loop turn.
    pub(crate) fn schedule_once<F>(&self, delay: Duration, action: F) -> TaskId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.insert(delay, None, TaskAction::Invoke(Arc::new(action)))
    }

    /// Schedules a repeating callable; first fire at `now + period`.
    pub(crate) fn schedule_repeating<F>(&self, period: Duration, action: F) -> TaskId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.insert(period, Some(period), TaskAction::Invoke(Arc::new(action)))
    }

    /// Schedules a one-shot republication of `envelope` after `delay`.
    pub(crate) fn schedule_republish(&self, delay: Duration, envelope: Envelope) -> TaskId {
        self.insert(delay, None, TaskAction::Republish(envelope))
    }

    /// Marks the task cancelled. Returns `false` for ids that are unknown,
    /// already cancelled, or belong to a one-shot that already fired.
    pub(crate) fn cancel(&self, id: TaskId) -> bool {
        match self.index.remove(&id) {
            Some((_, flag)) => {
                flag.store(true, Ordering::Release);
                debug!(task_id = id, "task cancelled");
                true
            }
            None => false,
        }
    }

    /// Earliest pending fire instant, if any.
    pub(crate) fn next_fire(&self) -> Option<Instant> {
        self.heap.lock().next_fire()
    }

    /// Collects actions due at `now`. One-shot tasks are retired from the
    /// cancel index here, before their actions run.
    pub(crate) fn pop_due(&self, now: Instant) -> Vec<DueTask> {
        let due = self.heap.lock().pop_due(now);
        for task in &due {
            if task.one_shot {
                self.index.remove(&task.id);
            }
        }
        due
    }

    /// Number of live scheduled tasks.
    pub(crate) fn count(&self) -> usize {
        self.index.len()
    }

    fn insert(&self, delay: Duration, period: Option<Duration>, action: TaskAction) -> TaskId {
        let id = self.ids.next();
        let cancelled = Arc::new(AtomicBool::new(false));
        self.index.insert(id, Arc::clone(&cancelled));
        let fire_at = Instant::now() + delay;
        self.heap.lock().insert(
            fire_at,
            task::ScheduledTask {
                id,
                period,
                action,
                cancelled,
            },
        );
        debug!(task_id = id, ?delay, periodic = period.is_some(), "task scheduled");
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn cancel_before_fire_suppresses() {
        let timers = Timers::new();
        let id = timers.schedule_once(Duration::from_millis(50), || {});
        assert!(id > 0);
        assert_eq!(timers.count(), 1);

        assert!(timers.cancel(id));
        assert_eq!(timers.count(), 0);
        assert!(!timers.cancel(id));

        let due = timers.pop_due(Instant::now() + Duration::from_secs(1));
        assert!(due.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn fired_one_shot_cannot_be_cancelled() {
        let timers = Timers::new();
        let id = timers.schedule_once(Duration::ZERO, || {});

        let due = timers.pop_due(Instant::now());
        assert_eq!(due.len(), 1);
        assert_eq!(timers.count(), 0);
        assert!(!timers.cancel(id));
    }

    #[tokio::test(start_paused = true)]
    async fn repeating_stays_in_index_until_cancel() {
        let timers = Timers::new();
        let period = Duration::from_millis(20);
        let id = timers.schedule_repeating(period, || {});

        let due = timers.pop_due(Instant::now() + period);
        assert_eq!(due.len(), 1);
        assert_eq!(timers.count(), 1);

        assert!(timers.cancel(id));
        assert_eq!(timers.count(), 0);
        let due = timers.pop_due(Instant::now() + Duration::from_secs(1));
        assert!(due.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn next_fire_tracks_earliest_live_task() {
        let timers = Timers::new();
        let near = timers.schedule_once(Duration::from_millis(10), || {});
        let _far = timers.schedule_once(Duration::from_millis(500), || {});

        let first = timers.next_fire().unwrap();
        assert!(timers.cancel(near));
        let second = timers.next_fire().unwrap();
        assert!(second > first);
    }
}
