//! # Statistics accumulator.
//!
//! Lock-free counters and timing aggregates for the dispatch hot path.
//! The accumulator sits beside the queue, not under its lock: counters are
//! relaxed atomics and the combined snapshot is **not** cross-field
//! consistent — each field is read independently.
//!
//! When disabled, recording is skipped entirely and counters retain their
//! last values until [`Statistics::reset`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Point-in-time view of the accumulator, returned by
/// [`EventLoop::statistics`](crate::EventLoop::statistics).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Events submitted to the loop (sync and async alike).
    pub published: u64,
    /// Handler and timer invocations that completed normally.
    pub processed: u64,
    /// Async publishes discarded at the queue bound or after stop.
    pub dropped: u64,
    /// Invocations that panicked.
    pub failed: u64,
    /// Sum of all invocation durations, including failed ones.
    pub total_processing_time: Duration,
    /// Longest single invocation observed.
    pub max_processing_time: Duration,
}

/// Counter block shared by the façade and the dispatcher.
pub(crate) struct Statistics {
    enabled: AtomicBool,
    published: AtomicU64,
    processed: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
    total_us: AtomicU64,
    max_us: AtomicU64,
}

impl Statistics {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            published: AtomicU64::new(0),
            processed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            total_us: AtomicU64::new(0),
            max_us: AtomicU64::new(0),
        }
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub(crate) fn record_published(&self) {
        if self.is_enabled() {
            self.published.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_dropped(&self) {
        if self.is_enabled() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Books one handler or timer invocation. Failed invocations still
    /// contribute their duration to the aggregates.
    pub(crate) fn record_invocation(&self, elapsed: Duration, succeeded: bool) {
        if !self.is_enabled() {
            return;
        }
        if succeeded {
            self.processed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        let us = elapsed.as_micros().min(u64::MAX as u128) as u64;
        self.total_us.fetch_add(us, Ordering::Relaxed);
        self.max_us.fetch_max(us, Ordering::Relaxed);
    }

    pub(crate) fn reset(&self) {
        self.published.store(0, Ordering::Relaxed);
        self.processed.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.total_us.store(0, Ordering::Relaxed);
        self.max_us.store(0, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            total_processing_time: Duration::from_micros(self.total_us.load(Ordering::Relaxed)),
            max_processing_time: Duration::from_micros(self.max_us.load(Ordering::Relaxed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocations_accumulate_time_and_counts() {
        let stats = Statistics::new(true);
        stats.record_published();
        stats.record_invocation(Duration::from_micros(300), true);
        stats.record_invocation(Duration::from_micros(700), false);

        let snap = stats.snapshot();
        assert_eq!(snap.published, 1);
        assert_eq!(snap.processed, 1);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.total_processing_time, Duration::from_micros(1000));
        assert_eq!(snap.max_processing_time, Duration::from_micros(700));
    }

    #[test]
    fn disabled_recorder_keeps_last_values() {
        let stats = Statistics::new(true);
        stats.record_published();
        stats.set_enabled(false);
        stats.record_published();
        stats.record_dropped();
        stats.record_invocation(Duration::from_millis(5), true);

        let snap = stats.snapshot();
        assert_eq!(snap.published, 1);
        assert_eq!(snap.dropped, 0);
        assert_eq!(snap.processed, 0);
        assert_eq!(snap.total_processing_time, Duration::ZERO);
    }

    #[test]
    fn reset_zeroes_everything() {
        let stats = Statistics::new(true);
        stats.record_published();
        stats.record_dropped();
        stats.record_invocation(Duration::from_micros(50), true);
        stats.reset();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }
}
