//! # Bounded priority FIFO for async envelopes.
//!
//! [`EventQueue`] holds envelopes awaiting the dispatcher. Higher
//! priorities drain before lower ones; within one priority level order is
//! insertion order.
//!
//! ## Rules
//! - `push` refuses envelopes once `len() == max()`; the caller counts the
//!   drop. The queue itself never exceeds its bound.
//! - `pop` takes the oldest envelope of the highest non-empty lane.
//! - `set_max` applies to future pushes only; an already-over-bound queue
//!   drains normally.
//!
//! The queue is plain data behind the caller's lock; waking the dispatcher
//! is the façade's business (`Notify`), not the queue's.

use std::collections::VecDeque;

use super::envelope::Envelope;
use super::priority::Priority;

/// Priority-ordered FIFO with a configurable upper bound.
pub(crate) struct EventQueue {
    lanes: [VecDeque<Envelope>; 4],
    len: usize,
    max: usize,
}

impl EventQueue {
    pub(crate) fn new(max: usize) -> Self {
        Self {
            lanes: Default::default(),
            len: 0,
            max,
        }
    }

    /// Attempts to enqueue. Returns `false` when the queue is at capacity;
    /// the envelope is given back to the caller for disposal.
    pub(crate) fn push(&mut self, envelope: Envelope) -> Result<(), Envelope> {
        if self.len >= self.max {
            return Err(envelope);
        }
        self.lanes[envelope.priority().lane()].push_back(envelope);
        self.len += 1;
        Ok(())
    }

    /// Removes the next envelope: highest priority first, FIFO within one
    /// priority level.
    pub(crate) fn pop(&mut self) -> Option<Envelope> {
        for priority in Priority::DESCENDING {
            if let Some(env) = self.lanes[priority.lane()].pop_front() {
                self.len -= 1;
                return Some(env);
            }
        }
        None
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn max(&self) -> usize {
        self.max
    }

    pub(crate) fn set_max(&mut self, max: usize) {
        self.max = max;
    }
}
