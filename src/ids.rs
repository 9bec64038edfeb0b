//! Identifier allocation for subscriptions and scheduled tasks.
//!
//! Ids are issued from an atomic counter starting at 1 and are never
//! reused for the lifetime of the owning [`EventLoop`](crate::EventLoop).
//! Zero is reserved so callers can treat `0` as "no id".

use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of a handler subscription. Always `> 0`.
pub type HandlerId = u64;

/// Identifier of a scheduled task. Always `> 0`.
pub type TaskId = u64;

/// Monotonic id source.
///
/// Each registry and timer set owns its own allocator; ids are unique
/// within that allocator and strictly increasing.
#[derive(Debug)]
pub(crate) struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    pub(crate) fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Returns the next unused id.
    pub(crate) fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one_and_increase() {
        let ids = IdAllocator::new();
        let a = ids.next();
        let b = ids.next();
        let c = ids.next();
        assert_eq!(a, 1);
        assert!(b > a && c > b);
    }
}
