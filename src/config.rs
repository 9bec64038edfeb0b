//! # Global event loop configuration.
//!
//! [`Config`] fixes the knobs of a single [`EventLoop`](crate::EventLoop):
//! the async queue bound, the dispatcher's per-turn drain batch, and
//! whether the statistics accumulator starts enabled.
//!
//! # Example
//! ```
//! use eventide::Config;
//!
//! let mut cfg = Config::default();
//! cfg.max_queue_size = 256;
//! cfg.drain_batch = 32;
//!
//! assert!(cfg.statistics);
//! ```

/// Configuration for an event loop instance.
///
/// `max_queue_size` can also be adjusted at runtime via
/// [`EventLoop::set_max_queue_size`](crate::EventLoop::set_max_queue_size);
/// the other fields are fixed at construction.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of envelopes the async event queue may hold.
    /// Publishes beyond the bound are dropped and counted.
    pub max_queue_size: usize,
    /// Maximum number of envelopes dispatched per loop turn before
    /// due timers are re-checked.
    pub drain_batch: usize,
    /// Whether the statistics accumulator starts enabled.
    pub statistics: bool,
}

impl Default for Config {
    /// Provides a default configuration:
    /// - `max_queue_size = 1024`
    /// - `drain_batch = 64`
    /// - `statistics = true`
    fn default() -> Self {
        Self {
            max_queue_size: 1024,
            drain_batch: 64,
            statistics: true,
        }
    }
}
