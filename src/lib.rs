//! # eventide
//!
//! **Eventide** is an in-process, type-safe event dispatch and timer core.
//!
//! Producers submit values of arbitrary user-defined types to a central
//! loop; consumers register typed handlers and receive those values either
//! inline with the producer or on the dispatcher task. The same loop
//! schedules one-shot and periodic callbacks and can defer publication of
//! an event to a future instant.
//!
//! ## Features
//!
//! | Area               | Description                                                        | Key types                              |
//! |--------------------|--------------------------------------------------------------------|----------------------------------------|
//! | **Typed dispatch** | Subscribe plain closures per payload type; per-type FIFO delivery. | [`EventLoop`], [`HandlerId`]           |
//! | **Priorities**     | Four levels; higher priority drains first, gates per subscription. | [`Priority`]                           |
//! | **Filters**        | Per-subscription predicates over the payload.                      | [`EventLoop::add_filter`]              |
//! | **Backpressure**   | Bounded async queue; overflow drops are counted, never block.      | [`Config`], [`QueueSizes`]             |
//! | **Timers**         | One-shot, periodic (fixed cadence), and deferred publication.      | [`TaskId`], [`EventLoop::publish_after`] |
//! | **Statistics**     | Published/processed/dropped/failed counters and timing aggregates. | [`StatsSnapshot`]                      |
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use eventide::{EventLoop, Priority};
//!
//! struct Telemetry {
//!     rtt_ms: u64,
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let el = Arc::new(EventLoop::new());
//!
//!     el.subscribe_with::<Telemetry, _>(Priority::High, |t| {
//!         println!("rtt spike: {}ms", t.rtt_ms);
//!     });
//!
//!     let runner = Arc::clone(&el);
//!     let loop_task = tokio::spawn(async move { runner.run().await });
//!
//!     el.publish_with(Telemetry { rtt_ms: 480 }, Priority::High, Default::default());
//!     el.schedule_repeating(Duration::from_secs(30), || {
//!         // periodic housekeeping
//!     });
//!
//!     el.stop_loop();
//!     loop_task.await.unwrap().unwrap();
//! }
//! ```
//!
//! ## Guarantees, briefly
//!
//! - FIFO per (type, priority); higher priority before lower; no ordering
//!   across types.
//! - Handlers run without core locks held; a handler panic is contained
//!   and counted, the loop keeps running.
//! - The async queue never exceeds its bound; overflow increments the
//!   `dropped` counter and the publish returns normally.
//! - Periodic timers hold a fixed cadence and skip missed periods instead
//!   of bursting when the loop falls behind.
//!
//! ---

mod config;
mod error;
mod event_loop;
mod events;
mod ids;
mod registry;
mod stats;
mod timers;

// ---- Public re-exports ----

pub use config::Config;
pub use error::LoopError;
pub use event_loop::{EventLoop, QueueSizes};
pub use events::{DispatchMode, Priority};
pub use ids::{HandlerId, TaskId};
pub use stats::StatsSnapshot;
