//! # EventLoop: typed dispatch façade and dispatcher loop.
//!
//! The [`EventLoop`] owns the runtime components (handler registry, async
//! event queue, timer heap, statistics) and drives delivery from a single
//! dispatcher task.
//!
//! ## Architecture
//! ```text
//! producers (any thread)
//!   ├── publish ──────────► [EventQueue] ──┐
//!   ├── publish (Sync) ──► handlers inline │
//!   ├── schedule_* ──────► [TimerHeap] ────┤
//!   └── stop_loop ───────► CancellationToken
//!                                          ▼
//!                              run(): select loop
//!                                ├── pop_due(now) ──► timer actions
//!                                └── drain batch ───► registry snapshot
//!                                                        └──► handlers
//! ```
//!
//! ## Rules
//! - `run()` has exactly one owner; a second caller gets
//!   [`LoopError::AlreadyRunning`].
//! - Handlers run without any core lock held (snapshot-at-start).
//! - Producers never block on handler execution; they block at most
//!   briefly on the registry or queue lock.
//! - Handler panics are caught, counted as `failed`, and contained.
//! - Stop is graceful and permanent: envelopes already accepted drain,
//!   pending timers are abandoned, async publishes after stop are dropped,
//!   sync publishes keep working.

use std::any::{Any, TypeId};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::LoopError;
use crate::events::{DispatchMode, Envelope, EventQueue, Priority};
use crate::ids::{HandlerId, TaskId};
use crate::registry::Registry;
use crate::stats::{Statistics, StatsSnapshot};
use crate::timers::{TaskAction, Timers};

/// Observational snapshot of the loop's two queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSizes {
    /// Envelopes currently waiting in the async event queue.
    pub event_queue_size: usize,
    /// Scheduled tasks that are neither fired nor cancelled.
    pub timer_count: usize,
}

/// In-process typed event dispatcher with deferred and periodic scheduling.
///
/// Producers on any thread publish values of arbitrary `Send + 'static`
/// types; consumers register typed handlers gated by minimum priority and
/// optional filters. One caller drives delivery via [`run`](Self::run),
/// typically from a spawned task:
///
/// ```no_run
/// use std::sync::Arc;
/// use eventide::EventLoop;
///
/// #[derive(Debug)]
/// struct Tick(u32);
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let el = Arc::new(EventLoop::new());
/// el.subscribe::<Tick, _>(|tick| println!("tick {}", tick.0));
///
/// let runner = Arc::clone(&el);
/// let handle = tokio::spawn(async move { runner.run().await });
///
/// el.publish(Tick(1));
/// el.stop_loop();
/// handle.await.unwrap().unwrap();
/// # }
/// ```
///
/// Dropping the loop requests a stop; joining the dispatcher is the
/// owner's `await` of the `run` future.
pub struct EventLoop {
    registry: Registry,
    queue: Mutex<EventQueue>,
    timers: Timers,
    stats: Statistics,
    /// Wakes the dispatcher after enqueue/schedule/stop.
    notify: Notify,
    stop: CancellationToken,
    running: AtomicBool,
    drain_batch: usize,
}

impl EventLoop {
    /// Creates a loop with [`Config::default`].
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a loop with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            registry: Registry::new(),
            queue: Mutex::new(EventQueue::new(config.max_queue_size)),
            timers: Timers::new(),
            stats: Statistics::new(config.statistics),
            notify: Notify::new(),
            stop: CancellationToken::new(),
            running: AtomicBool::new(false),
            drain_batch: config.drain_batch.max(1),
        }
    }

    // ---- Subscriptions ----

    /// Registers `handler` for payloads of type `T` at the default
    /// `Normal` priority gate. Returns the subscription id (`> 0`).
    pub fn subscribe<T, F>(&self, handler: F) -> HandlerId
    where
        T: Send + 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribe_with(Priority::Normal, handler)
    }

    /// Registers `handler` for payloads of type `T`; events below
    /// `min_priority` are skipped for this subscription only.
    pub fn subscribe_with<T, F>(&self, min_priority: Priority, handler: F) -> HandlerId
    where
        T: Send + 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.registry.subscribe::<T, F>(min_priority, handler)
    }

    /// Removes the subscription with `id`. Returns whether it existed.
    /// A dispatch already in flight still delivers to the removed handler
    /// once (snapshot-at-start).
    pub fn unsubscribe<T: Send + 'static>(&self, id: HandlerId) -> bool {
        self.registry.unsubscribe(TypeId::of::<T>(), id)
    }

    /// Attaches `filter` to the subscription with `id`, replacing any
    /// previous filter. Returns whether the subscription exists.
    pub fn add_filter<T, F>(&self, id: HandlerId, filter: F) -> bool
    where
        T: Send + 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.registry.add_filter::<T, F>(id, filter)
    }

    // ---- Publication ----

    /// Publishes `payload` asynchronously at `Normal` priority.
    pub fn publish<T: Send + 'static>(&self, payload: T) {
        self.publish_with(payload, Priority::Normal, DispatchMode::Async);
    }

    /// Publishes `payload` with explicit priority and dispatch mode.
    ///
    /// `Async` enqueues for the dispatcher and may drop at the queue
    /// bound (counted, never an error). `Sync` bypasses the queue and
    /// invokes eligible handlers inline on the calling thread, in
    /// subscription order, before returning.
    pub fn publish_with<T: Send + 'static>(
        &self,
        payload: T,
        priority: Priority,
        mode: DispatchMode,
    ) {
        match mode {
            DispatchMode::Async => {
                self.publish_envelope(Envelope::new(payload, priority));
            }
            DispatchMode::Sync => {
                self.stats.record_published();
                self.dispatch_payload(TypeId::of::<T>(), &payload, priority);
            }
        }
    }

    /// Schedules a one-shot task that republishes `payload` (async,
    /// `Normal` priority) after `delay`. Returns the task id, which
    /// participates in [`cancel_task`](Self::cancel_task).
    pub fn publish_after<T: Send + 'static>(&self, delay: Duration, payload: T) -> TaskId {
        self.publish_after_with(delay, payload, Priority::Normal)
    }

    /// [`publish_after`](Self::publish_after) with an explicit priority.
    ///
    /// If the loop stops before the fire instant, the captured payload is
    /// destroyed without publication.
    pub fn publish_after_with<T: Send + 'static>(
        &self,
        delay: Duration,
        payload: T,
        priority: Priority,
    ) -> TaskId {
        let id = self
            .timers
            .schedule_republish(delay, Envelope::new(payload, priority));
        self.notify.notify_one();
        id
    }

    // ---- Scheduling ----

    /// Schedules `action` to run once after `delay`. A zero delay fires
    /// on the next loop turn.
    pub fn schedule_task<F>(&self, delay: Duration, action: F) -> TaskId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.timers.schedule_once(delay, action);
        self.notify.notify_one();
        id
    }

    /// Schedules `action` at a fixed `period`; first fire at
    /// `now + period`. A slow loop skips missed periods rather than
    /// bursting to catch up.
    pub fn schedule_repeating<F>(&self, period: Duration, action: F) -> TaskId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.timers.schedule_repeating(period, action);
        self.notify.notify_one();
        id
    }

    /// Cancels the task with `id`. Returns `false` for unknown ids and
    /// one-shots that already fired. A cancel racing the dispatcher may
    /// observe one final invocation.
    pub fn cancel_task(&self, id: TaskId) -> bool {
        self.timers.cancel(id)
    }

    // ---- Loop lifecycle ----

    /// Runs the dispatcher until [`stop_loop`](Self::stop_loop).
    ///
    /// Exactly one caller may own the loop: a concurrent second call
    /// returns [`LoopError::AlreadyRunning`], and a call after stop
    /// returns [`LoopError::Stopped`].
    pub async fn run(&self) -> Result<(), LoopError> {
        if self.stop.is_cancelled() {
            return Err(LoopError::Stopped);
        }
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(LoopError::AlreadyRunning);
        }
        debug!("event loop running");

        loop {
            self.run_due_timers();
            self.drain_events();

            let queue_empty = self.queue.lock().is_empty();
            if self.stop.is_cancelled() && queue_empty {
                break;
            }
            if !queue_empty {
                // Backlog remains after a full batch; re-check timers
                // before draining more.
                continue;
            }
            self.park().await;
        }

        self.running.store(false, Ordering::Release);
        debug!("event loop stopped");
        Ok(())
    }

    /// Requests a graceful stop: envelopes already accepted are drained,
    /// pending timers are abandoned. Idempotent, callable from any thread
    /// and from within handlers.
    pub fn stop_loop(&self) {
        if !self.stop.is_cancelled() {
            debug!("stop requested");
        }
        self.stop.cancel();
        self.notify.notify_one();
    }

    /// Whether a dispatcher currently owns the loop.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    // ---- Introspection ----

    /// Adjusts the async queue bound. Envelopes already queued beyond a
    /// smaller bound stay queued; only future publishes are refused.
    pub fn set_max_queue_size(&self, max: usize) {
        self.queue.lock().set_max(max);
    }

    /// Current queue depth and live timer count.
    pub fn queue_sizes(&self) -> QueueSizes {
        QueueSizes {
            event_queue_size: self.queue.lock().len(),
            timer_count: self.timers.count(),
        }
    }

    /// Gates the statistics accumulator. Disabling skips the hot-path
    /// bookkeeping; counters keep their last values until reset.
    pub fn enable_statistics(&self, enabled: bool) {
        self.stats.set_enabled(enabled);
    }

    /// Zeroes all counters and timing aggregates.
    pub fn reset_statistics(&self) {
        self.stats.reset();
    }

    /// Reads the counters. Fields are read independently; the snapshot is
    /// not a cross-field-consistent cut.
    pub fn statistics(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    // ---- Dispatch internals ----

    /// Normal async publish path; `publish_after` republication re-enters
    /// here at fire time.
    fn publish_envelope(&self, envelope: Envelope) {
        self.stats.record_published();
        if self.stop.is_cancelled() {
            debug!("async publish after stop; envelope dropped");
            self.stats.record_dropped();
            return;
        }
        match self.queue.lock().push(envelope) {
            Ok(()) => self.notify.notify_one(),
            Err(envelope) => {
                debug!(?envelope, "event queue full; envelope dropped");
                self.stats.record_dropped();
            }
        }
    }

    fn run_due_timers(&self) {
        for task in self.timers.pop_due(Instant::now()) {
            match task.action {
                TaskAction::Invoke(action) => self.invoke_contained(|| action()),
                TaskAction::Republish(envelope) => self.publish_envelope(envelope),
            }
        }
    }

    /// Dispatches up to one batch of queued envelopes.
    fn drain_events(&self) {
        for _ in 0..self.drain_batch {
            let Some(envelope) = self.queue.lock().pop() else {
                break;
            };
            self.dispatch_payload(envelope.type_id(), envelope.payload(), envelope.priority());
        }
    }

    /// Snapshot-at-start delivery shared by the dispatcher and the sync
    /// publish path.
    fn dispatch_payload(
        &self,
        type_id: TypeId,
        payload: &(dyn Any + Send),
        priority: Priority,
    ) {
        for subscription in self.registry.snapshot(type_id) {
            if subscription.accepts(priority, payload) {
                self.invoke_contained(|| subscription.invoke(payload));
            }
        }
    }

    /// Runs one handler or timer action with panic containment and, when
    /// statistics are enabled, timing instrumentation.
    fn invoke_contained<F: FnOnce()>(&self, f: F) {
        if !self.stats.is_enabled() {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
                warn!(cause = panic_message(payload.as_ref()), "handler panicked");
            }
            return;
        }
        let start = std::time::Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(f));
        let elapsed = start.elapsed();
        if let Err(payload) = &outcome {
            warn!(cause = panic_message(payload.as_ref()), "handler panicked");
        }
        self.stats.record_invocation(elapsed, outcome.is_ok());
    }

    /// Sleeps until woken by enqueue/schedule/stop or until the earliest
    /// timer is due.
    async fn park(&self) {
        let notified = self.notify.notified();
        match self.timers.next_fire() {
            Some(deadline) => {
                tokio::select! {
                    _ = notified => {}
                    _ = self.stop.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => {
                tokio::select! {
                    _ = notified => {}
                    _ = self.stop.cancelled() => {}
                }
            }
        }
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        self.stop_loop();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
