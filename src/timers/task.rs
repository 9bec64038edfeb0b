//! Scheduled task records.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use crate::events::Envelope;
use crate::ids::TaskId;

/// What a timer does when it fires.
pub(crate) enum TaskAction {
    /// Run an arbitrary callable. Repeating tasks always carry this form.
    Invoke(Arc<dyn Fn() + Send + Sync>),
    /// Re-enter a captured envelope into the async publish path
    /// (`publish_after`). One-shot only.
    Republish(Envelope),
}

impl TaskAction {
    /// Clone for periodic reinsertion. `Republish` never repeats.
    pub(crate) fn repeat(&self) -> Option<TaskAction> {
        match self {
            TaskAction::Invoke(f) => Some(TaskAction::Invoke(Arc::clone(f))),
            TaskAction::Republish(_) => None,
        }
    }
}

/// A deferred action with optional period and a lazily observed cancel flag.
///
/// One-shot tasks live until fire-and-complete or cancel; repeating tasks
/// until cancel or loop destruction.
pub(crate) struct ScheduledTask {
    pub(crate) id: TaskId,
    pub(crate) period: Option<Duration>,
    pub(crate) action: TaskAction,
    pub(crate) cancelled: Arc<AtomicBool>,
}
