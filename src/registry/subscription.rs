//! Subscription records and type-erasure shims.
//!
//! A subscription pairs a caller's typed handler with the downcasting shim
//! that lets the type-erased dispatch path invoke it. The shim is built
//! once at subscribe time; the dispatcher only ever sees
//! `Fn(&(dyn Any + Send))`.

use std::any::Any;
use std::sync::Arc;

use crate::events::Priority;
use crate::ids::HandlerId;

/// Type-erased handler invocation.
pub(crate) type Callback = Arc<dyn Fn(&(dyn Any + Send)) + Send + Sync>;

/// Type-erased per-subscription predicate.
pub(crate) type FilterFn = Arc<dyn Fn(&(dyn Any + Send)) -> bool + Send + Sync>;

/// A registered handler for one payload type.
///
/// Clones share the same callback and filter (`Arc`); dispatch snapshots
/// clone records out of the registry so invocation happens without the
/// registry lock held.
#[derive(Clone)]
pub(crate) struct Subscription {
    id: HandlerId,
    min_priority: Priority,
    callback: Callback,
    filter: Option<FilterFn>,
}

impl Subscription {
    /// Wraps a typed handler into an erased record.
    ///
    /// The shim silently ignores payloads of a foreign type; the registry
    /// keys subscriptions by [`TypeId`](std::any::TypeId), so that branch
    /// is unreachable in practice.
    pub(crate) fn new<T, F>(id: HandlerId, min_priority: Priority, handler: F) -> Self
    where
        T: Send + 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(move |payload| {
            if let Some(payload) = payload.downcast_ref::<T>() {
                handler(payload);
            }
        });
        Self {
            id,
            min_priority,
            callback,
            filter: None,
        }
    }

    /// Builds the erased form of a typed filter predicate.
    pub(crate) fn erase_filter<T, F>(filter: F) -> FilterFn
    where
        T: Send + 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Arc::new(move |payload| match payload.downcast_ref::<T>() {
            Some(payload) => filter(payload),
            None => false,
        })
    }

    pub(crate) fn id(&self) -> HandlerId {
        self.id
    }

    /// Replaces any previous filter.
    pub(crate) fn set_filter(&mut self, filter: FilterFn) {
        self.filter = Some(filter);
    }

    /// Whether this subscription observes an event of `priority` carrying
    /// `payload`: the priority gate passes and the filter (if any) accepts.
    pub(crate) fn accepts(&self, priority: Priority, payload: &(dyn Any + Send)) -> bool {
        priority >= self.min_priority && self.filter.as_ref().map_or(true, |f| f(payload))
    }

    /// Invokes the handler. Panic containment is the dispatch site's job.
    pub(crate) fn invoke(&self, payload: &(dyn Any + Send)) {
        (self.callback)(payload);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("min_priority", &self.min_priority)
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}
