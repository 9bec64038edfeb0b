//! # Typed handler registry.
//!
//! Maps runtime type identity to an ordered list of [`Subscription`]s.
//! Handlers for one payload type are invoked in subscription order; the
//! dispatcher works from a snapshot so long-running handlers never hold
//! the registry lock.
//!
//! ## Rules
//! - One reader/writer lock guards the whole table. Subscribe,
//!   unsubscribe and add-filter take the write path; snapshot takes the
//!   read path.
//! - A snapshot taken at dispatch start is stable: unsubscribing
//!   mid-dispatch does not retract that one delivery, and a subscription
//!   added mid-dispatch does not observe it.
//! - Handler ids never collide for the lifetime of the registry.

mod subscription;

use std::any::TypeId;
use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use crate::events::Priority;
use crate::ids::{HandlerId, IdAllocator};

pub(crate) use subscription::Subscription;

/// Per-type subscription lists behind a single rw-lock.
pub(crate) struct Registry {
    handlers: RwLock<HashMap<TypeId, Vec<Subscription>>>,
    ids: IdAllocator,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            ids: IdAllocator::new(),
        }
    }

    /// Appends a subscription for `T` and returns its fresh id.
    pub(crate) fn subscribe<T, F>(&self, min_priority: Priority, handler: F) -> HandlerId
    where
        T: Send + 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.ids.next();
        let record = Subscription::new::<T, F>(id, min_priority, handler);
        self.handlers
            .write()
            .entry(TypeId::of::<T>())
            .or_default()
            .push(record);
        debug!(handler_id = id, ty = std::any::type_name::<T>(), "subscribed");
        id
    }

    /// Removes the subscription with `id` from the list for `type_id`.
    /// Returns whether it existed.
    pub(crate) fn unsubscribe(&self, type_id: TypeId, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write();
        let Some(list) = handlers.get_mut(&type_id) else {
            return false;
        };
        let before = list.len();
        list.retain(|sub| sub.id() != id);
        let removed = list.len() != before;
        if list.is_empty() {
            handlers.remove(&type_id);
        }
        if removed {
            debug!(handler_id = id, "unsubscribed");
        }
        removed
    }

    /// Attaches `filter` to the subscription with `id`, replacing any
    /// previous filter. Returns whether the subscription exists.
    pub(crate) fn add_filter<T, F>(&self, id: HandlerId, filter: F) -> bool
    where
        T: Send + 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let mut handlers = self.handlers.write();
        let Some(list) = handlers.get_mut(&TypeId::of::<T>()) else {
            return false;
        };
        match list.iter_mut().find(|sub| sub.id() == id) {
            Some(sub) => {
                sub.set_filter(Subscription::erase_filter::<T, F>(filter));
                true
            }
            None => false,
        }
    }

    /// Copies the subscription handles for `type_id`. Empty when the type
    /// has no subscribers.
    pub(crate) fn snapshot(&self, type_id: TypeId) -> Vec<Subscription> {
        self.handlers
            .read()
            .get(&type_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Ping(i32);
    struct Pong;

    #[test]
    fn subscribe_and_snapshot_round_trip() {
        let registry = Registry::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = Arc::clone(&seen);

        let id = registry.subscribe::<Ping, _>(Priority::Normal, move |ev| {
            seen2.fetch_add(ev.0 as usize, Ordering::SeqCst);
        });
        assert!(id > 0);

        let subs = registry.snapshot(TypeId::of::<Ping>());
        assert_eq!(subs.len(), 1);
        subs[0].invoke(&Ping(7));
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn snapshot_is_per_type() {
        let registry = Registry::new();
        registry.subscribe::<Ping, _>(Priority::Normal, |_| {});
        assert_eq!(registry.snapshot(TypeId::of::<Ping>()).len(), 1);
        assert!(registry.snapshot(TypeId::of::<Pong>()).is_empty());
    }

    #[test]
    fn unsubscribe_removes_exactly_one() {
        let registry = Registry::new();
        let a = registry.subscribe::<Ping, _>(Priority::Normal, |_| {});
        let b = registry.subscribe::<Ping, _>(Priority::Normal, |_| {});
        assert_ne!(a, b);

        assert!(registry.unsubscribe(TypeId::of::<Ping>(), a));
        assert!(!registry.unsubscribe(TypeId::of::<Ping>(), a));
        let subs = registry.snapshot(TypeId::of::<Ping>());
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].id(), b);
    }

    #[test]
    fn unsubscribe_unknown_type_is_false() {
        let registry = Registry::new();
        assert!(!registry.unsubscribe(TypeId::of::<Pong>(), 1));
    }

    #[test]
    fn filter_gates_and_replaces() {
        let registry = Registry::new();
        let id = registry.subscribe::<Ping, _>(Priority::Normal, |_| {});

        assert!(registry.add_filter::<Ping, _>(id, |ev| ev.0 >= 5));
        let subs = registry.snapshot(TypeId::of::<Ping>());
        assert!(!subs[0].accepts(Priority::Normal, &Ping(2)));
        assert!(subs[0].accepts(Priority::Normal, &Ping(9)));

        // Replacement: the newer filter wins outright.
        assert!(registry.add_filter::<Ping, _>(id, |_| true));
        let subs = registry.snapshot(TypeId::of::<Ping>());
        assert!(subs[0].accepts(Priority::Normal, &Ping(2)));
    }

    #[test]
    fn add_filter_unknown_id_is_false() {
        let registry = Registry::new();
        registry.subscribe::<Ping, _>(Priority::Normal, |_| {});
        assert!(!registry.add_filter::<Ping, _>(999, |_: &Ping| true));
        assert!(!registry.add_filter::<Pong, _>(1, |_: &Pong| true));
    }

    #[test]
    fn min_priority_gate() {
        let registry = Registry::new();
        registry.subscribe::<Ping, _>(Priority::High, |_| {});
        let subs = registry.snapshot(TypeId::of::<Ping>());
        assert!(!subs[0].accepts(Priority::Low, &Ping(0)));
        assert!(!subs[0].accepts(Priority::Normal, &Ping(0)));
        assert!(subs[0].accepts(Priority::High, &Ping(0)));
        assert!(subs[0].accepts(Priority::Critical, &Ping(0)));
    }

    #[test]
    fn snapshot_survives_unsubscribe() {
        let registry = Registry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = Arc::clone(&count);
        let id = registry.subscribe::<Ping, _>(Priority::Normal, move |_| {
            count2.fetch_add(1, Ordering::SeqCst);
        });

        let subs = registry.snapshot(TypeId::of::<Ping>());
        assert!(registry.unsubscribe(TypeId::of::<Ping>(), id));
        // The copy taken before unsubscribe still delivers this dispatch.
        subs[0].invoke(&Ping(0));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
