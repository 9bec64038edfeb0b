//! Type-erased event envelopes.
//!
//! A published payload is boxed behind `dyn Any` and tagged with its
//! [`TypeId`] so the queue and dispatcher can move it around without
//! knowing the concrete type. The registry's per-subscription shims
//! downcast back to the declared type at invocation time.

use std::any::{Any, TypeId};

use super::priority::Priority;

/// An event awaiting dispatch: payload plus priority plus type identity.
///
/// Envelopes live from publication to the end of the dispatch that
/// consumes them; an envelope rejected at the queue bound is destroyed at
/// the publication site.
pub(crate) struct Envelope {
    type_id: TypeId,
    priority: Priority,
    payload: Box<dyn Any + Send>,
}

impl Envelope {
    pub(crate) fn new<T: Send + 'static>(payload: T, priority: Priority) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            priority,
            payload: Box::new(payload),
        }
    }

    pub(crate) fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub(crate) fn priority(&self) -> Priority {
        self.priority
    }

    /// Borrows the erased payload for handler shims.
    pub(crate) fn payload(&self) -> &(dyn Any + Send) {
        self.payload.as_ref()
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("type_id", &self.type_id)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_keeps_type_identity() {
        let env = Envelope::new(42u32, Priority::High);
        assert_eq!(env.type_id(), TypeId::of::<u32>());
        assert_eq!(env.priority(), Priority::High);
        assert_eq!(env.payload().downcast_ref::<u32>(), Some(&42));
        assert!(env.payload().downcast_ref::<i64>().is_none());
    }
}
