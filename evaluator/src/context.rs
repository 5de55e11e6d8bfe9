//! Evaluator context affinity.
//!
//! The real CUE-like evaluator is not thread-safe: values built in one
//! context cannot be injected into a value built in another. [`Context`]
//! models that affinity directly — it is deliberately `!Send`/`!Sync`, and
//! every [`crate::Value`] carries the id of the context that produced it.
//! Mixing ids is a programmer error and panics at the point of misuse
//! rather than silently producing a wrong tree.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

/// A single-threaded evaluator session. Create one per executor job; never
/// share one across a thread/task boundary.
#[derive(Debug)]
pub struct Context {
    id: ContextId,
    // *const () is neither Send nor Sync, which is the point.
    _not_send_not_sync: PhantomData<*const ()>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        let id = ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed));
        Self { id, _not_send_not_sync: PhantomData }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Panics if `other` was not produced by this context. Call this at
    /// every operation that accepts a foreign `Value`/`Instance`, mirroring
    /// the real evaluator's `FillPath` guard (spec §8 scenario 5).
    #[track_caller]
    pub fn assert_owns(&self, other: ContextId) {
        assert_eq!(
            self.id, other,
            "cross-context use: value belongs to context {:?}, not the receiving context {:?}",
            other, self.id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contexts_get_distinct_ids() {
        let a = Context::new();
        let b = Context::new();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    #[should_panic(expected = "cross-context use")]
    fn assert_owns_panics_on_mismatch() {
        let a = Context::new();
        let b = Context::new();
        a.assert_owns(b.id());
    }
}
