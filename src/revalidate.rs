//! Revalidation handles.
//!
//! The list owns its pager, but whoever mutates threads (sending a message,
//! resuming an interrupt) needs a way to say "refetch". The list registers a
//! [`StableCallback`] with a [`RevalidationBridge`] once; afterwards it swaps
//! the callback's closure as often as it likes without re-registering.

use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::debug;

type Callback = Arc<dyn Fn() + Send + Sync>;

/// A callback handle whose identity never changes while its target does.
///
/// Clones share the same slot, so an `update` through one clone is seen by
/// every holder.
#[derive(Clone)]
pub struct StableCallback {
    current: Arc<RwLock<Callback>>,
}

impl StableCallback {
    pub fn new(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(f))),
        }
    }

    /// A handle that does nothing until updated.
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// Point the handle at a new closure.
    pub fn update(&self, f: impl Fn() + Send + Sync + 'static) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = Arc::new(f);
    }

    /// Run the latest closure.
    pub fn call(&self) {
        // Release the lock before calling so the closure may `update` us.
        let f = Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner));
        f();
    }

    /// Whether two handles share the same slot.
    pub fn same_handle(&self, other: &StableCallback) -> bool {
        Arc::ptr_eq(&self.current, &other.current)
    }
}

impl fmt::Debug for StableCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StableCallback")
            .field("slot", &Arc::as_ptr(&self.current))
            .finish()
    }
}

/// Parent-side holder for the list's revalidation handle.
#[derive(Debug, Clone, Default)]
pub struct RevalidationBridge {
    slot: Arc<OnceLock<StableCallback>>,
}

impl RevalidationBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the list's handle. Only the first registration sticks;
    /// later ones return `false`.
    pub fn register(&self, callback: StableCallback) -> bool {
        let accepted = self.slot.set(callback).is_ok();
        if !accepted {
            debug!("revalidation handle already registered");
        }
        accepted
    }

    pub fn is_registered(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Ask the list to refetch. Does nothing before registration.
    pub fn revalidate(&self) {
        match self.slot.get() {
            Some(callback) => callback.call(),
            None => debug!("revalidate called before the list registered"),
        }
    }
}
