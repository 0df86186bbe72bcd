//! # Completion Signals
//!
//! A [`Fence`] reports that previously submitted device work has finished. The
//! device backend signals it (for wgpu, from the `on_submitted_work_done`
//! callback that fires during `Device::poll`); the staging arena and the deferred
//! destruction queue observe it.
//!
//! Fences can be polled from the main thread without blocking, or waited on from
//! a worker thread that needs staging space.

use std::{
    sync::{Arc, Condvar, Mutex, PoisonError},
    time::Duration,
};

#[derive(Debug, Default)]
struct FenceInner {
    signaled: Mutex<bool>,
    condvar: Condvar,
}

/// A one-shot, clonable completion signal.
#[derive(Clone, Debug, Default)]
pub struct Fence {
    inner: Arc<FenceInner>,
}

impl Fence {
    /// Creates an unsignaled fence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fence that is already signaled.
    pub fn signaled() -> Self {
        let fence = Self::new();
        fence.signal();
        fence
    }

    /// Marks the fence as complete and wakes all waiters.
    pub fn signal(&self) {
        let mut signaled = self
            .inner
            .signaled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *signaled = true;
        self.inner.condvar.notify_all();
    }

    /// Non-blocking completion check.
    pub fn is_signaled(&self) -> bool {
        *self
            .inner
            .signaled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until the fence is signaled or `timeout` elapses.
    ///
    /// # Returns
    /// `true` if the fence was signaled when the call returned.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let signaled = self
            .inner
            .signaled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (signaled, _) = self
            .inner
            .condvar
            .wait_timeout_while(signaled, timeout, |done| !*done)
            .unwrap_or_else(PoisonError::into_inner);
        *signaled
    }

    /// Returns `true` if both handles refer to the same signal.
    pub fn same_as(&self, other: &Fence) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
