//! # Cooperative Cancellation
//!
//! Every task handed to the worker pool receives a [`CancellationToken`]. The pool
//! trips the token on shutdown; tasks poll it at their own checkpoints (before
//! starting work, between expensive phases, while waiting for staging memory).
//!
//! Cancellation is best-effort. A task that already passed its last checkpoint
//! runs to completion, and nothing is ever interrupted mid-execution.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// A shared, clonable stop signal.
///
/// All clones observe the same flag. Once cancelled a token never resets.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
