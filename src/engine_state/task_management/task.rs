//! # Task System Core Traits
//!
//! ## Core Components
//! - `Task`: a unit of work executed on a worker thread
//! - `TaskResult`: what a task hands back, applied on the main thread
//!
//! ## Task Lifecycle
//! 1. A `Task` is published via `TaskManager::publish_task()`
//! 2. A worker calls `process()` with the pool's cancellation token
//! 3. The task returns a boxed `TaskResult` over the result channel
//! 4. The scheduler drains results once per frame and calls `handle_result()`
//!
//! ## Thread Safety
//! - `Task` and `TaskResult` must be `Send` to cross the channel
//! - Tasks own everything they touch (leases, `Arc`s), never borrowed engine state

use crate::{core::CancellationToken, engine_state::scheduler::CompletionContext};

/// A unit of work that runs on a worker thread.
pub trait Task: Send {
    /// Performs the work.
    ///
    /// `cancel` is tripped when the pool shuts down. Checking it is up to the task;
    /// a task that already passed its last check runs to completion.
    ///
    /// # Returns
    /// A boxed `TaskResult` that will be handled on the main thread.
    fn process(self: Box<Self>, cancel: &CancellationToken) -> Box<dyn TaskResult>;
}

/// The result of processing a `Task`.
pub trait TaskResult: Send {
    /// Applies the result on the main thread.
    ///
    /// Runs inside the frame loop, so keep it cheap: bookkeeping only, no meshing
    /// or device work.
    fn handle_result(self: Box<Self>, context: &mut CompletionContext<'_>);
}
