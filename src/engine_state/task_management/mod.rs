//! # Task Management System
//!
//! A fixed pool of worker threads executing terrain and meshing tasks off the
//! main thread.
//!
//! ## Architecture Overview
//! - `TaskManager`: owns the workers, the shared queue and the result channel
//! - `Task`: a unit of work executed asynchronously
//! - `TaskResult`: the result of a completed task, applied on the main thread
//!
//! Workers pull from one `Mutex<VecDeque>` and sleep on a `Condvar` while it is
//! empty, so an idle worker picks up the next task regardless of who published
//! it. Results travel back over an `mpsc` channel and are drained by the
//! scheduler once per frame.
//!
//! ## Task Lifecycle
//! 1. Tasks are published via `TaskManager::publish_task()`
//! 2. The first idle worker pops the task and calls `Task::process()`
//! 3. The result is sent back over the channel
//! 4. `TaskManager::drain_completed()` returns everything that finished so far
//!
//! ## Shutdown
//! `TaskManager::shutdown()` trips the shared [`CancellationToken`], drops every
//! queued task, wakes all workers and joins them. Cancellation is cooperative:
//! a task that is already running finishes (tasks check the token at their own
//! checkpoints) but no new task starts.
//!
//! ## Example Usage
//! ```rust,ignore
//! let mut task_manager = TaskManager::new(TaskManager::worker_count(1));
//! task_manager.publish_task(Box::new(MyTask::new(...)));
//!
//! // In the frame loop:
//! for result in task_manager.drain_completed() {
//!     result.handle_result(&mut context);
//! }
//! ```

pub mod task;

use std::{
    collections::VecDeque,
    sync::{
        mpsc::{channel, Receiver, Sender},
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, JoinHandle},
};

use log::info;
use task::{Task, TaskResult};

use crate::core::CancellationToken;

/// State shared between the manager and its workers.
struct SharedQueue {
    tasks: Mutex<VecDeque<Box<dyn Task>>>,
    available: Condvar,
    cancel: CancellationToken,
}

impl SharedQueue {
    fn lock(&self) -> MutexGuard<'_, VecDeque<Box<dyn Task>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until a task is available or the pool is cancelled.
    fn next_task(&self) -> Option<Box<dyn Task>> {
        let mut tasks = self.lock();
        loop {
            if self.cancel.is_cancelled() {
                return None;
            }
            if let Some(task) = tasks.pop_front() {
                return Some(task);
            }
            tasks = self
                .available
                .wait(tasks)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Manages a pool of worker threads and collects their results.
pub struct TaskManager {
    shared: Arc<SharedQueue>,
    workers: Vec<JoinHandle<()>>,
    result_receiver: Receiver<Box<dyn TaskResult>>,
    published: u64,
    completed: u64,
}

impl TaskManager {
    /// Worker count for this machine: available parallelism minus `reserve`, at least 1.
    pub fn worker_count(reserve: usize) -> usize {
        let parallelism = thread::available_parallelism().map_or(1, |n| n.get());
        parallelism.saturating_sub(reserve).max(1)
    }

    /// Spawns `num_workers` worker threads (at least one).
    pub fn new(num_workers: usize) -> Self {
        let num_workers = num_workers.max(1);
        let shared = Arc::new(SharedQueue {
            tasks: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            cancel: CancellationToken::new(),
        });
        let (result_sender, result_receiver) = channel::<Box<dyn TaskResult>>();

        let workers = (0..num_workers)
            .map(|index| {
                let shared = shared.clone();
                let result_sender = result_sender.clone();
                thread::Builder::new()
                    .name(format!("chunk-worker-{index}"))
                    .spawn(move || worker_loop(&shared, &result_sender))
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(err) => {
                    log::error!("failed to spawn worker thread: {err}");
                    None
                }
            })
            .collect::<Vec<_>>();

        info!(
            "Task manager started with {} workers (available parallelism: {:?})",
            workers.len(),
            thread::available_parallelism()
        );

        TaskManager {
            shared,
            workers,
            result_receiver,
            published: 0,
            completed: 0,
        }
    }

    /// Number of running worker threads.
    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Queues a task for the next idle worker.
    ///
    /// Returns `false` if the manager is shut down; the task is dropped.
    pub fn publish_task(&mut self, task: Box<dyn Task>) -> bool {
        if self.shared.cancel.is_cancelled() {
            return false;
        }
        self.shared.lock().push_back(task);
        self.shared.available.notify_one();
        self.published += 1;
        true
    }

    /// Tasks waiting for a worker.
    pub fn queued_len(&self) -> usize {
        self.shared.lock().len()
    }

    /// Tasks published but whose results were not drained yet.
    pub fn outstanding(&self) -> u64 {
        self.published - self.completed
    }

    /// Takes every result that arrived so far without blocking.
    pub fn drain_completed(&mut self) -> Vec<Box<dyn TaskResult>> {
        let results: Vec<_> = self.result_receiver.try_iter().collect();
        self.completed += results.len() as u64;
        results
    }

    /// Cancels outstanding work and joins all workers. Idempotent.
    pub fn shutdown(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.shared.cancel.cancel();
        let dropped = {
            let mut tasks = self.shared.lock();
            let dropped = tasks.len();
            tasks.clear();
            dropped
        };
        self.shared.available.notify_all();

        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("worker thread panicked");
            }
        }
        info!("Task manager stopped ({dropped} queued tasks dropped)");
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: &SharedQueue, results: &Sender<Box<dyn TaskResult>>) {
    while let Some(task) = shared.next_task() {
        let result = task.process(&shared.cancel);
        if results.send(result).is_err() {
            return;
        }
    }
}
