// Copyright 2024 the VSTGUI Authors
// SPDX-License-Identifier: Apache-2.0

//! Process-wide access to the task executor.
//!
//! The host creates the executor for its platform once, at start-up, and
//! installs it here. Code anywhere in the toolkit can then schedule work
//! without being handed the executor.
//!
//! ```ignore
//! let executor = vstgui::shell::LinuxTaskExecutor::new(&config, schedule);
//! vstgui::tasks::install(Arc::new(executor));
//! ```
//!
//! Scheduling works from any thread. The waiting functions block the calling
//! thread and, except for background and serial queues, must be called from
//! the main thread.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::error;

use crate::shell::{Queue, Task, TaskExecutor};

static EXECUTOR: RwLock<Option<Arc<dyn TaskExecutor>>> = RwLock::new(None);

/// Install `executor` as the process-wide executor, returning the previous one.
pub fn install(executor: Arc<dyn TaskExecutor>) -> Option<Arc<dyn TaskExecutor>> {
    EXECUTOR
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(executor)
}

/// Remove the installed executor, returning it.
///
/// Every serial queue should have been released, and every queue drained,
/// before the executor is dropped.
pub fn uninstall() -> Option<Arc<dyn TaskExecutor>> {
    EXECUTOR
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
}

/// The installed executor, if any.
pub fn executor() -> Option<Arc<dyn TaskExecutor>> {
    EXECUTOR
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

// The lock is released before `f` runs, so `f` may block or schedule more
// work without holding up `install`.
fn with_executor<R>(operation: &str, f: impl FnOnce(&dyn TaskExecutor) -> R) -> Option<R> {
    match executor() {
        Some(executor) => Some(f(&*executor)),
        None => {
            debug_assert!(false, "tasks::{operation} called with no executor installed");
            error!("tasks::{} called with no executor installed", operation);
            None
        }
    }
}

/// The queue bound to the UI thread.
pub fn main_queue() -> Queue {
    Queue::Main
}

/// The shared concurrent queue.
pub fn background_queue() -> Queue {
    Queue::Background
}

/// Create a serial queue. Release it with [`release_serial_queue`].
///
/// # Panics
///
/// Panics if no executor is installed.
pub fn make_serial_queue(name: &str) -> Queue {
    match executor() {
        Some(executor) => executor.make_serial_queue(name),
        None => panic!("tasks::make_serial_queue({name:?}) called with no executor installed"),
    }
}

/// Wait for the tasks of a serial queue to finish, then release it.
pub fn release_serial_queue(queue: Queue) {
    with_executor("release_serial_queue", |executor| {
        executor.release_serial_queue(queue)
    });
}

/// Schedule `task` to run on `queue`.
pub fn schedule(queue: Queue, task: Task) {
    with_executor("schedule", |executor| executor.schedule(queue, task));
}

/// Block until every task scheduled on `queue` before this call has finished.
pub fn wait_all_tasks_executed(queue: Queue) {
    with_executor("wait_all_tasks_executed", |executor| {
        executor.wait_all_tasks_executed(queue)
    });
}

/// Block until every queue is drained. Main thread only.
pub fn wait_all_queues_executed() {
    with_executor("wait_all_queues_executed", |executor| {
        executor.wait_all_queues_executed()
    });
}
