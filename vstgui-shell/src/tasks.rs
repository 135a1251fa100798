// Copyright 2024 the VSTGUI Authors
// SPDX-License-Identifier: Apache-2.0

//! Task queues and the executor contract implemented by every platform.

use std::fmt;
use std::num::NonZeroUsize;

/// A unit of work.
///
/// Tasks are moved into a queue when they are scheduled and run exactly once.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Identifies a serial queue created by [`TaskExecutor::make_serial_queue`].
///
/// Ids are minted by the executor and never reused by it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SerialQueueId(u64);

impl SerialQueueId {
    /// The first id handed out for serial queues.
    ///
    /// Ids below this one are the identifiers of the main and the
    /// background queue.
    pub(crate) const FIRST: u64 = 2;

    pub(crate) fn new(raw: u64) -> SerialQueueId {
        debug_assert!(raw >= Self::FIRST);
        SerialQueueId(raw)
    }

    /// Get the raw value for this id.
    pub const fn into_raw(self) -> u64 {
        self.0
    }
}

/// A handle naming one of the executor's queues.
///
/// Queues are plain values: copying one does not copy the queue, and dropping
/// one does not release it. The executor owns the backing resources.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Queue {
    /// The queue bound to the UI thread's run loop.
    Main,
    /// The shared concurrent queue.
    Background,
    /// A serial queue owned by whoever called
    /// [`TaskExecutor::make_serial_queue`].
    Serial(SerialQueueId),
}

impl Queue {
    /// The numeric identifier of this queue.
    ///
    /// The main queue is always `0` and the background queue always `1`;
    /// serial queues count up from `2`.
    pub const fn identifier(self) -> u64 {
        match self {
            Queue::Main => 0,
            Queue::Background => 1,
            Queue::Serial(id) => id.into_raw(),
        }
    }
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Queue::Main => write!(f, "Queue::Main"),
            Queue::Background => write!(f, "Queue::Background"),
            Queue::Serial(id) => write!(f, "Queue::Serial({})", id.0),
        }
    }
}

/// The contract between the toolkit and a platform's task machinery.
///
/// Scheduling is allowed from any thread. Waiting on the main queue, or on
/// everything at once, is only allowed from the main thread; this is checked
/// with debug assertions.
pub trait TaskExecutor: Send + Sync {
    /// The queue whose tasks run on the UI thread.
    fn main_queue(&self) -> Queue {
        Queue::Main
    }

    /// The shared concurrent queue.
    fn background_queue(&self) -> Queue {
        Queue::Background
    }

    /// Create a new serial queue.
    ///
    /// The name is informational only.
    fn make_serial_queue(&self, name: &str) -> Queue;

    /// Wait until `queue` has run all its tasks, then destroy it.
    ///
    /// Releasing a queue that is not a live serial queue does nothing.
    fn release_serial_queue(&self, queue: Queue);

    /// Schedule `task` on `queue`.
    fn schedule(&self, queue: Queue, task: Task);

    /// Block the calling thread until every task scheduled on `queue` before
    /// this call has finished.
    fn wait_all_tasks_executed(&self, queue: Queue);

    /// Block the calling (main) thread until every queue, the main queue
    /// included, has no outstanding work.
    fn wait_all_queues_executed(&self);
}

/// The name of the environment variable overriding the worker count.
pub const WORKER_THREADS_ENV: &str = "VSTGUI_WORKER_THREADS";

/// Configuration of the worker pool behind the background and serial queues.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub(crate) worker_threads: NonZeroUsize,
    pub(crate) thread_name: String,
}

impl ExecutorConfig {
    /// Set the number of worker threads.
    pub fn with_worker_threads(mut self, count: NonZeroUsize) -> Self {
        self.worker_threads = count;
        self
    }

    /// Set the prefix used to name worker threads.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// The number of worker threads.
    pub fn worker_threads(&self) -> NonZeroUsize {
        self.worker_threads
    }

    /// The prefix used to name worker threads.
    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    fn worker_threads_from_env() -> Option<NonZeroUsize> {
        let value = std::env::var(WORKER_THREADS_ENV).ok()?;
        match value.trim().parse::<NonZeroUsize>() {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::warn!(
                    "ignoring {}={:?}, expected a positive integer: {}",
                    WORKER_THREADS_ENV,
                    value,
                    e
                );
                None
            }
        }
    }
}

impl Default for ExecutorConfig {
    /// One worker per hardware thread, unless `VSTGUI_WORKER_THREADS` says
    /// otherwise.
    fn default() -> Self {
        let worker_threads = Self::worker_threads_from_env().unwrap_or_else(|| {
            std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
        });
        ExecutorConfig {
            worker_threads,
            thread_name: "vstgui-worker".into(),
        }
    }
}
