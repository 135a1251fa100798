// Copyright 2024 the VSTGUI Authors
// SPDX-License-Identifier: Apache-2.0

//! The Linux task executor.
//!
//! Linux has no system-wide UI run loop, so the main queue is reached through
//! a function supplied by whoever owns the run loop.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::backend::shared::{MainThreadDispatch, ThreadPoolTaskExecutor};
use crate::common_util::run_next;
use crate::tasks::{ExecutorConfig, Task};

/// Posts a task to the host's run loop, to be run on its thread.
///
/// Called from any thread.
pub type ScheduleMainQueueTaskFunc = Box<dyn Fn(Task) + Send + Sync>;

/// The main queue on Linux.
///
/// Tasks wait in our own FIFO; the host only receives trampolines that run
/// the oldest waiting task. A main thread waiting for the queue can then run
/// the FIFO directly, and the host's trampolines find it already empty.
struct LinuxMainQueue {
    pending: Arc<Mutex<VecDeque<Task>>>,
    schedule: ScheduleMainQueueTaskFunc,
}

impl MainThreadDispatch for LinuxMainQueue {
    fn dispatch(&self, task: Task) {
        lock!(self.pending).push_back(task);
        let pending = Arc::clone(&self.pending);
        (self.schedule)(Box::new(move || {
            run_next(&pending);
        }));
    }

    fn pump(&self) {
        while run_next(&self.pending) {}
    }
}

/// The task executor used on Linux.
pub struct LinuxTaskExecutor(ThreadPoolTaskExecutor<LinuxMainQueue>);

impl LinuxTaskExecutor {
    /// Create an executor whose main queue posts through `schedule`.
    ///
    /// Must be called on the thread running the host's run loop.
    pub fn new(config: &ExecutorConfig, schedule: ScheduleMainQueueTaskFunc) -> LinuxTaskExecutor {
        let main = LinuxMainQueue {
            pending: Arc::new(Mutex::new(VecDeque::new())),
            schedule,
        };
        LinuxTaskExecutor(ThreadPoolTaskExecutor::new(config, main))
    }

    /// Whether the calling thread is the run loop's thread.
    pub fn is_main_thread(&self) -> bool {
        self.0.is_main_thread()
    }
}

forward_task_executor!(LinuxTaskExecutor);
