// Copyright 2024 the VSTGUI Authors
// SPDX-License-Identifier: Apache-2.0

//! Strictly ordered queues layered on the shared thread pool.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::common_util::run_task;
use crate::tasks::{SerialQueueId, Task};

use super::{Outstanding, ThreadPool};

/// A queue whose tasks run one at a time, in submission order, on the pool.
///
/// At most one of its tasks is in the pool at any moment. The queue only
/// occupies a worker while one of its tasks is actually running.
pub(crate) struct SerialQueue {
    id: SerialQueueId,
    name: String,
    pool: Arc<ThreadPool>,
    state: Mutex<SerialState>,
    outstanding: Outstanding,
}

struct SerialState {
    tasks: VecDeque<Task>,
    /// Whether a "run next" step for this queue is in the pool.
    scheduled: bool,
}

impl SerialQueue {
    pub(crate) fn new(id: SerialQueueId, name: &str, pool: Arc<ThreadPool>) -> Arc<SerialQueue> {
        Arc::new(SerialQueue {
            id,
            name: name.to_owned(),
            pool,
            state: Mutex::new(SerialState {
                tasks: VecDeque::new(),
                scheduled: false,
            }),
            outstanding: Outstanding::new(),
        })
    }

    pub(crate) fn id(&self) -> SerialQueueId {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn schedule(self: &Arc<Self>, task: Task) {
        self.outstanding.begin();
        let submit = {
            let mut state = lock!(self.state);
            state.tasks.push_back(task);
            !std::mem::replace(&mut state.scheduled, true)
        };
        if submit {
            self.submit_next();
        }
    }

    fn submit_next(self: &Arc<Self>) {
        let queue = Arc::clone(self);
        self.pool
            .enqueue(Box::new(move || queue.run_and_schedule_next()));
    }

    fn run_and_schedule_next(self: Arc<Self>) {
        let task = lock!(self.state).tasks.pop_front();
        if let Some(task) = task {
            if !run_task(task) {
                tracing::warn!("a task on serial queue {:?} panicked", self.name);
            }
            self.outstanding.end();
        }

        let more = {
            let mut state = lock!(self.state);
            if state.tasks.is_empty() {
                state.scheduled = false;
                false
            } else {
                true
            }
        };
        if more {
            self.submit_next();
        }
    }

    /// Whether the queue holds no pending tasks.
    ///
    /// A task is removed from the queue right before it runs, so this can be
    /// `true` while the last task is still executing. Use
    /// [`wait_all_executed`](Self::wait_all_executed) to wait for completion.
    pub(crate) fn is_empty(&self) -> bool {
        lock!(self.state).tasks.is_empty()
    }

    /// Whether every task scheduled so far has finished.
    pub(crate) fn is_idle(&self) -> bool {
        self.outstanding.is_zero()
    }

    /// Block until every task scheduled so far has finished.
    pub(crate) fn wait_all_executed(&self) {
        self.outstanding.wait()
    }
}

impl fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SerialQueue")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("outstanding", &self.outstanding.count())
            .finish()
    }
}

impl Drop for SerialQueue {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if !state.tasks.is_empty() {
            tracing::warn!(
                "serial queue {:?} destroyed with {} pending tasks",
                self.name,
                state.tasks.len()
            );
        }
        debug_assert!(
            state.tasks.is_empty() || std::thread::panicking(),
            "serial queue destroyed before it was drained"
        );
    }
}
