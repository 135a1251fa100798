// Copyright 2024 the VSTGUI Authors
// SPDX-License-Identifier: Apache-2.0

//! The executor every platform builds on.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;

use crate::common_util::Counter;
use crate::tasks::{ExecutorConfig, Queue, SerialQueueId, Task, TaskExecutor};

use super::{Outstanding, SerialQueue, ThreadPool};

/// How long a waiting main thread blocks between two pumps of its run loop.
const MAIN_PUMP_INTERVAL: Duration = Duration::from_millis(1);

/// The platform half of an executor: a way to run tasks on the UI thread.
pub trait MainThreadDispatch: Send + Sync + 'static {
    /// Hand `task` to the UI thread's run loop. Called from any thread.
    ///
    /// Tasks must run in the order they were dispatched. Dropping a task
    /// without running it is allowed when the run loop is gone.
    fn dispatch(&self, task: Task);

    /// Run main-queue work that is already waiting.
    ///
    /// Only called on the main thread, while it waits for the main queue to
    /// drain. Without it, such a wait would never finish.
    fn pump(&self);
}

/// A [`TaskExecutor`] running background and serial queues on a fixed
/// thread pool, and the main queue through `M`.
///
/// The thread that creates the executor is its main thread.
pub struct ThreadPoolTaskExecutor<M> {
    main: M,
    main_thread: ThreadId,
    main_outstanding: Arc<Outstanding>,
    background_outstanding: Arc<Outstanding>,
    pool: Arc<ThreadPool>,
    serial_queues: Mutex<HashMap<SerialQueueId, Arc<SerialQueue>>>,
    queue_ids: Counter,
}

impl<M: MainThreadDispatch> ThreadPoolTaskExecutor<M> {
    pub fn new(config: &ExecutorConfig, main: M) -> ThreadPoolTaskExecutor<M> {
        tracing::debug!(
            "creating task executor with {} worker threads",
            config.worker_threads()
        );
        ThreadPoolTaskExecutor {
            main,
            main_thread: thread::current().id(),
            main_outstanding: Arc::new(Outstanding::new()),
            background_outstanding: Arc::new(Outstanding::new()),
            pool: Arc::new(ThreadPool::new(config)),
            serial_queues: Mutex::new(HashMap::new()),
            // safe because the first serial id is nonzero
            queue_ids: unsafe { Counter::new_unchecked(SerialQueueId::FIRST) },
        }
    }

    /// The platform's main-thread glue.
    pub fn main_dispatch(&self) -> &M {
        &self.main
    }

    /// Whether the calling thread is this executor's main thread.
    pub fn is_main_thread(&self) -> bool {
        thread::current().id() == self.main_thread
    }

    /// The number of worker threads behind the background and serial queues.
    pub fn worker_threads(&self) -> usize {
        self.pool.size()
    }

    fn serial_queue(&self, id: SerialQueueId) -> Option<Arc<SerialQueue>> {
        lock!(self.serial_queues).get(&id).cloned()
    }

    fn live_serial_queues(&self) -> Vec<Arc<SerialQueue>> {
        lock!(self.serial_queues).values().cloned().collect()
    }

    /// Wrap `task` so that `outstanding` is decremented once it has run, or
    /// once it is dropped without running.
    fn counted(outstanding: &Arc<Outstanding>, task: Task) -> Task {
        outstanding.begin();
        let done = scopeguard::guard(Arc::clone(outstanding), |outstanding| outstanding.end());
        Box::new(move || {
            let _done = done;
            task()
        })
    }

    fn wait_main_queue(&self) {
        if !self.is_main_thread() {
            debug_assert!(false, "waiting on the main queue off the main thread");
            tracing::warn!("waiting on the main queue off the main thread");
            self.main_outstanding.wait();
            return;
        }
        while !self.main_outstanding.is_zero() {
            self.main.pump();
            self.main_outstanding.wait_timeout(MAIN_PUMP_INTERVAL);
        }
    }

    fn all_idle(&self) -> bool {
        let serial_queues = self.live_serial_queues();
        self.main_outstanding.is_zero()
            && self.background_outstanding.is_zero()
            && serial_queues.iter().all(|queue| queue.is_idle())
    }
}

impl<M: MainThreadDispatch> TaskExecutor for ThreadPoolTaskExecutor<M> {
    fn make_serial_queue(&self, name: &str) -> Queue {
        let id = SerialQueueId::new(self.queue_ids.next());
        let queue = SerialQueue::new(id, name, Arc::clone(&self.pool));
        lock!(self.serial_queues).insert(id, queue);
        tracing::debug!("created serial queue {:?} ({})", name, id.into_raw());
        Queue::Serial(id)
    }

    fn release_serial_queue(&self, queue: Queue) {
        let Queue::Serial(id) = queue else {
            tracing::warn!("{:?} is not a serial queue and cannot be released", queue);
            return;
        };
        let Some(serial) = self.serial_queue(id) else {
            tracing::warn!("release of unknown serial queue {}", id.into_raw());
            return;
        };
        serial.wait_all_executed();
        debug_assert!(serial.is_empty());
        lock!(self.serial_queues).remove(&serial.id());
        tracing::debug!("released serial queue {:?}", serial.name());
    }

    fn schedule(&self, queue: Queue, task: Task) {
        match queue {
            Queue::Main => self
                .main
                .dispatch(Self::counted(&self.main_outstanding, task)),
            Queue::Background => self
                .pool
                .enqueue(Self::counted(&self.background_outstanding, task)),
            Queue::Serial(id) => match self.serial_queue(id) {
                Some(serial) => serial.schedule(task),
                None => tracing::warn!(
                    "dropping task scheduled on unknown serial queue {}",
                    id.into_raw()
                ),
            },
        }
    }

    fn wait_all_tasks_executed(&self, queue: Queue) {
        match queue {
            Queue::Main => self.wait_main_queue(),
            Queue::Background => self.background_outstanding.wait(),
            Queue::Serial(id) => match self.serial_queue(id) {
                Some(serial) => serial.wait_all_executed(),
                None => tracing::warn!("waiting on unknown serial queue {}", id.into_raw()),
            },
        }
    }

    fn wait_all_queues_executed(&self) {
        debug_assert!(
            self.is_main_thread(),
            "waiting on all queues off the main thread"
        );
        // Tasks may schedule more work on other queues, so keep going until
        // one pass finds nothing outstanding anywhere.
        loop {
            for queue in self.live_serial_queues() {
                queue.wait_all_executed();
            }
            self.background_outstanding.wait();
            self.wait_main_queue();
            if self.all_idle() {
                break;
            }
        }
    }
}

impl<M> Drop for ThreadPoolTaskExecutor<M> {
    fn drop(&mut self) {
        let serial_queues = self
            .serial_queues
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if !serial_queues.is_empty() {
            tracing::warn!(
                "task executor dropped with {} serial queues still alive",
                serial_queues.len()
            );
        }
        debug_assert!(
            serial_queues.is_empty() || thread::panicking(),
            "all serial queues must be released before the executor is dropped"
        );
    }
}

/// Implement [`TaskExecutor`] for a newtype around a
/// [`ThreadPoolTaskExecutor`] by forwarding to its field `.0`.
macro_rules! forward_task_executor {
    ($ty:ty) => {
        impl $crate::TaskExecutor for $ty {
            fn make_serial_queue(&self, name: &str) -> $crate::Queue {
                $crate::TaskExecutor::make_serial_queue(&self.0, name)
            }

            fn release_serial_queue(&self, queue: $crate::Queue) {
                $crate::TaskExecutor::release_serial_queue(&self.0, queue)
            }

            fn schedule(&self, queue: $crate::Queue, task: $crate::Task) {
                $crate::TaskExecutor::schedule(&self.0, queue, task)
            }

            fn wait_all_tasks_executed(&self, queue: $crate::Queue) {
                $crate::TaskExecutor::wait_all_tasks_executed(&self.0, queue)
            }

            fn wait_all_queues_executed(&self) {
                $crate::TaskExecutor::wait_all_queues_executed(&self.0)
            }
        }
    };
}
