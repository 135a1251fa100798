// Copyright 2024 the VSTGUI Authors
// SPDX-License-Identifier: Apache-2.0

//! A fixed-size pool of worker threads draining one FIFO.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, Once, PoisonError};
use std::thread::{self, JoinHandle};

use crate::common_util::run_task;
use crate::tasks::{ExecutorConfig, Task};

use super::Outstanding;

pub(crate) struct ThreadPool {
    shared: Arc<Shared>,
    size: usize,
    thread_name: String,
    /// Workers are spawned the first time a task is enqueued.
    started: Once,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

struct Shared {
    queue: Mutex<PoolQueue>,
    work_available: Condvar,
    /// Tasks accepted by `enqueue` that have not finished running yet.
    outstanding: Outstanding,
}

struct PoolQueue {
    tasks: VecDeque<Task>,
    stop: bool,
}

impl ThreadPool {
    pub(crate) fn new(config: &ExecutorConfig) -> ThreadPool {
        ThreadPool {
            shared: Arc::new(Shared {
                queue: Mutex::new(PoolQueue {
                    tasks: VecDeque::new(),
                    stop: false,
                }),
                work_available: Condvar::new(),
                outstanding: Outstanding::new(),
            }),
            size: config.worker_threads().get(),
            thread_name: config.thread_name().to_owned(),
            started: Once::new(),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// The number of worker threads.
    pub(crate) fn size(&self) -> usize {
        self.size
    }

    /// Append `task` to the queue and wake one worker.
    ///
    /// Enqueueing after the pool started shutting down is a programming error.
    pub(crate) fn enqueue(&self, task: Task) {
        self.shared.outstanding.begin();
        {
            let mut queue = lock!(self.shared.queue);
            if queue.stop {
                drop(queue);
                self.shared.outstanding.end();
                debug_assert!(false, "task enqueued on a stopped thread pool");
                tracing::error!("task enqueued on a stopped thread pool, discarding it");
                return;
            }
            queue.tasks.push_back(task);
        }
        self.started.call_once(|| self.spawn_workers());
        self.shared.work_available.notify_one();
    }

    /// Whether every accepted task has finished.
    #[cfg(test)]
    pub(crate) fn is_idle(&self) -> bool {
        self.shared.outstanding.is_zero()
    }

    /// Block until every accepted task has finished.
    #[cfg(test)]
    pub(crate) fn wait_idle(&self) {
        self.shared.outstanding.wait()
    }

    fn spawn_workers(&self) {
        let mut workers = lock!(self.workers);
        for index in 0..self.size {
            let shared = Arc::clone(&self.shared);
            let spawned = thread::Builder::new()
                .name(format!("{}-{}", self.thread_name, index))
                .spawn(move || worker_loop(&shared));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => tracing::error!("failed to spawn worker thread {}: {}", index, e),
            }
        }
        if workers.is_empty() {
            tracing::error!("thread pool has no workers, queued tasks will never run");
        } else {
            tracing::debug!("started {} worker threads", workers.len());
        }
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let task = {
            let mut queue = lock!(shared.queue);
            while !queue.stop && queue.tasks.is_empty() {
                queue = shared
                    .work_available
                    .wait(queue)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            if queue.stop {
                return;
            }
            queue.tasks.pop_front()
        };
        if let Some(task) = task {
            run_task(task);
            shared.outstanding.end();
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        let discarded = {
            let mut queue = lock!(self.shared.queue);
            queue.stop = true;
            std::mem::take(&mut queue.tasks)
        };
        self.shared.work_available.notify_all();

        if !discarded.is_empty() {
            tracing::warn!(
                "thread pool shut down with {} queued tasks, they will not run",
                discarded.len()
            );
        }
        debug_assert!(
            discarded.is_empty() || thread::panicking(),
            "thread pool dropped before its queue was drained"
        );
        // The discarded tasks may own references that release more work; drop
        // them outside of the queue lock.
        drop(discarded);

        let current = thread::current().id();
        let workers = std::mem::take(
            self.workers
                .get_mut()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for handle in workers {
            // The last reference to the pool can be dropped by one of its own
            // tasks; that worker exits on its own once it sees `stop`.
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                tracing::error!("worker thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::num::NonZeroUsize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use test_log::test;

    fn pool(workers: usize) -> ThreadPool {
        let config = ExecutorConfig::default()
            .with_worker_threads(NonZeroUsize::new(workers).unwrap())
            .with_thread_name("test-pool");
        ThreadPool::new(&config)
    }

    #[test]
    fn runs_every_task() {
        let pool = pool(4);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..500 {
            let counter = Arc::clone(&counter);
            pool.enqueue(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }
        pool.wait_idle();
        assert!(pool.is_idle());
        assert_eq!(counter.load(Ordering::SeqCst), 500);
    }

    #[test]
    fn concurrency_is_bounded_by_worker_count() {
        let pool = pool(3);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        for _ in 0..60 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            pool.enqueue(Box::new(move || {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_micros(200));
                running.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        pool.wait_idle();
        let peak = peak.load(Ordering::SeqCst);
        assert!(peak >= 1 && peak <= pool.size(), "peak concurrency {peak}");
    }

    #[test]
    fn panicking_task_does_not_kill_the_pool() {
        let pool = pool(1);
        let ran = Arc::new(AtomicUsize::new(0));
        pool.enqueue(Box::new(|| panic!("task failure")));
        let ran_clone = Arc::clone(&ran);
        pool.enqueue(Box::new(move || {
            ran_clone.fetch_add(1, Ordering::SeqCst);
        }));
        pool.wait_idle();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn workers_start_lazily() {
        let pool = pool(2);
        assert!(lock!(pool.workers).is_empty());
        pool.enqueue(Box::new(|| {}));
        pool.wait_idle();
        assert_eq!(lock!(pool.workers).len(), 2);
    }
}
