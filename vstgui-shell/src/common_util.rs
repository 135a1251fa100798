// Copyright 2024 the VSTGUI Authors
// SPDX-License-Identifier: Apache-2.0

//! Common functions used by the backends

use std::sync::atomic::{AtomicU64, Ordering};

use crate::tasks::Task;

/// Run a task, containing any panic it raises.
///
/// Returns `false` if the task panicked. The panic payload is logged and
/// dropped; workers and run loops keep going.
pub(crate) fn run_task(task: Task) -> bool {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(task)) {
        Ok(()) => true,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                .unwrap_or("<non-string panic payload>");
            tracing::error!("task panicked: {}", message);
            false
        }
    }
}

/// Run the oldest task in `pending`, returning `false` if there was none.
///
/// Backends that keep the main queue in their own FIFO hand the run loop
/// trampolines calling this, and drain the FIFO with it when pumping.
#[cfg(any(
    target_os = "freebsd",
    target_os = "linux",
    target_os = "openbsd",
    target_os = "macos"
))]
pub(crate) fn run_next(pending: &std::sync::Mutex<std::collections::VecDeque<Task>>) -> bool {
    let task = lock!(pending).pop_front();
    match task {
        Some(task) => {
            run_task(task);
            true
        }
        None => false,
    }
}

/// An incrementing counter for generating unique ids.
///
/// This can be used safely from multiple threads.
///
/// The counter will overflow if `next()` is called 2^64 - 2 times.
/// If this is possible for your application, and reuse would be undesirable,
/// use something else.
#[derive(Debug)]
pub(crate) struct Counter(AtomicU64);

impl Counter {
    /// Creates a new counter with a given starting value.
    ///
    /// # Safety
    ///
    /// The value must not be zero.
    pub(crate) const unsafe fn new_unchecked(init: u64) -> Counter {
        Counter(AtomicU64::new(init))
    }

    /// Return the next value.
    pub(crate) fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}
