// Copyright 2024 the VSTGUI Authors
// SPDX-License-Identifier: Apache-2.0

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

/// A count of submitted-but-unfinished tasks that can be waited on.
///
/// The mutex inside is a leaf: no other lock is ever taken while it is held.
#[derive(Debug, Default)]
pub(crate) struct Outstanding {
    count: Mutex<usize>,
    drained: Condvar,
}

impl Outstanding {
    pub(crate) fn new() -> Outstanding {
        Outstanding::default()
    }

    /// Record a newly submitted task.
    pub(crate) fn begin(&self) {
        *lock!(self.count) += 1;
    }

    /// Record that a task finished (or was discarded).
    pub(crate) fn end(&self) {
        let mut count = lock!(self.count);
        debug_assert!(*count > 0, "unbalanced Outstanding::end");
        *count = count.saturating_sub(1);
        if *count == 0 {
            drop(count);
            self.drained.notify_all();
        }
    }

    pub(crate) fn count(&self) -> usize {
        *lock!(self.count)
    }

    pub(crate) fn is_zero(&self) -> bool {
        self.count() == 0
    }

    /// Block until the count drops to zero.
    pub(crate) fn wait(&self) {
        let mut count = lock!(self.count);
        while *count != 0 {
            count = self
                .drained
                .wait(count)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block until the count drops to zero or `timeout` has passed.
    ///
    /// Returns `true` if the count is zero.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> bool {
        let count = lock!(self.count);
        let (count, _) = self
            .drained
            .wait_timeout_while(count, timeout, |count| *count != 0)
            .unwrap_or_else(PoisonError::into_inner);
        *count == 0
    }
}
