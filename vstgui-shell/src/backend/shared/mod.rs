// Copyright 2024 the VSTGUI Authors
// SPDX-License-Identifier: Apache-2.0

//! Logic that is shared by more than one backend.
//!
//! Every platform runs its background and serial queues on the same
//! [`ThreadPool`]; the only thing a platform supplies is a way to reach its UI
//! thread, see [`MainThreadDispatch`].

#[macro_use]
mod executor;
mod outstanding;
mod serial_queue;
mod thread_pool;

pub use executor::{MainThreadDispatch, ThreadPoolTaskExecutor};
pub(crate) use outstanding::Outstanding;
pub(crate) use serial_queue::SerialQueue;
pub(crate) use thread_pool::ThreadPool;

cfg_if::cfg_if! {
    if #[cfg(any(target_os = "freebsd", target_os = "linux", target_os = "openbsd"))] {
        pub(crate) mod linux;
    }
}
