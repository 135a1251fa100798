// Copyright 2024 the VSTGUI Authors
// SPDX-License-Identifier: Apache-2.0

//! Utility macros shared by the executors and the backends.

/// Lock a `std::sync::Mutex`, recovering the guard if another thread panicked
/// while holding it.
///
/// Tasks never run while one of our locks is held.
macro_rules! lock {
    ($val:expr) => {
        $val.lock().unwrap_or_else(|poisoned| {
            tracing::warn!(
                "[{}:{}] {} was poisoned",
                std::file!(),
                std::line!(),
                std::stringify!($val)
            );
            poisoned.into_inner()
        })
    };
}
