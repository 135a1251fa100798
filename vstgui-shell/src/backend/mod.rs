// Copyright 2024 the VSTGUI Authors
// SPDX-License-Identifier: Apache-2.0

//! Platform specific implementations.

#[macro_use]
pub(crate) mod shared;

#[cfg(all(
    feature = "x11",
    any(target_os = "freebsd", target_os = "linux", target_os = "openbsd")
))]
pub(crate) mod x11;

#[cfg(target_os = "windows")]
pub(crate) mod windows;

#[cfg(target_os = "macos")]
pub(crate) mod mac;
