// Copyright 2024 the VSTGUI Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors at the platform layer.

use std::fmt;
use std::sync::Arc;

/// Shell errors.
#[derive(Debug, Clone)]
pub enum Error {
    /// The platform refused to create the object that receives main-queue
    /// tasks: a hidden window on Windows, a runner object on macOS.
    MainQueueUnavailable,
    /// X11 specific error.
    #[cfg(all(
        feature = "x11",
        any(target_os = "freebsd", target_os = "linux", target_os = "openbsd")
    ))]
    X11(crate::backend::x11::error::Error),
    /// Other miscellaneous error.
    Other(Arc<anyhow::Error>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            Error::MainQueueUnavailable => {
                write!(f, "Failed to set up the main queue for this platform.")
            }
            #[cfg(all(
                feature = "x11",
                any(target_os = "freebsd", target_os = "linux", target_os = "openbsd")
            ))]
            Error::X11(err) => fmt::Display::fmt(err, f),
            Error::Other(s) => write!(f, "{s}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<anyhow::Error> for Error {
    fn from(src: anyhow::Error) -> Error {
        Error::Other(Arc::new(src))
    }
}

#[cfg(all(
    feature = "x11",
    any(target_os = "freebsd", target_os = "linux", target_os = "openbsd")
))]
impl From<crate::backend::x11::error::Error> for Error {
    fn from(src: crate::backend::x11::error::Error) -> Error {
        Error::X11(src)
    }
}
