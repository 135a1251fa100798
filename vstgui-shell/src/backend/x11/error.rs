// Copyright 2024 the VSTGUI Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors in the X11 backend.

use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum Error {
    XError(Arc<x11rb::errors::ReplyError>),
    /// The connection ran out of resource ids.
    IdsExhausted,
    /// The requested screen does not exist on this display.
    NoSuchScreen(usize),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            Error::XError(e) => e.fmt(f),
            Error::IdsExhausted => write!(f, "X11 resource ids exhausted"),
            Error::NoSuchScreen(screen) => write!(f, "X11 screen {screen} does not exist"),
        }
    }
}

impl std::error::Error for Error {}

impl From<x11rb::x11_utils::X11Error> for Error {
    fn from(err: x11rb::x11_utils::X11Error) -> Error {
        Error::XError(Arc::new(x11rb::errors::ReplyError::X11Error(err)))
    }
}

impl From<x11rb::errors::ReplyError> for Error {
    fn from(err: x11rb::errors::ReplyError) -> Error {
        Error::XError(Arc::new(err))
    }
}

impl From<x11rb::errors::ConnectionError> for Error {
    fn from(err: x11rb::errors::ConnectionError) -> Error {
        Error::XError(Arc::new(x11rb::errors::ReplyError::ConnectionError(err)))
    }
}

impl From<x11rb::errors::ReplyOrIdError> for Error {
    fn from(err: x11rb::errors::ReplyOrIdError) -> Error {
        use x11rb::errors::ReplyOrIdError;
        match err {
            ReplyOrIdError::IdsExhausted => Error::IdsExhausted,
            ReplyOrIdError::ConnectionError(e) => e.into(),
            ReplyOrIdError::X11Error(e) => e.into(),
        }
    }
}
