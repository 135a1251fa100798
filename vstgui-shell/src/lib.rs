// Copyright 2024 the VSTGUI Authors
// SPDX-License-Identifier: Apache-2.0

//! Platform layer for the VSTGUI toolkit.
//!
//! This crate provides the two pieces of the toolkit that talk to the
//! operating system directly: the task executors behind the toolkit's
//! `Tasks` API, and (on X11) the XDND drag-and-drop protocol handler.
//!
//! Everything else in the toolkit consumes these through [`TaskExecutor`]
//! and [`DragHandler`].

#![warn(rustdoc::broken_intra_doc_links)]
#![allow(clippy::new_without_default)]
#![deny(clippy::trivially_copy_pass_by_ref)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use keyboard_types::Modifiers;
pub use kurbo;

#[macro_use]
mod util;

mod backend;
mod common_util;
mod dnd;
mod error;
mod tasks;

pub use dnd::{DataPackage, DataType, DragEventData, DragHandler, DragOperation};
pub use error::Error;
pub use tasks::{ExecutorConfig, Queue, SerialQueueId, Task, TaskExecutor, WORKER_THREADS_ENV};

pub use backend::shared::{MainThreadDispatch, ThreadPoolTaskExecutor};

#[cfg(any(target_os = "freebsd", target_os = "linux", target_os = "openbsd"))]
pub use backend::shared::linux::tasks::{LinuxTaskExecutor, ScheduleMainQueueTaskFunc};

#[cfg(target_os = "windows")]
pub use backend::windows::tasks::Win32TaskExecutor;

#[cfg(target_os = "macos")]
pub use backend::mac::tasks::MacTaskExecutor;

/// The X11 drag-and-drop backend.
#[cfg(all(
    feature = "x11",
    any(target_os = "freebsd", target_os = "linux", target_os = "openbsd")
))]
#[cfg_attr(docsrs, doc(cfg(feature = "x11")))]
pub mod x11 {
    pub use crate::backend::x11::atom::{Atom, XdndAtoms};
    pub use crate::backend::x11::child_window::ChildWindow;
    pub use crate::backend::x11::connection::{DndConnection, Property, X11Connection};
    pub use crate::backend::x11::error::Error;
    pub use crate::backend::x11::package::XdndDataPackage;
    pub use crate::backend::x11::xdnd::{DragState, XdndHandler, XDND_VERSION};
}
