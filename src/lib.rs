// Copyright 2024 the VSTGUI Authors
// SPDX-License-Identifier: Apache-2.0

//! Task queues and drag-and-drop for the VSTGUI toolkit.
//!
//! The process-wide entry points live in [`tasks`]. The platform pieces
//! behind them, including the X11 drop target, are in [`shell`].

#![warn(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use vstgui_shell as shell;

pub mod tasks;

// These are the types from shell that we expose at the top level.
pub use shell::{
    DataPackage, DataType, DragEventData, DragHandler, DragOperation, Error as PlatformError,
    ExecutorConfig, Queue, Task, TaskExecutor,
};
