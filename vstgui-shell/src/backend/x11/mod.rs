// Copyright 2024 the VSTGUI Authors
// SPDX-License-Identifier: Apache-2.0

//! X11 drop-target support, speaking XDND version 5.

// # Notes on error handling
//
// Replies are only waited for where the protocol needs the answer right away
// (interning atoms, reading properties, translating coordinates). A failed
// request while a drag is in progress abandons the drag; nothing is reported
// to the toolkit beyond the drag leaving.

#[macro_use]
mod util;

pub mod atom;
pub mod child_window;
pub mod connection;
pub mod error;
pub mod package;
pub mod xdnd;
