// Copyright 2024 the VSTGUI Authors
// SPDX-License-Identifier: Apache-2.0

//! Windows implementation of the task executor.

pub(crate) mod tasks;
