// Copyright 2024 the VSTGUI Authors
// SPDX-License-Identifier: Apache-2.0

pub(crate) mod tasks;
