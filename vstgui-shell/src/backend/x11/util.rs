// Copyright 2024 the VSTGUI Authors
// SPDX-License-Identifier: Apache-2.0

//! Miscellaneous utility functions for working with X11.

use x11rb::protocol::xproto::ModMask;

use crate::Modifiers;

macro_rules! log_x11 {
    ($val:expr) => {
        if let Err(e) = $val {
            tracing::error!("X11 error: {}", e);
        }
    };
}

/// Extracts the keyboard modifiers from a key/button `state` mask.
pub(crate) fn key_mods(mods: u16) -> Modifiers {
    let mut ret = Modifiers::default();
    let key_masks = [
        (ModMask::SHIFT, Modifiers::SHIFT),
        (ModMask::CONTROL, Modifiers::CONTROL),
        // The "windows" key is usually MOD_MASK_4.
        (ModMask::M1, Modifiers::ALT),
        (ModMask::M2, Modifiers::NUM_LOCK),
        (ModMask::M4, Modifiers::META),
        (ModMask::LOCK, Modifiers::CAPS_LOCK),
    ];
    for (mask, modifiers) in key_masks {
        if mods & u16::from(mask) != 0 {
            ret |= modifiers;
        }
    }
    ret
}

/// Splits a packed XDND point (`x << 16 | y`).
pub(crate) fn unpack_point(packed: u32) -> (i16, i16) {
    ((packed >> 16) as u16 as i16, (packed & 0xffff) as u16 as i16)
}
