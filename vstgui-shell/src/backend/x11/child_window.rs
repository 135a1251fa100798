// Copyright 2024 the VSTGUI Authors
// SPDX-License-Identifier: Apache-2.0

//! A plain child window, destroyed when dropped.

use std::rc::Rc;

use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    ConfigureWindowAux, ConnectionExt as _, CreateWindowAux, EventMask, Window, WindowClass,
};

use crate::kurbo::Rect;

use super::error::Error;

/// A child window of some host window.
///
/// Hosts embed one of these as the drop target of a plugin view.
pub struct ChildWindow<C: Connection> {
    conn: Rc<C>,
    id: Window,
}

impl<C: Connection> ChildWindow<C> {
    /// Create an unmapped child of `parent` covering `rect`.
    pub fn new(conn: Rc<C>, parent: Window, rect: Rect) -> Result<ChildWindow<C>, Error> {
        let id = conn.generate_id()?;
        let (x, y, width, height) = geometry(rect);
        conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            id,
            parent,
            x,
            y,
            width,
            height,
            0,
            WindowClass::INPUT_OUTPUT,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new().event_mask(
                EventMask::STRUCTURE_NOTIFY | EventMask::PROPERTY_CHANGE | EventMask::EXPOSURE,
            ),
        )?;
        tracing::debug!("created child window {:#x} of {:#x}", id, parent);
        Ok(ChildWindow { conn, id })
    }

    pub fn id(&self) -> Window {
        self.id
    }

    pub fn map(&self) -> Result<(), Error> {
        self.conn.map_window(self.id)?;
        Ok(())
    }

    pub fn unmap(&self) -> Result<(), Error> {
        self.conn.unmap_window(self.id)?;
        Ok(())
    }

    pub fn set_rect(&self, rect: Rect) -> Result<(), Error> {
        let (x, y, width, height) = geometry(rect);
        self.conn.configure_window(
            self.id,
            &ConfigureWindowAux::new()
                .x(i32::from(x))
                .y(i32::from(y))
                .width(u32::from(width))
                .height(u32::from(height)),
        )?;
        Ok(())
    }
}

impl<C: Connection> Drop for ChildWindow<C> {
    fn drop(&mut self) {
        log_x11!(self.conn.destroy_window(self.id));
        log_x11!(self.conn.flush());
    }
}

/// Origin and size of `rect` in whole pixels; X11 windows are at least 1x1.
fn geometry(rect: Rect) -> (i16, i16, u16, u16) {
    let rect = rect.abs().round();
    (
        rect.x0 as i16,
        rect.y0 as i16,
        rect.width().max(1.0) as u16,
        rect.height().max(1.0) as u16,
    )
}
