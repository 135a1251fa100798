// Copyright 2024 the VSTGUI Authors
// SPDX-License-Identifier: Apache-2.0

//! The X11 requests the drop target makes, and their x11rb implementation.

use std::rc::Rc;

use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    Atom, ClientMessageEvent, ConnectionExt as _, EventMask, GetPropertyType, PropMode, Timestamp,
    Window,
};
use x11rb::wrapper::ConnectionExt as _;

use super::error::Error;

/// A window property as read from the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Property {
    pub type_: Atom,
    pub format: u8,
    pub value: Vec<u8>,
}

impl Property {
    /// The value as 32-bit items, or `None` if the format is not 32.
    pub fn value32(&self) -> Option<impl Iterator<Item = u32> + '_> {
        if self.format != 32 {
            return None;
        }
        Some(
            self.value
                .chunks_exact(4)
                .map(|chunk| u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])),
        )
    }
}

/// The requests an [`XdndHandler`](super::xdnd::XdndHandler) sends.
pub trait DndConnection {
    fn intern_atom(&self, name: &str) -> Result<Atom, Error>;

    /// Read a whole property. Returns `None` if the window does not have it.
    fn get_property(
        &self,
        window: Window,
        property: Atom,
        delete: bool,
    ) -> Result<Option<Property>, Error>;

    fn change_property32(
        &self,
        window: Window,
        property: Atom,
        type_: Atom,
        data: &[u32],
    ) -> Result<(), Error>;

    fn convert_selection(
        &self,
        requestor: Window,
        selection: Atom,
        target: Atom,
        property: Atom,
        time: Timestamp,
    ) -> Result<(), Error>;

    fn send_client_message(
        &self,
        destination: Window,
        event: ClientMessageEvent,
    ) -> Result<(), Error>;

    /// Translate root window coordinates into `window`'s coordinates.
    fn translate_coordinates(&self, window: Window, x: i16, y: i16) -> Result<(i16, i16), Error>;

    /// The modifier and button mask of the pointer.
    fn query_pointer_mask(&self, window: Window) -> Result<u16, Error>;

    fn flush(&self) -> Result<(), Error>;
}

/// A [`DndConnection`] on top of an x11rb connection.
pub struct X11Connection<C: Connection> {
    conn: Rc<C>,
    screen_num: usize,
}

impl<C: Connection> X11Connection<C> {
    pub fn new(conn: Rc<C>, screen_num: usize) -> Result<X11Connection<C>, Error> {
        if conn.setup().roots.get(screen_num).is_none() {
            return Err(Error::NoSuchScreen(screen_num));
        }
        Ok(X11Connection { conn, screen_num })
    }

    pub fn connection(&self) -> &Rc<C> {
        &self.conn
    }

    pub fn screen_num(&self) -> usize {
        self.screen_num
    }

    fn root(&self) -> Window {
        self.conn.setup().roots[self.screen_num].root
    }
}

impl<C: Connection> DndConnection for X11Connection<C> {
    fn intern_atom(&self, name: &str) -> Result<Atom, Error> {
        Ok(self.conn.intern_atom(false, name.as_bytes())?.reply()?.atom)
    }

    fn get_property(
        &self,
        window: Window,
        property: Atom,
        delete: bool,
    ) -> Result<Option<Property>, Error> {
        let reply = self
            .conn
            .get_property(
                delete,
                window,
                property,
                GetPropertyType::ANY,
                0,
                u32::MAX,
            )?
            .reply()?;
        if reply.type_ == x11rb::NONE {
            return Ok(None);
        }
        Ok(Some(Property {
            type_: reply.type_,
            format: reply.format,
            value: reply.value,
        }))
    }

    fn change_property32(
        &self,
        window: Window,
        property: Atom,
        type_: Atom,
        data: &[u32],
    ) -> Result<(), Error> {
        self.conn
            .change_property32(PropMode::REPLACE, window, property, type_, data)?;
        Ok(())
    }

    fn convert_selection(
        &self,
        requestor: Window,
        selection: Atom,
        target: Atom,
        property: Atom,
        time: Timestamp,
    ) -> Result<(), Error> {
        self.conn
            .convert_selection(requestor, selection, target, property, time)?;
        Ok(())
    }

    fn send_client_message(
        &self,
        destination: Window,
        event: ClientMessageEvent,
    ) -> Result<(), Error> {
        self.conn
            .send_event(false, destination, EventMask::NO_EVENT, event)?;
        Ok(())
    }

    fn translate_coordinates(&self, window: Window, x: i16, y: i16) -> Result<(i16, i16), Error> {
        let reply = self
            .conn
            .translate_coordinates(self.root(), window, x, y)?
            .reply()?;
        Ok((reply.dst_x, reply.dst_y))
    }

    fn query_pointer_mask(&self, window: Window) -> Result<u16, Error> {
        let reply = self.conn.query_pointer(window)?.reply()?;
        Ok(u16::from(reply.mask))
    }

    fn flush(&self) -> Result<(), Error> {
        self.conn.flush()?;
        Ok(())
    }
}
