// Copyright 2024 the VSTGUI Authors
// SPDX-License-Identifier: Apache-2.0

//! Lazily interned atoms.

use once_cell::unsync::OnceCell;
use x11rb::protocol::xproto;

use super::connection::DndConnection;
use super::error::Error;

/// An atom that is interned the first time it is needed, then cached.
#[derive(Debug)]
pub struct Atom {
    name: &'static str,
    id: OnceCell<xproto::Atom>,
}

impl Atom {
    pub const fn new(name: &'static str) -> Atom {
        Atom {
            name,
            id: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The atom's id, if it has been resolved already.
    pub fn get(&self) -> Option<xproto::Atom> {
        self.id.get().copied()
    }

    /// The atom's id, interning it on first use.
    pub fn resolve(&self, conn: &dyn DndConnection) -> Result<xproto::Atom, Error> {
        self.id
            .get_or_try_init(|| {
                let id = conn.intern_atom(self.name)?;
                tracing::trace!("interned {} as {}", self.name, id);
                Ok(id)
            })
            .copied()
    }
}

macro_rules! lazy_atoms {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($field:ident: $atom:expr,)*
        }
    ) => {
        $(#[$meta])*
        #[allow(non_snake_case)]
        $vis struct $name {
            $(pub $field: Atom,)*
        }

        impl $name {
            pub fn new() -> $name {
                $name {
                    $($field: Atom::new($atom),)*
                }
            }
        }
    };
}

lazy_atoms! {
    /// Every atom the XDND drop target uses.
    ///
    /// Atoms belong to one display connection; share one set between the
    /// handlers of that connection.
    #[derive(Debug)]
    pub struct XdndAtoms {
        XdndAware: "XdndAware",
        XdndEnter: "XdndEnter",
        XdndPosition: "XdndPosition",
        XdndStatus: "XdndStatus",
        XdndLeave: "XdndLeave",
        XdndDrop: "XdndDrop",
        XdndFinished: "XdndFinished",
        XdndSelection: "XdndSelection",
        XdndTypeList: "XdndTypeList",
        XdndProxy: "XdndProxy",
        XdndActionCopy: "XdndActionCopy",
        XdndActionMove: "XdndActionMove",
        XVSTGUISelection: "XVSTGUISelection",
        URI_LIST: "text/uri-list",
        TEXT_PLAIN_UTF8: "text/plain;charset=utf-8",
        UTF8_STRING: "UTF8_STRING",
        TEXT_PLAIN: "text/plain",
        STRING: "STRING",
        OCTET_STREAM: "application/octet-stream",
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::backend::x11::connection::Property;
    use std::cell::Cell;
    use test_log::test;
    use x11rb::protocol::xproto::{ClientMessageEvent, Timestamp, Window};

    /// Interns every name as the next free id, counting requests.
    #[derive(Default)]
    struct CountingConnection {
        requests: Cell<u32>,
    }

    impl DndConnection for CountingConnection {
        fn intern_atom(&self, _name: &str) -> Result<xproto::Atom, Error> {
            self.requests.set(self.requests.get() + 1);
            Ok(100 + self.requests.get())
        }
        fn get_property(&self, _: Window, _: u32, _: bool) -> Result<Option<Property>, Error> {
            Ok(None)
        }
        fn change_property32(&self, _: Window, _: u32, _: u32, _: &[u32]) -> Result<(), Error> {
            Ok(())
        }
        fn convert_selection(
            &self,
            _: Window,
            _: u32,
            _: u32,
            _: u32,
            _: Timestamp,
        ) -> Result<(), Error> {
            Ok(())
        }
        fn send_client_message(&self, _: Window, _: ClientMessageEvent) -> Result<(), Error> {
            Ok(())
        }
        fn translate_coordinates(&self, _: Window, x: i16, y: i16) -> Result<(i16, i16), Error> {
            Ok((x, y))
        }
        fn query_pointer_mask(&self, _: Window) -> Result<u16, Error> {
            Ok(0)
        }
        fn flush(&self) -> Result<(), Error> {
            Ok(())
        }
    }

    #[test]
    fn resolves_once() {
        let conn = CountingConnection::default();
        let atoms = XdndAtoms::new();
        assert_eq!(atoms.XdndEnter.get(), None);
        let first = atoms.XdndEnter.resolve(&conn).unwrap();
        let second = atoms.XdndEnter.resolve(&conn).unwrap();
        assert_eq!(first, second);
        assert_eq!(atoms.XdndEnter.get(), Some(first));
        assert_eq!(conn.requests.get(), 1);

        atoms.URI_LIST.resolve(&conn).unwrap();
        assert_eq!(conn.requests.get(), 2);
        assert_eq!(atoms.URI_LIST.name(), "text/uri-list");
    }
}
