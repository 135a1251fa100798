// Copyright 2024 the VSTGUI Authors
// SPDX-License-Identifier: Apache-2.0

//! The receiving side of the XDND protocol.
//!
//! See <https://freedesktop.org/wiki/Specifications/XDND/> for the protocol.
//! A drag goes through these states:
//!
//! - `Clear`: no drag.
//! - `Initiated`: a source announced a drag with a type we accept. The
//!   first position triggers the conversion of its selection.
//! - `Entering`: the data arrived. The next position tells the toolkit the
//!   drag entered.
//! - `Moving`: the toolkit knows about the drag and sees every position.
//!
//! Leave, drop and events from an unexpected source return to `Clear`.

use std::fmt;
use std::mem;
use std::rc::Rc;

use x11rb::protocol::xproto::{
    AtomEnum, ClientMessageEvent, SelectionNotifyEvent, Timestamp, Window, CLIENT_MESSAGE_EVENT,
};

use crate::dnd::{DataType, DragEventData, DragHandler, DragOperation};
use crate::kurbo::Point;
use crate::Modifiers;

use super::atom::{Atom, XdndAtoms};
use super::connection::DndConnection;
use super::error::Error;
use super::package::XdndDataPackage;
use super::util::{key_mods, unpack_point};

/// The protocol version we implement, and the oldest one we accept.
pub const XDND_VERSION: u32 = 5;

/// `XdndStatus` flag: the target accepts the drop.
const STATUS_ACCEPT: u32 = 1 << 0;
/// `XdndStatus` flag: send positions even inside the rectangle.
const STATUS_SEND_POSITIONS: u32 = 1 << 1;
/// `XdndEnter` flag: the source has more than three types.
const ENTER_TYPE_LIST: u32 = 1 << 0;

/// Where a drag is in the protocol, see the module documentation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragState {
    Clear,
    Initiated,
    Entering,
    Moving,
}

#[derive(Clone, Copy, Debug)]
enum XdndMessage {
    Enter,
    Position,
    Leave,
    Drop,
}

/// The drag being received from one source.
#[derive(Debug)]
struct Session {
    source: Window,
    /// The negotiated type.
    dnd_type: u32,
}

#[derive(Clone, Copy, Debug)]
struct Pointer {
    pos: Point,
    modifiers: Modifiers,
}

enum Drag {
    Clear,
    Initiated {
        session: Session,
        package: XdndDataPackage,
        /// The latest position, once the selection was requested.
        position: Option<ClientMessageEvent>,
    },
    Entering {
        session: Session,
        package: XdndDataPackage,
    },
    Moving {
        session: Session,
        package: XdndDataPackage,
        pointer: Pointer,
        operation: DragOperation,
    },
}

impl Drag {
    fn session(&self) -> Option<&Session> {
        match self {
            Drag::Clear => None,
            Drag::Initiated { session, .. }
            | Drag::Entering { session, .. }
            | Drag::Moving { session, .. } => Some(session),
        }
    }

    fn state(&self) -> DragState {
        match self {
            Drag::Clear => DragState::Clear,
            Drag::Initiated { .. } => DragState::Initiated,
            Drag::Entering { .. } => DragState::Entering,
            Drag::Moving { .. } => DragState::Moving,
        }
    }
}

/// Receives XDND drags for one window and forwards them to a [`DragHandler`].
///
/// The host's event loop passes every `ClientMessage` and `SelectionNotify`
/// event for the window to [`handle_client_message`] and
/// [`handle_selection_notify`].
///
/// [`handle_client_message`]: XdndHandler::handle_client_message
/// [`handle_selection_notify`]: XdndHandler::handle_selection_notify
pub struct XdndHandler {
    conn: Rc<dyn DndConnection>,
    atoms: Rc<XdndAtoms>,
    window: Window,
    handler: Box<dyn DragHandler>,
    drag: Drag,
}

impl XdndHandler {
    pub fn new(
        conn: Rc<dyn DndConnection>,
        atoms: Rc<XdndAtoms>,
        window: Window,
        handler: Box<dyn DragHandler>,
    ) -> XdndHandler {
        XdndHandler {
            conn,
            atoms,
            window,
            handler,
            drag: Drag::Clear,
        }
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn state(&self) -> DragState {
        self.drag.state()
    }

    /// The type negotiated for the current drag.
    pub fn dnd_type(&self) -> Option<u32> {
        self.drag.session().map(|session| session.dnd_type)
    }

    /// Advertise the window as an XDND target by setting `XdndAware`.
    pub fn register_window(&self) -> Result<(), Error> {
        let aware = self.atom(&self.atoms.XdndAware)?;
        self.conn
            .change_property32(self.window, aware, AtomEnum::ATOM.into(), &[XDND_VERSION])?;
        self.conn.flush()
    }

    /// Handle a client message sent to the window.
    ///
    /// Returns `false` if it is not an XDND message.
    pub fn handle_client_message(&mut self, event: &ClientMessageEvent) -> bool {
        if event.format != 32 {
            return false;
        }
        let message = match self.message_kind(event.type_) {
            Ok(Some(message)) => message,
            Ok(None) => return false,
            Err(e) => {
                tracing::error!("failed to resolve XDND atoms: {}", e);
                return false;
            }
        };
        let result = match message {
            XdndMessage::Enter => self.enter(event),
            XdndMessage::Position => self.position(event),
            XdndMessage::Leave => {
                self.leave(event);
                Ok(())
            }
            XdndMessage::Drop => self.dropped(event),
        };
        if let Err(e) = result {
            tracing::error!("{:?} failed, abandoning the drag: {}", message, e);
            self.reset();
        }
        true
    }

    /// Handle a selection notification for the window.
    ///
    /// Returns `false` if it does not answer a conversion of the XDND
    /// selection.
    pub fn handle_selection_notify(&mut self, event: &SelectionNotifyEvent) -> bool {
        let selection = match self.atom(&self.atoms.XdndSelection) {
            Ok(selection) => selection,
            Err(e) => {
                tracing::error!("failed to resolve XdndSelection: {}", e);
                return false;
            }
        };
        if event.requestor != self.window || event.selection != selection {
            return false;
        }
        if let Err(e) = self.selection_notify(event) {
            tracing::error!("reading the dropped data failed, abandoning the drag: {}", e);
            self.reset();
        }
        true
    }

    fn atom(&self, atom: &Atom) -> Result<u32, Error> {
        atom.resolve(&*self.conn)
    }

    fn message_kind(&self, type_: u32) -> Result<Option<XdndMessage>, Error> {
        let atoms = &*self.atoms;
        let kinds = [
            (&atoms.XdndEnter, XdndMessage::Enter),
            (&atoms.XdndPosition, XdndMessage::Position),
            (&atoms.XdndLeave, XdndMessage::Leave),
            (&atoms.XdndDrop, XdndMessage::Drop),
        ];
        for (atom, kind) in kinds {
            if self.atom(atom)? == type_ {
                return Ok(Some(kind));
            }
        }
        Ok(None)
    }

    fn enter(&mut self, event: &ClientMessageEvent) -> Result<(), Error> {
        self.reset();
        let data = event.data.as_data32();
        let source = data[0];
        let version = data[1] >> 24;
        if version < XDND_VERSION {
            tracing::debug!(
                "ignoring drag from {:#x}: XDND version {} is too old",
                source,
                version
            );
            return Ok(());
        }

        let offered = if data[1] & ENTER_TYPE_LIST != 0 {
            self.type_list(source)?
        } else {
            data[2..].iter().copied().filter(|&t| t != x11rb::NONE).collect()
        };
        let Some((dnd_type, kind)) = self.negotiate(&offered)? else {
            tracing::debug!("ignoring drag from {:#x}: no acceptable type", source);
            return Ok(());
        };
        tracing::debug!("drag from {:#x} entered with {:?}", source, kind);
        let package = if dnd_type == self.atom(&self.atoms.STRING)? {
            XdndDataPackage::latin1_text()
        } else {
            XdndDataPackage::new(kind)
        };
        self.drag = Drag::Initiated {
            session: Session { source, dnd_type },
            package,
            position: None,
        };
        Ok(())
    }

    fn type_list(&self, source: Window) -> Result<Vec<u32>, Error> {
        let type_list = self.atom(&self.atoms.XdndTypeList)?;
        let types = self
            .conn
            .get_property(source, type_list, false)?
            .and_then(|property| property.value32().map(Iterator::collect));
        Ok(types.unwrap_or_default())
    }

    /// Pick the type to receive: files, then text, then raw bytes.
    fn negotiate(&self, offered: &[u32]) -> Result<Option<(u32, DataType)>, Error> {
        let atoms = &*self.atoms;
        let preference = [
            (&atoms.URI_LIST, DataType::FilePath),
            (&atoms.TEXT_PLAIN_UTF8, DataType::Text),
            (&atoms.UTF8_STRING, DataType::Text),
            (&atoms.TEXT_PLAIN, DataType::Text),
            (&atoms.STRING, DataType::Text),
            (&atoms.OCTET_STREAM, DataType::Binary),
        ];
        for (atom, kind) in preference {
            let id = self.atom(atom)?;
            if offered.contains(&id) {
                return Ok(Some((id, kind)));
            }
        }
        Ok(None)
    }

    fn position(&mut self, event: &ClientMessageEvent) -> Result<(), Error> {
        let data = event.data.as_data32();
        if !self.is_current_source(data[0]) {
            return Ok(());
        }
        if let Drag::Initiated {
            session, position, ..
        } = &mut self.drag
        {
            if position.is_none() {
                let selection = self.atoms.XdndSelection.resolve(&*self.conn)?;
                let property = self.atoms.XVSTGUISelection.resolve(&*self.conn)?;
                request_selection(&*self.conn, self.window, selection, session, property, data[3])?;
            }
            *position = Some(event.clone());
            return Ok(());
        }

        let pointer = self.pointer(data[2])?;
        let (session, package, operation) = match mem::replace(&mut self.drag, Drag::Clear) {
            Drag::Entering { session, package } => {
                let operation = self.handler.drag_enter(&event_data(&package, pointer));
                tracing::debug!("drag entered, toolkit answered {:?}", operation);
                (session, package, operation)
            }
            Drag::Moving {
                session, package, ..
            } => {
                let operation = self.handler.drag_move(&event_data(&package, pointer));
                (session, package, operation)
            }
            other => {
                self.drag = other;
                return Ok(());
            }
        };
        let status = self.reply_status(&session, operation);
        self.drag = Drag::Moving {
            session,
            package,
            pointer,
            operation,
        };
        status
    }

    fn selection_notify(&mut self, event: &SelectionNotifyEvent) -> Result<(), Error> {
        let property = self.atom(&self.atoms.XVSTGUISelection)?;
        let (session, mut package, position) = match mem::replace(&mut self.drag, Drag::Clear) {
            Drag::Initiated {
                session,
                package,
                position: Some(position),
            } if event.target == session.dnd_type => (session, package, position),
            other => {
                tracing::debug!("unexpected SelectionNotify in state {:?}", other.state());
                self.drag = other;
                return Ok(());
            }
        };
        if event.property != property {
            tracing::debug!("drag source refused the conversion, abandoning the drag");
            return Ok(());
        }
        let Some(value) = self.conn.get_property(self.window, property, true)? else {
            tracing::debug!("converted selection is missing, abandoning the drag");
            return Ok(());
        };
        if package.fill(&value.value) == 0 {
            tracing::debug!("dropped data has no usable entries, abandoning the drag");
            return Ok(());
        }
        self.drag = Drag::Entering { session, package };
        self.position(&position)
    }

    fn leave(&mut self, event: &ClientMessageEvent) {
        if self.is_current_source(event.data.as_data32()[0]) {
            tracing::debug!("drag left");
            self.reset();
        }
    }

    /// Finish the drag, dropping into the toolkit if it accepted it.
    ///
    /// A drop before the data arrived only answers the source: the toolkit
    /// never saw the drag enter, so it gets no leave either.
    fn dropped(&mut self, event: &ClientMessageEvent) -> Result<(), Error> {
        if !self.is_current_source(event.data.as_data32()[0]) {
            return Ok(());
        }
        let (session, accepted) = match mem::replace(&mut self.drag, Drag::Clear) {
            Drag::Moving {
                session,
                package,
                pointer,
                operation,
            } => {
                let data = event_data(&package, pointer);
                let accepted = if operation.accepts() {
                    self.handler.drag_drop(&data)
                } else {
                    self.handler.drag_leave(&data);
                    false
                };
                (session, accepted.then_some(operation))
            }
            Drag::Initiated { session, .. } | Drag::Entering { session, .. } => (session, None),
            Drag::Clear => return Ok(()),
        };
        tracing::debug!("drag dropped, accepted: {:?}", accepted);
        self.reply_finished(&session, accepted)
    }

    /// Whether `source` is the source of the current drag.
    ///
    /// A drag from any other source resets the handler.
    fn is_current_source(&mut self, source: Window) -> bool {
        match self.drag.session().map(|session| session.source) {
            None => false,
            Some(current) if current == source => true,
            Some(current) => {
                tracing::warn!(
                    "XDND event from {:#x} while receiving from {:#x}, dropping both",
                    source,
                    current
                );
                self.reset();
                false
            }
        }
    }

    /// Forget the current drag, telling the toolkit if it knew about it.
    fn reset(&mut self) {
        if let Drag::Moving {
            package, pointer, ..
        } = mem::replace(&mut self.drag, Drag::Clear)
        {
            self.handler.drag_leave(&event_data(&package, pointer));
        }
    }

    fn pointer(&self, packed_root: u32) -> Result<Pointer, Error> {
        let (x, y) = unpack_point(packed_root);
        let (x, y) = self.conn.translate_coordinates(self.window, x, y)?;
        let mask = self.conn.query_pointer_mask(self.window)?;
        Ok(Pointer {
            pos: Point::new(x.into(), y.into()),
            modifiers: key_mods(mask),
        })
    }

    fn action(&self, operation: DragOperation) -> Result<u32, Error> {
        match operation {
            DragOperation::Copy => self.atom(&self.atoms.XdndActionCopy),
            DragOperation::Move => self.atom(&self.atoms.XdndActionMove),
            DragOperation::None => Ok(x11rb::NONE),
        }
    }

    fn reply_status(&self, session: &Session, operation: DragOperation) -> Result<(), Error> {
        let mut flags = STATUS_SEND_POSITIONS;
        if operation.accepts() {
            flags |= STATUS_ACCEPT;
        }
        let action = self.action(operation)?;
        let status = self.atom(&self.atoms.XdndStatus)?;
        self.send(session, status, [self.window, flags, 0, 0, action])
    }

    fn reply_finished(
        &self,
        session: &Session,
        accepted: Option<DragOperation>,
    ) -> Result<(), Error> {
        let action = self.action(accepted.unwrap_or(DragOperation::None))?;
        let finished = self.atom(&self.atoms.XdndFinished)?;
        let data = [self.window, accepted.is_some() as u32, action, 0, 0];
        self.send(session, finished, data)
    }

    /// Send a message to the drag source, or to the window it proxies for.
    fn send(&self, session: &Session, type_: u32, data: [u32; 5]) -> Result<(), Error> {
        let proxy = self.atom(&self.atoms.XdndProxy)?;
        let destination = self
            .conn
            .get_property(session.source, proxy, false)?
            .and_then(|property| property.value32().and_then(|mut v| v.next()))
            .filter(|&window| window != x11rb::NONE)
            .unwrap_or(session.source);
        let event = ClientMessageEvent {
            response_type: CLIENT_MESSAGE_EVENT,
            format: 32,
            sequence: 0,
            window: session.source,
            type_,
            data: data.into(),
        };
        self.conn.send_client_message(destination, event)?;
        self.conn.flush()
    }
}

fn request_selection(
    conn: &dyn DndConnection,
    window: Window,
    selection: u32,
    session: &Session,
    property: u32,
    time: Timestamp,
) -> Result<(), Error> {
    conn.convert_selection(window, selection, session.dnd_type, property, time)?;
    conn.flush()
}

fn event_data(package: &XdndDataPackage, pointer: Pointer) -> DragEventData<'_> {
    DragEventData {
        drop: package,
        pos: pointer.pos,
        modifiers: pointer.modifiers,
    }
}

impl fmt::Debug for XdndHandler {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("XdndHandler")
            .field("window", &self.window)
            .field("state", &self.drag.state())
            .field("source", &self.drag.session().map(|s| s.source))
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::backend::x11::connection::Property;
    use crate::dnd::DataPackage;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use test_log::test;
    use x11rb::protocol::xproto::SELECTION_NOTIFY_EVENT;

    const TARGET: Window = 0x100;
    const SOURCE: Window = 0x200;
    const PROXY: Window = 0x300;

    #[derive(Debug, Clone, PartialEq)]
    enum Request {
        ConvertSelection {
            requestor: Window,
            selection: u32,
            target: u32,
            property: u32,
            time: Timestamp,
        },
        ClientMessage {
            destination: Window,
            window: Window,
            type_: u32,
            data: [u32; 5],
        },
        ChangeProperty32 {
            window: Window,
            property: u32,
            data: Vec<u32>,
        },
    }

    /// An in-memory server: interns atoms, stores properties and records
    /// every request.
    #[derive(Default)]
    struct FakeConnection {
        atoms: RefCell<HashMap<String, u32>>,
        properties: RefCell<HashMap<(Window, u32), Property>>,
        requests: RefCell<Vec<Request>>,
        modifiers: u16,
    }

    impl FakeConnection {
        fn atom(&self, name: &str) -> u32 {
            self.intern_atom(name).unwrap()
        }

        fn set_property(&self, window: Window, name: &str, property: Property) {
            let atom = self.atom(name);
            self.properties
                .borrow_mut()
                .insert((window, atom), property);
        }

        fn take_requests(&self) -> Vec<Request> {
            mem::take(&mut *self.requests.borrow_mut())
        }

        fn messages(&self) -> Vec<(Window, u32, [u32; 5])> {
            self.take_requests()
                .into_iter()
                .filter_map(|request| match request {
                    Request::ClientMessage {
                        destination,
                        type_,
                        data,
                        ..
                    } => Some((destination, type_, data)),
                    _ => None,
                })
                .collect()
        }
    }

    impl DndConnection for FakeConnection {
        fn intern_atom(&self, name: &str) -> Result<u32, Error> {
            let mut atoms = self.atoms.borrow_mut();
            let next = 1000 + atoms.len() as u32;
            Ok(*atoms.entry(name.to_owned()).or_insert(next))
        }

        fn get_property(
            &self,
            window: Window,
            property: u32,
            delete: bool,
        ) -> Result<Option<Property>, Error> {
            let mut properties = self.properties.borrow_mut();
            Ok(if delete {
                properties.remove(&(window, property))
            } else {
                properties.get(&(window, property)).cloned()
            })
        }

        fn change_property32(
            &self,
            window: Window,
            property: u32,
            _type: u32,
            data: &[u32],
        ) -> Result<(), Error> {
            self.requests.borrow_mut().push(Request::ChangeProperty32 {
                window,
                property,
                data: data.to_vec(),
            });
            Ok(())
        }

        fn convert_selection(
            &self,
            requestor: Window,
            selection: u32,
            target: u32,
            property: u32,
            time: Timestamp,
        ) -> Result<(), Error> {
            self.requests.borrow_mut().push(Request::ConvertSelection {
                requestor,
                selection,
                target,
                property,
                time,
            });
            Ok(())
        }

        fn send_client_message(
            &self,
            destination: Window,
            event: ClientMessageEvent,
        ) -> Result<(), Error> {
            self.requests.borrow_mut().push(Request::ClientMessage {
                destination,
                window: event.window,
                type_: event.type_,
                data: event.data.as_data32(),
            });
            Ok(())
        }

        fn translate_coordinates(
            &self,
            _window: Window,
            x: i16,
            y: i16,
        ) -> Result<(i16, i16), Error> {
            Ok((x - 10, y - 20))
        }

        fn query_pointer_mask(&self, _window: Window) -> Result<u16, Error> {
            Ok(self.modifiers)
        }

        fn flush(&self) -> Result<(), Error> {
            Ok(())
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Enter(Point, Vec<Vec<u8>>),
        Move(Point),
        Leave,
        Drop(Vec<Vec<u8>>),
    }

    /// Records the calls it gets and answers with `answer`.
    struct RecordingHandler {
        calls: Rc<RefCell<Vec<Call>>>,
        answer: Rc<RefCell<DragOperation>>,
    }

    fn entries(package: &dyn DataPackage) -> Vec<Vec<u8>> {
        (0..package.count())
            .filter_map(|i| package.data(i).map(|(bytes, _)| bytes.to_vec()))
            .collect()
    }

    impl DragHandler for RecordingHandler {
        fn drag_enter(&mut self, data: &DragEventData) -> DragOperation {
            self.calls
                .borrow_mut()
                .push(Call::Enter(data.pos, entries(data.drop)));
            *self.answer.borrow()
        }

        fn drag_move(&mut self, data: &DragEventData) -> DragOperation {
            self.calls.borrow_mut().push(Call::Move(data.pos));
            *self.answer.borrow()
        }

        fn drag_leave(&mut self, _data: &DragEventData) {
            self.calls.borrow_mut().push(Call::Leave);
        }

        fn drag_drop(&mut self, data: &DragEventData) -> bool {
            self.calls.borrow_mut().push(Call::Drop(entries(data.drop)));
            true
        }
    }

    struct Harness {
        conn: Rc<FakeConnection>,
        xdnd: XdndHandler,
        calls: Rc<RefCell<Vec<Call>>>,
        answer: Rc<RefCell<DragOperation>>,
    }

    impl Harness {
        fn new() -> Harness {
            let conn = Rc::new(FakeConnection::default());
            let calls = Rc::new(RefCell::new(Vec::new()));
            let answer = Rc::new(RefCell::new(DragOperation::Copy));
            let handler = RecordingHandler {
                calls: Rc::clone(&calls),
                answer: Rc::clone(&answer),
            };
            let xdnd = XdndHandler::new(
                Rc::clone(&conn) as Rc<dyn DndConnection>,
                Rc::new(XdndAtoms::new()),
                TARGET,
                Box::new(handler),
            );
            Harness {
                conn,
                xdnd,
                calls,
                answer,
            }
        }

        fn message(&mut self, name: &str, data: [u32; 5]) -> bool {
            let event = ClientMessageEvent {
                response_type: CLIENT_MESSAGE_EVENT,
                format: 32,
                sequence: 0,
                window: TARGET,
                type_: self.conn.atom(name),
                data: data.into(),
            };
            self.xdnd.handle_client_message(&event)
        }

        fn enter(&mut self, types: &[&str]) {
            let mut data = [SOURCE, XDND_VERSION << 24, 0, 0, 0];
            for (slot, name) in data[2..].iter_mut().zip(types) {
                *slot = self.conn.atom(name);
            }
            assert!(self.message("XdndEnter", data));
        }

        fn position(&mut self, x: u32, y: u32) {
            assert!(self.message("XdndPosition", [SOURCE, 0, x << 16 | y, 42, 0]));
        }

        fn leave(&mut self) {
            assert!(self.message("XdndLeave", [SOURCE, 0, 0, 0, 0]));
        }

        fn do_drop(&mut self) {
            assert!(self.message("XdndDrop", [SOURCE, 0, 43, 0, 0]));
        }

        /// Answer the pending conversion with `value`.
        fn deliver(&mut self, value: &[u8]) {
            let target = self.xdnd.dnd_type().unwrap();
            let property = self.conn.atom("XVSTGUISelection");
            self.conn.set_property(
                TARGET,
                "XVSTGUISelection",
                Property {
                    type_: target,
                    format: 8,
                    value: value.to_vec(),
                },
            );
            let event = SelectionNotifyEvent {
                response_type: SELECTION_NOTIFY_EVENT,
                sequence: 0,
                time: 42,
                requestor: TARGET,
                selection: self.conn.atom("XdndSelection"),
                target,
                property,
            };
            assert!(self.xdnd.handle_selection_notify(&event));
        }

        /// Run a drag up to the point where the toolkit saw it enter.
        fn enter_files(&mut self) {
            self.enter(&["text/uri-list"]);
            self.position(110, 220);
            self.deliver(b"file:///tmp/a.wav\r\n");
        }

        fn calls(&self) -> Vec<Call> {
            mem::take(&mut *self.calls.borrow_mut())
        }
    }

    #[test]
    fn file_paths_are_preferred_over_text() {
        let mut h = Harness::new();
        h.enter(&["text/plain", "text/uri-list"]);
        assert_eq!(h.xdnd.state(), DragState::Initiated);
        assert_eq!(h.xdnd.dnd_type(), Some(h.conn.atom("text/uri-list")));
    }

    #[test]
    fn text_is_preferred_over_binary() {
        let mut h = Harness::new();
        h.enter(&["application/octet-stream", "UTF8_STRING"]);
        assert_eq!(h.xdnd.dnd_type(), Some(h.conn.atom("UTF8_STRING")));
    }

    #[test]
    fn legacy_string_text_is_read_as_latin1() {
        let mut h = Harness::new();
        h.enter(&["STRING"]);
        h.position(110, 220);
        h.deliver(b"caf\xe9");
        assert_eq!(
            h.calls(),
            vec![Call::Enter(
                Point::new(100.0, 200.0),
                vec!["caf\u{e9}".as_bytes().to_vec()]
            )]
        );
    }

    #[test]
    fn long_type_lists_come_from_the_source_window() {
        let mut h = Harness::new();
        let types: Vec<u32> = ["image/png", "image/jpeg", "text/html", "text/uri-list"]
            .iter()
            .map(|name| h.conn.atom(name))
            .collect();
        h.conn.set_property(
            SOURCE,
            "XdndTypeList",
            Property {
                type_: AtomEnum::ATOM.into(),
                format: 32,
                value: types.iter().flat_map(|t| t.to_ne_bytes()).collect(),
            },
        );
        assert!(h.message(
            "XdndEnter",
            [SOURCE, XDND_VERSION << 24 | ENTER_TYPE_LIST, 0, 0, 0]
        ));
        assert_eq!(h.xdnd.dnd_type(), Some(h.conn.atom("text/uri-list")));
    }

    #[test]
    fn old_protocol_versions_are_rejected() {
        let mut h = Harness::new();
        let uri_list = h.conn.atom("text/uri-list");
        assert!(h.message("XdndEnter", [SOURCE, 4 << 24, uri_list, 0, 0]));
        assert_eq!(h.xdnd.state(), DragState::Clear);
    }

    #[test]
    fn unknown_types_are_not_accepted() {
        let mut h = Harness::new();
        h.enter(&["image/png"]);
        assert_eq!(h.xdnd.state(), DragState::Clear);
        h.position(1, 1);
        assert!(h.conn.take_requests().is_empty());
    }

    #[test]
    fn position_without_a_drag_is_ignored() {
        let mut h = Harness::new();
        h.position(50, 60);
        assert_eq!(h.xdnd.state(), DragState::Clear);
        assert!(h.calls().is_empty());
        assert!(h.conn.take_requests().is_empty());
    }

    #[test]
    fn first_position_requests_the_selection_once() {
        let mut h = Harness::new();
        h.enter(&["text/uri-list"]);
        h.position(110, 220);
        h.position(111, 221);
        let requests = h.conn.take_requests();
        assert_eq!(
            requests,
            vec![Request::ConvertSelection {
                requestor: TARGET,
                selection: h.conn.atom("XdndSelection"),
                target: h.conn.atom("text/uri-list"),
                property: h.conn.atom("XVSTGUISelection"),
                time: 42,
            }]
        );
        assert!(h.calls().is_empty());
    }

    #[test]
    fn selection_arrival_enters_and_replies_status() {
        let mut h = Harness::new();
        h.enter_files();
        assert_eq!(h.xdnd.state(), DragState::Moving);
        assert_eq!(
            h.calls(),
            vec![Call::Enter(
                Point::new(100.0, 200.0),
                vec![b"/tmp/a.wav".to_vec()]
            )]
        );
        let copy = h.conn.atom("XdndActionCopy");
        let status = h.conn.atom("XdndStatus");
        assert_eq!(
            h.conn.messages(),
            vec![(SOURCE, status, [TARGET, 0b11, 0, 0, copy])]
        );
    }

    #[test]
    fn moves_are_forwarded_with_the_latest_answer() {
        let mut h = Harness::new();
        h.enter_files();
        h.calls();
        h.conn.take_requests();

        *h.answer.borrow_mut() = DragOperation::None;
        h.position(30, 40);
        assert_eq!(h.calls(), vec![Call::Move(Point::new(20.0, 20.0))]);
        let status = h.conn.atom("XdndStatus");
        assert_eq!(
            h.conn.messages(),
            vec![(SOURCE, status, [TARGET, 0b10, 0, 0, 0])]
        );
    }

    #[test]
    fn drop_of_an_accepted_drag() {
        let mut h = Harness::new();
        *h.answer.borrow_mut() = DragOperation::Move;
        h.enter_files();
        h.calls();
        h.conn.take_requests();

        h.do_drop();
        assert_eq!(h.calls(), vec![Call::Drop(vec![b"/tmp/a.wav".to_vec()])]);
        let finished = h.conn.atom("XdndFinished");
        let action = h.conn.atom("XdndActionMove");
        assert_eq!(
            h.conn.messages(),
            vec![(SOURCE, finished, [TARGET, 1, action, 0, 0])]
        );
        assert_eq!(h.xdnd.state(), DragState::Clear);
    }

    #[test]
    fn drop_of_a_refused_drag_is_a_leave() {
        let mut h = Harness::new();
        *h.answer.borrow_mut() = DragOperation::None;
        h.enter_files();
        h.calls();
        h.conn.take_requests();

        h.do_drop();
        assert_eq!(h.calls(), vec![Call::Leave]);
        let finished = h.conn.atom("XdndFinished");
        assert_eq!(
            h.conn.messages(),
            vec![(SOURCE, finished, [TARGET, 0, 0, 0, 0])]
        );
        assert_eq!(h.xdnd.state(), DragState::Clear);
    }

    #[test]
    fn drop_before_data_arrived_still_finishes() {
        let mut h = Harness::new();
        h.enter(&["text/uri-list"]);
        h.position(1, 1);
        h.conn.take_requests();
        h.do_drop();
        assert!(h.calls().is_empty());
        let finished = h.conn.atom("XdndFinished");
        assert_eq!(
            h.conn.messages(),
            vec![(SOURCE, finished, [TARGET, 0, 0, 0, 0])]
        );
    }

    #[test]
    fn leave_tells_the_toolkit_only_after_enter() {
        let mut h = Harness::new();
        h.enter(&["text/uri-list"]);
        h.position(1, 1);
        h.leave();
        assert!(h.calls().is_empty());
        assert_eq!(h.xdnd.state(), DragState::Clear);

        h.enter_files();
        h.calls();
        h.leave();
        assert_eq!(h.calls(), vec![Call::Leave]);
        assert_eq!(h.xdnd.state(), DragState::Clear);
    }

    #[test]
    fn remote_only_uri_lists_abandon_the_drag() {
        let mut h = Harness::new();
        h.enter(&["text/uri-list"]);
        h.position(110, 220);
        h.conn.take_requests();
        h.deliver(b"file://elsewhere/tmp/a.wav\r\n");
        assert_eq!(h.xdnd.state(), DragState::Clear);
        assert!(h.calls().is_empty());
        assert!(h.conn.take_requests().is_empty());
    }

    #[test]
    fn events_from_another_source_reset_the_drag() {
        let mut h = Harness::new();
        h.enter_files();
        h.calls();
        assert!(h.message("XdndPosition", [SOURCE + 1, 0, 0, 0, 0]));
        assert_eq!(h.xdnd.state(), DragState::Clear);
        assert_eq!(h.calls(), vec![Call::Leave]);
    }

    #[test]
    fn replies_go_to_the_proxy_window() {
        let mut h = Harness::new();
        h.conn.set_property(
            SOURCE,
            "XdndProxy",
            Property {
                type_: AtomEnum::WINDOW.into(),
                format: 32,
                value: PROXY.to_ne_bytes().to_vec(),
            },
        );
        h.enter_files();
        let requests = h.conn.take_requests();
        let status = h.conn.atom("XdndStatus");
        assert!(requests.contains(&Request::ClientMessage {
            destination: PROXY,
            window: SOURCE,
            type_: status,
            data: [TARGET, 0b11, 0, 0, h.conn.atom("XdndActionCopy")],
        }));
    }

    #[test]
    fn foreign_messages_are_not_consumed() {
        let mut h = Harness::new();
        assert!(!h.message("WM_PROTOCOLS", [0; 5]));
    }

    #[test]
    fn register_window_sets_xdnd_aware() {
        let h = Harness::new();
        h.xdnd.register_window().unwrap();
        assert_eq!(
            h.conn.take_requests(),
            vec![Request::ChangeProperty32 {
                window: TARGET,
                property: h.conn.atom("XdndAware"),
                data: vec![XDND_VERSION],
            }]
        );
    }

    #[test]
    fn modifiers_are_reported() {
        let conn = Rc::new(FakeConnection {
            modifiers: u16::from(x11rb::protocol::xproto::ModMask::SHIFT),
            ..FakeConnection::default()
        });
        struct Mods(Rc<RefCell<Option<Modifiers>>>);
        impl DragHandler for Mods {
            fn drag_enter(&mut self, data: &DragEventData) -> DragOperation {
                *self.0.borrow_mut() = Some(data.modifiers);
                DragOperation::Copy
            }
            fn drag_move(&mut self, _: &DragEventData) -> DragOperation {
                DragOperation::Copy
            }
            fn drag_leave(&mut self, _: &DragEventData) {}
            fn drag_drop(&mut self, _: &DragEventData) -> bool {
                true
            }
        }
        let seen = Rc::new(RefCell::new(None));
        let mut h = Harness::new();
        h.conn = Rc::clone(&conn);
        h.xdnd = XdndHandler::new(
            conn as Rc<dyn DndConnection>,
            Rc::new(XdndAtoms::new()),
            TARGET,
            Box::new(Mods(Rc::clone(&seen))),
        );
        h.enter_files();
        assert_eq!(*seen.borrow(), Some(Modifiers::SHIFT));
    }
}
