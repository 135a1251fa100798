// Copyright 2024 the VSTGUI Authors
// SPDX-License-Identifier: Apache-2.0

//! Drag and drop, as seen by the toolkit.

use crate::kurbo::Point;
use crate::Modifiers;

/// What the toolkit wants to happen with a drag that is over it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DragOperation {
    Copy,
    Move,
    /// The drag is not accepted at its current position.
    None,
}

impl DragOperation {
    /// Whether this operation accepts the drag.
    pub fn accepts(self) -> bool {
        self != DragOperation::None
    }
}

/// The kind of data carried by an entry of a [`DataPackage`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    /// A UTF-8 path on the local file system.
    FilePath,
    /// UTF-8 text.
    Text,
    /// Raw bytes.
    Binary,
    /// No data; returned for out-of-range indices.
    Error,
}

/// The payload of a drag.
pub trait DataPackage {
    /// The number of entries in this package.
    fn count(&self) -> usize;

    /// The type of the entry at `index`, or [`DataType::Error`] if there
    /// is none.
    fn data_type(&self, index: usize) -> DataType;

    /// The raw bytes of the entry at `index`.
    ///
    /// File paths and text are UTF-8.
    fn data(&self, index: usize) -> Option<(&[u8], DataType)>;
}

/// The information passed to every drag callback.
pub struct DragEventData<'a> {
    /// The payload of the drag.
    pub drop: &'a dyn DataPackage,
    /// The pointer position, in the target window's coordinates.
    pub pos: Point,
    /// The keyboard modifiers held while dragging.
    pub modifiers: Modifiers,
}

/// Receives drag events for one platform window.
///
/// Enter and move return the operation the toolkit would perform if the drag
/// was dropped at that point.
pub trait DragHandler {
    fn drag_enter(&mut self, data: &DragEventData) -> DragOperation;
    fn drag_move(&mut self, data: &DragEventData) -> DragOperation;
    fn drag_leave(&mut self, data: &DragEventData);
    /// Returns `true` if the drop was handled.
    fn drag_drop(&mut self, data: &DragEventData) -> bool;
}
