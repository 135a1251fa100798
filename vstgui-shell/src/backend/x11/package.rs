// Copyright 2024 the VSTGUI Authors
// SPDX-License-Identifier: Apache-2.0

//! The payload of an XDND drag.

use crate::dnd::{DataPackage, DataType};

/// The data of a drag, converted from the source's selection.
///
/// The package has the single type that was negotiated when the drag
/// entered. Its entries are only available once the selection has arrived.
/// Text is stored as UTF-8 whatever the selection target was.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XdndDataPackage {
    kind: DataType,
    latin1: bool,
    entries: Vec<Vec<u8>>,
}

impl XdndDataPackage {
    pub fn new(kind: DataType) -> XdndDataPackage {
        XdndDataPackage {
            kind,
            latin1: false,
            entries: Vec::new(),
        }
    }

    /// A text package for the ICCCM `STRING` target, which is ISO-8859-1.
    pub fn latin1_text() -> XdndDataPackage {
        XdndDataPackage {
            latin1: true,
            ..XdndDataPackage::new(DataType::Text)
        }
    }

    /// The type negotiated for this drag.
    pub fn kind(&self) -> DataType {
        self.kind
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fill the package from a converted selection, returning the number of
    /// entries.
    ///
    /// A URI list yields one entry per local file. Text and binary data
    /// yield a single entry unless `value` is empty.
    pub fn fill(&mut self, value: &[u8]) -> usize {
        self.entries = match self.kind {
            DataType::FilePath => parse_uri_list(value)
                .into_iter()
                .map(String::into_bytes)
                .collect(),
            DataType::Text => {
                let text = value.strip_suffix(b"\0").unwrap_or(value);
                if text.is_empty() {
                    Vec::new()
                } else if self.latin1 {
                    vec![text.iter().map(|&b| b as char).collect::<String>().into_bytes()]
                } else {
                    vec![String::from_utf8_lossy(text).into_owned().into_bytes()]
                }
            }
            DataType::Binary if !value.is_empty() => vec![value.to_vec()],
            DataType::Binary | DataType::Error => Vec::new(),
        };
        self.entries.len()
    }
}

impl DataPackage for XdndDataPackage {
    fn count(&self) -> usize {
        self.entries.len()
    }

    fn data_type(&self, index: usize) -> DataType {
        if index < self.entries.len() {
            self.kind
        } else {
            DataType::Error
        }
    }

    fn data(&self, index: usize) -> Option<(&[u8], DataType)> {
        self.entries
            .get(index)
            .map(|entry| (entry.as_slice(), self.kind))
    }
}

/// Extract the local file paths from a `text/uri-list`.
///
/// Entries on other hosts, entries that are not `file:` URIs and entries
/// that do not decode to UTF-8 are skipped.
pub(crate) fn parse_uri_list(list: &[u8]) -> Vec<String> {
    let list = String::from_utf8_lossy(list);
    list.split(|c| c == '\r' || c == '\n')
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|uri| {
            let path = local_file_path(uri);
            if path.is_none() {
                tracing::debug!("skipping non-local uri {:?}", uri);
            }
            path
        })
        .collect()
}

fn local_file_path(uri: &str) -> Option<String> {
    let rest = uri.strip_prefix("file://")?;
    let slash = rest.find('/')?;
    let (host, path) = rest.split_at(slash);
    if !host.is_empty() && !host.eq_ignore_ascii_case("localhost") {
        return None;
    }
    String::from_utf8(percent_decode(path)).ok()
}

fn percent_decode(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex(bytes[i + 1]), hex(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

fn hex(digit: u8) -> Option<u8> {
    (digit as char).to_digit(16).map(|d| d as u8)
}
