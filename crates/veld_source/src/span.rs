//! Source file identity and byte-offset ranges for tracking locations.
//!
//! The elaboration core never opens files. A driver assigns a [`FileId`] to
//! each parsed tree it hands over, and the core threads [`Span`]s through to
//! diagnostics unchanged.

use serde::{Deserialize, Serialize};

/// Opaque identifier for a source file participating in a compilation.
///
/// The index is only meaningful to the driver that assigned it; within the
/// core it exists so that byte ranges from different files are never
/// compared or merged with each other.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct FileId(u32);

impl FileId {
    /// Creates a `FileId` from the index the driver assigned.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the driver-assigned index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// Sentinel file for spans with no source position (fabricated syntax,
/// driver-level options). Never handed out as a real file id.
const DUMMY_FILE: FileId = FileId(u32::MAX);

/// A byte offset range within a source file.
///
/// Spans track the location of AST nodes and elaborated symbols back to
/// their origin in source code. The `start` is inclusive and `end` is
/// exclusive.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Span {
    /// The source file this span belongs to.
    pub file: FileId,
    /// Byte offset of the start of the span (inclusive).
    pub start: u32,
    /// Byte offset of the end of the span (exclusive).
    pub end: u32,
}

impl Span {
    /// A dummy span used when no source location is available.
    pub const DUMMY: Span = Span {
        file: DUMMY_FILE,
        start: 0,
        end: 0,
    };

    /// Creates a new span in the given file with the given byte range.
    pub fn new(file: FileId, start: u32, end: u32) -> Self {
        Self { file, start, end }
    }

    /// Merges two spans in the same file, producing a span that covers both.
    ///
    /// Takes the minimum start and maximum end of the two spans. If the
    /// spans are from different files (which happens when one of them is
    /// synthetic), the left-hand span is returned unchanged.
    pub fn merge(self, other: Span) -> Span {
        if self.file != other.file {
            return self;
        }
        Span {
            file: self.file,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Returns `true` if this is the dummy span.
    pub fn is_dummy(&self) -> bool {
        self.file == DUMMY_FILE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_id_roundtrip() {
        let id = FileId::from_raw(42);
        assert_eq!(id.as_raw(), 42);
        assert_eq!(id, FileId::from_raw(42));
        assert_ne!(id, FileId::from_raw(43));
    }

    #[test]
    fn construct() {
        let f = FileId::from_raw(0);
        let s = Span::new(f, 10, 20);
        assert_eq!(s.file, f);
        assert_eq!(s.start, 10);
        assert_eq!(s.end, 20);
    }

    #[test]
    fn merge_spans() {
        let f = FileId::from_raw(0);
        let a = Span::new(f, 5, 15);
        let b = Span::new(f, 10, 25);
        let m = a.merge(b);
        assert_eq!(m.start, 5);
        assert_eq!(m.end, 25);
    }

    #[test]
    fn merge_across_files_keeps_left() {
        let a = Span::new(FileId::from_raw(0), 5, 15);
        let b = Span::new(FileId::from_raw(1), 10, 25);
        assert_eq!(a.merge(b), a);
        assert_eq!(a.merge(Span::DUMMY), a);
    }

    #[test]
    fn dummy_span() {
        assert!(Span::DUMMY.is_dummy());
        // Spans in real files are never dummy, whatever their range.
        let f = FileId::from_raw(0);
        assert!(!Span::new(f, 0, 0).is_dummy());
    }

    #[test]
    fn serde_roundtrip() {
        let s = Span::new(FileId::from_raw(1), 10, 20);
        let json = serde_json::to_string(&s).unwrap();
        let back: Span = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);

        let id = FileId::from_raw(7);
        let json = serde_json::to_string(&id).unwrap();
        let back: FileId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
