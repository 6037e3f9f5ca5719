//! Line/column ranges within source files for diagnostics.

use crate::file_id::FileId;
use crate::position::SourcePos;
use serde::{Deserialize, Serialize};

/// An inclusive line/column range within a source file.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Span {
    /// The source file this span belongs to.
    pub file: FileId,
    /// First character of the span.
    pub first: SourcePos,
    /// Last character of the span (inclusive).
    pub last: SourcePos,
}

impl Span {
    /// A dummy span used when no source location is available.
    pub const DUMMY: Span = Span {
        file: FileId::DUMMY,
        first: SourcePos { line: 0, col: 0 },
        last: SourcePos { line: 0, col: 0 },
    };

    /// Creates a new span.
    pub fn new(file: FileId, first: SourcePos, last: SourcePos) -> Self {
        Self { file, first, last }
    }

    /// Creates a span covering a single position.
    pub fn point(file: FileId, pos: SourcePos) -> Self {
        Self::new(file, pos, pos)
    }

    /// Returns `true` if `pos` lies within this span.
    pub fn contains(&self, pos: SourcePos) -> bool {
        self.first <= pos && pos <= self.last
    }

    /// Returns `true` if this is the dummy span.
    pub fn is_dummy(&self) -> bool {
        self.file == FileId::DUMMY
    }
}
