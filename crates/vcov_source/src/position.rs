//! Line/column positions and the packed column bitfield used in coverage names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 1-based line/column coordinate in an original source file.
///
/// Ordering is line-major, which matches the order in which the parser
/// re-walks the text.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct SourcePos {
    /// The line number (1-based).
    pub line: u32,
    /// The column number (1-based, counted in characters).
    pub col: u32,
}

impl SourcePos {
    /// Creates a new position.
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }

    /// Returns the position of the last character of `text` when it starts here.
    ///
    /// `text` must not contain a newline.
    pub fn last_of(self, text: &str) -> SourcePos {
        let len = text.chars().count() as u32;
        SourcePos::new(self.line, self.col + len.saturating_sub(1))
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// The first and last column of an expression, packed the way coverage names
/// encode them: first column in the upper 16 bits, last column in the lower 16.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct ColumnRange {
    /// First column (1-based, inclusive).
    pub first: u16,
    /// Last column (1-based, inclusive).
    pub last: u16,
}

impl ColumnRange {
    /// Creates a column range.
    pub fn new(first: u16, last: u16) -> Self {
        Self { first, last }
    }

    /// Returns the packed `first << 16 | last` bitfield.
    pub fn bits(self) -> u32 {
        (u32::from(self.first) << 16) | u32::from(self.last)
    }

    /// Unpacks a bitfield produced by [`bits`](Self::bits).
    pub fn from_bits(bits: u32) -> Self {
        Self {
            first: (bits >> 16) as u16,
            last: (bits & 0xffff) as u16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_line_major() {
        assert!(SourcePos::new(1, 80) < SourcePos::new(2, 1));
        assert!(SourcePos::new(3, 4) < SourcePos::new(3, 5));
    }

    #[test]
    fn last_of_counts_characters() {
        assert_eq!(SourcePos::new(4, 10).last_of("assign"), SourcePos::new(4, 15));
        assert_eq!(SourcePos::new(4, 10).last_of(";"), SourcePos::new(4, 10));
    }

    #[test]
    fn column_bits_roundtrip() {
        let cols = ColumnRange::new(12, 40);
        assert_eq!(cols.bits(), (12 << 16) | 40);
        assert_eq!(ColumnRange::from_bits(cols.bits()), cols);
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", SourcePos::new(7, 3)), "7:3");
    }
}
