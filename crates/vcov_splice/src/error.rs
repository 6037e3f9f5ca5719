//! Splice buffer errors.

use thiserror::Error;
use vcov_common::InternalError;
use vcov_source::SourcePos;

/// Errors raised by [`SpliceBuffer`](crate::SpliceBuffer) operations.
///
/// Only [`SpliceError::LineTooLong`] is caused by user input; every other
/// variant means the caller broke the window or mark protocol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpliceError {
    /// An output line grew past the configured ceiling.
    #[error("output line {line} exceeds the {limit}-character line limit")]
    LineTooLong {
        /// Original source line being emitted.
        line: u32,
        /// Configured ceiling.
        limit: usize,
    },
    /// A replace position is not held by the current window.
    #[error("position {pos} is not in the pending output")]
    NotBuffered {
        /// The missing position.
        pos: SourcePos,
    },
    /// A replace span reaches outside the open window.
    #[error("span {first}..{last} lies outside the replace window {start}..{end}")]
    OutsideWindow {
        /// Requested first position.
        first: SourcePos,
        /// Requested last position.
        last: SourcePos,
        /// Window start.
        start: SourcePos,
        /// Window end.
        end: SourcePos,
    },
    /// A declaration was inserted with no mark on the stack.
    #[error("no register insertion mark is active")]
    NoMark,
    /// Held output was flushed while marks still point into it.
    #[error("{0} register insertion marks still active at flush")]
    MarksOutstanding(usize),
}

impl SpliceError {
    /// Returns `true` for errors caused by the input text rather than a bug.
    pub fn is_user_error(&self) -> bool {
        matches!(self, SpliceError::LineTooLong { .. })
    }
}

impl From<SpliceError> for InternalError {
    fn from(err: SpliceError) -> Self {
        InternalError::new(err.to_string())
    }
}
