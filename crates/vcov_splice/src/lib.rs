//! The position-tracked splice buffer.
//!
//! Instrumented output streams through a [`SpliceBuffer`] one token at a
//! time. Text that came from the original source keeps its line/column
//! origin, so a span of it can later be swapped for synthesized code with
//! [`SpliceBuffer::replace`], as long as it has not been flushed. Register
//! insertion marks let declarations be hoisted to an earlier point of the
//! still-held output.

#![warn(missing_docs)]

pub mod buffer;
pub mod error;

pub use buffer::SpliceBuffer;
pub use error::SpliceError;
