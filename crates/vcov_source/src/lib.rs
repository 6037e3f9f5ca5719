//! Source file management and line/column position tracking.
//!
//! Coverage instrumentation addresses original Verilog text by line and
//! column, never by byte offset: the parser re-walks the source and reports
//! token positions, and every synthesized name is derived from them. This
//! crate provides [`SourcePos`], the packed [`ColumnRange`] bitfield, file-level
//! [`Span`]s, and the [`SourceDb`] holding the original text.

#![warn(missing_docs)]

pub mod file_id;
pub mod position;
pub mod source_db;
pub mod source_file;
pub mod span;

pub use file_id::FileId;
pub use position::{ColumnRange, SourcePos};
pub use source_db::SourceDb;
pub use source_file::SourceFile;
pub use span::Span;
