//! Diagnostic creation, severity management, and terminal rendering.
//!
//! Elaboration and instrumentation report user-facing problems as structured
//! [`Diagnostic`] values with category-prefixed codes. The [`DiagnosticSink`]
//! accumulates them during a run and [`TerminalRenderer`] prints them
//! rustc-style against the original source text.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod label;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use label::{Label, LabelStyle};
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
