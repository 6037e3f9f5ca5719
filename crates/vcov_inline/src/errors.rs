//! The instrumentation error type with its diagnostic codes and helpers.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use vcov_common::InternalError;
use vcov_diagnostics::{Category, Diagnostic, DiagnosticCode};
use vcov_source::Span;
use vcov_splice::SpliceError;

/// Output directory cannot be created or cleared.
pub const E401: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 401,
};

/// Output file cannot be written.
pub const E402: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 402,
};

/// Source text of a design file is not available.
pub const E403: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 403,
};

/// Output line longer than `inline.max_line_length`.
pub const E404: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 404,
};

/// Module not instantiated below the top; emitted without coverage.
pub const W410: DiagnosticCode = DiagnosticCode {
    category: Category::Warning,
    number: 410,
};

/// Creates a diagnostic for an unusable output directory.
pub fn error_output_dir(path: &Path, reason: &str) -> Diagnostic {
    Diagnostic::fatal(
        E401,
        format!("cannot prepare output directory `{}`: {reason}", path.display()),
        Span::DUMMY,
    )
}

/// Creates a diagnostic for an output file that cannot be written.
pub fn error_output_file(path: &Path, reason: &str) -> Diagnostic {
    Diagnostic::fatal(
        E402,
        format!("cannot write `{}`: {reason}", path.display()),
        Span::DUMMY,
    )
}

/// Creates a diagnostic for a design file whose text is not loaded.
pub fn error_missing_source(file: &str) -> Diagnostic {
    Diagnostic::fatal(E403, format!("source of `{file}` is not available"), Span::DUMMY)
        .with_help("design files are read relative to the working directory")
}

/// Creates a diagnostic for an output line past the configured ceiling.
pub fn error_line_too_long(line: u32, limit: usize, span: Span) -> Diagnostic {
    Diagnostic::error(
        E404,
        format!("instrumented output of line {line} exceeds {limit} characters"),
        span,
    )
    .with_help("raise `inline.max_line_length` in vcov.toml")
}

/// Creates a warning for a module that is emitted uninstrumented.
pub fn warn_uninstantiated(module: &str, span: Span) -> Diagnostic {
    Diagnostic::warning(
        W410,
        format!("module `{module}` is not instantiated below the top module"),
        span,
    )
    .with_note("it is copied to the output without coverage")
}

/// A failure while instrumenting a design or writing its output.
#[derive(Debug, Error)]
pub enum InlineError {
    /// The output directory could not be created or cleared.
    #[error("cannot prepare output directory `{path}`: {source}")]
    OutputDir {
        /// Directory path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// An output file could not be written.
    #[error("cannot write `{path}`: {source}")]
    OutputFile {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The text of a design file is not loaded.
    #[error("source of `{0}` is not available")]
    MissingSource(String),
    /// The splice buffer rejected an operation.
    #[error(transparent)]
    Splice(#[from] SpliceError),
    /// A broken invariant.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl InlineError {
    /// Converts the error into a diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            InlineError::OutputDir { path, source } => error_output_dir(path, &source.to_string()),
            InlineError::OutputFile { path, source } => error_output_file(path, &source.to_string()),
            InlineError::MissingSource(file) => error_missing_source(file),
            InlineError::Splice(SpliceError::LineTooLong { line, limit }) => {
                error_line_too_long(*line, *limit, Span::DUMMY)
            }
            InlineError::Splice(err) => internal(&err.to_string()),
            InlineError::Internal(err) => internal(&err.to_string()),
        }
    }
}

fn internal(message: &str) -> Diagnostic {
    Diagnostic::fatal(DiagnosticCode::new(Category::Internal, 2), message, Span::DUMMY)
}
