//! The elaboration error type with its diagnostic codes and helpers.
//!
//! Codes `E300`--`E305` cover instance-tree construction and generate
//! resolution. All of them stop the run: later instrumentation depends on a
//! complete instance tree.

use std::path::Path;
use thiserror::Error;
use vcov_common::InternalError;
use vcov_diagnostics::{Category, Diagnostic, DiagnosticCode};
use vcov_source::{SourceDb, SourcePos, Span};

/// Top-level module not found.
pub const E300: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 300,
};

/// Genvar referenced where it has no value.
pub const E301: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 301,
};

/// Hierarchical reference that does not resolve after elaboration.
pub const E302: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 302,
};

/// Generate loop exceeded the iteration ceiling.
pub const E303: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 303,
};

/// Expression in a constant context is not constant.
pub const E304: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 304,
};

/// Module instantiates itself.
pub const E305: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 305,
};

/// Creates a diagnostic for a missing top-level module.
pub fn error_top_not_found(name: &str) -> Diagnostic {
    Diagnostic::fatal(E300, format!("top-level module `{name}` not found"), Span::DUMMY)
        .with_help("pass `--top` with the name of a module in the design")
}

/// Creates a diagnostic for an unknown genvar.
pub fn error_unknown_genvar(name: &str, scope: &str, span: Span) -> Diagnostic {
    Diagnostic::fatal(
        E301,
        format!("genvar `{name}` has no value in scope `{scope}`"),
        span,
    )
    .with_note("generate elaboration cannot continue without it")
}

/// Creates a diagnostic for an unresolved hierarchical reference.
pub fn error_unbound_reference(name: &str, scope: &str, span: Span) -> Diagnostic {
    Diagnostic::fatal(
        E302,
        format!("reference `{name}` does not resolve in scope `{scope}`"),
        span,
    )
}

/// Creates a diagnostic for a runaway generate loop.
pub fn error_iteration_limit(limit: u32, scope: &str, span: Span) -> Diagnostic {
    Diagnostic::fatal(
        E303,
        format!("generate construct in `{scope}` exceeded {limit} iterations"),
        span,
    )
    .with_help("raise `inline.max_generate_iterations` in vcov.toml if the loop is intended")
}

/// Creates a diagnostic for a non-constant expression in a constant context.
pub fn error_not_constant(msg: &str, span: Span) -> Diagnostic {
    Diagnostic::fatal(E304, format!("cannot evaluate constant: {msg}"), span)
}

/// Creates a diagnostic for a circular instantiation.
pub fn error_circular_instantiation(name: &str) -> Diagnostic {
    Diagnostic::fatal(
        E305,
        format!("circular instantiation of module `{name}`"),
        Span::DUMMY,
    )
    .with_note("the module directly or indirectly instantiates itself")
}

/// Source location of an elaboration error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Original file of the enclosing module.
    pub file: String,
    /// First character.
    pub first: SourcePos,
    /// Last character.
    pub last: SourcePos,
}

impl Location {
    fn span(&self, db: &SourceDb) -> Span {
        match db.find(Path::new(&self.file)) {
            Some(file) => Span::new(file, self.first, self.last),
            None => Span::DUMMY,
        }
    }
}

fn span_of(at: &Option<Location>, db: &SourceDb) -> Span {
    at.as_ref().map_or(Span::DUMMY, |loc| loc.span(db))
}

/// A fatal elaboration failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ElaborateError {
    /// The requested top module does not exist.
    #[error("top-level module `{0}` not found")]
    UnknownTop(String),
    /// A genvar has no value where it is read.
    #[error("genvar `{name}` has no value in scope `{scope}`")]
    UnknownGenvar {
        /// Genvar name.
        name: String,
        /// Hierarchical name of the instance being resolved.
        scope: String,
        /// Where the genvar is read.
        at: Option<Location>,
    },
    /// A late-bound reference did not resolve.
    #[error("reference `{name}` does not resolve in scope `{scope}`")]
    Unbound {
        /// Substituted reference text.
        name: String,
        /// Hierarchical name of the instance holding the reference.
        scope: String,
        /// Where the reference appears.
        at: Option<Location>,
    },
    /// A generate loop ran past the iteration ceiling.
    #[error("generate construct in `{scope}` exceeded {limit} iterations")]
    IterationLimit {
        /// Configured ceiling.
        limit: u32,
        /// Hierarchical name of the instance being resolved.
        scope: String,
        /// The loop test.
        at: Option<Location>,
    },
    /// A constant context holds a non-constant expression.
    #[error("cannot evaluate constant: {message}")]
    NotConstant {
        /// Description.
        message: String,
        /// The expression.
        at: Option<Location>,
    },
    /// A module instantiates itself.
    #[error("circular instantiation of module `{0}`")]
    Circular(String),
    /// A broken invariant.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl ElaborateError {
    /// Converts the error into a diagnostic located through `db`.
    pub fn to_diagnostic(&self, db: &SourceDb) -> Diagnostic {
        match self {
            ElaborateError::UnknownTop(name) => error_top_not_found(name),
            ElaborateError::UnknownGenvar { name, scope, at } => {
                error_unknown_genvar(name, scope, span_of(at, db))
            }
            ElaborateError::Unbound { name, scope, at } => {
                error_unbound_reference(name, scope, span_of(at, db))
            }
            ElaborateError::IterationLimit { limit, scope, at } => {
                error_iteration_limit(*limit, scope, span_of(at, db))
            }
            ElaborateError::NotConstant { message, at } => {
                error_not_constant(message, span_of(at, db))
            }
            ElaborateError::Circular(name) => error_circular_instantiation(name),
            ElaborateError::Internal(err) => Diagnostic::fatal(
                DiagnosticCode::new(Category::Internal, 1),
                err.to_string(),
                Span::DUMMY,
            ),
        }
    }
}
