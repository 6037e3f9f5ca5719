//! Coverage signal naming.
//!
//! Every coverage point is an escaped identifier derived from its kind, the
//! source span it measures and the scope path relative to the declaring
//! scope. Escaped identifiers end at whitespace, so every name carries its
//! terminating space.

use std::fmt;
use vcov_model::{Design, ExprSpan, FunitId};

/// What a coverage signal measures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CoverageKind {
    /// Statement executed.
    Line,
    /// Operand polarity of a two-operand logic operator, or a comparison.
    Combinational,
    /// One-bit outcome of a unary operator or a bare condition.
    Unary,
    /// Which terms of an event control fired.
    Event,
    /// Memory element written.
    MemoryWrite,
    /// Memory element read.
    MemoryRead,
    /// State transition.
    Fsm,
    /// Temporary holding a value that must not be evaluated twice.
    Temporary,
    /// Case item selected.
    CaseItem,
}

impl CoverageKind {
    /// One-letter tag used in the signal name.
    pub fn tag(self) -> char {
        match self {
            CoverageKind::Line => 'L',
            CoverageKind::Combinational => 'C',
            CoverageKind::Unary => 'U',
            CoverageKind::Event => 'E',
            CoverageKind::MemoryWrite => 'W',
            CoverageKind::MemoryRead => 'R',
            CoverageKind::Fsm => 'F',
            CoverageKind::Temporary => 'X',
            CoverageKind::CaseItem => 'A',
        }
    }
}

impl fmt::Display for CoverageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Builds `\covered$<K><first>_<last>_<cols>[$<scope>] `.
pub fn coverage_name(kind: CoverageKind, span: ExprSpan, scope: &str) -> String {
    let mut name = format!(
        "\\covered${}{}_{}_{:08x}",
        kind.tag(),
        span.first_line,
        span.last_line,
        span.cols.bits()
    );
    if !scope.is_empty() {
        name.push('$');
        name.push_str(&scope.replace('.', "$"));
    }
    name.push(' ');
    name
}

/// Name of the per-instance id parameter declared in every instrumented module.
pub const INSTANCE_ID_PARAM: &str = "\\covered$inst_id ";

/// Scope path from `owner` (exclusive) down to `funit`, joined with `$`.
/// Empty when `funit` is `owner` or lies outside it.
pub fn relative_scope(design: &Design, owner: FunitId, funit: FunitId) -> String {
    design
        .scope_path(owner, funit)
        .map(|parts| parts.join("$"))
        .unwrap_or_default()
}
