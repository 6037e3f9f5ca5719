//! Diagnostic rendering for terminal output.

use crate::diagnostic::Diagnostic;
use crate::label::LabelStyle;
use vcov_source::SourceDb;

/// Trait for rendering diagnostics into formatted output strings.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic into a formatted string.
    fn render(&self, diag: &Diagnostic, source_db: &SourceDb) -> String;
}

/// Renders diagnostics in a rustc-style terminal format.
///
/// ```text
/// fatal[E301]: unknown genvar `j` in scope `top.blk[0]`
///   --> rtl/top.v:12:20
///    |
/// 12 |     assign y[j] = x[j];
///    |            ^
///    = note: ...
/// ```
pub struct TerminalRenderer {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn header(&self, diag: &Diagnostic) -> String {
        let tag = format!("{}[{}]", diag.severity, diag.code);
        if self.color {
            let color = if diag.severity.is_error() { "31" } else { "33" };
            format!("\x1b[1;{color}m{tag}\x1b[0m: {}\n", diag.message)
        } else {
            format!("{tag}: {}\n", diag.message)
        }
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic, source_db: &SourceDb) -> String {
        let mut out = self.header(diag);

        if !diag.primary_span.is_dummy() {
            let span = diag.primary_span;
            let file = source_db.get_file(span.file);
            out.push_str(&format!("  --> {}:{}\n", file.path.display(), span.first));

            if let Some(line_content) = file.line_text(span.first.line) {
                let line_num = span.first.line.to_string();
                let padding = " ".repeat(line_num.len());
                out.push_str(&format!("{padding} |\n"));
                out.push_str(&format!("{line_num} | {line_content}\n"));

                let width = if span.last.line == span.first.line {
                    (span.last.col.saturating_sub(span.first.col) + 1) as usize
                } else {
                    1
                };
                let primary_msg = diag
                    .labels
                    .iter()
                    .find(|l| l.style == LabelStyle::Primary)
                    .map(|l| format!(" {}", l.message))
                    .unwrap_or_default();
                let col_padding = " ".repeat((span.first.col as usize).saturating_sub(1));
                out.push_str(&format!(
                    "{padding} | {col_padding}{}{primary_msg}\n",
                    "^".repeat(width)
                ));
            }
        }

        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }

        out
    }
}
