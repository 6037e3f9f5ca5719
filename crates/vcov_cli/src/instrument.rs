//! `vcov instrument`: elaborate, then write instrumented copies of every
//! design file.

use std::path::{Path, PathBuf};

use vcov_diagnostics::DiagnosticSink;
use vcov_inline::{instrument_design, NoAssertions};

use crate::pipeline::{elaborate, load_design, load_sources, render_diagnostics, resolve_config};
use crate::{GlobalArgs, InstrumentArgs};

/// Runs the command. Returns exit code 0 on success and 1 when any error
/// was reported.
pub fn run(args: &InstrumentArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = resolve_config(global)?;
    let mut design = load_design(Path::new(&args.design))?;
    let sources = load_sources(&design);
    let sink = DiagnosticSink::new();

    let Some(root) = elaborate(&mut design, args.top.as_deref(), &config, &sources, &sink) else {
        render_diagnostics(&sink, &sources, global.color);
        return Ok(1);
    };
    tracing::info!(top = %design.hierarchical_name(root), "design elaborated");

    let dir = PathBuf::from(args.output.as_deref().unwrap_or(&config.output.dir));
    let result = instrument_design(&design, &sources, &config, &NoAssertions, &sink, &dir);
    if let Err(e) = &result {
        sink.emit(e.to_diagnostic());
    }
    render_diagnostics(&sink, &sources, global.color);

    match result {
        Ok(summary) if !sink.has_errors() => {
            if !global.quiet {
                eprintln!(
                    "   Instrumented {} file(s), {} statement(s), {} coverage signal(s) into {}",
                    summary.files,
                    summary.stats.statements,
                    summary.stats.points,
                    dir.display()
                );
            }
            Ok(0)
        }
        _ => Ok(1),
    }
}
