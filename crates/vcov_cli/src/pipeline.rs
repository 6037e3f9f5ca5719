//! Shared steps of the `instrument` and `check` commands: configuration,
//! design loading and elaboration, and diagnostic rendering.

use std::path::{Path, PathBuf};

use vcov_config::CoverageConfig;
use vcov_diagnostics::{DiagnosticRenderer, DiagnosticSink, TerminalRenderer};
use vcov_model::{Design, InstId};
use vcov_source::SourceDb;

use crate::GlobalArgs;

/// Loads the configuration named by `--config`, or `vcov.toml` in the
/// current directory when present.
pub fn resolve_config(global: &GlobalArgs) -> Result<CoverageConfig, Box<dyn std::error::Error>> {
    let config = match &global.config {
        Some(path) => vcov_config::load_config_file(Path::new(path))?,
        None => vcov_config::load_config(&std::env::current_dir()?)?,
    };
    Ok(config)
}

/// Reads a design description and checks that its ids are consistent.
pub fn load_design(path: &Path) -> Result<Design, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read design `{}`: {e}", path.display()))?;
    let design: Design = serde_json::from_str(&text)
        .map_err(|e| format!("malformed design `{}`: {e}", path.display()))?;
    let problems = design.validate();
    if !problems.is_empty() {
        return Err(format!("inconsistent design `{}`: {}", path.display(), problems.join("; ")).into());
    }
    tracing::info!(
        funits = design.funits.len(),
        statements = design.stmts.len(),
        "design loaded"
    );
    Ok(design)
}

/// Loads every file the design refers to. Unreadable files are left out;
/// instrumenting them later reports the gap.
pub fn load_sources(design: &Design) -> SourceDb {
    let mut db = SourceDb::new();
    for file in design.files() {
        let path = PathBuf::from(file);
        if let Err(e) = db.load_file(&path) {
            tracing::warn!(file, error = %e, "cannot read design file");
        }
    }
    db
}

/// Elaborates `design` from `top`, turning a failure into a diagnostic.
pub fn elaborate(
    design: &mut Design,
    top: Option<&str>,
    config: &CoverageConfig,
    sources: &SourceDb,
    sink: &DiagnosticSink,
) -> Option<InstId> {
    match vcov_elaborate::elaborate(design, top, config.inline.max_generate_iterations) {
        Ok(root) => Some(root),
        Err(e) => {
            sink.emit(e.to_diagnostic(sources));
            None
        }
    }
}

/// Renders all diagnostics from `sink` to stderr. Returns how many were
/// rendered.
pub fn render_diagnostics(sink: &DiagnosticSink, sources: &SourceDb, color: bool) -> usize {
    let renderer = TerminalRenderer::new(color);
    let diagnostics = sink.diagnostics();
    for diag in &diagnostics {
        eprintln!("{}", renderer.render(diag, sources));
    }
    diagnostics.len()
}
