//! Writing instrumented files and the instance-id fragment.

use crate::errors::warn_uninstantiated;
use crate::errors::InlineError;
use crate::names::INSTANCE_ID_PARAM;
use crate::oracle::CoverageOracle;
use crate::replay::replay;
use crate::session::{Session, SessionStats};
use std::fs;
use std::path::{Path, PathBuf};
use vcov_config::CoverageConfig;
use vcov_diagnostics::DiagnosticSink;
use vcov_elaborate::{instances_of, module_instances};
use vcov_model::{Design, FunitKind};
use vcov_source::{SourceDb, Span};

/// Totals over every file of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Files written.
    pub files: usize,
    /// Elaborated module instances.
    pub instances: usize,
    /// Per-file counters, summed.
    pub stats: SessionStats,
}

/// Creates `dir`, or removes stale `.v` files from it when it exists.
pub fn prepare_output_dir(dir: &Path) -> Result<(), InlineError> {
    let wrap = |source| InlineError::OutputDir {
        path: dir.to_path_buf(),
        source,
    };
    if !dir.exists() {
        return fs::create_dir_all(dir).map_err(wrap);
    }
    for entry in fs::read_dir(dir).map_err(wrap)? {
        let path = entry.map_err(wrap)?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "v") {
            tracing::debug!(path = %path.display(), "removing stale output");
            fs::remove_file(&path).map_err(wrap)?;
        }
    }
    Ok(())
}

/// `<dir>/<base name of original>`.
pub fn output_path(dir: &Path, original: &Path) -> PathBuf {
    match original.file_name() {
        Some(name) => dir.join(name),
        None => dir.join(original),
    }
}

/// Instruments the text of one design file.
pub fn instrument_source(
    design: &Design,
    config: &CoverageConfig,
    oracle: &dyn CoverageOracle,
    file: &str,
    source: &str,
) -> Result<(String, SessionStats), InlineError> {
    let mut session = Session::new(design, config, oracle, file);
    replay(source, &mut session)?;
    session.finish()
}

/// One `defparam` per module instance assigning its numeric id.
pub fn instance_id_fragment(design: &Design) -> String {
    module_instances(design)
        .into_iter()
        .map(|inst| {
            format!(
                "defparam {}.{INSTANCE_ID_PARAM} = {};\n",
                design.hierarchical_name(inst),
                design.instances[inst].id
            )
        })
        .collect()
}

/// Writes one instrumented file per design file into `dir`, followed by
/// the instance-id fragment.
///
/// The design must already be elaborated. Modules without an instance are
/// copied unchanged and reported as warnings through `sink`.
pub fn instrument_design(
    design: &Design,
    sources: &SourceDb,
    config: &CoverageConfig,
    oracle: &dyn CoverageOracle,
    sink: &DiagnosticSink,
    dir: &Path,
) -> Result<Summary, InlineError> {
    prepare_output_dir(dir)?;
    let mut summary = Summary {
        instances: module_instances(design).len(),
        ..Summary::default()
    };
    for file in design.files() {
        let id = sources
            .find(Path::new(file))
            .ok_or_else(|| InlineError::MissingSource(file.to_string()))?;
        for funit in design.funits_in_file(file) {
            let unit = &design.funits[funit];
            if unit.kind == FunitKind::Module && instances_of(design, funit).is_empty() {
                sink.emit(warn_uninstantiated(&unit.name, Span::point(id, unit.start)));
            }
        }

        let (text, stats) = instrument_source(design, config, oracle, file, &sources.get_file(id).content)?;
        let path = output_path(dir, Path::new(file));
        fs::write(&path, text).map_err(|source| InlineError::OutputFile {
            path: path.clone(),
            source,
        })?;
        tracing::info!(
            file = %path.display(),
            statements = stats.statements,
            points = stats.points,
            "wrote instrumented file"
        );
        summary.files += 1;
        summary.stats.modules += stats.modules;
        summary.stats.statements += stats.statements;
        summary.stats.points += stats.points;
    }

    let ids = dir.join(&config.output.instance_ids);
    fs::write(&ids, instance_id_fragment(design)).map_err(|source| InlineError::OutputFile {
        path: ids.clone(),
        source,
    })?;
    Ok(summary)
}
