pub mod combine;
pub mod compare;
pub mod explore;
pub mod init;
pub mod prepare;
pub mod score;
pub mod settings;
pub mod simulate;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use diagrameval_batch::DiagramEvalConfig;
use diagrameval_core::engine::ProgressReporter;
use diagrameval_core::model::RawRow;
use diagrameval_core::parser;
use diagrameval_core::report::ScoringReport;
use diagrameval_core::store::DiagramStore;

/// Console progress reporter.
pub(crate) struct ConsoleReporter {
    verb: &'static str,
}

impl ConsoleReporter {
    pub(crate) fn new(verb: &'static str) -> Self {
        Self { verb }
    }
}

impl ProgressReporter for ConsoleReporter {
    fn on_item_start(&self, id: &str) {
        tracing::debug!("{} {id}", self.verb);
    }

    fn on_item_complete(&self, _id: &str) {}

    fn on_item_error(&self, id: &str, error: &str) {
        eprintln!("  ERROR: {id}: {error}");
    }

    fn on_batch_complete(&self, total: usize, completed: usize, failed: usize, elapsed: Duration) {
        eprintln!(
            "Complete: {completed}/{total} succeeded, {failed} failed ({:.1}s)",
            elapsed.as_secs_f64()
        );
    }
}

/// Load the coded rows named in the config.
pub(crate) fn load_rows(config: &DiagramEvalConfig) -> Result<Vec<RawRow>> {
    parser::load_rows(&config.rows)
}

/// Group rows into diagrams; the store logs and skips malformed groups.
pub(crate) fn build_store(config: &DiagramEvalConfig, rows: &[RawRow]) -> DiagramStore {
    let outcome = DiagramStore::from_rows(rows, &config.store_options());
    tracing::info!(
        diagrams = outcome.store.len(),
        rejected = outcome.failures.len(),
        filtered_rows = outcome.filtered_rows,
        "grouped rows"
    );
    outcome.store
}

/// Expand directories into the `*.json` files they contain, sorted.
pub(crate) fn collect_report_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(path)
                .with_context(|| format!("failed to read directory: {}", path.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .collect();
            found.sort();
            out.extend(found);
        } else {
            out.push(path.clone());
        }
    }
    anyhow::ensure!(!out.is_empty(), "no report files found");
    Ok(out)
}

pub(crate) fn load_reports(paths: &[PathBuf]) -> Result<Vec<ScoringReport>> {
    collect_report_paths(paths)?
        .iter()
        .map(|p| ScoringReport::load_json(p))
        .collect()
}

/// File name of `path` as a string, or the whole path when it has none.
pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
