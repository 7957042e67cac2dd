//! Every comparison row of many reports in one table.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use diagrameval_core::align::ComparisonRow;
use diagrameval_core::report::ScoringReport;

/// A comparison row tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedRow {
    pub strategy: Option<u8>,
    pub model: String,
    pub source_file: String,
    #[serde(flatten)]
    pub row: ComparisonRow,
}

/// Concatenate the rows of `reports` in report order.
pub fn combine(reports: &[ScoringReport]) -> Vec<CombinedRow> {
    reports
        .iter()
        .flat_map(|report| {
            report.rows.iter().map(move |row| CombinedRow {
                strategy: report.source.strategy,
                model: report.source.model.clone(),
                source_file: report.source.file.clone(),
                row: row.clone(),
            })
        })
        .collect()
}

/// Write combined rows as JSONL.
pub fn write_combined_jsonl(rows: &[CombinedRow], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for row in rows {
        let line = serde_json::to_string(row).context("failed to serialize combined row")?;
        writeln!(file, "{line}")
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    tracing::debug!(path = %path.display(), rows = rows.len(), "wrote combined table");
    Ok(())
}

/// Read a combined JSONL file back.
pub fn read_combined_jsonl(path: &Path) -> Result<Vec<CombinedRow>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("failed to parse row at {}:{}", path.display(), i + 1))
        })
        .collect()
}
