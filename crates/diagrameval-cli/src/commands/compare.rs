//! The `diagrameval compare` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::Table;

use diagrameval_report::overview::{SettingsOverview, OVERVIEW_HEADERS};

use super::load_reports;

/// Columns shown in the terminal; the file formats carry all of them.
const TEXT_COLUMNS: [usize; 9] = [0, 1, 4, 5, 9, 14, 18, 25, 26];

pub fn execute(reports: Vec<PathBuf>, format: String, output: Option<PathBuf>) -> Result<()> {
    let reports = load_reports(&reports)?;
    let overview = SettingsOverview::from_reports(&reports);

    let rendered = match format.as_str() {
        "markdown" | "md" => overview.to_markdown(),
        "json" => serde_json::to_string_pretty(&overview)?,
        "html" => overview.to_html(),
        _ => {
            let mut table = Table::new();
            table.set_header(TEXT_COLUMNS.iter().map(|&i| OVERVIEW_HEADERS[i]));
            for row in overview.table() {
                table.add_row(TEXT_COLUMNS.iter().map(|&i| row[i].clone()));
            }
            format!("Comparing {} report(s)\n{table}", reports.len())
        }
    };

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Overview written to: {}", path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(())
}
